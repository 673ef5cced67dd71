mod progress;
mod progression;
mod state;
mod workflow;

// Public API of the study subsystem.
pub use crate::error::{SessionClosed, SessionError, TransitionError};
pub use progress::ActivityProgress;
pub use progression::SectionAdvance;
pub use state::{ActivityState, SectionCursor, StudyState};
pub use workflow::{StudyHandle, StudyLoopService, StudySession};

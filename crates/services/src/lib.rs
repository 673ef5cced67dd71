#![forbid(unsafe_code)]

pub mod activity_source;
pub mod config;
pub mod error;
pub mod preload_service;
pub mod study;
mod wire;

pub use study_core::Clock;

pub use activity_source::{ActivitySource, HttpActivitySource, PickedActivity, SessionToken};
pub use config::{ActivitySourceConfig, StudyConfig};
pub use error::{
    ActivitySourceError, PreloadError, ProtocolError, SessionClosed, SessionError,
    SessionErrorKind, TransitionError, TransportError,
};
pub use preload_service::{FetchedMedia, HttpMediaFetcher, MediaFetcher, MediaPreloader};

pub use study::{
    ActivityProgress, ActivityState, SectionAdvance, SectionCursor, StudyHandle,
    StudyLoopService, StudySession, StudyState,
};

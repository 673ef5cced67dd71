mod activity;
mod atom;
mod ids;
mod media;

pub use activity::{
    Activity, ActivityError, AnnotatedText, Choice, OnFail, Qmti, Section, SectionKind, Slide,
    TtsSlides,
};
pub use atom::{
    AggregateAtomReport, AtomError, AtomId, AtomInfo, AtomReport, AtomSet, AtomsInfo, combine,
    merge_unique,
};
pub use ids::ActivityInstanceId;
pub use media::{MediaError, MediaFilename, MediaHandle, MediaUrlPrefix, PreloadMap};

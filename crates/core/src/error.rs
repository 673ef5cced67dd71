use thiserror::Error;

use crate::model::{ActivityError, AtomError, MediaError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Activity(#[from] ActivityError),
    #[error(transparent)]
    Atom(#[from] AtomError),
    #[error(transparent)]
    Media(#[from] MediaError),
}

//! Shared error types for the services crate.

use thiserror::Error;

use study_core::model::{MediaFilename, SectionKind};

use crate::study::SectionCursor;

/// Transport-level failure talking to a remote endpoint.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("connection error: {0}")]
    Connection(String),
}

impl TransportError {
    /// Classifies a failed request; unreachable or stalled hosts become `Connection`.
    pub(crate) fn from_request(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            TransportError::Connection(err.to_string())
        } else {
            TransportError::Http(err)
        }
    }
}

/// The backend sent something this client does not understand.
///
/// Indicates version skew between client and backend; never retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    #[error("section is missing its kind discriminator")]
    MissingSectionKind,
    #[error("unknown section kind: {0}")]
    UnknownSectionKind(String),
    #[error("unknown on_fail policy: {0}")]
    UnknownFailPolicy(String),
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid activity content: {0}")]
    InvalidContent(#[from] study_core::Error),
}

/// Errors emitted by an `ActivitySource`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ActivitySourceError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Errors emitted by the media preload pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PreloadError {
    #[error("failed to preload media file {filename}")]
    Fetch {
        filename: MediaFilename,
        #[source]
        source: TransportError,
    },
}

/// A section-finished event that does not fit the current activity state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransitionError {
    #[error("no activity is loaded")]
    NoActiveActivity,
    #[error("activity already completed")]
    AlreadyCompleted,
    #[error("section index {index} out of range for {len} sections")]
    SectionOutOfRange { index: usize, len: usize },
    #[error("event targets {expected} but the activity is at {actual}")]
    Desync {
        expected: SectionCursor,
        actual: SectionCursor,
    },
    #[error("expected a {expected} section, current section is {actual}")]
    WrongSectionKind {
        expected: SectionKind,
        actual: SectionKind,
    },
    #[error("choice {index} out of range for {len} choices")]
    ChoiceOutOfRange { index: usize, len: usize },
}

/// The session loop behind a `StudyHandle` is no longer running.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("study session has ended")]
pub struct SessionClosed;

/// Coarse classification used by callers to pick retry prompt vs hard failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorKind {
    NetworkFailure,
    ProtocolMismatch,
    InvalidStateTransition,
}

/// Errors that end a study session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("failed to pick next activity")]
    Pick(#[source] TransportError),
    #[error(transparent)]
    Preload(#[from] PreloadError),
    #[error("failed to report activity result")]
    Report(#[source] TransportError),
    #[error("protocol mismatch: {0}")]
    ProtocolMismatch(#[from] ProtocolError),
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(#[from] TransitionError),
}

impl SessionError {
    #[must_use]
    pub fn kind(&self) -> SessionErrorKind {
        match self {
            SessionError::Pick(_) | SessionError::Preload(_) | SessionError::Report(_) => {
                SessionErrorKind::NetworkFailure
            }
            SessionError::ProtocolMismatch(_) => SessionErrorKind::ProtocolMismatch,
            SessionError::InvalidStateTransition(_) => SessionErrorKind::InvalidStateTransition,
        }
    }

    /// True when re-running the session from scratch may succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.kind() == SessionErrorKind::NetworkFailure
    }

    pub(crate) fn from_pick(err: ActivitySourceError) -> Self {
        match err {
            ActivitySourceError::Transport(source) => SessionError::Pick(source),
            ActivitySourceError::Protocol(source) => SessionError::ProtocolMismatch(source),
        }
    }

    pub(crate) fn from_report(err: ActivitySourceError) -> Self {
        match err {
            ActivitySourceError::Transport(source) => SessionError::Report(source),
            ActivitySourceError::Protocol(source) => SessionError::ProtocolMismatch(source),
        }
    }
}

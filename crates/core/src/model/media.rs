use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use thiserror::Error;
use url::Url;

//
// ─── ERRORS (domain validation) ────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("media filename cannot be empty")]
    EmptyFilename,

    #[error("media url prefix is not a valid absolute url: {0}")]
    InvalidUrlPrefix(String),
}

//
// ─── FILENAMES ────────────────────────────────────────────────────────────────
//

/// A media filename as referenced inside an activity.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaFilename(String);

impl MediaFilename {
    /// # Errors
    ///
    /// Returns `MediaError::EmptyFilename` if the name is blank.
    pub fn new(raw: impl Into<String>) -> Result<Self, MediaError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(MediaError::EmptyFilename);
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for MediaFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MediaFilename({})", self.0)
    }
}

impl fmt::Display for MediaFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Base URL that activity filenames are appended to.
///
/// Resolution is plain concatenation, so the prefix decides whether a
/// separating `/` is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUrlPrefix(String);

impl MediaUrlPrefix {
    /// # Errors
    ///
    /// Returns `MediaError::InvalidUrlPrefix` if the prefix is not an absolute URL.
    pub fn new(raw: impl Into<String>) -> Result<Self, MediaError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if Url::parse(trimmed).is_err() {
            return Err(MediaError::InvalidUrlPrefix(raw));
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn resolve(&self, filename: &MediaFilename) -> String {
        format!("{}{}", self.0, filename.as_str())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//
// ─── PRELOADED MEDIA ──────────────────────────────────────────────────────────
//

/// Fully downloaded media, playable without touching the network.
///
/// The payload is reference counted; the memory is released once the last
/// clone (held by the state or by whatever renders it) is dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaHandle {
    filename: MediaFilename,
    content_type: Option<String>,
    data: Bytes,
}

impl MediaHandle {
    #[must_use]
    pub fn new(filename: MediaFilename, content_type: Option<String>, data: Bytes) -> Self {
        Self {
            filename,
            content_type,
            data,
        }
    }

    #[must_use]
    pub fn filename(&self) -> &MediaFilename {
        &self.filename
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaHandle")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Filename → preloaded media for one activity. Built once, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadMap {
    entries: HashMap<MediaFilename, MediaHandle>,
}

impl PreloadMap {
    #[must_use]
    pub fn get(&self, filename: &MediaFilename) -> Option<&MediaHandle> {
        self.entries.get(filename)
    }

    #[must_use]
    pub fn contains(&self, filename: &MediaFilename) -> bool {
        self.entries.contains_key(filename)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all payload sizes in bytes.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.entries.values().map(MediaHandle::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MediaFilename, &MediaHandle)> {
        self.entries.iter()
    }
}

impl FromIterator<MediaHandle> for PreloadMap {
    fn from_iter<T: IntoIterator<Item = MediaHandle>>(iter: T) -> Self {
        let entries = iter
            .into_iter()
            .map(|handle| (handle.filename.clone(), handle))
            .collect();
        Self { entries }
    }
}

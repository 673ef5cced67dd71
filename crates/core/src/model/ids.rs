use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one loaded playthrough of an activity.
///
/// Two loads of identical activity content get different ids, so the
/// presentation layer can tell a fresh playthrough from a stale one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActivityInstanceId(Uuid);

impl ActivityInstanceId {
    /// Generates a new random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing value, e.g. in tests.
    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying uuid.
    #[must_use]
    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl fmt::Debug for ActivityInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActivityInstanceId({})", self.0.simple())
    }
}

impl fmt::Display for ActivityInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_differ() {
        assert_ne!(ActivityInstanceId::generate(), ActivityInstanceId::generate());
    }

    #[test]
    fn display_is_compact_hex() {
        let id = ActivityInstanceId::from_uuid(Uuid::nil());
        assert_eq!(id.to_string(), "00000000000000000000000000000000");
    }
}

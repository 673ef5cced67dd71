use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use study_core::Clock;
use study_core::model::{
    Activity, ActivityInstanceId, AggregateAtomReport, AtomsInfo, PreloadMap, Section,
};

use super::progress::ActivityProgress;

/// Identifies the exact section an event was raised for.
///
/// Events carry the cursor they observed, so a stale or duplicated event is
/// detected instead of being applied to the wrong section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionCursor {
    pub instance_id: ActivityInstanceId,
    pub attempt: u32,
    pub section_index: usize,
}

impl fmt::Display for SectionCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "activity {} attempt {} section {}",
            self.instance_id, self.attempt, self.section_index
        )
    }
}

/// One playthrough of a loaded activity.
///
/// Owned by the study loop. Transitions consume the state and hand back a new
/// one; nothing patches it from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityState {
    pub(super) instance_id: ActivityInstanceId,
    pub(super) attempt: u32,
    pub(super) activity: Arc<Activity>,
    pub(super) atoms_info: Arc<AtomsInfo>,
    pub(super) preload: Arc<PreloadMap>,
    pub(super) section_index: usize,
    pub(super) accum: AggregateAtomReport,
    pub(super) completed: bool,
    pub(super) loaded_at: DateTime<Utc>,
}

impl ActivityState {
    /// Starts a fresh playthrough at section 0 with an empty aggregate.
    #[must_use]
    pub fn initialize(activity: Activity, preload: PreloadMap, clock: &Clock) -> Self {
        Self {
            instance_id: ActivityInstanceId::generate(),
            attempt: 0,
            activity: Arc::new(activity),
            atoms_info: Arc::new(AtomsInfo::new()),
            preload: Arc::new(preload),
            section_index: 0,
            accum: AggregateAtomReport::new(),
            completed: false,
            loaded_at: clock.now(),
        }
    }

    #[must_use]
    pub fn with_atoms_info(mut self, atoms_info: AtomsInfo) -> Self {
        self.atoms_info = Arc::new(atoms_info);
        self
    }

    #[must_use]
    pub fn instance_id(&self) -> ActivityInstanceId {
        self.instance_id
    }

    /// Number of restarts within this playthrough.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    #[must_use]
    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    #[must_use]
    pub fn atoms_info(&self) -> &AtomsInfo {
        &self.atoms_info
    }

    #[must_use]
    pub fn preload_map(&self) -> &PreloadMap {
        &self.preload
    }

    #[must_use]
    pub fn section_index(&self) -> usize {
        self.section_index
    }

    #[must_use]
    pub fn current_section(&self) -> Option<&Section> {
        self.activity.section(self.section_index)
    }

    /// Aggregate of every report merged so far in this playthrough.
    #[must_use]
    pub fn accumulated(&self) -> &AggregateAtomReport {
        &self.accum
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    #[must_use]
    pub fn cursor(&self) -> SectionCursor {
        SectionCursor {
            instance_id: self.instance_id,
            attempt: self.attempt,
            section_index: self.section_index,
        }
    }

    #[must_use]
    pub fn progress(&self) -> Option<ActivityProgress> {
        let section = self.current_section()?;
        Some(ActivityProgress {
            section_index: self.section_index,
            total_sections: self.activity.section_count(),
            section_kind: section.kind(),
            attempt: self.attempt,
            is_complete: self.completed,
        })
    }
}

/// What the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyState {
    loading: bool,
    activity: Option<ActivityState>,
}

impl Default for StudyState {
    fn default() -> Self {
        Self::loading()
    }
}

impl StudyState {
    /// A pick or preload is in flight and there is nothing to show.
    #[must_use]
    pub fn loading() -> Self {
        Self {
            loading: true,
            activity: None,
        }
    }

    #[must_use]
    pub fn showing(activity: ActivityState) -> Self {
        Self {
            loading: false,
            activity: Some(activity),
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn activity(&self) -> Option<&ActivityState> {
        self.activity.as_ref()
    }
}

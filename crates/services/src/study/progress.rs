use study_core::model::SectionKind;

/// Where the learner is inside the current activity, for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityProgress {
    pub section_index: usize,
    pub total_sections: usize,
    pub section_kind: SectionKind,
    pub attempt: u32,
    pub is_complete: bool,
}

impl ActivityProgress {
    /// Sections left after the current one.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.total_sections
            .saturating_sub(self.section_index)
            .saturating_sub(1)
    }
}

use study_core::model::{AggregateAtomReport, AtomReport, OnFail, Section, SectionKind};
use tracing::debug;

use crate::error::TransitionError;
use super::state::ActivityState;

/// Result of finishing the current section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionAdvance {
    /// Moved on to the next section.
    Advanced,
    /// A restart-on-fail quiz was failed; back at section 0.
    Restarted,
    /// The last section finished. Carries the final aggregate, intro atoms included.
    Completed(AggregateAtomReport),
}

impl ActivityState {
    /// Applies the outcome of the current section.
    ///
    /// A failed quiz with `OnFail::Restart` sends the playthrough back to
    /// section 0 and drops `report`; reports merged before it are kept.
    /// Anything else merges `report` and advances. Finishing the last section
    /// also merges the activity's intro atoms as introduced, exactly once.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::AlreadyCompleted` if the activity already
    /// finished, or `TransitionError::SectionOutOfRange` if the index no longer
    /// points at a section.
    pub fn section_finished(
        self,
        report: AtomReport,
        failed: bool,
    ) -> Result<(Self, SectionAdvance), TransitionError> {
        let policy = match self.checked_section()? {
            Section::TtsSlides(_) => OnFail::Report,
            Section::Qmti(quiz) => quiz.on_fail(),
        };

        if failed && policy == OnFail::Restart {
            debug!(instance = %self.instance_id, section = self.section_index, "restarting activity");
            return Ok((self.restarted(), SectionAdvance::Restarted));
        }

        let mut next = self;
        next.accum = next.accum.combine(&report);

        let new_index = next.section_index + 1;
        if new_index < next.activity.section_count() {
            next.section_index = new_index;
            return Ok((next, SectionAdvance::Advanced));
        }

        let intro = AtomReport::empty().with_introduced(next.activity.intro_atoms().iter().cloned());
        next.accum = next.accum.combine(&intro);
        next.completed = true;
        let aggregate = next.accum.clone();
        Ok((next, SectionAdvance::Completed(aggregate)))
    }

    /// Finishes the current slideshow section.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::WrongSectionKind` if the current section is not a slideshow.
    pub fn slides_finished(self) -> Result<(Self, SectionAdvance), TransitionError> {
        let report = match self.checked_section()? {
            Section::TtsSlides(slides) => slides.finished_report(),
            other => {
                return Err(TransitionError::WrongSectionKind {
                    expected: SectionKind::TtsSlides,
                    actual: other.kind(),
                });
            }
        };
        self.section_finished(report, false)
    }

    /// Answers the current quiz with the choice at `index`.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::WrongSectionKind` if the current section is not a quiz,
    /// or `TransitionError::ChoiceOutOfRange` for an unknown choice.
    pub fn choice_selected(self, index: usize) -> Result<(Self, SectionAdvance), TransitionError> {
        let (report, failed) = match self.checked_section()? {
            Section::Qmti(quiz) => quiz.report_for_choice(index).map_err(|_| {
                TransitionError::ChoiceOutOfRange {
                    index,
                    len: quiz.choices().len(),
                }
            })?,
            other => {
                return Err(TransitionError::WrongSectionKind {
                    expected: SectionKind::Qmti,
                    actual: other.kind(),
                });
            }
        };
        self.section_finished(report, failed)
    }

    fn checked_section(&self) -> Result<&Section, TransitionError> {
        if self.completed {
            return Err(TransitionError::AlreadyCompleted);
        }
        self.current_section()
            .ok_or(TransitionError::SectionOutOfRange {
                index: self.section_index,
                len: self.activity.section_count(),
            })
    }

    fn restarted(mut self) -> Self {
        self.section_index = 0;
        self.attempt = self.attempt.saturating_add(1);
        self
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::{
        Activity, AnnotatedText, AtomId, AtomSet, Choice, MediaFilename, PreloadMap, Qmti, Slide,
        TtsSlides,
    };
    use study_core::time::fixed_clock;

    fn atom(id: &str) -> AtomId {
        AtomId::new(id).unwrap()
    }

    fn atoms(ids: &[&str]) -> AtomSet {
        ids.iter().map(|id| atom(id)).collect()
    }

    fn file(raw: &str) -> MediaFilename {
        MediaFilename::new(raw).unwrap()
    }

    fn slides() -> Section {
        Section::TtsSlides(
            TtsSlides::new(vec![Slide {
                audio: file("s.mp3"),
                image: file("s.png"),
                text: AnnotatedText::default(),
            }])
            .unwrap(),
        )
    }

    fn quiz(tested: &str, on_fail: OnFail) -> Section {
        Section::Qmti(
            Qmti::new(
                file("q.mp3"),
                AnnotatedText::default(),
                atoms(&[tested]),
                vec![
                    Choice {
                        image: file("right.png"),
                        correct: true,
                        fail_atoms: AtomSet::new(),
                    },
                    Choice {
                        image: file("wrong.png"),
                        correct: false,
                        fail_atoms: atoms(&["decoy"]),
                    },
                ],
                on_fail,
            )
            .unwrap(),
        )
    }

    fn state(sections: Vec<Section>, intro: &[&str]) -> ActivityState {
        let activity = Activity::new(sections, atoms(intro)).unwrap();
        ActivityState::initialize(activity, PreloadMap::default(), &fixed_clock())
    }

    #[test]
    fn initialize_starts_at_first_section_with_empty_aggregate() {
        let state = state(vec![slides()], &[]);
        assert_eq!(state.section_index(), 0);
        assert_eq!(state.attempt(), 0);
        assert!(state.accumulated().is_empty());
        assert!(!state.is_completed());
    }

    #[test]
    fn intro_atoms_are_credited_once_on_completion() {
        let mut current = state(vec![slides(), slides(), slides()], &["a1", "a2"]);
        for _ in 0..2 {
            let (next, outcome) = current.slides_finished().unwrap();
            assert_eq!(outcome, SectionAdvance::Advanced);
            assert!(next.accumulated().report().introduced.is_empty());
            current = next;
        }

        let (done, outcome) = current.slides_finished().unwrap();
        let SectionAdvance::Completed(aggregate) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(aggregate.report().introduced, atoms(&["a1", "a2"]));
        assert_eq!(done.section_index(), 2);
        assert!(done.is_completed());
    }

    #[test]
    fn restart_discards_only_the_failed_report() {
        let mut current = state(
            vec![slides(), quiz("s1", OnFail::Report), quiz("s2", OnFail::Restart)],
            &["intro"],
        );
        current = current.slides_finished().unwrap().0;
        current = current.choice_selected(0).unwrap().0;
        let before = current.accumulated().clone();
        let instance = current.instance_id();

        let failing = AtomReport::empty().with_failed([atom("s2")]);
        let (restarted, outcome) = current.section_finished(failing, true).unwrap();

        assert_eq!(outcome, SectionAdvance::Restarted);
        assert_eq!(restarted.section_index(), 0);
        assert_eq!(restarted.accumulated(), &before);
        assert_eq!(restarted.instance_id(), instance);
        assert_eq!(restarted.attempt(), 1);
        assert!(restarted.accumulated().report().introduced.is_empty());
    }

    #[test]
    fn report_policy_merges_failure_and_advances() {
        let current = state(
            vec![slides(), slides(), quiz("s2", OnFail::Report), slides()],
            &[],
        );
        let current = current.slides_finished().unwrap().0;
        let current = current.slides_finished().unwrap().0;

        let (next, outcome) = current.choice_selected(1).unwrap();

        assert_eq!(outcome, SectionAdvance::Advanced);
        assert_eq!(next.section_index(), 3);
        assert_eq!(next.accumulated().report().failed, atoms(&["decoy", "s2"]));
    }

    #[test]
    fn report_policy_on_last_section_completes() {
        let current = state(vec![quiz("q", OnFail::Report)], &[]);
        let (_, outcome) = current.choice_selected(1).unwrap();
        let SectionAdvance::Completed(aggregate) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(aggregate.report().failed, atoms(&["decoy", "q"]));
    }

    #[test]
    fn slides_then_failed_quiz_scenario() {
        let current = state(vec![slides(), quiz("atom1", OnFail::Report)], &["atom0"]);

        let (current, outcome) = current.section_finished(AtomReport::empty(), false).unwrap();
        assert_eq!(outcome, SectionAdvance::Advanced);
        assert_eq!(current.section_index(), 1);
        assert!(current.accumulated().is_empty());

        let failing = AtomReport::empty().with_failed([atom("atom1")]);
        let (_, outcome) = current.section_finished(failing, true).unwrap();
        let expected = AggregateAtomReport::new().combine(
            &AtomReport::empty()
                .with_introduced([atom("atom0")])
                .with_failed([atom("atom1")]),
        );
        assert_eq!(outcome, SectionAdvance::Completed(expected));
    }

    #[test]
    fn repeated_restarts_do_not_double_count() {
        let mut current = state(vec![slides(), quiz("q", OnFail::Restart)], &[]);
        for attempt in 1..=3 {
            current = current
                .section_finished(AtomReport::empty().with_exposed([atom("seen")]), false)
                .unwrap()
                .0;
            let (next, outcome) = current.choice_selected(1).unwrap();
            assert_eq!(outcome, SectionAdvance::Restarted);
            assert_eq!(next.attempt(), attempt);
            current = next;
        }
        assert_eq!(current.accumulated().report().exposed, atoms(&["seen"]));
        assert!(current.accumulated().report().failed.is_empty());
    }

    #[test]
    fn finishing_after_completion_is_rejected() {
        let current = state(vec![slides()], &[]);
        let (done, _) = current.slides_finished().unwrap();
        let err = done.slides_finished().unwrap_err();
        assert_eq!(err, TransitionError::AlreadyCompleted);
    }

    #[test]
    fn wrong_section_kind_is_rejected() {
        let current = state(vec![slides()], &[]);
        let err = current.clone().choice_selected(0).unwrap_err();
        assert_eq!(
            err,
            TransitionError::WrongSectionKind {
                expected: SectionKind::Qmti,
                actual: SectionKind::TtsSlides,
            }
        );
        let quiz_state = state(vec![quiz("q", OnFail::Report)], &[]);
        let err = quiz_state.choice_selected(9).unwrap_err();
        assert_eq!(err, TransitionError::ChoiceOutOfRange { index: 9, len: 2 });
    }

    #[test]
    fn progress_tracks_current_section() {
        let current = state(vec![slides(), quiz("q", OnFail::Report)], &[]);
        let current = current.slides_finished().unwrap().0;
        let progress = current.progress().unwrap();
        assert_eq!(progress.section_index, 1);
        assert_eq!(progress.total_sections, 2);
        assert_eq!(progress.section_kind, SectionKind::Qmti);
        assert_eq!(progress.remaining(), 0);
    }
}

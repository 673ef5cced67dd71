use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::model::atom::{AtomReport, AtomSet};
use crate::model::media::MediaFilename;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ActivityError {
    #[error("activity has no sections")]
    NoSections,

    #[error("slideshow has no slides")]
    EmptySlideshow,

    #[error("quiz has no choices")]
    NoChoices,

    #[error("quiz has no correct choice")]
    NoCorrectChoice,

    #[error("choice {index} out of range for {len} choices")]
    ChoiceOutOfRange { index: usize, len: usize },
}

//
// ─── SHARED PIECES ────────────────────────────────────────────────────────────
//

/// Transcript of spoken media plus its translations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotatedText {
    pub text: String,
    pub translations: Vec<String>,
}

impl AnnotatedText {
    #[must_use]
    pub fn new(text: impl Into<String>, translations: Vec<String>) -> Self {
        Self {
            text: text.into(),
            translations,
        }
    }
}

/// Discriminant of a `Section`, used in logs and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    TtsSlides,
    Qmti,
}

impl SectionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SectionKind::TtsSlides => "tts_slides",
            SectionKind::Qmti => "qmti",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── SLIDESHOW ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    pub audio: MediaFilename,
    pub image: MediaFilename,
    pub text: AnnotatedText,
}

/// Narrated slideshow. Tests no atoms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtsSlides {
    slides: Vec<Slide>,
}

impl TtsSlides {
    /// # Errors
    ///
    /// Returns `ActivityError::EmptySlideshow` if `slides` is empty.
    pub fn new(slides: Vec<Slide>) -> Result<Self, ActivityError> {
        if slides.is_empty() {
            return Err(ActivityError::EmptySlideshow);
        }
        Ok(Self { slides })
    }

    #[must_use]
    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    /// Report produced once the whole slide sequence has played.
    #[must_use]
    pub fn finished_report(&self) -> AtomReport {
        AtomReport::empty()
    }
}

//
// ─── QUIZ (QMTI) ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub image: MediaFilename,
    pub correct: bool,
    /// Extra atoms marked failed when this choice is picked.
    pub fail_atoms: AtomSet,
}

/// What a failed quiz does to the rest of the activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnFail {
    /// Record the failure and move on.
    #[default]
    Report,
    /// Send the learner back to the first section.
    Restart,
}

/// Audio prompt answered by picking one of several images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Qmti {
    prompt_audio: MediaFilename,
    text: AnnotatedText,
    tested_atoms: AtomSet,
    choices: Vec<Choice>,
    on_fail: OnFail,
}

impl Qmti {
    /// # Errors
    ///
    /// Returns `ActivityError::NoChoices` or `ActivityError::NoCorrectChoice`
    /// if the choice list cannot be answered correctly.
    pub fn new(
        prompt_audio: MediaFilename,
        text: AnnotatedText,
        tested_atoms: AtomSet,
        choices: Vec<Choice>,
        on_fail: OnFail,
    ) -> Result<Self, ActivityError> {
        if choices.is_empty() {
            return Err(ActivityError::NoChoices);
        }
        if !choices.iter().any(|choice| choice.correct) {
            return Err(ActivityError::NoCorrectChoice);
        }
        Ok(Self {
            prompt_audio,
            text,
            tested_atoms,
            choices,
            on_fail,
        })
    }

    #[must_use]
    pub fn prompt_audio(&self) -> &MediaFilename {
        &self.prompt_audio
    }

    #[must_use]
    pub fn text(&self) -> &AnnotatedText {
        &self.text
    }

    #[must_use]
    pub fn tested_atoms(&self) -> &AtomSet {
        &self.tested_atoms
    }

    #[must_use]
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    #[must_use]
    pub fn on_fail(&self) -> OnFail {
        self.on_fail
    }

    /// Builds the report for the choice at `index`, returning whether it counts as failed.
    ///
    /// A correct choice passes the tested atoms. An incorrect one fails them
    /// together with the choice's own fail atoms.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError::ChoiceOutOfRange` for an unknown choice.
    pub fn report_for_choice(&self, index: usize) -> Result<(AtomReport, bool), ActivityError> {
        let choice = self
            .choices
            .get(index)
            .ok_or(ActivityError::ChoiceOutOfRange {
                index,
                len: self.choices.len(),
            })?;

        if choice.correct {
            let report = AtomReport::empty().with_passed(self.tested_atoms.iter().cloned());
            Ok((report, false))
        } else {
            let report = AtomReport::empty().with_failed(
                self.tested_atoms
                    .iter()
                    .chain(choice.fail_atoms.iter())
                    .cloned(),
            );
            Ok((report, true))
        }
    }
}

//
// ─── SECTION / ACTIVITY ───────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    TtsSlides(TtsSlides),
    Qmti(Qmti),
}

impl Section {
    #[must_use]
    pub fn kind(&self) -> SectionKind {
        match self {
            Section::TtsSlides(_) => SectionKind::TtsSlides,
            Section::Qmti(_) => SectionKind::Qmti,
        }
    }

    /// Every media file this section plays or shows.
    pub fn media_filenames(&self) -> Vec<&MediaFilename> {
        match self {
            Section::TtsSlides(slides) => slides
                .slides
                .iter()
                .flat_map(|slide| [&slide.audio, &slide.image])
                .collect(),
            Section::Qmti(quiz) => std::iter::once(&quiz.prompt_audio)
                .chain(quiz.choices.iter().map(|choice| &choice.image))
                .collect(),
        }
    }
}

/// One learning unit. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    sections: Vec<Section>,
    intro_atoms: AtomSet,
}

impl Activity {
    /// # Errors
    ///
    /// Returns `ActivityError::NoSections` if `sections` is empty.
    pub fn new(sections: Vec<Section>, intro_atoms: AtomSet) -> Result<Self, ActivityError> {
        if sections.is_empty() {
            return Err(ActivityError::NoSections);
        }
        Ok(Self {
            sections,
            intro_atoms,
        })
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    #[must_use]
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Atoms credited as introduced once the whole activity completes.
    #[must_use]
    pub fn intro_atoms(&self) -> &AtomSet {
        &self.intro_atoms
    }

    /// Distinct media filenames referenced anywhere in the activity.
    #[must_use]
    pub fn media_filenames(&self) -> BTreeSet<MediaFilename> {
        self.sections
            .iter()
            .flat_map(Section::media_filenames)
            .cloned()
            .collect()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::atom::AtomId;

    fn file(raw: &str) -> MediaFilename {
        MediaFilename::new(raw).unwrap()
    }

    fn atom_set(ids: &[&str]) -> AtomSet {
        ids.iter().map(|id| AtomId::new(*id).unwrap()).collect()
    }

    fn choice(image: &str, correct: bool, fail_atoms: &[&str]) -> Choice {
        Choice {
            image: file(image),
            correct,
            fail_atoms: atom_set(fail_atoms),
        }
    }

    fn quiz(on_fail: OnFail) -> Qmti {
        Qmti::new(
            file("prompt.mp3"),
            AnnotatedText::new("el gato", vec!["the cat".into()]),
            atom_set(&["gato"]),
            vec![
                choice("cat.png", true, &[]),
                choice("dog.png", false, &["perro"]),
            ],
            on_fail,
        )
        .unwrap()
    }

    #[test]
    fn quiz_requires_a_correct_choice() {
        let err = Qmti::new(
            file("p.mp3"),
            AnnotatedText::default(),
            AtomSet::new(),
            vec![choice("x.png", false, &[])],
            OnFail::Report,
        )
        .unwrap_err();
        assert_eq!(err, ActivityError::NoCorrectChoice);
    }

    #[test]
    fn correct_choice_passes_tested_atoms() {
        let (report, failed) = quiz(OnFail::Report).report_for_choice(0).unwrap();
        assert!(!failed);
        assert_eq!(report.passed, atom_set(&["gato"]));
        assert!(report.failed.is_empty());
    }

    #[test]
    fn wrong_choice_fails_tested_and_extra_atoms() {
        let (report, failed) = quiz(OnFail::Restart).report_for_choice(1).unwrap();
        assert!(failed);
        assert_eq!(report.failed, atom_set(&["gato", "perro"]));
        assert!(report.passed.is_empty());
    }

    #[test]
    fn unknown_choice_is_an_error() {
        let err = quiz(OnFail::Report).report_for_choice(7).unwrap_err();
        assert_eq!(err, ActivityError::ChoiceOutOfRange { index: 7, len: 2 });
    }

    #[test]
    fn media_filenames_are_distinct_across_sections() {
        let slides = TtsSlides::new(vec![
            Slide {
                audio: file("a.mp3"),
                image: file("b.png"),
                text: AnnotatedText::default(),
            },
            Slide {
                audio: file("a.mp3"),
                image: file("cat.png"),
                text: AnnotatedText::default(),
            },
        ])
        .unwrap();
        let activity = Activity::new(
            vec![Section::TtsSlides(slides), Section::Qmti(quiz(OnFail::Report))],
            AtomSet::new(),
        )
        .unwrap();

        let names: Vec<_> = activity
            .media_filenames()
            .into_iter()
            .map(|name| name.as_str().to_owned())
            .collect();
        assert_eq!(names, ["a.mp3", "b.png", "cat.png", "dog.png", "prompt.mp3"]);
    }

    #[test]
    fn empty_activity_is_rejected() {
        assert_eq!(
            Activity::new(Vec::new(), AtomSet::new()).unwrap_err(),
            ActivityError::NoSections
        );
    }
}

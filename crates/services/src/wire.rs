//! JSON shapes spoken by the activity backend, and their adaptation into
//! domain types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use study_core::model::{
    Activity, AggregateAtomReport, AnnotatedText, AtomId, AtomInfo, AtomSet, AtomsInfo, Choice,
    MediaFilename, MediaUrlPrefix, OnFail, Qmti, Section, Slide, TtsSlides,
};

use crate::activity_source::PickedActivity;
use crate::error::ProtocolError;

//
// ─── PICK ACTIVITY ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
pub(crate) struct PickActivityResponse {
    media_url_prefix: String,
    activity: WireActivity,
    #[serde(default)]
    atoms_info: BTreeMap<String, WireAtomInfo>,
}

#[derive(Debug, Deserialize)]
struct WireActivity {
    sections: Vec<Value>,
    #[serde(default)]
    intro_atoms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireAtomInfo {
    meaning: String,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireText {
    text: String,
    #[serde(default)]
    trans: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireSlide {
    audio_fn: String,
    image_fn: String,
    attext: WireText,
}

#[derive(Debug, Deserialize)]
struct WireTtsSlides {
    slides: Vec<WireSlide>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    image_fn: String,
    correct: bool,
    #[serde(default)]
    fail_atoms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireQmti {
    prompt_audio_fn: String,
    attext: WireText,
    tested_atoms: Vec<String>,
    choices: Vec<WireChoice>,
    on_fail: String,
}

impl TryFrom<PickActivityResponse> for PickedActivity {
    type Error = ProtocolError;

    fn try_from(resp: PickActivityResponse) -> Result<Self, Self::Error> {
        let media_url_prefix =
            MediaUrlPrefix::new(resp.media_url_prefix).map_err(study_core::Error::from)?;

        let sections = resp
            .activity
            .sections
            .into_iter()
            .map(adapt_section)
            .collect::<Result<Vec<_>, _>>()?;
        let intro_atoms = atom_set(resp.activity.intro_atoms)?;
        let activity = Activity::new(sections, intro_atoms).map_err(study_core::Error::from)?;

        let mut atoms_info = AtomsInfo::new();
        for (id, info) in resp.atoms_info {
            let id = AtomId::new(id).map_err(study_core::Error::from)?;
            atoms_info.insert(
                id,
                AtomInfo {
                    meaning: info.meaning,
                    notes: info.notes,
                },
            );
        }

        Ok(PickedActivity {
            media_url_prefix,
            activity,
            atoms_info,
        })
    }
}

/// Dispatches on the `kind` discriminator so unknown kinds surface by name.
fn adapt_section(raw: Value) -> Result<Section, ProtocolError> {
    let kind = raw
        .get("kind")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingSectionKind)?
        .to_owned();

    match kind.as_str() {
        "tts_slides" => {
            let wire: WireTtsSlides = serde_json::from_value(raw)?;
            let slides = wire
                .slides
                .into_iter()
                .map(|slide| {
                    Ok(Slide {
                        audio: filename(slide.audio_fn)?,
                        image: filename(slide.image_fn)?,
                        text: text(slide.attext),
                    })
                })
                .collect::<Result<Vec<_>, ProtocolError>>()?;
            let slides = TtsSlides::new(slides).map_err(study_core::Error::from)?;
            Ok(Section::TtsSlides(slides))
        }
        "qmti" => {
            let wire: WireQmti = serde_json::from_value(raw)?;
            let on_fail = match wire.on_fail.as_str() {
                "report" => OnFail::Report,
                "restart" => OnFail::Restart,
                other => return Err(ProtocolError::UnknownFailPolicy(other.to_owned())),
            };
            let choices = wire
                .choices
                .into_iter()
                .map(|choice| {
                    Ok(Choice {
                        image: filename(choice.image_fn)?,
                        correct: choice.correct,
                        fail_atoms: atom_set(choice.fail_atoms)?,
                    })
                })
                .collect::<Result<Vec<_>, ProtocolError>>()?;
            let quiz = Qmti::new(
                filename(wire.prompt_audio_fn)?,
                text(wire.attext),
                atom_set(wire.tested_atoms)?,
                choices,
                on_fail,
            )
            .map_err(study_core::Error::from)?;
            Ok(Section::Qmti(quiz))
        }
        _ => Err(ProtocolError::UnknownSectionKind(kind)),
    }
}

fn filename(raw: String) -> Result<MediaFilename, ProtocolError> {
    Ok(MediaFilename::new(raw).map_err(study_core::Error::from)?)
}

fn atom_set(raw: Vec<String>) -> Result<AtomSet, ProtocolError> {
    raw.into_iter()
        .map(|id| AtomId::new(id).map_err(|e| ProtocolError::from(study_core::Error::from(e))))
        .collect()
}

fn text(wire: WireText) -> AnnotatedText {
    AnnotatedText::new(wire.text, wire.trans)
}

//
// ─── REPORT RESULT ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
pub(crate) struct ReportResultRequest<'a> {
    lang: &'a str,
    result: WireAtomReport<'a>,
}

#[derive(Debug, Serialize)]
struct WireAtomReport<'a> {
    atoms_introduced: Vec<&'a str>,
    atoms_exposed: Vec<&'a str>,
    atoms_forgot: Vec<&'a str>,
    atoms_passed: Vec<&'a str>,
    atoms_failed: Vec<&'a str>,
}

impl<'a> ReportResultRequest<'a> {
    pub(crate) fn new(lang: &'a str, aggregate: &'a AggregateAtomReport) -> Self {
        let report = aggregate.report();
        let ids = |set: &'a AtomSet| set.iter().map(AtomId::as_str).collect::<Vec<_>>();
        Self {
            lang,
            result: WireAtomReport {
                atoms_introduced: ids(&report.introduced),
                atoms_exposed: ids(&report.exposed),
                atoms_forgot: ids(&report.forgot),
                atoms_passed: ids(&report.passed),
                atoms_failed: ids(&report.failed),
            },
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use study_core::Clock;
use study_core::model::{AggregateAtomReport, AtomReport};

use crate::activity_source::{ActivitySource, SessionToken};
use crate::config::{DEFAULT_LANGUAGE_CODE, StudyConfig};
use crate::error::{SessionClosed, SessionError, TransitionError};
use crate::preload_service::{MediaFetcher, MediaPreloader};
use super::progression::SectionAdvance;
use super::state::{ActivityState, SectionCursor, StudyState};

const EVENT_QUEUE_CAPACITY: usize = 16;

/// Picks, preloads, runs and reports activities for one learner.
#[derive(Clone)]
pub struct StudyLoopService {
    clock: Clock,
    source: Arc<dyn ActivitySource>,
    preloader: MediaPreloader,
    language_code: String,
}

impl StudyLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        source: Arc<dyn ActivitySource>,
        fetcher: Arc<dyn MediaFetcher>,
    ) -> Self {
        Self {
            clock,
            source,
            preloader: MediaPreloader::new(fetcher),
            language_code: DEFAULT_LANGUAGE_CODE.to_owned(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: &StudyConfig) -> Self {
        self.language_code.clone_from(&config.language_code);
        self.preloader = self
            .preloader
            .with_max_concurrent_fetches(config.max_concurrent_fetches);
        self
    }

    /// Creates a session and the handle the presentation layer drives it with.
    ///
    /// Nothing happens until `StudySession::run` is awaited.
    #[must_use]
    pub fn open_session(&self, token: SessionToken) -> (StudySession, StudyHandle) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (state_tx, state_rx) = watch::channel(StudyState::loading());

        let session = StudySession {
            service: self.clone(),
            token,
            events: events_rx,
            state: state_tx,
        };
        let handle = StudyHandle {
            events: events_tx,
            state: state_rx,
        };
        (session, handle)
    }

    /// Picks the next activity and preloads all of its media.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the pick or any media fetch fails.
    #[tracing::instrument(skip_all, fields(lang = %self.language_code))]
    pub async fn load_activity(&self, token: &SessionToken) -> Result<ActivityState, SessionError> {
        let picked = self
            .source
            .pick_activity(token)
            .await
            .map_err(SessionError::from_pick)?;
        debug!(
            sections = picked.activity.section_count(),
            intro_atoms = picked.activity.intro_atoms().len(),
            "picked activity"
        );

        let preload = self
            .preloader
            .preload(&picked.activity, &picked.media_url_prefix)
            .await?;

        let state = ActivityState::initialize(picked.activity, preload, &self.clock)
            .with_atoms_info(picked.atoms_info);
        info!(instance = %state.instance_id(), "activity ready");
        Ok(state)
    }

    /// Sends the final aggregate of a completed activity.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Report` if the backend cannot be reached.
    #[tracing::instrument(skip_all, fields(lang = %self.language_code))]
    pub async fn report(
        &self,
        token: &SessionToken,
        aggregate: &AggregateAtomReport,
    ) -> Result<(), SessionError> {
        self.source
            .report_result(token, &self.language_code, aggregate)
            .await
            .map_err(SessionError::from_report)?;
        debug!("activity result reported");
        Ok(())
    }
}

#[derive(Debug)]
enum StudyInput {
    Finished { report: AtomReport, failed: bool },
    SlidesFinished,
    ChoiceSelected(usize),
}

#[derive(Debug)]
struct StudyEvent {
    cursor: SectionCursor,
    input: StudyInput,
}

/// Presentation-side handle to a running session.
///
/// Every event names the `SectionCursor` of the section it answers, taken from
/// the state that was rendered. An event for a section the loop has already
/// left is rejected instead of being applied to the next one.
#[derive(Clone)]
pub struct StudyHandle {
    events: mpsc::Sender<StudyEvent>,
    state: watch::Receiver<StudyState>,
}

impl StudyHandle {
    /// Read-only subscription to every published `StudyState`.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StudyState> {
        self.state.clone()
    }

    #[must_use]
    pub fn current(&self) -> StudyState {
        self.state.borrow().clone()
    }

    /// Reports that the section at `cursor` finished with `report`.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` if the session loop has stopped.
    pub async fn section_finished(
        &self,
        cursor: SectionCursor,
        report: AtomReport,
        failed: bool,
    ) -> Result<(), SessionClosed> {
        self.send(cursor, StudyInput::Finished { report, failed }).await
    }

    /// # Errors
    ///
    /// Returns `SessionClosed` if the session loop has stopped.
    pub async fn slides_finished(&self, cursor: SectionCursor) -> Result<(), SessionClosed> {
        self.send(cursor, StudyInput::SlidesFinished).await
    }

    /// # Errors
    ///
    /// Returns `SessionClosed` if the session loop has stopped.
    pub async fn choice_selected(
        &self,
        cursor: SectionCursor,
        index: usize,
    ) -> Result<(), SessionClosed> {
        self.send(cursor, StudyInput::ChoiceSelected(index)).await
    }

    async fn send(&self, cursor: SectionCursor, input: StudyInput) -> Result<(), SessionClosed> {
        self.events
            .send(StudyEvent { cursor, input })
            .await
            .map_err(|_| SessionClosed)
    }
}

/// The single owner of a learner's study state.
pub struct StudySession {
    service: StudyLoopService,
    token: SessionToken,
    events: mpsc::Receiver<StudyEvent>,
    state: watch::Sender<StudyState>,
}

impl StudySession {
    /// Runs pick, preload, play and report until every handle is dropped.
    ///
    /// A new activity is only picked after the previous result was reported.
    /// Any event that arrives while no activity is shown ends the session.
    /// Dropping the future abandons in-flight work; a later session starts
    /// from a fresh pick.
    ///
    /// # Errors
    ///
    /// Returns the first `SessionError`; the loop never retries on its own.
    pub async fn run(mut self) -> Result<(), SessionError> {
        loop {
            self.state.send_replace(StudyState::loading());
            let mut current = tokio::select! {
                biased;
                event = self.events.recv() => {
                    let Some(event) = event else {
                        debug!("all study handles dropped while loading, ending session");
                        return Ok(());
                    };
                    warn!(cursor = %event.cursor, "event received while no activity is shown");
                    return Err(TransitionError::NoActiveActivity.into());
                }
                loaded = self.service.load_activity(&self.token) => loaded?,
            };
            self.state.send_replace(StudyState::showing(current.clone()));

            let aggregate = loop {
                let Some(event) = self.events.recv().await else {
                    debug!("all study handles dropped, ending session");
                    return Ok(());
                };

                let (next, advance) = apply(current, event)?;
                current = next;
                match advance {
                    SectionAdvance::Advanced => {
                        debug!(section = current.section_index(), "section advanced");
                        self.state.send_replace(StudyState::showing(current.clone()));
                    }
                    SectionAdvance::Restarted => {
                        info!(attempt = current.attempt(), "activity restarted");
                        self.state.send_replace(StudyState::showing(current.clone()));
                    }
                    SectionAdvance::Completed(aggregate) => break aggregate,
                }
            };

            let elapsed = self.service.clock.elapsed_since(current.loaded_at());
            info!(
                instance = %current.instance_id(),
                attempts = current.attempt().saturating_add(1),
                elapsed_secs = elapsed.num_seconds(),
                "activity completed"
            );

            self.state.send_replace(StudyState::loading());
            self.service.report(&self.token, &aggregate).await?;
        }
    }
}

fn apply(
    current: ActivityState,
    event: StudyEvent,
) -> Result<(ActivityState, SectionAdvance), TransitionError> {
    let actual = current.cursor();
    if event.cursor != actual {
        return Err(TransitionError::Desync {
            expected: event.cursor,
            actual,
        });
    }

    match event.input {
        StudyInput::Finished { report, failed } => current.section_finished(report, failed),
        StudyInput::SlidesFinished => current.slides_finished(),
        StudyInput::ChoiceSelected(index) => current.choice_selected(index),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

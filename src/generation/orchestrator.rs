//! Generation orchestration - drives a dream session through its attempts
//!
//! An accepted submission moves the session to `analyzing` and launches five
//! independent units on the Tokio runtime: one tags call and one call per
//! image slot. A single driver task drains unit results from a `JoinSet` as
//! they finish, writes them into the session and publishes the matching event
//! while holding the session lock. Once every unit has reported, the
//! completion policy picks `result` or `error` and the final `StateChanged` is
//! published.
//!
//! There is no orchestrator deadline. A unit that never returns keeps the
//! attempt in `analyzing`; the client transport timeout is the only bound.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{Instrument, debug, debug_span, error, info, info_span, warn};

use crate::generation::{
    CompletionPolicy, EventStream, GenerationClient, GenerationEvent, IMAGE_SLOT_COUNT, ImageData,
    RemoteError, Subscription, UnitKind,
};
use crate::session::{ErrorRecord, ImageSlot, Session, SessionError, SessionState, Trigger};

/// Owns one dream session and runs its generation attempts
#[derive(Clone)]
pub struct GenerationOrchestrator {
    shared: Arc<Shared>,
}

struct Shared {
    client: Arc<dyn GenerationClient>,
    policy: CompletionPolicy,
    session: Mutex<Session>,
    events: EventStream,
}

enum UnitOutcome {
    Tags(Result<Vec<String>, RemoteError>),
    Image {
        index: usize,
        result: Result<ImageData, RemoteError>,
    },
}

impl GenerationOrchestrator {
    /// Create an orchestrator with the default completion policy
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self::with_policy(client, CompletionPolicy::default())
    }

    pub fn with_policy(client: Arc<dyn GenerationClient>, policy: CompletionPolicy) -> Self {
        Self {
            shared: Arc::new(Shared {
                client,
                policy,
                session: Mutex::new(Session::new()),
                events: EventStream::new(),
            }),
        }
    }

    pub fn policy(&self) -> CompletionPolicy {
        self.shared.policy
    }

    /// Snapshot of the session
    pub fn session(&self) -> Session {
        self.shared.lock_session().clone()
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock_session().state
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> Subscription {
        self.shared.events.subscribe()
    }

    /// Current session plus a subscription starting exactly after it
    pub fn subscribe_with_snapshot(&self) -> (Session, Subscription) {
        let session = self.shared.lock_session();
        let subscription = self.shared.events.subscribe();
        (session.clone(), subscription)
    }

    pub fn begin_editing(&self) -> Result<(), SessionError> {
        let mut session = self.shared.lock_session();
        self.shared.transition(&mut session, Trigger::BeginEditing)?;
        Ok(())
    }

    /// Replace the prompt; refused while an attempt is in flight
    pub fn set_prompt(&self, prompt: impl Into<String>) -> Result<(), SessionError> {
        let mut session = self.shared.lock_session();
        if session.state.is_analyzing() {
            warn!(session = %session.id, "rejected prompt edit during analysis");
            return Err(SessionError::InvalidState {
                state: session.state,
                operation: "set_prompt",
            });
        }
        session.prompt = prompt.into();
        Ok(())
    }

    /// End editing; an empty prompt returns to `idle`, anything else is ready to submit
    pub fn finish_editing(&self) -> Result<SessionState, SessionError> {
        let mut session = self.shared.lock_session();
        let prompt_empty = session.prompt.trim().is_empty();
        let next = self
            .shared
            .transition(&mut session, Trigger::FinishEditing { prompt_empty })?;
        if prompt_empty {
            session.prompt.clear();
        }
        Ok(next)
    }

    /// Set the prompt and start an attempt
    ///
    /// Accepted from `editing` or `readyToSubmit`. The session is reset and in
    /// `analyzing`, with `StateChanged(analyzing)` published, before this
    /// returns. Must be called from within a Tokio runtime.
    pub fn submit(&self, prompt: impl Into<String>) -> Result<AttemptHandle, SessionError> {
        self.start_attempt(Some(prompt.into()))
    }

    /// Start an attempt with the prompt already held by the session
    pub fn submit_current(&self) -> Result<AttemptHandle, SessionError> {
        self.start_attempt(None)
    }

    /// Leave a finished `result` and return to a blank `idle` session
    pub fn discard_result(&self) -> Result<(), SessionError> {
        self.reset_from(SessionState::Result, "discard_result")
    }

    /// Acknowledge a failed attempt and return to a blank `idle` session
    pub fn acknowledge_error(&self) -> Result<(), SessionError> {
        self.reset_from(SessionState::Error, "acknowledge_error")
    }

    fn reset_from(&self, expected: SessionState, operation: &'static str) -> Result<(), SessionError> {
        let mut session = self.shared.lock_session();
        if session.state != expected {
            return Err(SessionError::InvalidState {
                state: session.state,
                operation,
            });
        }
        self.shared.transition(&mut session, Trigger::Reset)?;
        session.reset();
        Ok(())
    }

    fn start_attempt(&self, prompt: Option<String>) -> Result<AttemptHandle, SessionError> {
        let (prompt, attempt, span) = {
            let mut session = self.shared.lock_session();

            if let Err(err) = session.state.transition(Trigger::Submit) {
                warn!(session = %session.id, state = %session.state, "rejected submit");
                return Err(err);
            }

            let prompt = prompt.unwrap_or_else(|| session.prompt.clone());
            if prompt.trim().is_empty() {
                return Err(SessionError::EmptyPrompt);
            }

            session.prompt = prompt;
            let attempt = session.begin_attempt();
            self.shared.transition(&mut session, Trigger::Submit)?;

            let span = info_span!("attempt", session = %session.id, attempt);
            span.in_scope(|| info!(prompt_len = session.prompt.len(), "attempt started"));
            (Arc::<str>::from(session.prompt.as_str()), attempt, span)
        };

        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(shared.run_attempt(prompt).instrument(span));

        Ok(AttemptHandle {
            attempt,
            task,
            shared: Arc::clone(&self.shared),
        })
    }
}

impl Shared {
    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the session along the state machine and announce the new state
    fn transition(
        &self,
        session: &mut Session,
        trigger: Trigger,
    ) -> Result<SessionState, SessionError> {
        let next = session.state.transition(trigger)?;
        debug!(from = %session.state, to = %next, trigger = trigger.name(), "state transition");
        session.state = next;
        self.events.publish(GenerationEvent::StateChanged(next));
        Ok(next)
    }

    async fn run_attempt(self: Arc<Self>, prompt: Arc<str>) -> SessionState {
        let started = Instant::now();
        let mut units = JoinSet::new();

        {
            let client = Arc::clone(&self.client);
            let prompt = Arc::clone(&prompt);
            units.spawn(
                async move {
                    UnitOutcome::Tags(guarded(UnitKind::Tags, client.generate_tags(&prompt)).await)
                }
                .instrument(debug_span!("unit", unit = %UnitKind::Tags)),
            );
        }

        for index in 0..IMAGE_SLOT_COUNT {
            let client = Arc::clone(&self.client);
            let prompt = Arc::clone(&prompt);
            let unit = UnitKind::Image(index);
            units.spawn(
                async move {
                    let result = guarded(unit, client.generate_image(&prompt, index)).await;
                    UnitOutcome::Image { index, result }
                }
                .instrument(debug_span!("unit", unit = %unit)),
            );
        }

        debug!(units = units.len(), "fan-out launched");

        let mut tags_reported = false;
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok(outcome) => {
                    tags_reported |= matches!(outcome, UnitOutcome::Tags(_));
                    self.apply(outcome);
                }
                Err(err) => error!(%err, "generation unit ended without reporting"),
            }
        }

        self.finish(tags_reported, started)
    }

    /// Store one unit's result and publish its event under the session lock
    fn apply(&self, outcome: UnitOutcome) {
        let mut session = self.lock_session();

        match outcome {
            UnitOutcome::Tags(Ok(tags)) => {
                debug!(count = tags.len(), "tags loaded");
                if session.record_tags(tags.clone()) {
                    self.events.publish(GenerationEvent::TagsLoaded(tags));
                }
            }
            UnitOutcome::Tags(Err(error)) => self.fail_tags(&mut session, error),
            UnitOutcome::Image {
                index,
                result: Ok(image),
            } => {
                debug!(index, bytes = image.len(), "image loaded");
                if session.settle_image(index, ImageSlot::Loaded(image.clone())) {
                    self.events
                        .publish(GenerationEvent::ImageLoaded { index, image });
                }
            }
            UnitOutcome::Image {
                index,
                result: Err(error),
            } => self.fail_image(&mut session, index, error),
        }
    }

    fn fail_tags(&self, session: &mut Session, error: RemoteError) {
        warn!(%error, "tags generation failed");
        session.record_failure(ErrorRecord::new(UnitKind::Tags, error.clone()));
        self.events.publish(GenerationEvent::GenerationFailed {
            kind: UnitKind::Tags,
            error,
        });
    }

    fn fail_image(&self, session: &mut Session, index: usize, error: RemoteError) {
        warn!(index, %error, "image generation failed");
        if session.settle_image(index, ImageSlot::Failed(error.clone())) {
            session.record_failure(ErrorRecord::new(UnitKind::Image(index), error.clone()));
            self.events
                .publish(GenerationEvent::ImageFailed { index, error });
        }
    }

    /// Join point: settle anything a lost unit left behind, then pick the terminal state
    fn finish(&self, tags_reported: bool, started: Instant) -> SessionState {
        let mut session = self.lock_session();

        if !tags_reported {
            self.fail_tags(&mut session, RemoteError::transport("tags unit ended without a result"));
        }
        for index in 0..IMAGE_SLOT_COUNT {
            if session.images[index].is_empty() {
                self.fail_image(
                    &mut session,
                    index,
                    RemoteError::transport("image unit ended without a result"),
                );
            }
        }

        let failed = self.policy.attempt_failed(session.tags.is_none());
        let next = match self.transition(&mut session, Trigger::Complete { failed }) {
            Ok(next) => next,
            Err(err) => {
                error!(%err, "attempt completed outside analyzing");
                session.state
            }
        };

        info!(
            state = %next,
            tags = session.tags().len(),
            images_loaded = session.loaded_count(),
            images_failed = session.failed_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "attempt finished"
        );
        next
    }
}

/// Runs one unit's call, turning a panic into a failure of that unit alone
async fn guarded<T, F>(unit: UnitKind, call: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    debug!("unit started");
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(_) => {
            error!(%unit, "generation unit panicked");
            Err(RemoteError::transport(format!("{} unit panicked", unit)))
        }
    }
}

/// Handle on an in-flight attempt
///
/// Dropping the handle does not cancel the attempt.
pub struct AttemptHandle {
    attempt: u32,
    task: JoinHandle<SessionState>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for AttemptHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttemptHandle")
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}

impl AttemptHandle {
    /// Attempt number within the session
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Wait for the join barrier and return the terminal state
    pub async fn wait(self) -> SessionState {
        match self.task.await {
            Ok(state) => state,
            Err(err) => {
                error!(attempt = self.attempt, %err, "attempt driver did not finish");
                self.shared.lock_session().state
            }
        }
    }
}

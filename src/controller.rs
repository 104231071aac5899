use std::sync::{
    atomic::{AtomicU64, Ordering},
    Mutex, PoisonError,
};

use tokio::{
    sync::{mpsc, watch},
    task::{JoinError, JoinHandle},
    time::sleep,
};

use crate::{
    display::{Display, DisplayUpdate, UpdateKind, UpdateSender},
    render_envelope, CancelFlag, Phase, RelayClient, RelayError, RequestDescriptor,
    ResponseEnvelope, Surface,
};

/// How a submission ended.
#[derive(Debug)]
pub enum Outcome {
    /// An envelope was decoded and sent to the display.
    Success(ResponseEnvelope),
    /// The failure notice was raised; carries the final error.
    Exhausted(RelayError),
    /// The submission was cancelled or superseded before finishing.
    Cancelled,
}

/// Handle to one in-flight submission.
///
/// Dropping the handle does not stop the submission.
#[derive(Debug)]
pub struct SubmissionHandle {
    generation: u64,
    cancel: CancelFlag,
    phase: watch::Receiver<Phase>,
    task: JoinHandle<Outcome>,
}

impl SubmissionHandle {
    /// Stamp carried by every display update of this submission.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stops further retries. A result already shown still reverts to neutral.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Waits for the submission to finish, status reset included.
    pub async fn join(self) -> Outcome {
        self.task.await.unwrap_or(Outcome::Cancelled)
    }
}

/// Entry point turning submissions into display updates.
///
/// Each [`Controller::submit`] spawns an independent retry sequence. All
/// sequences report to one display task that owns the surface.
pub struct Controller<S> {
    client: RelayClient,
    updates: UpdateSender,
    generation: AtomicU64,
    in_flight: Mutex<Option<CancelFlag>>,
    display: JoinHandle<S>,
}

impl<S: Surface> Controller<S> {
    /// Starts the display task for `surface`. Must run inside a tokio runtime.
    pub fn spawn(client: RelayClient, surface: S) -> Self {
        let (updates, receiver) = mpsc::unbounded_channel();
        let display = tokio::spawn(Display::new(surface).run(receiver));
        Self {
            client,
            updates,
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
            display,
        }
    }

    pub fn client(&self) -> &RelayClient {
        &self.client
    }

    /// Submits `descriptor` and returns immediately.
    ///
    /// With `supersede_in_flight` set, the previous submission is cancelled
    /// first. Must run inside a tokio runtime.
    pub fn submit(&self, descriptor: RequestDescriptor) -> SubmissionHandle {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancelFlag::new();

        if self.client.options().supersede_in_flight {
            let mut in_flight = self
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = in_flight.replace(cancel.clone()) {
                previous.cancel();
            }
        }

        let (phase_tx, phase) = watch::channel(Phase::Idle);
        let submission = Submission {
            client: self.client.clone(),
            descriptor,
            generation,
            cancel: cancel.clone(),
            phase: phase_tx,
            updates: self.updates.clone(),
        };
        let task = tokio::spawn(submission.run());

        SubmissionHandle {
            generation,
            cancel,
            phase,
            task,
        }
    }

    /// Stops accepting submissions and waits for every running one to finish.
    ///
    /// Returns the surface once the display task has applied the last update.
    pub async fn shutdown(self) -> Result<S, JoinError> {
        let Self {
            updates, display, ..
        } = self;
        drop(updates);
        display.await
    }
}

struct Submission {
    client: RelayClient,
    descriptor: RequestDescriptor,
    generation: u64,
    cancel: CancelFlag,
    phase: watch::Sender<Phase>,
    updates: UpdateSender,
}

impl Submission {
    async fn run(self) -> Outcome {
        let result = self
            .client
            .drive(&self.descriptor, &self.cancel, |phase| {
                self.phase.send_replace(phase);
            })
            .await;

        match result {
            Ok(envelope) => {
                if self.cancel.is_cancelled() {
                    self.phase.send_replace(Phase::Cancelled);
                    return Outcome::Cancelled;
                }
                let rendered =
                    render_envelope(&envelope, self.client.options().log_preview_chars);
                self.publish(UpdateKind::Rendered(rendered));

                // Runs even after cancellation: the display drops a reset for a
                // generation that is no longer shown.
                sleep(self.client.options().status_reset()).await;
                self.publish(UpdateKind::Reset);
                Outcome::Success(envelope)
            }
            Err(RelayError::Cancelled) => Outcome::Cancelled,
            Err(err) => {
                self.phase.send_replace(Phase::Exhausted);
                self.publish(UpdateKind::Failed);
                Outcome::Exhausted(err)
            }
        }
    }

    fn publish(&self, kind: UpdateKind) {
        // The display task only stops once every sender is gone.
        let _ = self.updates.send(DisplayUpdate {
            generation: self.generation,
            kind,
        });
    }
}

use super::reporter::{Reporter, ResultView};
use crate::client::{EchoRequester, EchoResponse};
use crate::transport::Transport;
use crate::ProbeError;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

pub const EMPTY_INPUT_MESSAGE: &str = "Please enter a non-empty message.";
pub const SENDING_STATUS: &str = "Sending message...";
pub const RECEIVED_STATUS: &str = "Echo response received.";
pub const FAILED_STATUS: &str = "Request failed. Please try again.";

/// What happened to one submission
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Input was empty after trimming; nothing was sent
    Rejected,
    /// Another submission was still in flight; nothing was sent
    Busy,
    Sent(EchoResponse),
    Failed(ProbeError),
}

/// Submit handler for the echo form
///
/// Moves idle → busy → idle around each request and refuses a second
/// submission while one is outstanding.
pub struct EchoForm<T: Transport, R: Reporter> {
    requester: EchoRequester<T>,
    reporter: R,
    busy: AtomicBool,
}

/// Clears the busy flag however the submission ends
struct BusyGuard<'a, R: Reporter> {
    flag: &'a AtomicBool,
    reporter: &'a R,
}

impl<R: Reporter> Drop for BusyGuard<'_, R> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
        self.reporter.busy(false);
    }
}

impl<T: Transport, R: Reporter> EchoForm<T, R> {
    pub fn new(requester: EchoRequester<T>, reporter: R) -> Self {
        Self {
            requester,
            reporter,
            busy: AtomicBool::new(false),
        }
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub async fn submit(&self, raw_input: &str) -> SubmitOutcome {
        let message = raw_input.trim();
        info!(message = %message, "Form submitted");

        self.reporter.clear();

        if message.is_empty() {
            warn!("Empty message, not sending request");
            self.reporter.error(EMPTY_INPUT_MESSAGE);
            return SubmitOutcome::Rejected;
        }

        let Some(_guard) = self.enter_busy() else {
            warn!("Submission already in flight, ignoring");
            return SubmitOutcome::Busy;
        };

        self.reporter.status(SENDING_STATUS);

        match self.requester.send(message).await {
            Ok(response) => {
                info!("Request successful, rendering result");
                self.reporter.result(&ResultView::from(&response));
                self.reporter.status(RECEIVED_STATUS);
                SubmitOutcome::Sent(response)
            }
            Err(e) => {
                warn!(error = %e, "Echo request failed");
                self.reporter
                    .error(&format!("Failed to get echo response: {e}"));
                self.reporter.status(FAILED_STATUS);
                SubmitOutcome::Failed(e)
            }
        }
    }

    fn enter_busy(&self) -> Option<BusyGuard<'_, R>> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        self.reporter.busy(true);
        Some(BusyGuard {
            flag: &self.busy,
            reporter: &self.reporter,
        })
    }
}

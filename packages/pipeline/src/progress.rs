//! Progress reporting.
//!
//! Rows finish in any order, so the reporter keeps one run-wide counter.
//! Incrementing it and sending the event happen under the same lock,
//! which makes the `completed` values a consumer sees exactly `1..=total`
//! in increasing order.

use std::sync::{Arc, Mutex, PoisonError};

use pic_extract_models::ProgressEvent;
use tokio::sync::mpsc;

/// Producer half of the progress channel. Sending never blocks.
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// Consumer half of the progress channel.
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Creates an unbounded progress channel.
#[must_use]
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Counts finished rows for one run and forwards an event per row.
#[derive(Debug)]
pub struct ProgressReporter {
    total: usize,
    completed: Mutex<usize>,
    sender: ProgressSender,
}

impl ProgressReporter {
    /// Creates a reporter for a run of `total` rows.
    #[must_use]
    pub const fn new(total: usize, sender: ProgressSender) -> Self {
        Self {
            total,
            completed: Mutex::new(0),
            sender,
        }
    }

    /// Records one finished row and sends its event.
    ///
    /// A closed receiver is not an error: the run carries on without an
    /// observer.
    pub fn report(&self, row_index: usize) -> ProgressEvent {
        let mut completed = self
            .completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *completed += 1;

        let event = ProgressEvent {
            completed: *completed,
            total: self.total,
            row_index,
        };

        if self.sender.send(event).is_err() {
            log::trace!("Progress receiver dropped; event for row {row_index} discarded");
        }

        event
    }

    /// Returns a ticket that reports `row_index` when dropped.
    #[must_use]
    pub fn ticket(self: &Arc<Self>, row_index: usize) -> ProgressTicket {
        ProgressTicket {
            reporter: Arc::clone(self),
            row_index,
        }
    }
}

/// Reports its row exactly once, on drop, whichever way the row ends.
#[derive(Debug)]
#[must_use = "the row is reported as soon as the ticket is dropped"]
pub struct ProgressTicket {
    reporter: Arc<ProgressReporter>,
    row_index: usize,
}

impl Drop for ProgressTicket {
    fn drop(&mut self) {
        self.reporter.report(self.row_index);
    }
}

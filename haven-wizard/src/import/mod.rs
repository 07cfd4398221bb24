//! RunStatusTracker: client-side view of the note-import job.
//!
//! The tracker never performs I/O. Callers ask it whether a request may be sent, send it, and
//! report the outcome back; push-stream events are fed in as they arrive.

use log::{debug, info};

use crate::api::StreamEvent;
use crate::models::log::{LogLevel, LogView};
use crate::models::responses::RelayStatus;

pub const STREAM_LOST_LINE: &str = "Connection to import stream lost";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportRunState {
    Idle,
    Pending,
    Running,
    Cancelling,
    Completed,
    Failed,
    Cancelled,
}

impl ImportRunState {
    pub fn from_wire(status: &str) -> Option<Self> {
        match status.trim() {
            "idle" => Some(ImportRunState::Idle),
            "pending" => Some(ImportRunState::Pending),
            "running" => Some(ImportRunState::Running),
            "cancelling" => Some(ImportRunState::Cancelling),
            "completed" => Some(ImportRunState::Completed),
            "failed" => Some(ImportRunState::Failed),
            "cancelled" => Some(ImportRunState::Cancelled),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ImportRunState::Idle => "Idle",
            ImportRunState::Pending => "Starting...",
            ImportRunState::Running => "Running...",
            ImportRunState::Cancelling => "Cancelling...",
            ImportRunState::Completed => "Completed",
            ImportRunState::Failed => "Failed",
            ImportRunState::Cancelled => "Cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ImportRunState::Pending | ImportRunState::Running | ImportRunState::Cancelling
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ImportRunState::Completed | ImportRunState::Failed | ImportRunState::Cancelled
        )
    }
}

/// Why a start was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartRefusal {
    /// Relay is not running and healthy (or its status is unknown).
    RelayNotReady,
    /// A run is already pending, running or cancelling.
    AlreadyActive,
}

impl StartRefusal {
    pub fn message(&self) -> &'static str {
        match self {
            StartRefusal::RelayNotReady => "HAVEN must be running and healthy before importing",
            StartRefusal::AlreadyActive => "An import is already in progress",
        }
    }
}

/// What the caller should do with the subscription after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamControl {
    Continue,
    Close,
}

#[derive(Debug, Clone)]
pub struct RunStatusTracker {
    state: ImportRunState,
    subscribed: bool,
    request_in_flight: bool,
    log: LogView,
}

impl RunStatusTracker {
    pub fn new(log_cap: usize) -> Self {
        Self {
            state: ImportRunState::Idle,
            subscribed: false,
            request_in_flight: false,
            log: LogView::with_cap(log_cap),
        }
    }

    pub fn state(&self) -> ImportRunState {
        self.state
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn request_in_flight(&self) -> bool {
        self.request_in_flight
    }

    pub fn log(&self) -> &LogView {
        &self.log
    }

    /// Gate a start request. On `Ok` the state is `Pending`, the log is cleared and the caller
    /// must send the run request.
    pub fn begin_start(&mut self, relay: Option<&RelayStatus>) -> Result<(), StartRefusal> {
        if !relay.map_or(false, RelayStatus::is_ready) {
            return Err(StartRefusal::RelayNotReady);
        }
        if self.state.is_active() {
            return Err(StartRefusal::AlreadyActive);
        }
        self.state = ImportRunState::Pending;
        self.request_in_flight = true;
        self.log.clear();
        info!("[PHASE: import] [STEP: start] Import requested");
        Ok(())
    }

    /// The run request succeeded; the caller opens the push subscription.
    pub fn start_accepted(&mut self) -> bool {
        self.request_in_flight = false;
        if self.state != ImportRunState::Pending {
            return false;
        }
        self.state = ImportRunState::Running;
        self.subscribed = true;
        true
    }

    pub fn start_rejected(&mut self, reason: &str) {
        self.request_in_flight = false;
        if self.state == ImportRunState::Pending {
            self.state = ImportRunState::Idle;
        }
        self.log
            .push(LogLevel::Error, format!("Failed to start import: {}", reason));
    }

    /// Gate a cancel request. Only a running import can be cancelled.
    pub fn begin_cancel(&mut self) -> bool {
        if self.state != ImportRunState::Running {
            return false;
        }
        self.state = ImportRunState::Cancelling;
        self.request_in_flight = true;
        true
    }

    /// The cancel request was accepted; the final status arrives on the stream.
    pub fn cancel_accepted(&mut self) {
        self.request_in_flight = false;
    }

    pub fn cancel_failed(&mut self) {
        self.request_in_flight = false;
        if self.state == ImportRunState::Cancelling {
            self.state = ImportRunState::Running;
        }
    }

    pub fn apply_event(&mut self, event: StreamEvent) -> StreamControl {
        match event {
            StreamEvent::Log { level, message } => {
                self.log.push(level, message);
                StreamControl::Continue
            }
            StreamEvent::Status(status) => {
                let Some(next) = ImportRunState::from_wire(&status) else {
                    debug!("[PHASE: import] [STEP: stream] Ignoring unknown status '{}'", status);
                    return StreamControl::Continue;
                };
                self.transition(next);
                if next.is_terminal() {
                    self.subscribed = false;
                    StreamControl::Close
                } else {
                    StreamControl::Continue
                }
            }
        }
    }

    fn transition(&mut self, next: ImportRunState) {
        use ImportRunState::*;
        let allowed = matches!(
            (self.state, next),
            (Running, Completed | Failed | Cancelled | Cancelling)
                | (Cancelling, Cancelled | Completed | Failed)
        );
        if allowed {
            info!(
                "[PHASE: import] [STEP: status] {:?} -> {:?}",
                self.state, next
            );
            self.state = next;
        }
    }

    /// Transport failure on the subscription. State is kept.
    pub fn stream_lost(&mut self) {
        self.subscribed = false;
        self.log.push(LogLevel::Error, STREAM_LOST_LINE);
    }

    /// Server closed the stream without a terminal status.
    pub fn stream_ended(&mut self) {
        self.subscribed = false;
    }

    /// A subscription was reopened for an already-active run.
    pub fn attach_stream(&mut self) {
        self.subscribed = true;
    }

    /// Adopt the server-reported status when no live information source is attached.
    /// Returns true when the local state changed.
    pub fn reconcile(&mut self, server_status: &str) -> bool {
        if self.subscribed || self.request_in_flight {
            return false;
        }
        match ImportRunState::from_wire(server_status) {
            Some(next) if next != self.state => {
                info!(
                    "[PHASE: import] [STEP: reconcile] {:?} -> {:?}",
                    self.state, next
                );
                self.state = next;
                true
            }
            _ => false,
        }
    }

    /// The server reports an active run but nothing is listening to it.
    pub fn needs_stream(&self) -> bool {
        !self.subscribed
            && matches!(
                self.state,
                ImportRunState::Running | ImportRunState::Cancelling
            )
    }
}

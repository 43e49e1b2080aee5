//! Conversation state machine.
//!
//! ```text
//! Idle --try_set_responding--> Responding --try_cancel--> Cancelling
//! Cancelling --(server confirms cancel)--> Idle | Responded
//! Responding --(response completed)--> Responded
//! Responding --(error / disconnect)--> Idle            (reset)
//! Responded | Cancelling --try_set_responding--> Responding
//! ```
//!
//! Every read and write goes through one mutex guarding the whole machine,
//! so compare-and-set transitions cannot interleave. Besides the state the
//! machine counts response generations, cancelled ("superseded") responses
//! whose terminal event is still on its way, and cancelled responses that
//! have ended once but may still send a second end event; see
//! [`ConversationState::delta_generation`] and [`ConversationState::settle`].

use std::sync::Arc;

use parking_lot::Mutex;
use strum_macros::Display;

/// Whether a response is outstanding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display)]
pub enum ResponseState {
    /// Waiting for input.
    #[default]
    Idle,
    /// The model is producing a response.
    Responding,
    /// A cancel was requested for the current response.
    Cancelling,
    /// The last response completed.
    Responded,
}

impl ResponseState {
    /// States in which response text may be shown.
    pub fn is_displayable(self) -> bool {
        matches!(self, ResponseState::Responding | ResponseState::Responded)
    }
}

/// How the server says a response ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseEnd {
    /// `response.done` with status `completed`.
    Completed,
    /// `response.done` with status `cancelled`.
    Cancelled,
    /// A `response.cancelled` event.
    CancelConfirmed,
    /// `response.done` with a status this client does not know.
    Unrecognized,
}

impl ResponseEnd {
    /// `response.cancelled` and `response.done` with status `cancelled`
    /// may both arrive for one cancelled response.
    fn is_cancellation(self) -> bool {
        matches!(self, ResponseEnd::Cancelled | ResponseEnd::CancelConfirmed)
    }

    fn target(self) -> ResponseState {
        match self {
            ResponseEnd::Cancelled => ResponseState::Idle,
            ResponseEnd::Completed | ResponseEnd::CancelConfirmed | ResponseEnd::Unrecognized => {
                ResponseState::Responded
            }
        }
    }
}

/// Outcome of [`ConversationState::settle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The end belonged to the current response; the state moved here.
    Applied(ResponseState),
    /// The end belonged to a cancelled response that a newer one has
    /// already replaced; the state was left alone.
    Superseded,
    /// A second end event for a cancelled response that already ended;
    /// the state was left alone.
    Duplicate,
}

/// A consistent view of the machine taken under one lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSnapshot {
    pub state: ResponseState,
    pub generation: u64,
    pub superseded: u32,
}

#[derive(Debug, Default)]
struct Machine {
    state: ResponseState,
    generation: u64,
    superseded: u32,
    /// Cancelled responses that ended once and may still send their other
    /// cancellation event. Cleared once the live response is seen streaming
    /// or completing, since the server finishes one response before the next.
    ended_cancelled: u32,
}

/// Shared handle to the conversation state machine.
///
/// Clones refer to the same machine.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    inner: Arc<Mutex<Machine>>,
}

impl ConversationState {
    /// Create a machine in `Idle`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn get(&self) -> ResponseState {
        self.inner.lock().state
    }

    /// Generation of the most recently started response.
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Cancelled responses whose terminal event has not arrived yet.
    pub fn superseded(&self) -> u32 {
        self.inner.lock().superseded
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let machine = self.inner.lock();
        StateSnapshot {
            state: machine.state,
            generation: machine.generation,
            superseded: machine.superseded,
        }
    }

    /// Start a response. Refused only while another response is `Responding`.
    pub fn try_set_responding(&self) -> bool {
        let mut machine = self.inner.lock();
        if machine.state == ResponseState::Responding {
            return false;
        }
        machine.state = ResponseState::Responding;
        machine.generation += 1;
        true
    }

    /// Request cancellation of the current response. Only valid while `Responding`.
    pub fn try_cancel(&self) -> bool {
        let mut machine = self.inner.lock();
        if machine.state != ResponseState::Responding {
            return false;
        }
        machine.state = ResponseState::Cancelling;
        machine.superseded += 1;
        true
    }

    pub fn set_responded(&self) {
        self.inner.lock().state = ResponseState::Responded;
    }

    pub fn set_idle(&self) {
        self.inner.lock().state = ResponseState::Idle;
    }

    /// Back to `Idle`, forgetting any cancelled response still in flight.
    pub fn reset(&self) {
        let mut machine = self.inner.lock();
        machine.state = ResponseState::Idle;
        machine.superseded = 0;
        machine.ended_cancelled = 0;
    }

    /// Undo a start whose request never reached the server.
    ///
    /// Only applies if `generation` is still the live `Responding` response.
    pub fn abandon(&self, generation: u64) -> bool {
        let mut machine = self.inner.lock();
        if machine.state != ResponseState::Responding || machine.generation != generation {
            return false;
        }
        machine.state = ResponseState::Idle;
        true
    }

    /// Generation to stamp on a text delta, or `None` if the delta is stale.
    ///
    /// Deltas are live only while `Responding` with no cancelled response
    /// still draining; before its terminal event, text from a cancelled
    /// response is indistinguishable from text of its replacement. A live
    /// delta also retires every cancelled response that already ended.
    pub fn delta_generation(&self) -> Option<u64> {
        let mut machine = self.inner.lock();
        if machine.state != ResponseState::Responding || machine.superseded > 0 {
            return None;
        }
        machine.ended_cancelled = 0;
        Some(machine.generation)
    }

    /// Apply a server-reported response end.
    ///
    /// The first end event of a cancelled response consumes its superseded
    /// slot. A second cancellation event for it is reported as
    /// [`Settlement::Duplicate`] instead of ending the live response.
    pub fn settle(&self, end: ResponseEnd) -> Settlement {
        let mut machine = self.inner.lock();
        if machine.superseded > 0 {
            machine.superseded -= 1;
            if end.is_cancellation() {
                machine.ended_cancelled += 1;
            }
            if machine.state != ResponseState::Cancelling {
                return Settlement::Superseded;
            }
        } else if end.is_cancellation() && machine.ended_cancelled > 0 {
            machine.ended_cancelled -= 1;
            return Settlement::Duplicate;
        } else if !end.is_cancellation() {
            machine.ended_cancelled = 0;
        }
        machine.state = end.target();
        Settlement::Applied(machine.state)
    }
}

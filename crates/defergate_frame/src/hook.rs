//! Hook records: one deferred action plus its eligibility state.
//!
//! A record is created at its registration site with a frame-global
//! [`HookSeq`] and starts [`HookState::Ineligible`]. Arming flips it to
//! [`HookState::Eligible`] for the rest of the frame's life. Dispatch never
//! changes the state.

use core::fmt;
use std::rc::Rc;

use crate::error::BoxError;
use crate::frame::Frame;
use crate::gate::GateHandle;

// ─────────────────────────────────────────────────────────────────────────────
// HookSeq
// ─────────────────────────────────────────────────────────────────────────────

/// Registration order of a hook within its frame.
///
/// Sequence numbers are shared by all gates of a frame and only grow. A gate
/// dispatches its hooks from the highest sequence number down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HookSeq(pub(crate) u64);

impl HookSeq {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HookSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook#{}", self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HookState
// ─────────────────────────────────────────────────────────────────────────────

/// Eligibility of a hook record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    /// The registration site has not executed yet. The hook is skipped.
    Ineligible,
    /// The registration site executed. The hook runs on every reach of its gate.
    Eligible,
}

impl HookState {
    /// Returns `true` if the hook runs when its gate is reached.
    #[must_use]
    pub fn is_eligible(self) -> bool {
        matches!(self, HookState::Eligible)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BoxedAction
// ─────────────────────────────────────────────────────────────────────────────

/// Type-erased deferred action.
///
/// The handler receives the frame it was registered in, so an action can
/// reach gates of the same frame, including its own. Most actions do not need
/// it; use [`Frame::register`] or [`Frame::try_register`] for those.
///
/// Actions capture the procedure's state by reference (`Cell`, `RefCell`,
/// shared references), so they observe the values current at dispatch time.
/// Handlers are `Fn` so that a nested pass may run an action that is still
/// running in an outer pass. Cloning shares the handler.
#[derive(Clone)]
pub struct BoxedAction<'a> {
    handler: Rc<dyn Fn(&Frame<'a>) -> Result<(), BoxError> + 'a>,
}

impl<'a> BoxedAction<'a> {
    /// Creates an action from a handler that receives the owning frame.
    #[must_use]
    pub fn new(handler: impl Fn(&Frame<'a>) -> Result<(), BoxError> + 'a) -> Self {
        Self {
            handler: Rc::new(handler),
        }
    }

    /// Creates an action that cannot fail.
    #[must_use]
    pub fn infallible(action: impl Fn() + 'a) -> Self {
        Self::new(move |_frame| {
            action();
            Ok(())
        })
    }

    /// Creates an action from a closure returning any boxable error.
    #[must_use]
    pub fn fallible<E>(action: impl Fn() -> Result<(), E> + 'a) -> Self
    where
        E: Into<BoxError>,
    {
        Self::new(move |_frame| action().map_err(Into::into))
    }

    /// Runs the action.
    pub fn invoke(&self, frame: &Frame<'a>) -> Result<(), BoxError> {
        (self.handler)(frame)
    }
}

impl fmt::Debug for BoxedAction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedAction").finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HookRecord
// ─────────────────────────────────────────────────────────────────────────────

/// Entry in a gate's registry.
pub(crate) struct HookRecord<'a> {
    seq: HookSeq,
    gate: GateHandle,
    state: HookState,
    action: BoxedAction<'a>,
}

impl<'a> HookRecord<'a> {
    pub(crate) fn new(seq: HookSeq, gate: GateHandle, action: BoxedAction<'a>) -> Self {
        Self {
            seq,
            gate,
            state: HookState::Ineligible,
            action,
        }
    }

    pub(crate) fn seq(&self) -> HookSeq {
        self.seq
    }

    pub(crate) fn gate(&self) -> GateHandle {
        self.gate
    }

    pub(crate) fn state(&self) -> HookState {
        self.state
    }

    pub(crate) fn action(&self) -> BoxedAction<'a> {
        self.action.clone()
    }

    /// Marks the record eligible. Returns `false` if it already was.
    pub(crate) fn arm(&mut self) -> bool {
        match self.state {
            HookState::Ineligible => {
                self.state = HookState::Eligible;
                true
            }
            HookState::Eligible => false,
        }
    }
}

impl fmt::Debug for HookRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRecord")
            .field("seq", &self.seq)
            .field("gate", &self.gate)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameId;
    use core::cell::Cell;

    fn gate() -> GateHandle {
        GateHandle::new(FrameId::new(1), 0)
    }

    #[test]
    fn record_starts_ineligible() {
        let record = HookRecord::new(HookSeq::new(0), gate(), BoxedAction::infallible(|| {}));
        assert_eq!(record.state(), HookState::Ineligible);
        assert!(!record.state().is_eligible());
    }

    #[test]
    fn record_arms_exactly_once() {
        let mut record =
            HookRecord::new(HookSeq::new(0), gate(), BoxedAction::infallible(|| {}));

        assert!(record.arm(), "first arm flips the state");
        assert_eq!(record.state(), HookState::Eligible);

        assert!(!record.arm(), "second arm is rejected");
        assert_eq!(record.state(), HookState::Eligible);
    }

    #[test]
    fn infallible_action_observes_live_state() {
        let counter = Cell::new(0);
        let seen = Cell::new(0);
        let frame = Frame::new();
        let action = BoxedAction::infallible(|| seen.set(counter.get()));

        counter.set(5);
        action.invoke(&frame).expect("infallible action");
        assert_eq!(seen.get(), 5);

        counter.set(9);
        action.invoke(&frame).expect("infallible action");
        assert_eq!(seen.get(), 9);
    }

    #[test]
    fn fallible_action_boxes_its_error() {
        let frame = Frame::new();
        let action = BoxedAction::fallible(|| Err::<(), _>("handle already closed"));

        let err = action.invoke(&frame).expect_err("action should fail");
        assert_eq!(err.to_string(), "handle already closed");
    }

    #[test]
    fn cloned_action_shares_handler() {
        let calls = Cell::new(0);
        let frame = Frame::new();
        let action = BoxedAction::infallible(|| calls.set(calls.get() + 1));
        let shared = action.clone();

        action.invoke(&frame).unwrap();
        shared.invoke(&frame).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn hook_seq_orders_by_value() {
        assert!(HookSeq::new(1) < HookSeq::new(2));
        assert_eq!(HookSeq::new(3).to_string(), "hook#3");
    }
}

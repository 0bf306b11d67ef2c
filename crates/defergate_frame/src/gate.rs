//! Exit gates: named rendezvous points within one frame.
//!
//! A gate owns the records of every hook registered against it, kept in
//! registration order. Gates are independent of one another: reaching a gate
//! only ever dispatches its own records.

use core::fmt;

use crate::frame::FrameId;
use crate::hook::{HookRecord, HookSeq};

// ─────────────────────────────────────────────────────────────────────────────
// GateHandle
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to a gate declared with [`Frame::declare_gate`](crate::Frame::declare_gate).
///
/// A handle is only valid for the frame that issued it. Using it with any
/// other frame, including a later invocation of the same procedure, fails
/// with [`FrameError::UnknownGate`](crate::FrameError::UnknownGate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GateHandle {
    frame: FrameId,
    index: usize,
}

impl GateHandle {
    pub(crate) fn new(frame: FrameId, index: usize) -> Self {
        Self { frame, index }
    }

    /// Returns the frame that issued this handle.
    #[must_use]
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// Returns the declaration index of the gate within its frame.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for GateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/gate#{}", self.frame, self.index)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ExitGate
// ─────────────────────────────────────────────────────────────────────────────

/// A gate and its hook registry.
pub(crate) struct ExitGate<'a> {
    name: String,
    hooks: Vec<HookRecord<'a>>,
    reached: usize,
}

impl<'a> ExitGate<'a> {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            hooks: Vec::new(),
            reached: 0,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Records in registration order (ascending sequence number).
    pub(crate) fn hooks(&self) -> &[HookRecord<'a>] {
        &self.hooks
    }

    /// Appends a record. Sequence numbers must arrive in ascending order.
    pub(crate) fn push(&mut self, record: HookRecord<'a>) {
        debug_assert!(
            self.hooks.last().is_none_or(|last| last.seq() < record.seq()),
            "hook sequence numbers must increase within a gate"
        );
        self.hooks.push(record);
    }

    pub(crate) fn record_mut(&mut self, seq: HookSeq) -> Option<&mut HookRecord<'a>> {
        let position = self
            .hooks
            .binary_search_by_key(&seq, HookRecord::seq)
            .ok()?;
        self.hooks.get_mut(position)
    }

    pub(crate) fn mark_reached(&mut self) {
        self.reached += 1;
    }

    pub(crate) fn reach_count(&self) -> usize {
        self.reached
    }

    pub(crate) fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    pub(crate) fn eligible_count(&self) -> usize {
        self.hooks
            .iter()
            .filter(|record| record.state().is_eligible())
            .count()
    }

    /// Whether the gate holds eligible hooks but was never reached.
    pub(crate) fn has_pending_hooks(&self) -> bool {
        self.reached == 0 && self.eligible_count() > 0
    }
}

impl fmt::Debug for ExitGate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExitGate")
            .field("name", &self.name)
            .field("hooks", &self.hooks)
            .field("reached", &self.reached)
            .finish()
    }
}

//! The dispatcher: one pass over a gate's eligible hooks.
//!
//! A pass is built from a snapshot of the gate's registry taken when the gate
//! is reached. Hooks run from the highest sequence number down, so the
//! resource acquired last is released first. Hooks registered or armed while
//! the pass runs belong to the next reach, not this one.
//!
//! Passes do not hold any borrow of the frame while actions run. An action may
//! register hooks or reach any gate of its own frame, including the one being
//! dispatched. A nested reach is a fresh pass with its own snapshot; the outer
//! pass continues with its remaining hooks once the action returns.

use crate::config::FailurePolicy;
use crate::error::FrameError;
use crate::frame::Frame;
use crate::gate::ExitGate;
use crate::hook::{BoxedAction, HookSeq};

// ─────────────────────────────────────────────────────────────────────────────
// DispatchReport
// ─────────────────────────────────────────────────────────────────────────────

/// Summary of a completed dispatch pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    gate: String,
    ran: Vec<HookSeq>,
    skipped: usize,
}

impl DispatchReport {
    /// Returns the name of the dispatched gate.
    #[must_use]
    pub fn gate(&self) -> &str {
        &self.gate
    }

    /// Returns the hooks that ran, in the order they ran.
    #[must_use]
    pub fn ran(&self) -> &[HookSeq] {
        &self.ran
    }

    /// Returns the number of hooks skipped because they were ineligible.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DispatchPass
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) struct DispatchPass<'a> {
    gate: String,
    /// Eligible hooks, highest sequence number first.
    eligible: Vec<(HookSeq, BoxedAction<'a>)>,
    skipped: usize,
}

impl<'a> DispatchPass<'a> {
    pub(crate) fn snapshot(gate: &ExitGate<'a>) -> Self {
        let mut skipped = 0;
        let eligible = gate
            .hooks()
            .iter()
            .rev()
            .filter_map(|record| {
                if record.state().is_eligible() {
                    Some((record.seq(), record.action()))
                } else {
                    skipped += 1;
                    None
                }
            })
            .collect();

        Self {
            gate: gate.name().to_owned(),
            eligible,
            skipped,
        }
    }

    pub(crate) fn run(
        self,
        frame: &Frame<'a>,
        policy: FailurePolicy,
    ) -> Result<DispatchReport, FrameError> {
        let DispatchPass {
            gate,
            eligible,
            skipped,
        } = self;
        let mut ran = Vec::with_capacity(eligible.len());
        let mut failures = Vec::new();

        for (seq, action) in eligible {
            tracing::trace!(frame = %frame.id(), gate = %gate, seq = %seq, "running hook");
            ran.push(seq);
            let result = action.invoke(frame).map_err(|source| FrameError::ActionFailure {
                gate: gate.clone(),
                seq,
                source,
            });

            if let Err(err) = result {
                tracing::warn!(frame = %frame.id(), gate = %gate, seq = %seq, error = %err, "hook failed");
                match policy {
                    FailurePolicy::Halt => return Err(err),
                    FailurePolicy::Continue => failures.push(err),
                }
            }
        }

        if failures.is_empty() {
            Ok(DispatchReport { gate, ran, skipped })
        } else {
            Err(FrameError::ActionFailures { gate, failures })
        }
    }
}

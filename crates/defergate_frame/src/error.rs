//! Error types for frames, gates and hook dispatch.

use crate::frame::FrameId;
use crate::gate::GateHandle;
use crate::hook::HookSeq;

/// Error type returned by a failing hook action.
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// Errors raised by [`Frame`](crate::Frame) operations.
///
/// [`DuplicateGate`](Self::DuplicateGate) and [`UnknownGate`](Self::UnknownGate)
/// indicate a defect in the procedure using the frame. The remaining variants
/// are produced by a dispatch pass.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A gate with this name is already declared in the frame.
    #[error("gate '{name}' is already declared in {frame}")]
    DuplicateGate {
        /// The frame the gate was declared in.
        frame: FrameId,
        /// The duplicate gate name.
        name: String,
    },

    /// The gate handle belongs to another frame, possibly one that has ended.
    #[error("gate {gate} is not declared in {frame}")]
    UnknownGate {
        /// The frame the handle was used with.
        frame: FrameId,
        /// The offending handle.
        gate: GateHandle,
    },

    /// A hook action returned an error. The pass stopped after it.
    #[error("{seq} on gate '{gate}' failed: {source}")]
    ActionFailure {
        /// Name of the gate being dispatched.
        gate: String,
        /// Sequence number of the failing hook.
        seq: HookSeq,
        /// The error returned by the action.
        #[source]
        source: BoxError,
    },

    /// One or more hooks failed during a pass that ran under
    /// [`FailurePolicy::Continue`](crate::FailurePolicy::Continue).
    #[error("{} hook(s) on gate '{gate}' failed", failures.len())]
    ActionFailures {
        /// Name of the gate being dispatched.
        gate: String,
        /// The individual failures, in the order they occurred.
        failures: Vec<FrameError>,
    },
}

impl FrameError {
    /// Returns `true` for errors caused by misuse of the frame API rather than
    /// by a hook action.
    #[must_use]
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            FrameError::DuplicateGate { .. } | FrameError::UnknownGate { .. }
        )
    }

    /// Returns the sequence numbers of the hooks this error reports, in the
    /// order they failed.
    #[must_use]
    pub fn failed_hooks(&self) -> Vec<HookSeq> {
        match self {
            FrameError::ActionFailure { seq, .. } => vec![*seq],
            FrameError::ActionFailures { failures, .. } => {
                failures.iter().flat_map(FrameError::failed_hooks).collect()
            }
            FrameError::DuplicateGate { .. } | FrameError::UnknownGate { .. } => Vec::new(),
        }
    }
}

//! Label-scoped deferred execution for defergate (Layer 1).
//!
//! `defergate_frame` lets a procedure register cleanup actions at arbitrary
//! points of its execution and have them run, last registered first, when
//! control reaches a named exit point of the same procedure. A procedure can
//! own any number of exit points, and exit points inside loops can be reached
//! many times.
//!
//! # Core Concepts
//!
//! - [`Frame`] - Private state of one invocation: its gates and hooks
//! - [`GateHandle`] - A named exit point declared with [`Frame::declare_gate`]
//! - [`BoxedAction`] - A deferred action, registered against a gate
//! - [`HookSite`] - A pre-declared registration site, made eligible with [`Frame::arm`]
//! - [`DispatchReport`] - Summary of one dispatch pass triggered by [`Frame::reach`]
//!
//! # Example
//!
//! ```
//! use core::cell::RefCell;
//! use defergate_frame::Frame;
//!
//! let trace = RefCell::new(Vec::new());
//! let frame = Frame::new();
//! let ret = frame.declare_gate("ret")?;
//!
//! trace.borrow_mut().push("open(R1)");
//! frame.register(ret, || trace.borrow_mut().push("close(R1)"))?;
//!
//! trace.borrow_mut().push("open(R2)");
//! frame.register(ret, || trace.borrow_mut().push("close(R2)"))?;
//!
//! frame.finish(ret)?;
//! assert_eq!(
//!     *trace.borrow(),
//!     ["open(R1)", "open(R2)", "close(R2)", "close(R1)"]
//! );
//! # Ok::<(), defergate_frame::FrameError>(())
//! ```
//!
//! # Eligibility
//!
//! A hook only runs if its registration site actually executed. A procedure
//! that bails out to a gate before reaching a registration site never sees
//! that hook run, on this reach or any later one.
//!
//! # Threads
//!
//! Frames are `!Send` and `!Sync`. Each invocation, whether a thread or a
//! task on a current-thread runtime, creates its own frame, so the hook
//! registries need no locking.

/// Registration sites and gate-declaration macros.
pub mod binding;

/// Per-frame configuration.
pub mod config;

/// Reverse-order dispatch of a gate's eligible hooks.
pub mod dispatch;

/// Error types.
pub mod error;

/// Invocation frames.
pub mod frame;

/// Named exit gates.
pub mod gate;

/// Hook records and deferred actions.
pub mod hook;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::binding::HookSite;
    pub use crate::config::{FailurePolicy, FrameConfig};
    pub use crate::dispatch::DispatchReport;
    pub use crate::error::{BoxError, FrameError};
    pub use crate::frame::{Frame, FrameId};
    pub use crate::gate::GateHandle;
    pub use crate::hook::{BoxedAction, HookSeq, HookState};
    pub use crate::{gates, hook};
}

// Re-export key types at crate root for convenience
pub use binding::HookSite;
pub use config::{FailurePolicy, FrameConfig};
pub use dispatch::DispatchReport;
pub use error::{BoxError, FrameError};
pub use frame::{Frame, FrameId};
pub use gate::GateHandle;
pub use hook::{BoxedAction, HookSeq, HookState};

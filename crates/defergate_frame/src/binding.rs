//! Binding layer: registration sites and gate positions inside a procedure.
//!
//! A procedure binds its source positions to the frame as follows:
//!
//! - **Registration site**: a call to [`Frame::register`] (or the [`hook!`]
//!   macro) placed where the resource becomes live. The action is a closure,
//!   so its body is never executed inline; it only runs from a reach.
//! - **Pre-declared site**: [`Frame::declare_hook`] creates the record up front
//!   and returns a [`HookSite`]; the record becomes eligible only when the
//!   procedure passes the site to [`Frame::arm`]. A site that is never armed
//!   never runs.
//! - **Gate position**: a call to [`Frame::reach`] placed before any code that
//!   logically follows the gate. A "jump" to the gate is a reach followed by
//!   `return`, `break` or `continue`; a fallthrough is a reach on the straight
//!   path.
//!
//! # Example
//!
//! ```
//! use core::cell::RefCell;
//! use defergate_frame::{gates, hook, FrameError, Frame};
//!
//! fn open_both(fail_second: bool, trace: &RefCell<Vec<&'static str>>) -> Result<(), FrameError> {
//!     let frame = Frame::new();
//!     gates!(frame; ret);
//!
//!     trace.borrow_mut().push("open a");
//!     hook!(frame, ret => { trace.borrow_mut().push("close a") })?;
//!
//!     if fail_second {
//!         // jump to `ret`: the hook for `b` below was never registered
//!         return frame.finish(ret).map(drop);
//!     }
//!
//!     trace.borrow_mut().push("open b");
//!     hook!(frame, ret => { trace.borrow_mut().push("close b") })?;
//!
//!     frame.finish(ret).map(drop)
//! }
//!
//! let trace = RefCell::new(Vec::new());
//! open_both(true, &trace)?;
//! assert_eq!(*trace.borrow(), ["open a", "close a"]);
//! # Ok::<(), FrameError>(())
//! ```

use crate::gate::GateHandle;
use crate::hook::HookSeq;

/// A registration site whose hook record exists but is not yet eligible.
///
/// Returned by [`Frame::declare_hook`](crate::Frame::declare_hook). The site
/// is consumed by [`Frame::arm`](crate::Frame::arm), so a record can be made
/// eligible at most once. Sites are neither `Clone` nor `Copy`.
#[derive(Debug, PartialEq, Eq)]
pub struct HookSite {
    gate: GateHandle,
    seq: HookSeq,
}

impl HookSite {
    pub(crate) fn new(gate: GateHandle, seq: HookSeq) -> Self {
        Self { gate, seq }
    }

    /// Returns the gate the hook targets.
    #[must_use]
    pub fn gate(&self) -> GateHandle {
        self.gate
    }

    /// Returns the sequence number assigned to the hook.
    #[must_use]
    pub fn seq(&self) -> HookSeq {
        self.seq
    }
}

/// Declares gates named after the given identifiers.
///
/// Each identifier becomes a local [`GateHandle`] bound to a gate of the same
/// name. A failed declaration is propagated with `?`, so the enclosing
/// function must return a `Result` whose error type implements
/// `From<FrameError>`.
///
/// ```
/// use defergate_frame::{gates, Frame, FrameError};
///
/// fn procedure() -> Result<(), FrameError> {
///     let frame = Frame::new();
///     gates!(frame; retry, ret);
///     assert_eq!(frame.gate_name(retry)?, "retry");
///     frame.finish(ret).map(drop)
/// }
/// # procedure().unwrap();
/// ```
#[macro_export]
macro_rules! gates {
    ($frame:expr; $($name:ident),+ $(,)?) => {
        $(
            let $name = $frame.declare_gate(::core::stringify!($name))?;
        )+
    };
}

/// Registers a block as a deferred action on a gate.
///
/// `hook!(frame, gate => { ... })` expands to `frame.register(gate, || { ... })`
/// and evaluates to its `Result`. The block borrows the procedure's locals,
/// so it observes their values at dispatch time. Prefix the block with `move`
/// to move captured values into the action instead.
///
/// ```
/// use core::cell::Cell;
/// use defergate_frame::{hook, Frame};
///
/// let closed = Cell::new(0);
/// let frame = Frame::new();
/// let ret = frame.declare_gate("ret")?;
/// hook!(frame, ret => { closed.set(closed.get() + 1) })?;
/// frame.finish(ret)?;
/// assert_eq!(closed.get(), 1);
/// # Ok::<(), defergate_frame::FrameError>(())
/// ```
#[macro_export]
macro_rules! hook {
    ($frame:expr, $gate:expr => move $body:block) => {
        $frame.register($gate, move || $body)
    };
    ($frame:expr, $gate:expr => $body:block) => {
        $frame.register($gate, || $body)
    };
}

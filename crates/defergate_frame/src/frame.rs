//! Invocation frames.
//!
//! A [`Frame`] is the private state of one invocation of a procedure: its
//! gates, their hook records and the frame-global sequence counter. Create one
//! on entry, declare gates, register hooks as resources are acquired and reach
//! gates where the procedure exits or retries.
//!
//! # Live State
//!
//! Actions capture the procedure's locals by reference, so locals an action
//! reads must be declared before the frame:
//!
//! ```
//! use core::cell::Cell;
//! use defergate_frame::Frame;
//!
//! let index = Cell::new(0);
//! let released = Cell::new(0);
//! let frame = Frame::new();
//! let retry = frame.declare_gate("retry")?;
//!
//! frame.register(retry, || released.set(released.get() + index.get()))?;
//!
//! for i in 1..=3 {
//!     index.set(i);
//!     frame.reach(retry)?;
//! }
//! assert_eq!(released.get(), 1 + 2 + 3);
//! # Ok::<(), defergate_frame::FrameError>(())
//! ```

use core::cell::{Cell, RefCell};
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;

use crate::binding::HookSite;
use crate::config::FrameConfig;
use crate::dispatch::{DispatchPass, DispatchReport};
use crate::error::{BoxError, FrameError};
use crate::gate::{ExitGate, GateHandle};
use crate::hook::{BoxedAction, HookRecord, HookSeq};

static NEXT_FRAME_ID: AtomicU64 = AtomicU64::new(1);

// ─────────────────────────────────────────────────────────────────────────────
// FrameId
// ─────────────────────────────────────────────────────────────────────────────

/// Process-unique identifier of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(u64);

impl FrameId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    fn next() -> Self {
        Self::new(NEXT_FRAME_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GateTable
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct GateTable<'a> {
    gates: Vec<ExitGate<'a>>,
    by_name: HashMap<String, usize>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Frame
// ─────────────────────────────────────────────────────────────────────────────

/// Private state of one procedure invocation.
///
/// All operations take `&self` so that hook actions, which receive the frame
/// during dispatch, can reach other gates or register further hooks.
///
/// # Lifetime
///
/// `'a` bounds the state captured by hook actions. The frame ends when it is
/// dropped or consumed by [`finish`](Self::finish); its records are discarded
/// without running. Reaching a cleanup gate on every exit path is the
/// procedure's responsibility.
pub struct Frame<'a> {
    id: FrameId,
    config: FrameConfig,
    table: RefCell<GateTable<'a>>,
    next_seq: Cell<u64>,
}

impl Default for Frame<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Frame<'a> {
    /// Creates a frame with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Creates a frame with the given configuration.
    #[must_use]
    pub fn with_config(config: FrameConfig) -> Self {
        let id = FrameId::next();
        tracing::debug!(frame = %id, procedure = config.name().unwrap_or_default(), "frame entered");
        Self {
            id,
            config,
            table: RefCell::new(GateTable::default()),
            next_seq: Cell::new(0),
        }
    }

    /// Returns this frame's identifier.
    #[must_use]
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// Returns the procedure name from the configuration, if set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.config.name()
    }

    /// Returns the frame configuration.
    #[must_use]
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────
    // Gates
    // ─────────────────────────────────────────────────────────────────────

    /// Declares a named exit gate.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::DuplicateGate`] if a gate with this name already
    /// exists in the frame.
    pub fn declare_gate(&self, name: impl Into<String>) -> Result<GateHandle, FrameError> {
        let name = name.into();
        let mut table = self.table.borrow_mut();

        if table.by_name.contains_key(&name) {
            return Err(FrameError::DuplicateGate {
                frame: self.id,
                name,
            });
        }

        let handle = GateHandle::new(self.id, table.gates.len());
        tracing::debug!(frame = %self.id, gate = %name, "gate declared");
        table.by_name.insert(name.clone(), handle.index());
        table.gates.push(ExitGate::new(name));
        Ok(handle)
    }

    /// Looks up a gate by name.
    #[must_use]
    pub fn gate(&self, name: &str) -> Option<GateHandle> {
        let table = self.table.borrow();
        table
            .by_name
            .get(name)
            .map(|&index| GateHandle::new(self.id, index))
    }

    /// Checks if a gate with the given name is declared.
    #[must_use]
    pub fn contains_gate(&self, name: &str) -> bool {
        self.table.borrow().by_name.contains_key(name)
    }

    /// Returns the number of declared gates.
    #[must_use]
    pub fn gate_count(&self) -> usize {
        self.table.borrow().gates.len()
    }

    /// Returns the name of a gate.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownGate`] if the handle is not from this frame.
    pub fn gate_name(&self, gate: GateHandle) -> Result<String, FrameError> {
        self.inspect(gate, |exit| exit.name().to_owned())
    }

    /// Returns the number of hook records targeting a gate, eligible or not.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownGate`] if the handle is not from this frame.
    pub fn hook_count(&self, gate: GateHandle) -> Result<usize, FrameError> {
        self.inspect(gate, ExitGate::hook_count)
    }

    /// Returns the number of eligible hooks targeting a gate.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownGate`] if the handle is not from this frame.
    pub fn eligible_count(&self, gate: GateHandle) -> Result<usize, FrameError> {
        self.inspect(gate, ExitGate::eligible_count)
    }

    /// Returns how many times a gate has been reached.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownGate`] if the handle is not from this frame.
    pub fn reach_count(&self, gate: GateHandle) -> Result<usize, FrameError> {
        self.inspect(gate, ExitGate::reach_count)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────

    /// Registers an action on a gate and makes it eligible immediately.
    ///
    /// The action does not run now. It runs on every later reach of `gate`,
    /// after all hooks registered after it on the same gate.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownGate`] if the handle is not from this frame.
    pub fn register(&self, gate: GateHandle, action: impl Fn() + 'a) -> Result<HookSeq, FrameError> {
        self.register_boxed(gate, BoxedAction::infallible(action))
    }

    /// Registers a fallible action on a gate.
    ///
    /// An error returned by the action surfaces from [`reach`](Self::reach) as
    /// [`FrameError::ActionFailure`].
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownGate`] if the handle is not from this frame.
    pub fn try_register<E>(
        &self,
        gate: GateHandle,
        action: impl Fn() -> Result<(), E> + 'a,
    ) -> Result<HookSeq, FrameError>
    where
        E: Into<BoxError>,
    {
        self.register_boxed(gate, BoxedAction::fallible(action))
    }

    /// Registers a pre-built [`BoxedAction`] on a gate.
    ///
    /// This is the lower-level registration method used by both
    /// [`register`](Self::register) and [`try_register`](Self::try_register).
    /// Use it for actions that need the frame, e.g. to reach another gate.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownGate`] if the handle is not from this frame.
    pub fn register_boxed(&self, gate: GateHandle, action: BoxedAction<'a>) -> Result<HookSeq, FrameError> {
        let site = self.declare_hook(gate, action)?;
        let seq = site.seq();
        self.arm(site)?;
        Ok(seq)
    }

    /// Creates an ineligible hook record and returns its registration site.
    ///
    /// The sequence number is assigned now. The hook stays ineligible, and is
    /// skipped by every dispatch pass, until the site is passed to
    /// [`arm`](Self::arm). Dropping the site leaves it ineligible for good.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownGate`] if the handle is not from this frame.
    pub fn declare_hook(&self, gate: GateHandle, action: BoxedAction<'a>) -> Result<HookSite, FrameError> {
        let mut table = self.table.borrow_mut();
        let exit = self.resolve_mut(&mut table, gate)?;

        let seq = HookSeq::new(self.next_seq.get());
        self.next_seq.set(seq.value() + 1);
        exit.push(HookRecord::new(seq, gate, action));

        tracing::trace!(frame = %self.id, gate = exit.name(), seq = %seq, "hook declared");
        Ok(HookSite::new(gate, seq))
    }

    /// Makes the hook at a registration site eligible.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownGate`] if the site was declared in
    /// another frame.
    pub fn arm(&self, site: HookSite) -> Result<(), FrameError> {
        let mut table = self.table.borrow_mut();
        let exit = self.resolve_mut(&mut table, site.gate())?;
        let unknown = FrameError::UnknownGate {
            frame: self.id,
            gate: site.gate(),
        };
        let record = exit.record_mut(site.seq()).ok_or(unknown)?;

        debug_assert_eq!(record.gate(), site.gate());
        let armed = record.arm();
        debug_assert!(armed, "a registration site is armed at most once");

        tracing::trace!(frame = %self.id, gate = exit.name(), seq = %site.seq(), "hook armed");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────────────

    /// Reaches a gate: runs its eligible hooks, newest first, then returns.
    ///
    /// A gate can be reached any number of times. Each reach re-scans the
    /// current eligibility of the gate's hooks and runs all eligible ones
    /// again; hooks are never consumed. An action may reach this same gate;
    /// the nested reach is a full pass of its own.
    ///
    /// # Errors
    ///
    /// - [`FrameError::UnknownGate`] if the handle is not from this frame
    /// - [`FrameError::ActionFailure`] if an action fails under
    ///   [`FailurePolicy::Halt`](crate::FailurePolicy::Halt); hooks after it
    ///   in this pass did not run
    /// - [`FrameError::ActionFailures`] if any action fails under
    ///   [`FailurePolicy::Continue`](crate::FailurePolicy::Continue)
    pub fn reach(&self, gate: GateHandle) -> Result<DispatchReport, FrameError> {
        let pass = {
            let mut table = self.table.borrow_mut();
            let exit = self.resolve_mut(&mut table, gate)?;
            exit.mark_reached();
            DispatchPass::snapshot(exit)
        };

        let report = pass.run(self, self.config.failure_policy())?;
        tracing::debug!(
            frame = %self.id,
            gate = report.gate(),
            ran = report.ran().len(),
            skipped = report.skipped(),
            "gate reached"
        );
        Ok(report)
    }

    /// Reaches a terminal gate and ends the frame.
    ///
    /// # Errors
    ///
    /// Same as [`reach`](Self::reach). The frame ends either way.
    pub fn finish(self, gate: GateHandle) -> Result<DispatchReport, FrameError> {
        self.reach(gate)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn resolve_mut<'t>(
        &self,
        table: &'t mut GateTable<'a>,
        gate: GateHandle,
    ) -> Result<&'t mut ExitGate<'a>, FrameError> {
        let unknown = FrameError::UnknownGate {
            frame: self.id,
            gate,
        };
        if gate.frame() != self.id {
            return Err(unknown);
        }
        table.gates.get_mut(gate.index()).ok_or(unknown)
    }

    fn inspect<T>(&self, gate: GateHandle, f: impl FnOnce(&ExitGate<'a>) -> T) -> Result<T, FrameError> {
        let mut table = self.table.borrow_mut();
        let exit = self.resolve_mut(&mut table, gate)?;
        Ok(f(&*exit))
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        let table = self.table.get_mut();

        if self.config.warn_unreached() {
            for gate in table.gates.iter().filter(|gate| gate.has_pending_hooks()) {
                tracing::warn!(
                    frame = %self.id,
                    gate = gate.name(),
                    pending = gate.eligible_count(),
                    "frame ended without reaching a gate that holds eligible hooks"
                );
            }
        }

        tracing::debug!(frame = %self.id, gates = table.gates.len(), "frame ended");
    }
}

impl fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Frame");
        debug.field("id", &self.id).field("config", &self.config);
        match self.table.try_borrow() {
            Ok(table) => debug.field("gates", &table.gates),
            Err(_) => debug.field("gates", &"<dispatching>"),
        };
        debug.finish()
    }
}

//! Per-frame configuration.
//!
//! # Example
//!
//! ```
//! use defergate_frame::{FailurePolicy, Frame, FrameConfig};
//!
//! let frame = Frame::with_config(
//!     FrameConfig::new()
//!         .with_name("copy_file")
//!         .with_failure_policy(FailurePolicy::Continue),
//! );
//! assert_eq!(frame.name(), Some("copy_file"));
//! ```

// ─────────────────────────────────────────────────────────────────────────────
// FailurePolicy
// ─────────────────────────────────────────────────────────────────────────────

/// What a dispatch pass does when a hook action fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the pass at the failing hook. Earlier-registered hooks of that
    /// pass do not run, and the failure is returned from `reach` (default).
    #[default]
    Halt,
    /// Run every remaining eligible hook, then return all failures together
    /// as [`FrameError::ActionFailures`](crate::FrameError::ActionFailures).
    Continue,
}

// ─────────────────────────────────────────────────────────────────────────────
// FrameConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for a [`Frame`](crate::Frame).
///
/// # Fields
///
/// - `name` - Procedure name attached to log events (default: none)
/// - `failure_policy` - See [`FailurePolicy`] (default: `Halt`)
/// - `warn_unreached` - Warn when the frame ends while a gate holding eligible
///   hooks was never reached (default: `true`)
#[derive(Debug, Clone)]
pub struct FrameConfig {
    name: Option<String>,
    failure_policy: FailurePolicy,
    warn_unreached: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            name: None,
            failure_policy: FailurePolicy::Halt,
            warn_unreached: true,
        }
    }
}

impl FrameConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the procedure name used in log events.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the failure policy for every dispatch pass of the frame.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Enables or disables the unreached-gate warning emitted on drop.
    #[must_use]
    pub fn with_warn_unreached(mut self, enabled: bool) -> Self {
        self.warn_unreached = enabled;
        self
    }

    /// Returns the procedure name, if set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the failure policy.
    #[must_use]
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Returns whether the unreached-gate warning is enabled.
    #[must_use]
    pub fn warn_unreached(&self) -> bool {
        self.warn_unreached
    }
}

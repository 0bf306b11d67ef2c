//! Per-invocation exit gates with deferred cleanup hooks.
//!
//! See [`Frame`] for the runtime and the [`gates!`] and [`hook!`] macros for
//! the binding layer. Enable the `subscriber` feature for
//! [`subscriber::TracingConfig`].

pub use defergate_frame::*;

/// Subscriber setup for binaries and tests.
#[cfg(feature = "subscriber")]
pub mod subscriber {
    pub use defergate_tracing::*;
}

/// Re-export all common types for easy access.
pub mod prelude {
    pub use defergate_frame::prelude::*;
}

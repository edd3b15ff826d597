//! Logging facilities for Horizon Inspect.
//!
//! Horizon Inspect uses the `tracing` crate for instrumentation. Every log
//! call names one of the [`targets`] below so subsystems can be filtered
//! independently. To see logs, install a subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_inspect::script=debug,horizon_inspect_core=warn")
//!     .init();
//! ```

/// Span names used throughout Horizon Inspect for tracing.
pub mod span_names {
    /// A full reflective build pass.
    pub const BUILD: &str = "horizon_inspect::build";
    /// Realizing a control subtree.
    pub const REALIZE: &str = "horizon_inspect::realize";
    /// Parsing an attribute script.
    pub const SCRIPT: &str = "horizon_inspect::script";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "horizon_inspect_core";
    /// Signal system target.
    pub const SIGNAL: &str = "horizon_inspect_core::signal";
    /// Data binding target.
    pub const DATA: &str = "horizon_inspect_core::data";
    /// Undo/redo target.
    pub const UNDO: &str = "horizon_inspect_core::undo";
    /// Reflection metadata target.
    pub const META: &str = "horizon_inspect_core::meta";
    /// Control tree target.
    pub const CANVAS: &str = "horizon_inspect::canvas";
    /// Builder stack target.
    pub const INTERPRETER: &str = "horizon_inspect::interpreter";
    /// Attribute script target.
    pub const SCRIPT: &str = "horizon_inspect::script";
    /// Reflective synthesis target.
    pub const REFLECT: &str = "horizon_inspect::reflect";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// This is useful for tracking the duration of operations.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_inspect::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Macros for common tracing patterns.
///
/// These are thin wrappers around the `tracing` macros with the core target.
#[macro_export]
macro_rules! inspect_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "horizon_inspect_core", $($arg)*)
    };
}

#[macro_export]
macro_rules! inspect_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "horizon_inspect_core", $($arg)*)
    };
}

#[macro_export]
macro_rules! inspect_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "horizon_inspect_core", $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span() {
        let _span = PerfSpan::new("test_operation");
    }

    #[test]
    fn test_targets_are_namespaced() {
        for target in [targets::SIGNAL, targets::DATA, targets::UNDO, targets::META] {
            assert!(target.starts_with(targets::CORE));
        }
        for target in [targets::CANVAS, targets::SCRIPT, targets::REFLECT] {
            assert!(target.starts_with("horizon_inspect::"));
        }
    }
}

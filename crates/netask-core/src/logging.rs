//! Logging facilities for netask.
//!
//! netask uses the `tracing` crate for instrumentation and never installs a
//! subscriber itself. To see logs, install one in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("netask_net::task=debug,netask_net::transport=trace")
//!         .init();
//! }
//! ```
//!
//! Every event is emitted with one of the [`targets`] below so output can be
//! filtered per subsystem.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "netask_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "netask_core::signal";
    /// Progress aggregation target.
    pub const PROGRESS: &str = "netask_core::progress";
    /// Async runtime target.
    pub const RUNTIME: &str = "netask_core::runtime";
    /// Task lifecycle target (state transitions, outcomes).
    pub const TASK: &str = "netask_net::task";
    /// Transport target (attempts, retries, statuses).
    pub const TRANSPORT: &str = "netask_net::transport";
    /// Batch combinator target.
    pub const BATCH: &str = "netask_net::batch";
}

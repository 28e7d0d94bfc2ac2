//! Core building blocks for netask.
//!
//! This crate holds the pieces of the task layer that do not touch the
//! network:
//!
//! - **Signal/Slot System**: Type-safe change notification
//! - **Progress**: Hierarchical unit-count progress aggregation
//! - **Async Runtime**: The background runtime tasks execute on
//! - **Logging**: `tracing` target names for log filtering
//!
//! # Progress Example
//!
//! ```
//! use netask_core::Progress;
//!
//! let task = Progress::new(1);
//! let transfer = Progress::new(1024);
//! task.add_child(&transfer, 1);
//!
//! task.on_changed().connect(|fraction| {
//!     println!("{:.0}% done", fraction * 100.0);
//! });
//!
//! transfer.set_completed_unit_count(512);
//! transfer.finish();
//! assert!(task.is_finished());
//! ```

pub mod async_runtime;
pub mod logging;
pub mod progress;
pub mod signal;

pub use async_runtime::{AsyncRuntime, AsyncRuntimeConfig, AsyncRuntimeError, AsyncTaskHandle, RuntimeType};
pub use progress::{Progress, ProgressSnapshot};
pub use signal::{ConnectionId, Signal};

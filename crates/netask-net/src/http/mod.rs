//! HTTP transport for netask tasks.
//!
//! [`HttpClient`] is the session that requests travel through; clones share a
//! connection pool. [`OutgoingRequest`] is the fully built request a task
//! hands to the transport, and [`ResponseHead`] is what comes back before
//! the body is validated and parsed.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use netask_net::http::HttpClient;
//!
//! let client = HttpClient::builder()
//!     .timeout(Duration::from_secs(10))
//!     .scratch_dir("/var/tmp/my-app")
//!     .build()?;
//! # Ok::<(), netask_net::TransportError>(())
//! ```

mod client;
mod request;
mod response;
pub(crate) mod transport;

pub use client::{HttpClient, HttpClientBuilder, HttpClientConfig};
pub use request::{CachePolicy, HttpMethod, OutgoingRequest};
pub use response::{ReceivedResponse, ResponseHead};

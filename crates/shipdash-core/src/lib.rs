//! # shipdash-core
//!
//! Shared logic for the shipdash CLI: the operation model reported by the
//! dashboard backend, a long-running-operation poller, the backend HTTP client
//! and profile configuration.
//!
//! ## Layers
//!
//! - [`operation`] - handles, states and status snapshots (wire format included)
//! - [`poller`] - polls a status source until a terminal state, reporting every
//!   snapshot through a single callback
//! - [`client`] - HTTP client for the dashboard backend
//! - [`workflows`] - submit + poll composed into `*_and_wait` calls
//! - [`config`] - TOML profiles
//!
//! ## Example
//!
//! ```rust,ignore
//! use shipdash_core::{BackendClient, OperationHandle, Poller};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let client = Arc::new(BackendClient::new("http://localhost:8000")?);
//! let session = Poller::new(client)
//!     .interval(Duration::from_secs(2))
//!     .max_attempts(100)
//!     .start(
//!         OperationHandle::new("job-42"),
//!         Box::new(|status| println!("{}: {}", status.state, status.message)),
//!     );
//! let outcome = session.wait().await;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod operation;
pub mod poller;
pub mod workflows;

pub use client::{BackendClient, HealthStatus, SaveRequest};
pub use config::{Config, ConfigError, Profile};
pub use error::{CoreError, Result};
pub use operation::{
    OperationDetail, OperationHandle, OperationState, OperationStatus, StatusOrigin,
};
pub use poller::{
    DEFAULT_INTERVAL, FetchFn, PollOptions, PollOutcome, PollSession, PollState, Poller,
    StatusFetcher, UpdateCallback,
};
pub use workflows::{save_and_wait, wait_for_operation};

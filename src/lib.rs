//! A lean async client for Qiniu Kodo object storage and media processing.
//!
//! ## Quick start
//!
//! ```no_run
//! # async fn demo() -> Result<(), kodo::Error> {
//! use kodo::{Auth, Client, Zone};
//!
//! let client = Client::builder()
//!     .zone(Zone::Z0)
//!     .auth(Auth::from_env()?)
//!     .build()?;
//!
//! let info = client.buckets().stat("my-bucket", "path/to/file.txt").send().await?;
//! println!("{} bytes, {}", info.fsize, info.mime_type);
//!
//! let ops = kodo::batch::build_batch_delete("my-bucket", ["a.txt", "b.txt"]);
//! for item in client.buckets().batch(ops).send().await? {
//!     println!("{} {:?}", item.code, item.error());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Failures
//!
//! Dispatch never fails on its own: timeouts and transport faults come back
//! as a [`types::Response`] with `status_code() == -1`. Resource operations
//! turn any non-2xx outcome into exactly one [`Error::Api`].

#[cfg(all(
    feature = "rustls",
    feature = "native-tls",
    not(feature = "allow-both-tls")
))]
compile_error!("Enable only one of: rustls, native-tls.");

/// Service entry points and request builders.
pub mod api;
/// Entry encoding and batch op lists.
pub mod batch;
/// Hosts, zones, and client configuration.
pub mod config;
/// Pluggable HTTP transport.
pub mod transport;
/// Shared request/response types.
pub mod types;

mod auth;
mod client;
mod error;
mod util;

pub use auth::{Auth, Credentials, Signer};
pub use client::{Client, ClientBuilder};
pub use config::{Config, Hosts, Zone};
pub use error::{Error, Result};

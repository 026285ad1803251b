//! Boundary to the remote POS API.
//!
//! The checkout core only sees the `PosBackend` trait; `HttpPosBackend` is the
//! production implementation over REST.

pub mod client;
pub mod errors;
pub mod traits;

pub use client::HttpPosBackend;
pub use errors::BackendError;
pub use traits::PosBackend;

#[cfg(any(test, feature = "testing"))]
pub use traits::MockPosBackend;

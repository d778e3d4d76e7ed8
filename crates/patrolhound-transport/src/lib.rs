//! Blocking TCP transport for the patrolhound SDK.
//!
//! Exposes [`TcpLink`], a thin wrapper around `std::net::TcpStream` with
//! connect-with-timeout, independent handles via `try_clone` (one for a
//! reader thread, one for the writer), and idempotent shutdown. Frame and
//! protocol semantics live in higher layers.

pub mod error;
pub mod tcp;

pub use error::{Result, TransportError};
pub use tcp::TcpLink;

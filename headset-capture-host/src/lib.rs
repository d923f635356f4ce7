//! # headset-capture-host
//!
//! Host-facing surface for `headset-capture-core`.
//!
//! [`HostProxy`] is an explicit handle (no process-wide instance) exposing the
//! calls a host application makes: configure, start, stop, buffer polling,
//! callback registration, and microphone mode selection. Hosts that marshal
//! calls as JSON use [`HostProxy::dispatch_json`] with [`HostCommand`] /
//! [`HostResponse`].

pub mod commands;
pub mod error;
pub mod proxy;

pub use commands::{HostCommand, HostResponse};
pub use error::HostError;
pub use proxy::HostProxy;

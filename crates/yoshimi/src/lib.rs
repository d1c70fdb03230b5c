//! yoshimi server library
//!
//! This library contains the SSH transport glue and the server lifecycle.
//! The actual server binary is in main.rs.

pub mod lifecycle;
pub mod server;

// Re-export commonly used types
pub use lifecycle::{ServerHandle, ShutdownOutcome};
pub use server::{ChannelSink, ConnectionHandler, ServerShared};

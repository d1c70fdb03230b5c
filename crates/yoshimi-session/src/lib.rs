//! # yoshimi-session
//!
//! Session logic for the yoshimi SSH form server.
//!
//! This crate provides:
//! - The per-connection state machine (secret gate, menu, form, result)
//! - Pure rendering of each stage to a frame
//! - The session host that feeds events in and writes frames out
//! - Script and menu action invokers
//! - The registry of live sessions
//!
//! ## Architecture
//!
//! This is Layer 2 in the architecture - it depends on yoshimi-core and
//! yoshimi-terminal and knows nothing about SSH. The transport hands it
//! decoded [`InputEvent`]s and a [`FrameSink`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod field;
pub mod host;
pub mod invoker;
pub mod machine;
pub mod manager;
pub mod render;

// Re-export commonly used types
pub use field::TextField;
pub use host::{ActionSet, FrameSink, HostExit, SessionHost};
pub use invoker::{LocalActions, ProcessInvoker, ScriptInvoker};
pub use machine::{Effect, Focus, InputEvent, MachineConfig, MenuAction, SessionMachine};
pub use manager::{SessionInfo, SessionRegistry};
pub use render::render;

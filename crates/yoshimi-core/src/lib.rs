//! # yoshimi-core
//!
//! Core types for the yoshimi SSH form server.
//!
//! This crate contains all fundamental types with **no internal dependencies**
//! on other yoshimi crates. It provides:
//!
//! - Configuration (`ServerConfig` and its sections)
//! - Geometry types (Position, Dimensions)
//! - Session identity and stages
//! - Key types for input handling
//! - Action outcomes
//! - Error types
//!
//! ## Architecture
//!
//! This is Layer 0 in the architecture - all other crates depend on this one,
//! but this crate has no dependencies on other yoshimi crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod geometry;
pub mod key;
pub mod outcome;
pub mod session;

// Re-export commonly used types
pub use config::{
    FeatureSet, GateSettings, MenuSettings, ScriptSettings, ServerConfig, ServerSettings,
    TerminalSettings,
};
pub use error::{Error, Result};
pub use geometry::{Dimensions, Position};
pub use key::Key;
pub use outcome::{ActionResult, Outcome};
pub use session::{SessionId, Stage};

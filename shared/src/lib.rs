//! Shared types for the realtime console client
//!
//! Contains the wire vocabulary spoken with the console backend (feed frames,
//! client actions, progress events) plus the error type and tracing setup
//! used by every crate in the workspace.

pub mod types;
pub mod errors;
pub mod logging;
pub mod messages;

pub use types::*;
pub use errors::*;

pub use messages::{
    // Backend -> client feed frames
    ChatFrame, DashboardFrame,

    // Client -> backend actions
    ClientAction,

    // Server-pushed processing progress
    ProgressEvent, ProgressStatus,
};

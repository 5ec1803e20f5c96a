//! Message types for the realtime console client
//!
//! This module organizes the wire vocabulary by direction:
//! - `chat`: Backend → client frames on the chat feed
//! - `dashboard`: Backend → client frames on the dashboard feeds
//! - `action`: Client → backend requests, shared by every feed
//! - `progress`: Server-pushed processing progress events

pub mod chat;
pub mod dashboard;
pub mod action;
pub mod progress;

pub use chat::ChatFrame;
pub use dashboard::DashboardFrame;
pub use action::ClientAction;
pub use progress::{ProgressEvent, ProgressStatus};

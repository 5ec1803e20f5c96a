//! Service tests for the realtime client
//!
//! Exercise the real connector and progress source against local servers.

pub mod helpers;

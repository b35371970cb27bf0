//! Port traits for the collaborators the dashboard core talks to.

pub mod broker_port;
pub mod config_port;
pub mod feed_port;

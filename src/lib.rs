//! tradewind: live market-data dashboard core.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`]. The [`scheduler`] owns the poll
//! loop and [`cli`] wires everything to a terminal.

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
pub mod scheduler;

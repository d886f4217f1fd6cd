//! # Twix Worker Library
//!
//! Background delivery of task reminders.
//!
//! ## Modules
//!
//! - `config`: Environment configuration
//! - `orchestrator`: Poll loop and recipient selection
//! - `queue`: Claiming due reminders

pub mod config;
pub mod orchestrator;
pub mod queue;

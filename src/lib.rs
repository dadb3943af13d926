//! Contract analysis front end.
//!
//! Uploads a contract to an analysis backend, answers questions about it, exports key
//! dates to a calendar and dispatches the document to an e-signature provider.

pub mod calendar;
pub mod cli;
pub mod error;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod services;
pub mod text_summary;
#[cfg(feature = "tui")]
mod tui;

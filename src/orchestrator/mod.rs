//! Application-level orchestration.
//!
//! This module owns the document workflow (analyze, ask, sign) and post-analysis
//! reporting. UI/CLI layers call into this module to keep responsibilities separated.

mod controller;
mod report;
mod session;

pub use controller::{run_controller, UiCommand, WorkflowController};
pub use report::{export_json, AnalysisReport, ReportDate};
pub use session::{DocumentSession, PendingQuestion, WorkflowPhase, WorkflowState};

//! Post-analysis reporting.
//!
//! Collects the session, conversation and signing outcome into one serializable
//! report for text and JSON output.

use super::session::WorkflowState;
use crate::calendar;
use crate::model::{EnvelopeSummary, Message, Party, Risk};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct ReportDate {
    #[serde(rename = "type")]
    pub kind: String,
    pub date: String,
    pub calendar_link: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub file_name: String,
    pub summary: String,
    pub risks: Vec<Risk>,
    /// Only dates that can be exported to a calendar.
    pub dates: Vec<ReportDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parties: Option<Vec<Party>>,
    pub conversation: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub envelope: Option<EnvelopeSummary>,
}

impl AnalysisReport {
    /// Build a report from the active session, or `None` before any successful analysis.
    pub fn from_state(state: &WorkflowState, envelope: Option<EnvelopeSummary>) -> Option<Self> {
        let session = state.session()?;
        let analysis = &session.analysis;
        let dates = analysis
            .dates
            .iter()
            .filter_map(|d| {
                calendar::calendar_link(d).map(|calendar_link| ReportDate {
                    kind: d.kind.clone(),
                    date: d.date.clone(),
                    calendar_link,
                })
            })
            .collect();

        Some(Self {
            file_name: session.file.name.clone(),
            summary: analysis.summary.clone(),
            risks: analysis.risks.clone(),
            dates,
            parties: analysis.parties.clone(),
            conversation: state.conversation().to_vec(),
            envelope,
        })
    }
}

/// Write a report as pretty JSON, creating parent directories.
pub fn export_json(path: &Path, report: &AnalysisReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let body = serde_json::to_string_pretty(report).context("serialize report")?;
    std::fs::write(path, body).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnalysisResult, AnalyzeResponse, DocumentFile, KeyDate};

    fn state_with_dates(dates: Vec<KeyDate>) -> WorkflowState {
        let mut state = WorkflowState::new();
        state.begin_analysis().unwrap();
        state
            .finish_analysis(
                DocumentFile::new("contract.pdf", b"%PDF".to_vec()),
                Ok(AnalyzeResponse {
                    text: "body".into(),
                    analysis: AnalysisResult {
                        summary: "S".into(),
                        risks: vec![],
                        dates,
                        parties: None,
                    },
                }),
            )
            .unwrap();
        state
    }

    #[test]
    fn no_report_before_analysis() {
        assert!(AnalysisReport::from_state(&WorkflowState::new(), None).is_none());
    }

    #[test]
    fn report_keeps_only_exportable_dates() {
        let state = state_with_dates(vec![
            KeyDate {
                kind: "Effective Date".into(),
                date: "2025-01-01".into(),
            },
            KeyDate {
                kind: "Renewal".into(),
                date: "on request".into(),
            },
        ]);
        let report = AnalysisReport::from_state(&state, None).unwrap();
        assert_eq!(report.file_name, "contract.pdf");
        assert_eq!(report.dates.len(), 1);
        assert_eq!(report.dates[0].kind, "Effective Date");
        assert!(report.dates[0].calendar_link.contains("20250101"));
    }

    #[test]
    fn export_writes_pretty_json() {
        let state = state_with_dates(vec![]);
        let report = AnalysisReport::from_state(&state, None).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        export_json(&path, &report).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["summary"], "S");
        assert!(written.get("envelope").is_none());
    }

    #[test]
    fn export_creates_missing_directories() {
        let state = state_with_dates(vec![]);
        let report = AnalysisReport::from_state(&state, None).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("report.json");
        export_json(&path, &report).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["file_name"], "contract.pdf");
    }
}

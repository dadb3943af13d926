//! Text summary builder for CLI output.
//!
//! Formats an analysis report as human-readable lines for text mode.

use crate::model::Role;
use crate::orchestrator::AnalysisReport;

/// Pre-formatted lines for text output.
pub struct TextSummary {
    pub lines: Vec<String>,
}

/// Build a text summary from a finished report.
pub fn build_text_summary(report: &AnalysisReport) -> TextSummary {
    let mut lines = Vec::new();

    lines.push(format!("Document: {}", report.file_name));
    lines.push(String::new());
    lines.push("Summary".to_string());
    lines.push(format!("  {}", report.summary.trim()));

    if let Some(parties) = report.parties.as_ref().filter(|p| !p.is_empty()) {
        lines.push(String::new());
        lines.push("Parties".to_string());
        for p in parties {
            lines.push(format!("  {}: {}", p.role, p.name));
        }
    }

    lines.push(String::new());
    lines.push(format!("Risks ({})", report.risks.len()));
    for r in &report.risks {
        lines.push(format!("  [{}] {}", r.severity, r.description));
    }

    lines.push(String::new());
    lines.push(format!("Key dates ({})", report.dates.len()));
    for d in &report.dates {
        lines.push(format!("  {}: {}", d.kind, d.date));
        lines.push(format!("    {}", d.calendar_link));
    }

    if !report.conversation.is_empty() {
        lines.push(String::new());
        lines.push("Q&A".to_string());
        for m in &report.conversation {
            let who = match m.role {
                Role::User => "Q",
                Role::Assistant => "A",
            };
            lines.push(format!("  {who}: {}", m.content));
        }
    }

    if let Some(env) = report.envelope.as_ref() {
        lines.push(String::new());
        lines.push(format!(
            "Sent for signing: envelope {} ({})",
            env.envelope_id.as_deref().unwrap_or("-"),
            env.status.as_deref().unwrap_or("unknown status")
        ));
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Message, Risk, RiskSeverity};
    use crate::orchestrator::ReportDate;

    #[test]
    fn lists_risks_dates_and_conversation() {
        let report = AnalysisReport {
            file_name: "contract.pdf".into(),
            summary: "S".into(),
            risks: vec![Risk {
                severity: RiskSeverity::High,
                description: "D".into(),
            }],
            dates: vec![ReportDate {
                kind: "Effective Date".into(),
                date: "2025-01-01".into(),
                calendar_link: "https://calendar.example/x".into(),
            }],
            parties: None,
            conversation: vec![
                Message::user("When does this expire?"),
                Message::assistant("2026-01-01"),
            ],
            envelope: None,
        };
        let lines = build_text_summary(&report).lines;
        assert!(lines.contains(&"  S".to_string()));
        assert!(lines.contains(&"  [high] D".to_string()));
        assert!(lines.contains(&"  Effective Date: 2025-01-01".to_string()));
        assert!(lines.contains(&"  Q: When does this expire?".to_string()));
        assert!(lines.contains(&"  A: 2026-01-01".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("Parties")));
    }
}

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;

/// Read-only service configuration injected into the workflow controller.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL of the analysis / question-answering backend.
    pub backend_url: String,
    pub signature: SignatureConfig,
    pub user_agent: String,
}

/// E-signature provider credentials. Supplied once at process start.
#[derive(Clone, Default)]
pub struct SignatureConfig {
    pub base_path: String,
    pub access_token: String,
    pub account_id: String,
}

impl fmt::Debug for SignatureConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureConfig")
            .field("base_path", &self.base_path)
            .field("access_token", &"<redacted>")
            .field("account_id", &self.account_id)
            .finish()
    }
}

/// Raw handle to an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFile {
    pub name: String,
    pub contents: Bytes,
}

impl DocumentFile {
    pub fn new(name: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// Read a document from disk, keeping only the file name.
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let contents = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("Contract.pdf")
            .to_string();
        Ok(Self::new(name, contents))
    }

    /// Lower-cased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(|e| e.to_ascii_lowercase())
    }
}

/// Extensions offered by the document picker.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

/// Whether a path looks like a document the picker would offer.
pub fn is_accepted_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|ok| e.eq_ignore_ascii_case(ok))
        })
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskSeverity {
    Low,
    Medium,
    High,
}

impl RiskSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskSeverity::Low => "low",
            RiskSeverity::Medium => "medium",
            RiskSeverity::High => "high",
        }
    }
}

impl std::str::FromStr for RiskSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskSeverity::Low),
            "medium" => Ok(RiskSeverity::Medium),
            "high" => Ok(RiskSeverity::High),
            other => Err(format!("unknown risk severity: {other:?}")),
        }
    }
}

// Backends are not consistent about casing ("High" vs "high").
impl<'de> Deserialize<'de> for RiskSeverity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for RiskSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    pub severity: RiskSeverity,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDate {
    #[serde(rename = "type")]
    pub kind: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub role: String,
    pub name: String,
}

/// Structured analysis output for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub risks: Vec<Risk>,
    pub dates: Vec<KeyDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parties: Option<Vec<Party>>,
}

/// Body returned by `POST /analyze`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub text: String,
    #[serde(flatten)]
    pub analysis: AnalysisResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    pub name: String,
    pub email: String,
}

impl std::str::FromStr for Signer {
    type Err = String;

    /// Parse `Name <email>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, rest) = s
            .split_once('<')
            .ok_or_else(|| format!("expected \"Name <email>\", got {s:?}"))?;
        let email = rest
            .strip_suffix('>')
            .ok_or_else(|| format!("missing closing '>' in {s:?}"))?
            .trim();
        let name = name.trim();
        if name.is_empty() || !email.contains('@') {
            return Err(format!("expected \"Name <email>\", got {s:?}"));
        }
        Ok(Signer {
            name: name.to_string(),
            email: email.to_string(),
        })
    }
}

/// Provider confirmation for a created envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvelopeSummary {
    pub envelope_id: Option<String>,
    pub status: Option<String>,
    pub raw: serde_json::Value,
}

impl EnvelopeSummary {
    pub fn from_value(raw: serde_json::Value) -> Self {
        let field = |k: &str| raw.get(k).and_then(|v| v.as_str()).map(str::to_string);
        Self {
            envelope_id: field("envelopeId"),
            status: field("status"),
            raw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Analysis,
    Question,
    Signing,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Analysis => "analysis",
            OperationKind::Question => "question",
            OperationKind::Signing => "signing",
        })
    }
}

/// Events emitted by the controller loop and consumed by presentation layers.
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    AnalysisStarted {
        file_name: String,
    },
    AnalysisCompleted {
        file_name: String,
        // Boxed to keep the enum small.
        analysis: Box<AnalysisResult>,
    },
    QuestionAsked {
        message: Message,
    },
    AnswerReceived {
        message: Message,
    },
    /// The answer belonged to a document that has since been replaced.
    QuestionDropped,
    SigningStarted,
    SignatureSent {
        envelope: EnvelopeSummary,
    },
    OperationFailed {
        kind: OperationKind,
        notice: String,
    },
    Notice(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_response_parses_backend_body() {
        let body = serde_json::json!({
            "text": "full text",
            "summary": "S",
            "risks": [{"severity": "High", "description": "D"}],
            "dates": [{"type": "Effective Date", "date": "2025-01-01"}]
        });
        let parsed: AnalyzeResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.text, "full text");
        assert_eq!(parsed.analysis.summary, "S");
        assert_eq!(parsed.analysis.risks[0].severity, RiskSeverity::High);
        assert_eq!(parsed.analysis.dates[0].kind, "Effective Date");
        assert!(parsed.analysis.parties.is_none());
    }

    #[test]
    fn unknown_severity_is_rejected() {
        let body = serde_json::json!({
            "text": "t",
            "summary": "S",
            "risks": [{"severity": "catastrophic", "description": "D"}],
            "dates": []
        });
        assert!(serde_json::from_value::<AnalyzeResponse>(body).is_err());
    }

    #[test]
    fn signer_parses_name_and_email() {
        let s: Signer = "Jane Smith <jane@example.com>".parse().unwrap();
        assert_eq!(s.name, "Jane Smith");
        assert_eq!(s.email, "jane@example.com");
        assert!("jane@example.com".parse::<Signer>().is_err());
        assert!("Jane <not-an-email>".parse::<Signer>().is_err());
    }

    #[test]
    fn accepted_extensions_are_case_insensitive() {
        assert!(is_accepted_document(Path::new("contract.PDF")));
        assert!(is_accepted_document(Path::new("/tmp/a.docx")));
        assert!(!is_accepted_document(Path::new("notes.txt")));
        assert!(!is_accepted_document(Path::new("README")));
    }

    #[test]
    fn signature_config_debug_hides_token() {
        let cfg = SignatureConfig {
            base_path: "https://demo".into(),
            access_token: "secret-token".into(),
            account_id: "acc".into(),
        };
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("secret-token"));
        assert!(dbg.contains("acc"));
    }
}

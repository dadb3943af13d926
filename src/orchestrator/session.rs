//! Workflow state for one front end.
//!
//! Every operation is split into a `begin_*` step, which checks preconditions and the
//! in-flight guard and applies optimistic updates, and a `finish_*` step, which applies
//! the remote outcome in one update. The split lets the controller run the network
//! call anywhere (inline or on a task) while state stays single-owner.

use crate::error::{ServiceError, WorkflowError};
use crate::model::{
    AnalysisResult, AnalyzeResponse, DocumentFile, EnvelopeSummary, Message, OperationKind,
    Signer,
};

/// State associated with one analyzed document.
#[derive(Debug, Clone)]
pub struct DocumentSession {
    pub file: DocumentFile,
    pub extracted_text: String,
    pub analysis: AnalysisResult,
    generation: u64,
}

impl DocumentSession {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Coarse lifecycle phase, derived from the session and in-flight flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowPhase {
    NoFile,
    Analyzing,
    Analyzed,
    AwaitingAnswer,
    Signing,
}

/// Work order for a question that passed its preconditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuestion {
    pub question: String,
    pub text: String,
    pub generation: u64,
}

#[derive(Debug, Default)]
pub struct WorkflowState {
    session: Option<DocumentSession>,
    conversation: Vec<Message>,
    analysis_in_progress: bool,
    question_in_progress: bool,
    signing_in_progress: bool,
    generations: u64,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&DocumentSession> {
        self.session.as_ref()
    }

    pub fn extracted_text(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.extracted_text.as_str())
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.session.as_ref().map(|s| &s.analysis)
    }

    pub fn conversation(&self) -> &[Message] {
        &self.conversation
    }

    pub fn analysis_in_progress(&self) -> bool {
        self.analysis_in_progress
    }

    pub fn question_in_progress(&self) -> bool {
        self.question_in_progress
    }

    pub fn signing_in_progress(&self) -> bool {
        self.signing_in_progress
    }

    pub fn phase(&self) -> WorkflowPhase {
        if self.analysis_in_progress {
            WorkflowPhase::Analyzing
        } else if self.session.is_none() {
            WorkflowPhase::NoFile
        } else if self.question_in_progress {
            WorkflowPhase::AwaitingAnswer
        } else if self.signing_in_progress {
            WorkflowPhase::Signing
        } else {
            WorkflowPhase::Analyzed
        }
    }

    pub fn begin_analysis(&mut self) -> Result<(), WorkflowError> {
        if self.analysis_in_progress {
            return Err(WorkflowError::Busy(OperationKind::Analysis));
        }
        self.analysis_in_progress = true;
        Ok(())
    }

    /// Apply an analysis outcome. On success the session and conversation are replaced
    /// wholesale; on failure nothing but the progress flag changes.
    pub fn finish_analysis(
        &mut self,
        file: DocumentFile,
        outcome: Result<AnalyzeResponse, ServiceError>,
    ) -> Result<&DocumentSession, WorkflowError> {
        self.analysis_in_progress = false;
        let resp = outcome.map_err(WorkflowError::Analyze)?;
        self.generations += 1;
        self.conversation.clear();
        Ok(&*self.session.insert(DocumentSession {
            file,
            extracted_text: resp.text,
            analysis: resp.analysis,
            generation: self.generations,
        }))
    }

    /// Start a question. Returns `Ok(None)` when the question is blank or there is no
    /// extracted text, in which case nothing changes.
    pub fn begin_question(
        &mut self,
        question: &str,
    ) -> Result<Option<PendingQuestion>, WorkflowError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(None);
        };
        if question.trim().is_empty() || session.extracted_text.is_empty() {
            return Ok(None);
        }
        // A finished analysis would reset the conversation underneath the answer.
        if self.analysis_in_progress {
            return Err(WorkflowError::Busy(OperationKind::Analysis));
        }
        if self.question_in_progress {
            return Err(WorkflowError::Busy(OperationKind::Question));
        }

        let pending = PendingQuestion {
            question: question.to_string(),
            text: session.extracted_text.clone(),
            generation: session.generation,
        };
        self.question_in_progress = true;
        self.conversation.push(Message::user(question));
        Ok(Some(pending))
    }

    /// Apply an answer. The optimistic user message stays in place on failure.
    /// An answer for a session that has since been replaced is dropped.
    pub fn finish_question(
        &mut self,
        generation: u64,
        outcome: Result<String, ServiceError>,
    ) -> Result<Option<&Message>, WorkflowError> {
        self.question_in_progress = false;
        let answer = outcome.map_err(WorkflowError::Ask)?;
        let current = self.session.as_ref().map(|s| s.generation);
        if current != Some(generation) {
            return Ok(None);
        }
        self.conversation.push(Message::assistant(answer));
        Ok(self.conversation.last())
    }

    /// Start signing. Returns `Ok(None)` when no document has been analyzed or there
    /// is nobody to sign.
    pub fn begin_signing(
        &mut self,
        signers: &[Signer],
    ) -> Result<Option<DocumentFile>, WorkflowError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(None);
        };
        if signers.is_empty() {
            return Ok(None);
        }
        if self.signing_in_progress {
            return Err(WorkflowError::Busy(OperationKind::Signing));
        }
        self.signing_in_progress = true;
        Ok(Some(session.file.clone()))
    }

    pub fn finish_signing(
        &mut self,
        outcome: Result<EnvelopeSummary, ServiceError>,
    ) -> Result<EnvelopeSummary, WorkflowError> {
        self.signing_in_progress = false;
        outcome.map_err(WorkflowError::Sign)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{KeyDate, Risk, RiskSeverity, Role};
    use reqwest::StatusCode;

    fn response(text: &str, summary: &str) -> AnalyzeResponse {
        AnalyzeResponse {
            text: text.into(),
            analysis: AnalysisResult {
                summary: summary.into(),
                risks: vec![Risk {
                    severity: RiskSeverity::High,
                    description: "D".into(),
                }],
                dates: vec![KeyDate {
                    kind: "Effective Date".into(),
                    date: "2025-01-01".into(),
                }],
                parties: None,
            },
        }
    }

    fn http_error(status: StatusCode) -> ServiceError {
        ServiceError::Status {
            endpoint: "/test",
            status,
        }
    }

    fn signers() -> Vec<Signer> {
        vec![Signer {
            name: "Jane Smith".into(),
            email: "jane@example.com".into(),
        }]
    }

    fn analyzed(text: &str) -> WorkflowState {
        let mut state = WorkflowState::new();
        state.begin_analysis().unwrap();
        state
            .finish_analysis(
                DocumentFile::new("contract.pdf", b"%PDF".to_vec()),
                Ok(response(text, "S")),
            )
            .unwrap();
        state
    }

    #[test]
    fn starts_without_a_file() {
        let state = WorkflowState::new();
        assert_eq!(state.phase(), WorkflowPhase::NoFile);
        assert!(state.analysis().is_none());
        assert!(state.conversation().is_empty());
    }

    #[test]
    fn successful_analysis_sets_text_and_result_together() {
        let mut state = WorkflowState::new();
        state.begin_analysis().unwrap();
        assert_eq!(state.phase(), WorkflowPhase::Analyzing);

        let session = state
            .finish_analysis(
                DocumentFile::new("contract.pdf", b"%PDF".to_vec()),
                Ok(response("body", "S")),
            )
            .unwrap();
        assert_eq!(session.extracted_text, "body");
        assert_eq!(session.analysis.summary, "S");
        assert!(!state.analysis_in_progress());
        assert_eq!(state.phase(), WorkflowPhase::Analyzed);
    }

    #[test]
    fn new_analysis_resets_conversation() {
        let mut state = analyzed("body");
        state.begin_question("Who signs?").unwrap().unwrap();
        state.finish_question(1, Ok("Both".into())).unwrap();
        assert_eq!(state.conversation().len(), 2);

        state.begin_analysis().unwrap();
        state
            .finish_analysis(
                DocumentFile::new("other.pdf", b"%PDF".to_vec()),
                Ok(response("other", "S2")),
            )
            .unwrap();
        assert!(state.conversation().is_empty());
        assert_eq!(state.session().unwrap().file.name, "other.pdf");
    }

    #[test]
    fn failed_analysis_keeps_previous_session() {
        let mut state = analyzed("body");
        state.begin_question("Q").unwrap();
        state.finish_question(1, Ok("A".into())).unwrap();

        state.begin_analysis().unwrap();
        let err = state
            .finish_analysis(
                DocumentFile::new("bad.pdf", b"x".to_vec()),
                Err(http_error(StatusCode::INTERNAL_SERVER_ERROR)),
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Analyze(_)));
        assert!(!state.analysis_in_progress());
        assert_eq!(state.extracted_text(), Some("body"));
        assert_eq!(state.session().unwrap().file.name, "contract.pdf");
        assert_eq!(state.conversation().len(), 2);
    }

    #[test]
    fn failed_first_analysis_leaves_no_session() {
        let mut state = WorkflowState::new();
        state.begin_analysis().unwrap();
        assert!(state
            .finish_analysis(
                DocumentFile::new("bad.pdf", b"x".to_vec()),
                Err(http_error(StatusCode::BAD_GATEWAY)),
            )
            .is_err());
        assert_eq!(state.phase(), WorkflowPhase::NoFile);
    }

    #[test]
    fn duplicate_analysis_is_rejected() {
        let mut state = WorkflowState::new();
        state.begin_analysis().unwrap();
        assert!(matches!(
            state.begin_analysis(),
            Err(WorkflowError::Busy(OperationKind::Analysis))
        ));
    }

    #[test]
    fn blank_questions_are_ignored() {
        let mut state = analyzed("body");
        assert_eq!(state.begin_question("").unwrap(), None);
        assert_eq!(state.begin_question("   ").unwrap(), None);
        assert!(state.conversation().is_empty());
        assert!(!state.question_in_progress());
    }

    #[test]
    fn questions_need_extracted_text() {
        let mut state = WorkflowState::new();
        assert_eq!(state.begin_question("Anything?").unwrap(), None);

        let mut empty = analyzed("");
        assert_eq!(empty.begin_question("Anything?").unwrap(), None);
        assert!(empty.conversation().is_empty());
    }

    #[test]
    fn question_appends_user_message_immediately() {
        let mut state = analyzed("body");
        let pending = state.begin_question("When does this expire?").unwrap().unwrap();
        assert_eq!(pending.text, "body");
        assert_eq!(state.phase(), WorkflowPhase::AwaitingAnswer);
        assert_eq!(
            state.conversation(),
            &[Message::user("When does this expire?")]
        );

        let answer = state
            .finish_question(pending.generation, Ok("2026-01-01".into()))
            .unwrap()
            .cloned();
        assert_eq!(answer, Some(Message::assistant("2026-01-01")));
        assert_eq!(state.conversation().len(), 2);
        assert!(!state.question_in_progress());
    }

    #[test]
    fn failed_answer_keeps_user_message() {
        let mut state = analyzed("body");
        let pending = state.begin_question("Q").unwrap().unwrap();
        assert!(state
            .finish_question(
                pending.generation,
                Err(http_error(StatusCode::INTERNAL_SERVER_ERROR))
            )
            .is_err());
        assert_eq!(state.conversation().len(), 1);
        assert_eq!(state.conversation()[0].role, Role::User);
        assert!(!state.question_in_progress());
    }

    #[test]
    fn one_question_at_a_time() {
        let mut state = analyzed("body");
        state.begin_question("first").unwrap().unwrap();
        assert!(matches!(
            state.begin_question("second"),
            Err(WorkflowError::Busy(OperationKind::Question))
        ));
        assert_eq!(state.conversation().len(), 1);
    }

    #[test]
    fn stale_answer_is_dropped_after_new_upload() {
        let mut state = analyzed("body");
        let pending = state.begin_question("Q").unwrap().unwrap();
        // The answer settles only after a new document replaced the session.
        state.begin_analysis().unwrap();
        state
            .finish_analysis(
                DocumentFile::new("next.pdf", b"x".to_vec()),
                Ok(response("next", "S")),
            )
            .unwrap();

        let applied = state
            .finish_question(pending.generation, Ok("late".into()))
            .unwrap();
        assert!(applied.is_none());
        assert!(state.conversation().is_empty());
    }

    #[test]
    fn signing_requires_a_document_and_signers() {
        let mut state = WorkflowState::new();
        assert_eq!(state.begin_signing(&signers()).unwrap(), None);
        assert!(!state.signing_in_progress());

        let mut state = analyzed("body");
        assert_eq!(state.begin_signing(&[]).unwrap(), None);
        assert!(!state.signing_in_progress());
    }

    #[test]
    fn signing_flag_is_cleared_on_failure() {
        let mut state = analyzed("body");
        let file = state.begin_signing(&signers()).unwrap().unwrap();
        assert_eq!(file.name, "contract.pdf");
        assert!(matches!(
            state.begin_signing(&signers()),
            Err(WorkflowError::Busy(OperationKind::Signing))
        ));
        assert!(state
            .finish_signing(Err(http_error(StatusCode::INTERNAL_SERVER_ERROR)))
            .is_err());
        assert!(!state.signing_in_progress());
    }

    #[test]
    fn question_and_signing_can_overlap() {
        let mut state = analyzed("body");
        state.begin_signing(&signers()).unwrap().unwrap();
        assert!(state.begin_question("Q").unwrap().is_some());
        assert!(state.signing_in_progress());
        assert!(state.question_in_progress());
    }
}

use crate::calendar;
use crate::model::{AnalysisResult, KeyDate, Message, OperationKind, Signer, WorkflowEvent};

pub const TAB_SUMMARY: usize = 0;
pub const TAB_RISKS: usize = 1;
pub const TAB_DATES: usize = 2;
pub const TAB_QA: usize = 3;
pub const TAB_HELP: usize = 4;
pub const TAB_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    FilePath,
    Question,
}

/// View of the workflow owned by the UI thread. Updated only from controller events.
pub struct UiState {
    pub tab: usize,
    pub info: String,
    pub input_mode: InputMode,
    pub input: String,

    pub file_name: Option<String>,
    pub pending_file: Option<String>,
    pub analysis: Option<AnalysisResult>,
    pub conversation: Vec<Message>,
    pub conversation_scroll: usize,

    pub analysis_in_progress: bool,
    pub question_in_progress: bool,
    pub signing_in_progress: bool,

    pub date_selected: usize,
    pub last_calendar_link: Option<String>,
    pub signers: Vec<Signer>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: TAB_SUMMARY,
            info: "Press 'o' to open a contract".into(),
            input_mode: InputMode::Normal,
            input: String::new(),
            file_name: None,
            pending_file: None,
            analysis: None,
            conversation: Vec::new(),
            conversation_scroll: 0,
            analysis_in_progress: false,
            question_in_progress: false,
            signing_in_progress: false,
            date_selected: 0,
            last_calendar_link: None,
            signers: Vec::new(),
        }
    }
}

impl UiState {
    /// Dates shown on the Key Dates tab.
    pub fn exportable_dates(&self) -> Vec<&KeyDate> {
        self.analysis
            .as_ref()
            .map(calendar::exportable_dates)
            .unwrap_or_default()
    }

    pub fn selected_date(&self) -> Option<&KeyDate> {
        self.exportable_dates().get(self.date_selected).copied()
    }

    pub fn select_next_date(&mut self) {
        let n = self.exportable_dates().len();
        if n > 0 && self.date_selected + 1 < n {
            self.date_selected += 1;
        }
    }

    pub fn select_prev_date(&mut self) {
        self.date_selected = self.date_selected.saturating_sub(1);
    }

    pub fn can_ask(&self) -> bool {
        self.analysis.is_some() && !self.question_in_progress && !self.analysis_in_progress
    }

    pub fn can_sign(&self) -> bool {
        self.file_name.is_some() && !self.signing_in_progress
    }

    pub fn apply_event(&mut self, ev: WorkflowEvent) {
        match ev {
            WorkflowEvent::AnalysisStarted { file_name } => {
                self.analysis_in_progress = true;
                self.info = format!("Analyzing {file_name}…");
                self.pending_file = Some(file_name);
            }
            WorkflowEvent::AnalysisCompleted {
                file_name,
                analysis,
            } => {
                self.analysis_in_progress = false;
                self.pending_file = None;
                self.info = format!("Analyzed {file_name}");
                self.file_name = Some(file_name);
                self.analysis = Some(*analysis);
                self.conversation.clear();
                self.conversation_scroll = 0;
                self.date_selected = 0;
                self.last_calendar_link = None;
                self.tab = TAB_SUMMARY;
            }
            WorkflowEvent::QuestionAsked { message } => {
                self.question_in_progress = true;
                self.conversation.push(message);
                self.info = "Waiting for answer…".into();
            }
            WorkflowEvent::AnswerReceived { message } => {
                self.question_in_progress = false;
                self.conversation.push(message);
                self.info.clear();
            }
            WorkflowEvent::QuestionDropped => {
                self.question_in_progress = false;
                self.info = "Answer discarded: a new document was analyzed".into();
            }
            WorkflowEvent::SigningStarted => {
                self.signing_in_progress = true;
                self.info = "Sending…".into();
            }
            WorkflowEvent::SignatureSent { envelope } => {
                self.signing_in_progress = false;
                self.info = match envelope.envelope_id {
                    Some(id) => format!("Document sent for signing! (envelope {id})"),
                    None => "Document sent for signing!".into(),
                };
            }
            WorkflowEvent::OperationFailed { kind, notice } => {
                match kind {
                    OperationKind::Analysis => {
                        self.analysis_in_progress = false;
                        self.pending_file = None;
                    }
                    OperationKind::Question => self.question_in_progress = false,
                    OperationKind::Signing => self.signing_in_progress = false,
                }
                self.info = notice;
            }
            WorkflowEvent::Notice(msg) => self.info = msg,
        }
    }
}

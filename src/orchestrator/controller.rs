//! Workflow controller.
//!
//! Owns the document session and conversation, sequences requests against the remote
//! services and emits events for presentation layers.

use super::session::{DocumentSession, WorkflowState};
use crate::calendar;
use crate::error::{ServiceError, WorkflowError};
use crate::model::{
    AnalyzeResponse, DocumentFile, EnvelopeSummary, KeyDate, Message, OperationKind,
    ServiceConfig, Signer, WorkflowEvent,
};
use crate::services::{BackendClient, SignatureClient};
use anyhow::Result;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub enum UiCommand {
    Analyze(PathBuf),
    Ask(String),
    Sign(Vec<Signer>),
    Quit,
}

pub struct WorkflowController {
    state: WorkflowState,
    backend: BackendClient,
    esign: SignatureClient,
}

impl WorkflowController {
    pub fn new(cfg: &ServiceConfig) -> Result<Self> {
        Ok(Self {
            state: WorkflowState::new(),
            backend: BackendClient::new(&cfg.backend_url, &cfg.user_agent)?,
            esign: SignatureClient::new(cfg.signature.clone(), &cfg.user_agent)?,
        })
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Upload `file` for analysis and make it the active document on success.
    pub async fn analyze(&mut self, file: DocumentFile) -> Result<&DocumentSession, WorkflowError> {
        self.state.begin_analysis()?;
        tracing::info!(file = %file.name, bytes = file.contents.len(), "analyzing document");
        let outcome = self.backend.analyze(&file).await;
        log_outcome(OperationKind::Analysis, &outcome);
        self.state.finish_analysis(file, outcome)
    }

    /// Read a document from disk and analyze it.
    pub async fn analyze_path(&mut self, path: &Path) -> Result<&DocumentSession, WorkflowError> {
        let file = read_document(path).await?;
        self.analyze(file).await
    }

    /// Ask a question about the active document.
    ///
    /// Returns `Ok(None)` without sending anything if the question is blank or no text
    /// has been extracted yet.
    pub async fn ask(&mut self, question: &str) -> Result<Option<String>, WorkflowError> {
        let Some(pending) = self.state.begin_question(question)? else {
            tracing::debug!("question skipped: blank or no document text");
            return Ok(None);
        };
        tracing::info!(chars = pending.question.len(), "asking question");
        let outcome = self.backend.ask(&pending.question, &pending.text).await;
        log_outcome(OperationKind::Question, &outcome);
        let answer = self.state.finish_question(pending.generation, outcome)?;
        Ok(answer.map(|m| m.content.clone()))
    }

    /// Deep link adding `entry` to a calendar, if its date parses.
    pub fn calendar_link(&self, entry: &KeyDate) -> Option<String> {
        calendar::calendar_link(entry)
    }

    /// Send the active document to the e-signature provider.
    ///
    /// Returns `Ok(None)` without sending anything when there is no document or no signer.
    pub async fn request_signature(
        &mut self,
        signers: &[Signer],
    ) -> Result<Option<EnvelopeSummary>, WorkflowError> {
        let Some(file) = self.state.begin_signing(signers)? else {
            tracing::debug!("signing skipped: no document or no signers");
            return Ok(None);
        };
        tracing::info!(file = %file.name, signers = signers.len(), "creating envelope");
        let outcome = self.esign.create_envelope(&file, signers).await;
        log_outcome(OperationKind::Signing, &outcome);
        self.state.finish_signing(outcome).map(Some)
    }
}

async fn read_document(path: &Path) -> Result<DocumentFile, WorkflowError> {
    DocumentFile::read(path)
        .await
        .map_err(|source| WorkflowError::ReadDocument {
            path: path.to_path_buf(),
            source,
        })
}

fn log_outcome<T>(kind: OperationKind, outcome: &Result<T, ServiceError>) {
    match outcome {
        Ok(_) => tracing::info!(operation = %kind, "request succeeded"),
        Err(e) => tracing::warn!(operation = %kind, error = %e, "request failed"),
    }
}

fn failed(kind: OperationKind, err: &WorkflowError) -> WorkflowEvent {
    WorkflowEvent::OperationFailed {
        kind,
        notice: err.to_string(),
    }
}

/// A request running outside the controller's borrow.
type InFlight<T> = Option<BoxFuture<'static, T>>;

/// Await an optional in-flight request; pends forever when there is none.
async fn settle<T>(slot: &mut InFlight<T>) -> T {
    match slot.as_mut() {
        Some(fut) => fut.await,
        None => futures::future::pending().await,
    }
}

/// Drive the controller from UI commands, running at most one request per operation
/// kind while letting different kinds overlap. All state updates happen on this task.
pub async fn run_controller(
    mut controller: WorkflowController,
    event_tx: UnboundedSender<WorkflowEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut analysis: InFlight<(DocumentFile, Result<AnalyzeResponse, ServiceError>)> = None;
    let mut question: InFlight<(u64, Result<String, ServiceError>)> = None;
    let mut signing: InFlight<Result<EnvelopeSummary, ServiceError>> = None;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Analyze(path)) => {
                        let file = match read_document(&path).await {
                            Ok(f) => f,
                            Err(e) => {
                                tracing::warn!(error = %e, "document read failed");
                                let _ = event_tx.send(WorkflowEvent::Notice(e.to_string()));
                                continue;
                            }
                        };
                        if let Err(e) = controller.state.begin_analysis() {
                            let _ = event_tx.send(WorkflowEvent::Notice(e.to_string()));
                            continue;
                        }
                        tracing::info!(file = %file.name, bytes = file.contents.len(), "analyzing document");
                        let _ = event_tx.send(WorkflowEvent::AnalysisStarted {
                            file_name: file.name.clone(),
                        });
                        let backend = controller.backend.clone();
                        analysis = Some(Box::pin(async move {
                            let outcome = backend.analyze(&file).await;
                            (file, outcome)
                        }));
                    }
                    Some(UiCommand::Ask(q)) => {
                        match controller.state.begin_question(&q) {
                            Ok(Some(pending)) => {
                                let _ = event_tx.send(WorkflowEvent::QuestionAsked {
                                    message: Message::user(pending.question.clone()),
                                });
                                let backend = controller.backend.clone();
                                question = Some(Box::pin(async move {
                                    let outcome = backend.ask(&pending.question, &pending.text).await;
                                    (pending.generation, outcome)
                                }));
                            }
                            Ok(None) => tracing::debug!("question skipped: blank or no document text"),
                            // Rejected by the in-flight guard; the running request is unaffected.
                            Err(e) => {
                                let _ = event_tx.send(WorkflowEvent::Notice(e.to_string()));
                            }
                        }
                    }
                    Some(UiCommand::Sign(signers)) => {
                        match controller.state.begin_signing(&signers) {
                            Ok(Some(file)) => {
                                tracing::info!(file = %file.name, signers = signers.len(), "creating envelope");
                                let _ = event_tx.send(WorkflowEvent::SigningStarted);
                                let esign = controller.esign.clone();
                                signing = Some(Box::pin(async move {
                                    esign.create_envelope(&file, &signers).await
                                }));
                            }
                            Ok(None) => tracing::debug!("signing skipped: no document or no signers"),
                            Err(e) => {
                                let _ = event_tx.send(WorkflowEvent::Notice(e.to_string()));
                            }
                        }
                    }
                    Some(UiCommand::Quit) | None => break Ok(()),
                }
            }
            (file, outcome) = settle(&mut analysis) => {
                analysis = None;
                log_outcome(OperationKind::Analysis, &outcome);
                let file_name = file.name.clone();
                match controller.state.finish_analysis(file, outcome) {
                    Ok(session) => {
                        let _ = event_tx.send(WorkflowEvent::AnalysisCompleted {
                            file_name,
                            analysis: Box::new(session.analysis.clone()),
                        });
                    }
                    Err(e) => {
                        let _ = event_tx.send(failed(OperationKind::Analysis, &e));
                    }
                }
            }
            (generation, outcome) = settle(&mut question) => {
                question = None;
                log_outcome(OperationKind::Question, &outcome);
                match controller.state.finish_question(generation, outcome) {
                    Ok(Some(message)) => {
                        let _ = event_tx.send(WorkflowEvent::AnswerReceived {
                            message: message.clone(),
                        });
                    }
                    Ok(None) => {
                        tracing::debug!(generation, "dropped answer for replaced document");
                        let _ = event_tx.send(WorkflowEvent::QuestionDropped);
                    }
                    Err(e) => {
                        let _ = event_tx.send(failed(OperationKind::Question, &e));
                    }
                }
            }
            outcome = settle(&mut signing) => {
                signing = None;
                log_outcome(OperationKind::Signing, &outcome);
                match controller.state.finish_signing(outcome) {
                    Ok(envelope) => {
                        let _ = event_tx.send(WorkflowEvent::SignatureSent { envelope });
                    }
                    Err(e) => {
                        let _ = event_tx.send(failed(OperationKind::Signing, &e));
                    }
                }
            }
        }
    }
}

use crate::model::{is_accepted_document, ServiceConfig, SignatureConfig, Signer};
use crate::orchestrator::{export_json, AnalysisReport, WorkflowController};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Parser, Clone)]
#[command(
    name = "contract-analyzer",
    version,
    about = "Analyze contracts, ask questions about them and send them for signature"
)]
pub struct Cli {
    /// Base URL of the analysis / Q&A backend
    #[arg(long, env = "CONTRACT_ANALYZER_BACKEND_URL", default_value = "http://localhost:8001")]
    pub backend_url: String,

    /// E-signature API base path (e.g. https://demo.docusign.net/restapi)
    #[arg(long, env = "DOCUSIGN_BASE_PATH", default_value = "")]
    pub docusign_base_path: String,

    /// E-signature bearer token
    #[arg(long, env = "DOCUSIGN_ACCESS_TOKEN", default_value = "", hide_env_values = true)]
    pub docusign_access_token: String,

    /// E-signature account identifier
    #[arg(long, env = "DOCUSIGN_ACCOUNT_ID", default_value = "")]
    pub docusign_account_id: String,

    /// Signer as "Name <email>"; repeat for several signers in routing order
    #[arg(long = "signer", value_name = "NAME <EMAIL>")]
    pub signers: Vec<Signer>,

    /// Contract to analyze (.pdf, .doc, .docx)
    #[arg(long)]
    pub file: Option<std::path::PathBuf>,

    /// Question to ask about the contract (text/JSON mode); may be repeated
    #[arg(long = "ask", value_name = "QUESTION")]
    pub questions: Vec<String>,

    /// Send the contract for signature after analysis (text/JSON mode)
    #[arg(long)]
    pub sign: bool,

    /// Print JSON report and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print text report and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Export the report as JSON
    #[arg(long)]
    pub export_json: Option<std::path::PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log file for interactive mode (defaults to the user cache directory)
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        !self.json && !self.text && cfg!(feature = "tui")
    }
}

/// Build the service configuration from CLI arguments.
pub fn build_config(args: &Cli) -> ServiceConfig {
    ServiceConfig {
        backend_url: args.backend_url.clone(),
        signature: SignatureConfig {
            base_path: args.docusign_base_path.clone(),
            access_token: args.docusign_access_token.clone(),
            account_id: args.docusign_account_id.clone(),
        },
        user_agent: format!("contract-analyzer/{}", env!("CARGO_PKG_VERSION")),
    }
}

/// Reject documents the picker would not offer.
pub fn ensure_accepted_document(path: &std::path::Path) -> Result<()> {
    if !is_accepted_document(path) {
        anyhow::bail!(
            "unsupported document type: {} (expected .pdf, .doc or .docx)",
            path.display()
        );
    }
    Ok(())
}

pub async fn run(args: Cli) -> Result<()> {
    if args.is_interactive() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
    }
    run_scripted(args).await
}

/// Analyze, ask and optionally sign without a UI, then print a report.
async fn run_scripted(args: Cli) -> Result<()> {
    let path = args
        .file
        .clone()
        .context("--file is required in text and JSON modes")?;
    ensure_accepted_document(&path)?;

    let cfg = build_config(&args);
    let mut controller = WorkflowController::new(&cfg)?;
    let (out_tx, out_handle) = spawn_output_writer();

    let _ = out_tx.send(OutputLine::Stderr(format!(
        "Analyzing {}…",
        path.display()
    )));
    controller
        .analyze_path(&path)
        .await
        .with_context(|| format!("analysis of {} failed", path.display()))?;

    for q in &args.questions {
        match controller.ask(q).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                let _ = out_tx.send(OutputLine::Stderr(format!("Skipped question: {q:?}")));
            }
            Err(e) => {
                let _ = out_tx.send(OutputLine::Stderr(e.to_string()));
            }
        }
    }

    let mut envelope = None;
    if args.sign {
        match controller.request_signature(&args.signers).await {
            Ok(Some(env)) => {
                let _ = out_tx.send(OutputLine::Stderr("Document sent for signing!".into()));
                envelope = Some(env);
            }
            Ok(None) => {
                let _ = out_tx.send(OutputLine::Stderr(
                    "No signers given (use --signer \"Name <email>\"); not sent".into(),
                ));
            }
            Err(e) => {
                let _ = out_tx.send(OutputLine::Stderr(e.to_string()));
            }
        }
    }

    let report = AnalysisReport::from_state(controller.state(), envelope)
        .context("no analysis available")?;

    if let Some(p) = args.export_json.as_deref() {
        export_json(p, &report)?;
        let _ = out_tx.send(OutputLine::Stderr(format!("Exported JSON: {}", p.display())));
    }

    if args.json {
        let out = serde_json::to_string_pretty(&report)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        for line in crate::text_summary::build_text_summary(&report).lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signers_and_questions() {
        let cli = Cli::try_parse_from([
            "contract-analyzer",
            "--text",
            "--file",
            "nda.pdf",
            "--ask",
            "Who pays?",
            "--signer",
            "John Doe <john@example.com>",
            "--signer",
            "Jane Smith <jane@example.com>",
            "--sign",
        ])
        .unwrap();
        assert_eq!(cli.signers.len(), 2);
        assert_eq!(cli.signers[1].email, "jane@example.com");
        assert_eq!(cli.questions, vec!["Who pays?".to_string()]);
        assert!(!cli.is_interactive());
    }

    #[test]
    fn rejects_malformed_signer() {
        assert!(Cli::try_parse_from(["contract-analyzer", "--signer", "nobody"]).is_err());
    }

    #[test]
    fn only_picker_extensions_are_accepted() {
        assert!(ensure_accepted_document(std::path::Path::new("nda.PDF")).is_ok());
        assert!(ensure_accepted_document(std::path::Path::new("nda.docx")).is_ok());
        let err = ensure_accepted_document(std::path::Path::new("notes.txt")).unwrap_err();
        assert!(err.to_string().contains("unsupported document type"));
        assert!(ensure_accepted_document(std::path::Path::new("contract")).is_err());
    }

    #[test]
    fn config_carries_credentials() {
        let cli = Cli::try_parse_from([
            "contract-analyzer",
            "--backend-url",
            "http://backend:9000",
            "--docusign-base-path",
            "https://demo.docusign.net/restapi",
            "--docusign-access-token",
            "tok",
            "--docusign-account-id",
            "acc",
        ])
        .unwrap();
        let cfg = build_config(&cli);
        assert_eq!(cfg.backend_url, "http://backend:9000");
        assert_eq!(cfg.signature.access_token, "tok");
        assert_eq!(cfg.signature.account_id, "acc");
        assert!(cfg.user_agent.starts_with("contract-analyzer/"));
    }
}

use super::{build_http, join_url, read_json};
use crate::error::ServiceError;
use crate::model::{DocumentFile, EnvelopeSummary, SignatureConfig, Signer};
use anyhow::Result;
use base64::Engine;
use serde::Serialize;

const ENVELOPES_ENDPOINT: &str = "envelopes";
const EMAIL_SUBJECT: &str = "Please sign this document";
const DOCUMENT_ID: &str = "1";
const DEFAULT_DOCUMENT_NAME: &str = "Contract.pdf";
const DEFAULT_EXTENSION: &str = "pdf";

// Every signer gets one sign-here anchor at the same spot on page 1.
const ANCHOR_PAGE: &str = "1";
const ANCHOR_X: &str = "100";
const ANCHOR_Y: &str = "100";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateEnvelopeRequest<'a> {
    envelope_definition: &'a EnvelopeDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeDefinition {
    pub email_subject: String,
    pub documents: Vec<EnvelopeDocument>,
    pub recipients: Recipients,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeDocument {
    pub document_base64: String,
    pub name: String,
    pub file_extension: String,
    pub document_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipients {
    pub signers: Vec<EnvelopeSigner>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeSigner {
    pub email: String,
    pub name: String,
    pub recipient_id: String,
    pub routing_order: String,
    pub tabs: SignerTabs,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerTabs {
    pub sign_here_tabs: Vec<SignHereTab>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignHereTab {
    pub document_id: String,
    pub page_number: String,
    pub x_position: String,
    pub y_position: String,
}

impl EnvelopeDefinition {
    /// Describe a single-document envelope routed to `signers` in order.
    pub fn new(document: &DocumentFile, signers: &[Signer]) -> Self {
        let (name, file_extension) = match document.extension() {
            Some(ext) => (document.name.clone(), ext),
            None => (DEFAULT_DOCUMENT_NAME.to_string(), DEFAULT_EXTENSION.to_string()),
        };

        let signers = signers
            .iter()
            .enumerate()
            .map(|(idx, signer)| {
                let position = (idx + 1).to_string();
                EnvelopeSigner {
                    email: signer.email.clone(),
                    name: signer.name.clone(),
                    recipient_id: position.clone(),
                    routing_order: position,
                    tabs: SignerTabs {
                        sign_here_tabs: vec![SignHereTab {
                            document_id: DOCUMENT_ID.into(),
                            page_number: ANCHOR_PAGE.into(),
                            x_position: ANCHOR_X.into(),
                            y_position: ANCHOR_Y.into(),
                        }],
                    },
                }
            })
            .collect();

        Self {
            email_subject: EMAIL_SUBJECT.into(),
            documents: vec![EnvelopeDocument {
                document_base64: base64::engine::general_purpose::STANDARD
                    .encode(&document.contents),
                name,
                file_extension,
                document_id: DOCUMENT_ID.into(),
            }],
            recipients: Recipients { signers },
            status: "sent".into(),
        }
    }
}

/// Client for the e-signature provider's envelope API.
#[derive(Debug, Clone)]
pub struct SignatureClient {
    http: reqwest::Client,
    cfg: SignatureConfig,
}

impl SignatureClient {
    pub fn new(cfg: SignatureConfig, user_agent: &str) -> Result<Self> {
        Ok(Self {
            http: build_http(user_agent)?,
            cfg,
        })
    }

    fn envelopes_url(&self) -> String {
        join_url(
            &self.cfg.base_path,
            &format!(
                "v2.1/accounts/{}/{}",
                self.cfg.account_id, ENVELOPES_ENDPOINT
            ),
        )
    }

    /// Create and send an envelope for `document`.
    pub async fn create_envelope(
        &self,
        document: &DocumentFile,
        signers: &[Signer],
    ) -> Result<EnvelopeSummary, ServiceError> {
        let definition = EnvelopeDefinition::new(document, signers);
        let resp = self
            .http
            .post(self.envelopes_url())
            .bearer_auth(&self.cfg.access_token)
            .json(&CreateEnvelopeRequest {
                envelope_definition: &definition,
            })
            .send()
            .await
            .map_err(|e| ServiceError::transport(ENVELOPES_ENDPOINT, e))?;

        let raw: serde_json::Value = read_json(ENVELOPES_ENDPOINT, resp).await?;
        Ok(EnvelopeSummary::from_value(raw))
    }
}

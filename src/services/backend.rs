use super::{build_http, join_url, read_json};
use crate::error::ServiceError;
use crate::model::{AnalyzeResponse, DocumentFile};
use anyhow::Result;
use serde::{Deserialize, Serialize};

const ANALYZE_ENDPOINT: &str = "/analyze";
const ASK_ENDPOINT: &str = "/ask";

/// Client for the analysis and question-answering backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    pub(crate) http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    question: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct AskResponse {
    answer: String,
}

impl BackendClient {
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self> {
        Ok(Self {
            http: build_http(user_agent)?,
            base_url: base_url.to_string(),
        })
    }

    fn analyze_url(&self) -> String {
        join_url(&self.base_url, ANALYZE_ENDPOINT)
    }

    fn ask_url(&self) -> String {
        join_url(&self.base_url, ASK_ENDPOINT)
    }

    /// Upload a document as multipart field `file` and return the extraction.
    pub async fn analyze(&self, file: &DocumentFile) -> Result<AnalyzeResponse, ServiceError> {
        // Bytes clones are reference counted; the document is not copied. A known length
        // keeps the request out of chunked encoding.
        let len = file.contents.len() as u64;
        let part = reqwest::multipart::Part::stream_with_length(
            reqwest::Body::from(file.contents.clone()),
            len,
        )
        .file_name(file.name.clone());
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .http
            .post(self.analyze_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ServiceError::transport(ANALYZE_ENDPOINT, e))?;

        read_json(ANALYZE_ENDPOINT, resp).await
    }

    /// Ask a free-text question against the full document text.
    pub async fn ask(&self, question: &str, text: &str) -> Result<String, ServiceError> {
        let resp = self
            .http
            .post(self.ask_url())
            .json(&AskRequest { question, text })
            .send()
            .await
            .map_err(|e| ServiceError::transport(ASK_ENDPOINT, e))?;

        let body: AskResponse = read_json(ASK_ENDPOINT, resp).await?;
        Ok(body.answer)
    }
}

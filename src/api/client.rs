use std::time::Duration;

use async_trait::async_trait;
use serde::de::{DeserializeOwned, IgnoredAny};

use crate::actions::run_actions::route_segment;
use crate::api::auth;
use crate::config::types::ServerConfig;

use super::backend::RunsBackend;
use super::error::ApiError;
use super::types::{CreateRunCall, Envelope, ListRunsQuery, RunPageData, RunsPage};

/// Longest response body kept in an [`ApiError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// The runs API over HTTP.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &ServerConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            token: auth::resolve_token(config.token.as_deref()),
        })
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token {
            Some(ref token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Read an envelope even from non-2xx responses, since the backend
    /// reports application errors with an error status and a JSON body.
    async fn read_envelope<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<Envelope<T>, ApiError> {
        let status = resp.status();
        let text = resp.text().await?;
        match serde_json::from_str::<Envelope<T>>(&text) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(ApiError::Status {
                status: status.as_u16(),
                body: truncate(&text, MAX_ERROR_BODY),
            }),
            Err(e) => Err(ApiError::Decode(e)),
        }
    }
}

#[async_trait]
impl RunsBackend for HttpBackend {
    async fn list_runs(&self, query: &ListRunsQuery) -> Result<RunsPage, ApiError> {
        let url = format!("{}/api/v1/runs", self.base_url);
        tracing::debug!("api: GET {url} {query:?}");
        let resp = self
            .authorize(self.client.get(&url).query(query))
            .send()
            .await?;
        let data: RunPageData = Self::read_envelope(resp)
            .await?
            .check()?
            .ok_or(ApiError::MissingData)?;
        Ok(RunsPage::from_wire(data, query))
    }

    async fn create_run(&self, call: &CreateRunCall) -> Result<(), ApiError> {
        let url = format!(
            "{}/api/v1/stacks/{}/{}/async",
            self.base_url,
            call.stack_id,
            route_segment(call.kind)
        );
        tracing::debug!("api: POST {url} {:?}", call.query);
        let resp = self
            .authorize(self.client.post(&url).query(&call.query).json(&call.body))
            .send()
            .await?;
        Self::read_envelope::<IgnoredAny>(resp).await?.check()?;
        Ok(())
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_owned();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}

//! REST implementation of [`DialogueBackend`] and [`TranscriptArchiver`].
//!
//! `RestDialogueClient` wraps a `reqwest::Client` and translates every trait
//! method into exactly one HTTP call.  There is no retry: a failed call
//! fails the turn (or, for archival, is reported and dropped).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};

use dm_domain::config::BackendConfig;
use dm_domain::dialogue::{DialogueAction, TraceEvent};
use dm_domain::error::{Error, Result};
use dm_domain::events::BridgeEvent;

use crate::provider::{DialogueBackend, TranscriptArchiver};
use crate::types::{InteractRequest, TranscriptRecord};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A REST client for the dialogue runtime and the transcripts API.
///
/// Created once and reused for the lifetime of the process.  The
/// underlying `reqwest::Client` maintains a connection pool.
#[derive(Debug, Clone)]
pub struct RestDialogueClient {
    http: Client,
    runtime_base: Url,
    transcripts_base: Url,
    api_key: Option<String>,
    version_id: Option<String>,
    project_id: Option<String>,
    timeout: Duration,
}

impl RestDialogueClient {
    /// The configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build a new client from the shared `BackendConfig`.
    pub fn new(cfg: &BackendConfig) -> Result<Self> {
        let timeout = Duration::from_millis(cfg.timeout_ms);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            runtime_base: parse_base(&cfg.runtime_base_url())?,
            transcripts_base: parse_base(&cfg.transcripts_base_url())?,
            api_key: cfg.api_key.clone(),
            version_id: cfg.version_id.clone(),
            project_id: cfg.project_id.clone(),
            timeout,
        })
    }

    // ── request helpers ──────────────────────────────────────────────

    /// `{runtime}/state/user/{userId}[/suffix]` with the user id encoded as
    /// a single path segment.
    fn user_state_url(&self, user_id: &str, suffix: Option<&str>) -> Result<Url> {
        let mut url = self.runtime_base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::Config(format!("{} cannot be a base URL", self.runtime_base)))?;
            segments.pop_if_empty().extend(["state", "user", user_id]);
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        Ok(url)
    }

    fn transcripts_url(&self) -> Result<Url> {
        let mut url = self.transcripts_base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                Error::Config(format!("{} cannot be a base URL", self.transcripts_base))
            })?
            .pop_if_empty()
            .extend(["v2", "transcripts"]);
        Ok(url)
    }

    /// Attach the deployment credentials.
    fn authorize(&self, rb: RequestBuilder) -> RequestBuilder {
        match self.api_key {
            Some(ref key) => rb.header("Authorization", key),
            None => rb,
        }
    }

    fn with_version(&self, rb: RequestBuilder) -> RequestBuilder {
        match self.version_id {
            Some(ref version) => rb.header("versionID", version),
            None => rb,
        }
    }

    /// Send once, emit a `BackendCall` event, and map non-2xx to errors.
    ///
    /// * 401/403 become `Error::Auth`.
    /// * Any other non-success status becomes `Error::Backend`.
    async fn execute(&self, endpoint: &str, rb: RequestBuilder) -> Result<Response> {
        let start = Instant::now();
        let result = rb.send().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                BridgeEvent::BackendCall {
                    endpoint: endpoint.to_owned(),
                    status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                    duration_ms,
                }
                .emit();
                return Err(from_reqwest(e));
            }
        };

        let status = resp.status();
        BridgeEvent::BackendCall {
            endpoint: endpoint.to_owned(),
            status: status.as_u16(),
            duration_ms,
        }
        .emit();

        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Auth(format!(
                "{endpoint} auth failed ({}): {body}",
                status.as_u16()
            )));
        }
        Err(Error::Backend(format!(
            "{endpoint} returned {}: {body}",
            status.as_u16()
        )))
    }
}

fn parse_base(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::Config(format!("invalid backend URL {raw:?}: {e}")))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl DialogueBackend for RestDialogueClient {
    async fn reset_user_state(&self, user_id: &str) -> Result<()> {
        let url = self.user_state_url(user_id, None)?;
        let rb = self.with_version(self.authorize(self.http.delete(url)));
        self.execute("DELETE /state/user/{userId}", rb).await?;
        Ok(())
    }

    async fn advance_dialogue(
        &self,
        user_id: &str,
        action: &DialogueAction,
    ) -> Result<Vec<TraceEvent>> {
        let url = self.user_state_url(user_id, Some("interact"))?;
        let rb = self
            .with_version(self.authorize(self.http.post(url)))
            .header("sessionID", user_id)
            .json(&InteractRequest::new(action));
        let resp = self
            .execute("POST /state/user/{userId}/interact", rb)
            .await?;

        let body = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&body).map_err(|e| {
            Error::Backend(format!("failed to parse interact response: {e}: {body}"))
        })
    }
}

#[async_trait]
impl TranscriptArchiver for RestDialogueClient {
    async fn save_transcript(&self, user_id: &str) -> Result<()> {
        let url = self.transcripts_url()?;
        let record = TranscriptRecord::phone_call(
            user_id,
            self.version_id.clone(),
            self.project_id.clone(),
        );
        let rb = self.authorize(self.http.put(url)).json(&record);
        self.execute("PUT /v2/transcripts", rb).await?;
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Timeout errors become `Error::Timeout`; everything else becomes
/// `Error::Http`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

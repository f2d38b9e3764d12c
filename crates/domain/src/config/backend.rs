use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dialogue backend connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Per-deployment subdomain (e.g. `"acme"`). Prefixes both hosts.
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default = "d_runtime_host")]
    pub runtime_host: String,
    #[serde(default = "d_transcripts_host")]
    pub transcripts_host: String,
    /// Full base URL override for the runtime API (scheme included).
    #[serde(default)]
    pub runtime_url: Option<String>,
    /// Full base URL override for the transcripts API (scheme included).
    #[serde(default)]
    pub transcripts_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "d_10000")]
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            domain: None,
            runtime_host: d_runtime_host(),
            transcripts_host: d_transcripts_host(),
            runtime_url: None,
            transcripts_url: None,
            api_key: None,
            version_id: None,
            project_id: None,
            timeout_ms: 10_000,
        }
    }
}

impl BackendConfig {
    /// Base URL of the dialogue runtime (reset + interact).
    pub fn runtime_base_url(&self) -> String {
        if let Some(url) = &self.runtime_url {
            return url.trim_end_matches('/').to_owned();
        }
        match self.domain() {
            Some(domain) => format!("https://{domain}.{}", self.runtime_host),
            None => format!("https://{}", self.runtime_host),
        }
    }

    /// Base URL of the transcripts API.
    pub fn transcripts_base_url(&self) -> String {
        if let Some(url) = &self.transcripts_url {
            return url.trim_end_matches('/').to_owned();
        }
        match self.domain() {
            Some(domain) => {
                // `api.example.com` becomes `api.<domain>.example.com`.
                match self.transcripts_host.split_once('.') {
                    Some((head, rest)) => format!("https://{head}.{domain}.{rest}"),
                    None => format!("https://{domain}.{}", self.transcripts_host),
                }
            }
            None => format!("https://{}", self.transcripts_host),
        }
    }

    fn domain(&self) -> Option<&str> {
        self.domain.as_deref().filter(|d| !d.is_empty())
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_runtime_host() -> String {
    "general-runtime.voiceflow.com".into()
}
fn d_transcripts_host() -> String {
    "api.voiceflow.com".into()
}
fn d_10000() -> u64 {
    10_000
}

//! Request bodies sent to the dialogue runtime and transcripts API.
//!
//! Field names use `camelCase` on the wire via `#[serde(rename_all)]`.

use dm_domain::dialogue::DialogueAction;
use serde::Serialize;

/// Avatar attached to every archived transcript.
pub const TRANSCRIPT_USER_IMAGE: &str = "https://s3.amazonaws.com/com.voiceflow.studio/share/3818df985d5f502f5dc4a6816903ce174528467f/3818df985d5f502f5dc4a6816903ce174528467f.png";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Interact
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-request runtime settings.  The bridge never wants synthesized audio
/// or SSML back, and DTMF stop events are filtered out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnConfig {
    pub tts: bool,
    #[serde(rename = "stripSSML")]
    pub strip_ssml: bool,
    pub stop_types: Vec<String>,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            tts: false,
            strip_ssml: true,
            stop_types: vec!["DTMF".into()],
        }
    }
}

/// POST /state/user/{userId}/interact request body.
#[derive(Debug, Clone, Serialize)]
pub struct InteractRequest<'a> {
    pub config: TurnConfig,
    pub action: &'a DialogueAction,
}

impl<'a> InteractRequest<'a> {
    pub fn new(action: &'a DialogueAction) -> Self {
        Self {
            config: TurnConfig::default(),
            action,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transcripts
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// PUT /v2/transcripts request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptRecord {
    pub browser: &'static str,
    pub device: &'static str,
    pub os: &'static str,
    #[serde(rename = "sessionID")]
    pub session_id: String,
    pub unread: bool,
    #[serde(rename = "versionID")]
    pub version_id: Option<String>,
    #[serde(rename = "projectID")]
    pub project_id: Option<String>,
    pub user: TranscriptUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptUser {
    pub name: String,
    pub image: &'static str,
}

impl TranscriptRecord {
    /// A phone-call transcript keyed by the backend user id.
    pub fn phone_call(
        user_id: &str,
        version_id: Option<String>,
        project_id: Option<String>,
    ) -> Self {
        Self {
            browser: "VAPI",
            device: "Phone",
            os: "VAPI",
            session_id: user_id.to_owned(),
            unread: true,
            version_id,
            project_id,
            user: TranscriptUser {
                name: user_id.to_owned(),
                image: TRANSCRIPT_USER_IMAGE,
            },
        }
    }
}

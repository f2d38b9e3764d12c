use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Call control
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallConfig {
    /// Destination passed in the `transferCall` function-call arguments.
    #[serde(default)]
    pub forwarding_number: Option<String>,
    /// Model tag stamped on every streamed chunk.
    #[serde(default = "d_model")]
    pub model: String,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            forwarding_number: None,
            model: d_model(),
        }
    }
}

fn d_model() -> String {
    "dmapi".into()
}

use serde::{Deserialize, Serialize};

/// Configuration for the helpdesk module (`modules.helpdesk` in the app config)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HelpdeskConfig {
    /// Secret for attachment encryption. Base64 is used as raw key bytes,
    /// anything else is hashed. Without it, tickets with attachments are rejected.
    #[serde(default)]
    pub attachment_key: Option<String>,
    #[serde(default = "default_seed_roster")]
    pub seed_roster: bool,
    #[serde(default = "default_roster")]
    pub roster: Vec<String>,
    #[serde(default)]
    pub seed_sample_tickets: bool,
    #[serde(default = "default_attachment_file_name")]
    pub default_attachment_file_name: String,
    #[serde(default = "default_attachment_content_type")]
    pub default_attachment_content_type: String,
}

impl Default for HelpdeskConfig {
    fn default() -> Self {
        Self {
            attachment_key: None,
            seed_roster: default_seed_roster(),
            roster: default_roster(),
            seed_sample_tickets: false,
            default_attachment_file_name: default_attachment_file_name(),
            default_attachment_content_type: default_attachment_content_type(),
        }
    }
}

fn default_seed_roster() -> bool {
    true
}

fn default_roster() -> Vec<String> {
    ["Alice", "Bob", "Carol", "Dave", "Eve"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_attachment_file_name() -> String {
    "attachment".to_string()
}

fn default_attachment_content_type() -> String {
    "application/octet-stream".to_string()
}

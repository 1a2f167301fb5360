use std::time::Duration;

use anyhow::{Context, bail};

use kindred_api::ClientConfig;
use kindred_inbox::InboxConfig;
use kindred_types::models::Viewer;

const DEFAULT_API_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub token: Option<String>,
    pub viewer: Viewer,
    pub http_timeout: Duration,
    pub conversation_poll: Duration,
    pub message_poll: Duration,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_url = get("KINDRED_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into());
        let token = get("KINDRED_TOKEN");

        let profile_id = get("KINDRED_PROFILE_ID")
            .context("KINDRED_PROFILE_ID is required")?
            .parse()
            .context("KINDRED_PROFILE_ID must be an integer")?;
        let user_id = get("KINDRED_USER_ID")
            .context("KINDRED_USER_ID is required")?
            .parse()
            .context("KINDRED_USER_ID must be an integer")?;

        let secs = |key: &str, default: u64| -> anyhow::Result<Duration> {
            let secs: u64 = match get(key) {
                Some(raw) => raw.parse().with_context(|| format!("{key} must be a whole number of seconds"))?,
                None => default,
            };
            if secs == 0 {
                bail!("{key} must be at least 1 second");
            }
            Ok(Duration::from_secs(secs))
        };

        Ok(Self {
            api_url,
            token,
            viewer: Viewer { profile_id, user_id },
            http_timeout: secs("KINDRED_HTTP_TIMEOUT_SECS", 10)?,
            conversation_poll: secs("KINDRED_CONVERSATION_POLL_SECS", 5)?,
            message_poll: secs("KINDRED_MESSAGE_POLL_SECS", 3)?,
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new(&self.api_url).with_timeout(self.http_timeout);
        match &self.token {
            Some(token) => config.with_token(token),
            None => config,
        }
    }

    pub fn inbox_config(&self) -> InboxConfig {
        InboxConfig {
            conversation_poll: self.conversation_poll,
            message_poll: self.message_poll,
        }
    }
}

//! Static credentials from the application config

use std::collections::HashMap;
use crate::application::errors::BotError;
use crate::domain::traits::AuthProvider;
use crate::infrastructure::config::AuthConfig;

/// Bearer token and client id read once from config; refresh is a no-op
pub struct StaticAuth {
    client_id: Option<String>,
    token: String,
}

impl StaticAuth {
    pub fn new(client_id: Option<String>, token: impl Into<String>) -> Self {
        Self {
            client_id,
            token: token.into(),
        }
    }

    /// `None` when no token is configured
    pub fn from_config(config: &AuthConfig) -> Option<Self> {
        let token = config.token.as_deref().filter(|t| !t.is_empty())?;
        Some(Self::new(config.client_id.clone(), token))
    }
}

impl AuthProvider for StaticAuth {
    fn auth_headers(&self) -> Result<HashMap<String, String>, BotError> {
        let mut headers = HashMap::new();
        let token = self.token.strip_prefix("oauth:").unwrap_or(&self.token);
        headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        if let Some(client_id) = &self.client_id {
            headers.insert("Client-Id".to_string(), client_id.clone());
        }
        Ok(headers)
    }

    fn refresh(&self) -> Result<(), BotError> {
        tracing::debug!("static credentials cannot be refreshed");
        Ok(())
    }
}

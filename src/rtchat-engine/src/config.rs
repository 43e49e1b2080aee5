//! Configuration for a chat session.
//!
//! Settings come from the process environment, optionally seeded from a
//! `.env` file:
//! - `OPENAI_API_KEY` (required)
//! - `OPENAI_WEBSOCKET_URL` (default [`DEFAULT_WEBSOCKET_URL`])
//! - `MODEL` (default [`DEFAULT_MODEL`])
//! - `RTCHAT_INPUT_BUFFER`, `RTCHAT_FRAGMENT_BUFFER` (channel capacities)

use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};
use url::Url;

use crate::error::{ChatError, ChatResult};

pub const DEFAULT_WEBSOCKET_URL: &str = "wss://api.openai.com/v1/realtime";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini-realtime-preview";
/// Capacity of the user-message channel.
pub const DEFAULT_INPUT_BUFFER: usize = 5;
/// Capacity of the response-fragment channel.
pub const DEFAULT_FRAGMENT_BUFFER: usize = 50;

const ENV_API_KEY: &str = "OPENAI_API_KEY";
const ENV_WEBSOCKET_URL: &str = "OPENAI_WEBSOCKET_URL";
const ENV_MODEL: &str = "MODEL";
const ENV_INPUT_BUFFER: &str = "RTCHAT_INPUT_BUFFER";
const ENV_FRAGMENT_BUFFER: &str = "RTCHAT_FRAGMENT_BUFFER";

/// Configuration for connecting to a realtime endpoint.
#[derive(Clone)]
pub struct ChatConfig {
    /// Bearer token for the endpoint.
    api_key: SecretString,
    /// Base WebSocket URL, without the model parameter.
    websocket_url: String,
    /// Model identifier sent as the `model` query parameter.
    model: String,
    input_buffer: usize,
    fragment_buffer: usize,
}

impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConfig")
            .field("api_key", &"[REDACTED]")
            .field("websocket_url", &self.websocket_url)
            .field("model", &self.model)
            .field("input_buffer", &self.input_buffer)
            .field("fragment_buffer", &self.fragment_buffer)
            .finish()
    }
}

impl ChatConfig {
    /// Create a configuration with defaults for everything but the key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into().into()),
            websocket_url: DEFAULT_WEBSOCKET_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            input_buffer: DEFAULT_INPUT_BUFFER,
            fragment_buffer: DEFAULT_FRAGMENT_BUFFER,
        }
    }

    pub fn with_websocket_url(mut self, url: impl Into<String>) -> Self {
        self.websocket_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_buffers(mut self, input_buffer: usize, fragment_buffer: usize) -> Self {
        self.input_buffer = input_buffer;
        self.fragment_buffer = fragment_buffer;
        self
    }

    /// Seed the process environment from a dotenv file.
    ///
    /// With `None`, a `.env` in the current directory or its parents is used
    /// if one exists. An explicitly named file must be readable.
    pub fn load_env_file(path: Option<&Path>) -> ChatResult<Option<PathBuf>> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| {
                    ChatError::Config(format!("Failed to load {}: {}", path.display(), e))
                })?;
                debug!(path = %path.display(), "Loaded env file");
                Ok(Some(path.to_path_buf()))
            }
            None => match dotenvy::dotenv() {
                Ok(found) => {
                    debug!(path = %found.display(), "Loaded .env");
                    Ok(Some(found))
                }
                Err(e) if e.not_found() => {
                    debug!("No .env file found, using process environment");
                    Ok(None)
                }
                Err(e) => Err(ChatError::Config(format!("Failed to load .env: {}", e))),
            },
        }
    }

    /// Read the configuration from environment variables.
    pub fn from_env() -> ChatResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> ChatResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = get(ENV_API_KEY)
            .ok_or_else(|| ChatError::Config(format!("{} is not set", ENV_API_KEY)))?;

        let mut config = Self::new(api_key.trim());

        if let Some(url) = get(ENV_WEBSOCKET_URL) {
            config.websocket_url = url.trim().to_string();
        }
        if let Some(model) = get(ENV_MODEL) {
            config.model = model.trim().to_string();
        }

        if let Some(value) = get(ENV_INPUT_BUFFER) {
            config.input_buffer = parse_capacity(ENV_INPUT_BUFFER, &value)?;
        }
        if let Some(value) = get(ENV_FRAGMENT_BUFFER) {
            config.fragment_buffer = parse_capacity(ENV_FRAGMENT_BUFFER, &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> ChatResult<()> {
        if self.api_key.expose_secret().is_empty() {
            return Err(ChatError::Config("API key is empty".to_string()));
        }
        if self.model.is_empty() {
            return Err(ChatError::Config("Model is empty".to_string()));
        }
        if self.input_buffer == 0 || self.fragment_buffer == 0 {
            return Err(ChatError::Config(
                "Channel buffers must hold at least one message".to_string(),
            ));
        }
        self.connect_url()?;
        if self.api_key.expose_secret().starts_with("sk-") {
            debug!("API key has the expected prefix");
        } else {
            warn!("API key doesn't start with 'sk-', this may be incorrect");
        }
        Ok(())
    }

    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    pub fn websocket_url(&self) -> &str {
        &self.websocket_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn input_buffer(&self) -> usize {
        self.input_buffer
    }

    pub fn fragment_buffer(&self) -> usize {
        self.fragment_buffer
    }

    /// The URL to dial: the base URL with `model` set to the configured model.
    pub fn connect_url(&self) -> ChatResult<Url> {
        let mut url = Url::parse(&self.websocket_url)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ChatError::Config(format!(
                "WebSocket URL must use ws:// or wss://, got {}://",
                url.scheme()
            )));
        }

        let retained: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "model")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(retained)
            .append_pair("model", &self.model);

        Ok(url)
    }
}

fn parse_capacity(key: &str, value: &str) -> ChatResult<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| ChatError::Config(format!("{} must be a positive integer, got {:?}", key, value)))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ChatConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.api_key(), "sk-test");
        assert_eq!(config.websocket_url(), DEFAULT_WEBSOCKET_URL);
        assert_eq!(config.model(), DEFAULT_MODEL);
        assert_eq!(config.input_buffer(), DEFAULT_INPUT_BUFFER);
        assert_eq!(config.fragment_buffer(), DEFAULT_FRAGMENT_BUFFER);
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let err = ChatConfig::from_lookup(lookup(&[("MODEL", "m")])).unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: OPENAI_API_KEY is not set");

        let err = ChatConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "   ")])).unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
    }

    #[test]
    fn test_overrides() {
        let config = ChatConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_WEBSOCKET_URL", "ws://127.0.0.1:9000/realtime"),
            ("MODEL", "gpt-4o-realtime-preview"),
            ("RTCHAT_INPUT_BUFFER", "2"),
            ("RTCHAT_FRAGMENT_BUFFER", "8"),
        ]))
        .unwrap();

        assert_eq!(config.websocket_url(), "ws://127.0.0.1:9000/realtime");
        assert_eq!(config.model(), "gpt-4o-realtime-preview");
        assert_eq!(config.input_buffer(), 2);
        assert_eq!(config.fragment_buffer(), 8);
    }

    #[test]
    fn test_invalid_buffers() {
        for value in ["0", "-1", "many"] {
            let result = ChatConfig::from_lookup(lookup(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("RTCHAT_FRAGMENT_BUFFER", value),
            ]));
            assert!(result.is_err(), "accepted {value:?}");
        }
    }

    #[test]
    fn test_rejects_non_websocket_url() {
        let err = ChatConfig::new("sk-test")
            .with_websocket_url("https://api.openai.com/v1/realtime")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("ws:// or wss://"));

        let err = ChatConfig::new("sk-test")
            .with_websocket_url("not a url")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
    }

    #[test]
    fn test_connect_url_sets_model() {
        let url = ChatConfig::new("sk-test")
            .with_model("gpt-4o-mini-realtime-preview")
            .connect_url()
            .unwrap();
        assert_eq!(
            url.as_str(),
            "wss://api.openai.com/v1/realtime?model=gpt-4o-mini-realtime-preview"
        );
    }

    #[test]
    fn test_connect_url_replaces_existing_model() {
        let url = ChatConfig::new("sk-test")
            .with_websocket_url("ws://localhost:8080/rt?model=old&trace=1")
            .with_model("new")
            .connect_url()
            .unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8080/rt?trace=1&model=new");
    }

    #[test]
    fn test_debug_output_redacts_key() {
        let config = ChatConfig::new("sk-very-secret");
        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-very-secret"));
    }

    #[test]
    fn test_missing_explicit_env_file_is_an_error() {
        let err = ChatConfig::load_env_file(Some(Path::new("/definitely/not/here/.env")))
            .unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
    }
}

use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use portal::facade::GenerationDefaults;
use portal::providers::configs::{
    OllamaProviderConfig, OpenAiProviderConfig, ProviderConfig, DEFAULT_TIMEOUT,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

// Fields that live under `provider` when serde reports them without their parent key
const PROVIDER_FIELDS: &[&str] = &["type", "host", "api_key", "timeout_secs"];

#[derive(Debug, Default, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|_| ConfigError::InvalidAddress(addr))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    OpenAi {
        #[serde(default = "default_openai_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    Ollama {
        #[serde(default = "default_ollama_host")]
        host: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl ProviderSettings {
    pub fn into_config(self) -> ProviderConfig {
        match self {
            ProviderSettings::OpenAi {
                host,
                api_key,
                timeout_secs,
            } => ProviderConfig::OpenAi(OpenAiProviderConfig {
                host,
                api_key,
                timeout: Duration::from_secs(timeout_secs),
            }),
            ProviderSettings::Ollama { host, timeout_secs } => {
                ProviderConfig::Ollama(OllamaProviderConfig {
                    host,
                    timeout: Duration::from_secs(timeout_secs),
                })
            }
        }
    }
}

/// Generation parameters applied when a request leaves them out
#[derive(Debug, Deserialize)]
pub struct GenerationSettings {
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_chat_max_tokens")]
    pub chat_max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub chat_temperature: f32,
    #[serde(default = "default_completion_max_tokens")]
    pub completion_max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub completion_temperature: f32,
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,
    #[serde(default)]
    pub allowed_models: Vec<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            chat_max_tokens: default_chat_max_tokens(),
            chat_temperature: default_temperature(),
            completion_max_tokens: default_completion_max_tokens(),
            completion_temperature: default_temperature(),
            max_duration_secs: default_max_duration_secs(),
            allowed_models: Vec::new(),
        }
    }
}

impl GenerationSettings {
    pub fn into_defaults(self) -> GenerationDefaults {
        GenerationDefaults {
            default_model: self.default_model,
            chat_max_tokens: self.chat_max_tokens,
            chat_temperature: self.chat_temperature,
            completion_max_tokens: self.completion_max_tokens,
            completion_temperature: self.completion_temperature,
            max_duration: Duration::from_secs(self.max_duration_secs),
            allowed_models: self
                .allowed_models
                .into_iter()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    #[serde(default)]
    pub generation: GenerationSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("provider.type", "openai")?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("PORTAL")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("generation.allowed_models")
                    .try_parsing(true),
            )
            .build()?;

        match config.try_deserialize::<Self>() {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                if let Some(field) = missing_field_path(&err.to_string()) {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

// "missing field `api_key` for key `provider`" -> provider.api_key
fn missing_field_path(message: &str) -> Option<String> {
    let rest = message.strip_prefix("missing field `")?;
    let (field, tail) = rest.split_once('`')?;

    let parent = tail
        .strip_prefix(" for key `")
        .and_then(|key| key.strip_suffix('`'));
    Some(match parent {
        Some(parent) => format!("{}.{}", parent, field),
        None if PROVIDER_FIELDS.contains(&field) => format!("provider.{}", field),
        None => field.to_string(),
    })
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_openai_host() -> String {
    "https://api.openai.com".to_string()
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_model() -> String {
    "gpt-5-mini".to_string()
}

fn default_chat_max_tokens() -> u32 {
    2000
}

fn default_completion_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_duration_secs() -> u64 {
    30
}

use crate::ai::openai::DEFAULT_ENDPOINT;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Options passed to every model call: which backend model, and how random
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub model: String,
    /// Sampling temperature, always within [0, 2]
    pub temperature: f32,
}

impl GenerationConfig {
    pub fn new(model: impl Into<String>, temperature: f32) -> Result<Self, String> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err("Model name must not be empty".to_string());
        }
        if !(0.0..=2.0).contains(&temperature) {
            return Err(format!(
                "Temperature must be between 0 and 2, got {}",
                temperature
            ));
        }
        Ok(Self { model, temperature })
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub openai_api_key: String,
    pub openai_endpoint: String,
    pub artifacts_dir: PathBuf,
    pub generation: GenerationConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let openai_api_key =
            lookup("OPENAI_API_KEY").ok_or_else(|| "OPENAI_API_KEY must be set".to_string())?;

        let port = lookup("PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse()
            .map_err(|_| "PORT must be a valid number".to_string())?;

        let temperature = match lookup("TEMPERATURE") {
            Some(raw) => raw
                .parse::<f32>()
                .map_err(|_| format!("TEMPERATURE must be a number, got '{}'", raw))?,
            None => DEFAULT_TEMPERATURE,
        };
        let model = lookup("MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            port,
            openai_api_key,
            openai_endpoint: lookup("OPENAI_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            artifacts_dir: PathBuf::from(
                lookup("ARTIFACTS_DIR").unwrap_or_else(|| "./artifacts".to_string()),
            ),
            generation: GenerationConfig::new(model, temperature)?,
        })
    }
}

//! Run configuration threaded through the report pipeline.
//!
//! A [`Config`] is built once (usually from the process environment) and handed to
//! [`crate::pipeline::ReportPipeline`].  Nothing in the crate reads ambient globals for the
//! language-model credential or the model choice.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Environment variable holding the language-model API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable overriding the chat-completion base URL.
pub const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";
/// Environment variable selecting the model.
pub const MODEL_ENV: &str = "LCA_MODEL";
/// Environment variable naming the root directory for run outputs.
pub const OUTPUT_DIR_ENV: &str = "LCA_OUTPUT_DIR";
/// Environment variable overriding the search endpoint used for web enrichment.
pub const SEARCH_URL_ENV: &str = "LCA_SEARCH_URL";
/// Environment variable overriding the per-request HTTP timeout in seconds.
pub const HTTP_TIMEOUT_ENV: &str = "LCA_HTTP_TIMEOUT_SECS";
/// Environment variable selecting the document format.
pub const FORMAT_ENV: &str = "LCA_REPORT_FORMAT";

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_SEARCH_URL: &str = "https://www.google.com/search";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors raised while reading configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown model `{0}` (expected `gpt-3.5-turbo` or `gpt-4-turbo`)")]
    UnknownModel(String),
    #[error("unknown report format `{0}` (expected `docx` or `pdf`)")]
    UnknownFormat(String),
    #[error("{variable} must be a positive number of seconds, got `{value}`")]
    InvalidTimeout { variable: &'static str, value: String },
}

/// The two language models offered by the report form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ModelChoice {
    #[default]
    Gpt35Turbo,
    Gpt4Turbo,
}

impl ModelChoice {
    /// Every selectable model, in the order the form lists them.
    pub const ALL: [ModelChoice; 2] = [ModelChoice::Gpt35Turbo, ModelChoice::Gpt4Turbo];

    /// Model identifier sent to the completion endpoint.
    pub fn as_str(self) -> &'static str {
        match self {
            ModelChoice::Gpt35Turbo => "gpt-3.5-turbo",
            ModelChoice::Gpt4Turbo => "gpt-4-turbo",
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelChoice {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|model| model.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| ConfigError::UnknownModel(value.to_owned()))
    }
}

/// Output document format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReportFormat {
    #[default]
    Docx,
    Pdf,
}

impl ReportFormat {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Docx => "docx",
            ReportFormat::Pdf => "pdf",
        }
    }

    /// MIME type used when offering the document for download.
    pub fn mime_type(self) -> &'static str {
        match self {
            ReportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ReportFormat::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ReportFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "docx" => Ok(ReportFormat::Docx),
            "pdf" => Ok(ReportFormat::Pdf),
            other => Err(ConfigError::UnknownFormat(other.to_owned())),
        }
    }
}

/// Settings for a single report run.
///
/// `credential` being `None` puts the narrative generator into fallback-only mode; it is never
/// an error.
#[derive(Clone)]
pub struct Config {
    pub credential: Option<String>,
    pub model: ModelChoice,
    pub openai_base_url: String,
    pub search_url: String,
    pub output_dir: PathBuf,
    pub format: ReportFormat,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credential: None,
            model: ModelChoice::default(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_owned(),
            search_url: DEFAULT_SEARCH_URL.to_owned(),
            output_dir: PathBuf::from("."),
            format: ReportFormat::default(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("openai_base_url", &self.openai_base_url)
            .field("search_url", &self.search_url)
            .field("output_dir", &self.output_dir)
            .field("format", &self.format)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self {
            credential: get(OPENAI_API_KEY_ENV),
            ..Self::default()
        };

        if let Some(base_url) = get(OPENAI_BASE_URL_ENV) {
            config.openai_base_url = base_url;
        }
        if let Some(model) = get(MODEL_ENV) {
            config.model = model.parse()?;
        }
        if let Some(dir) = get(OUTPUT_DIR_ENV) {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(url) = get(SEARCH_URL_ENV) {
            config.search_url = url;
        }
        if let Some(format) = get(FORMAT_ENV) {
            config.format = format.parse()?;
        }
        if let Some(timeout) = get(HTTP_TIMEOUT_ENV) {
            config.http_timeout = match timeout.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidTimeout {
                        variable: HTTP_TIMEOUT_ENV,
                        value: timeout,
                    })
                }
            };
        }

        Ok(config)
    }

    /// Returns whether a language-model credential is configured.
    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Sets the credential and returns the updated configuration.
    pub fn with_credential(mut self, credential: impl Into<Option<String>>) -> Self {
        self.credential = credential.into();
        self
    }

    /// Sets the model and returns the updated configuration.
    pub fn with_model(mut self, model: ModelChoice) -> Self {
        self.model = model;
        self
    }

    /// Sets the output root and returns the updated configuration.
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Sets the document format and returns the updated configuration.
    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the search endpoint and returns the updated configuration.
    pub fn with_search_url(mut self, search_url: impl Into<String>) -> Self {
        self.search_url = search_url.into();
        self
    }

    /// Sets the HTTP timeout and returns the updated configuration.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert!(!config.has_credential());
        assert_eq!(config.model, ModelChoice::Gpt35Turbo);
        assert_eq!(config.format, ReportFormat::Docx);
        assert_eq!(config.search_url, DEFAULT_SEARCH_URL);
        assert_eq!(config.http_timeout, DEFAULT_HTTP_TIMEOUT);
    }

    #[test]
    fn blank_credential_is_absent() {
        let config = Config::from_lookup(lookup(&[(OPENAI_API_KEY_ENV, "   ")])).unwrap();
        assert_eq!(config.credential, None);
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            (OPENAI_API_KEY_ENV, "sk-test"),
            (MODEL_ENV, "gpt-4-turbo"),
            (FORMAT_ENV, "PDF"),
            (HTTP_TIMEOUT_ENV, "5"),
            (OUTPUT_DIR_ENV, "/tmp/reports"),
        ]))
        .unwrap();
        assert_eq!(config.credential.as_deref(), Some("sk-test"));
        assert_eq!(config.model, ModelChoice::Gpt4Turbo);
        assert_eq!(config.format, ReportFormat::Pdf);
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/reports"));
    }

    #[test]
    fn rejects_unknown_model_and_bad_timeout() {
        assert_eq!(
            Config::from_lookup(lookup(&[(MODEL_ENV, "gpt-2")])).unwrap_err(),
            ConfigError::UnknownModel("gpt-2".into())
        );
        assert!(matches!(
            Config::from_lookup(lookup(&[(HTTP_TIMEOUT_ENV, "0")])),
            Err(ConfigError::InvalidTimeout { .. })
        ));
    }

    #[test]
    fn debug_output_redacts_credential() {
        let config = Config::default().with_credential(Some("sk-secret".to_string()));
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}

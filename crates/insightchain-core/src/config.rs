use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::capability::GenerationSettings;
use crate::error::ConfigurationError;
use crate::llm::LlmProvider;
use crate::search::DEFAULT_MAX_RESULTS;
use crate::security::{SecretValue, require_var};

const DEFAULT_CONFIG_PATH: &str = "insightchain.toml";
const CONFIG_PATH_ENV: &str = "INSIGHTCHAIN_CONFIG";

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Provider in effect: explicit setting first, then whichever key is present.
    pub fn resolved_provider(&self) -> Option<LlmProvider> {
        self.llm.provider.or_else(|| {
            if self.llm.groq_api_key.is_some() {
                Some(LlmProvider::Groq)
            } else if self.llm.openai_api_key.is_some() {
                Some(LlmProvider::OpenAi)
            } else {
                None
            }
        })
    }

    /// Resolve the credential for the provider in effect.
    pub fn llm_api_key(&self) -> Result<SecretValue, ConfigurationError> {
        let key = match self.resolved_provider() {
            Some(LlmProvider::Groq) => self.llm.groq_api_key.clone(),
            Some(LlmProvider::OpenAi) => self.llm.openai_api_key.clone(),
            None => None,
        };
        key.ok_or(ConfigurationError::MissingCredential)
    }

    pub fn has_credential(&self) -> bool {
        self.llm_api_key().is_ok()
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        let provider = self.resolved_provider().unwrap_or(LlmProvider::Groq);
        let model = self
            .llm
            .model
            .clone()
            .unwrap_or_else(|| provider.default_model().to_string());
        GenerationSettings::new(model)
            .with_temperature(self.llm.temperature)
            .with_max_tokens(self.llm.max_tokens)
    }

    pub fn llm_base_url(&self) -> String {
        self.llm.base_url.clone().unwrap_or_else(|| {
            self.resolved_provider()
                .unwrap_or(LlmProvider::Groq)
                .default_base_url()
                .to_string()
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.request_timeout_secs)
    }

    pub fn pipeline_deadline(&self) -> Option<Duration> {
        self.pipeline.deadline_secs.map(Duration::from_secs)
    }
}

/// Helper to load configuration from a TOML file plus environment overrides.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a provided path or discoverable defaults.
    ///
    /// Resolution order:
    /// 1. Explicit `path` argument.
    /// 2. `INSIGHTCHAIN_CONFIG` environment variable.
    /// 3. `insightchain.toml` in the current working directory (optional).
    pub fn load(path: Option<PathBuf>) -> Result<Config, ConfigurationError> {
        Self::load_with(path, |name| env::var(name).ok())
    }

    /// Same as [`ConfigLoader::load`] with an injectable variable lookup.
    pub fn load_with<F>(path: Option<PathBuf>, lookup: F) -> Result<Config, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (candidate, required) = resolve_path(path, &lookup);
        let mut config = match fs::read_to_string(&candidate) {
            Ok(raw) => Self::parse(&candidate, &raw)?,
            Err(err) if !required && err.kind() == std::io::ErrorKind::NotFound => {
                Config::default()
            }
            Err(err) => return Err(ConfigurationError::io(candidate, err)),
        };

        Self::apply_env(&mut config, &lookup)?;
        Self::validate(&config)?;
        Ok(config)
    }

    pub fn parse(path: &Path, raw: &str) -> Result<Config, ConfigurationError> {
        toml::from_str(raw).map_err(|source| ConfigurationError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env<F>(config: &mut Config, lookup: &F) -> Result<(), ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let llm = &mut config.llm;

        if let Some(var) = llm.api_key_env.clone() {
            let secret = require_var(&var, lookup)?;
            match llm.provider {
                Some(LlmProvider::OpenAi) => llm.openai_api_key = Some(secret),
                _ => llm.groq_api_key = Some(secret),
            }
        }
        if llm.groq_api_key.is_none() {
            llm.groq_api_key = require_var(LlmProvider::Groq.api_key_env(), lookup).ok();
        }
        if llm.openai_api_key.is_none() {
            llm.openai_api_key = require_var(LlmProvider::OpenAi.api_key_env(), lookup).ok();
        }

        let provider = config.resolved_provider();
        let llm = &mut config.llm;
        let model_var = match provider {
            Some(LlmProvider::OpenAi) => "OPENAI_MODEL",
            _ => "GROQ_MODEL",
        };
        if let Some(model) = non_empty(lookup(model_var)) {
            llm.model = Some(model);
        }
        if let Some(value) = parse_var::<f32, F>("OPENAI_TEMPERATURE", lookup)? {
            llm.temperature = value;
        }
        if let Some(value) = parse_var::<u32, F>("OPENAI_MAX_TOKENS", lookup)? {
            llm.max_tokens = value;
        }
        if let Some(value) = parse_var::<u64, F>("AGENT_TIMEOUT", lookup)? {
            llm.request_timeout_secs = value;
        }
        if let Some(value) = parse_var::<usize, F>("MAX_RESEARCH_HISTORY", lookup)? {
            config.pipeline.max_history = Some(value);
        }
        Ok(())
    }

    fn validate(config: &Config) -> Result<(), ConfigurationError> {
        if !(0.0..=2.0).contains(&config.llm.temperature) {
            return Err(ConfigurationError::Invalid(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if config.llm.max_tokens == 0 {
            return Err(ConfigurationError::Invalid(
                "llm.max_tokens must be greater than zero".into(),
            ));
        }
        if config.llm.request_timeout_secs == 0 {
            return Err(ConfigurationError::Invalid(
                "llm.request_timeout_secs must be greater than zero".into(),
            ));
        }
        if config.search.provider == SearchProvider::Searxng && config.search.endpoint.is_none() {
            return Err(ConfigurationError::Invalid(
                "search.endpoint is required for the searxng provider".into(),
            ));
        }
        Ok(())
    }
}

fn resolve_path<F>(path: Option<PathBuf>, lookup: &F) -> (PathBuf, bool)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = path {
        return (path, true);
    }

    if let Some(from_env) = non_empty(lookup(CONFIG_PATH_ENV)) {
        return (PathBuf::from(from_env), true);
    }

    (Path::new(DEFAULT_CONFIG_PATH).to_path_buf(), false)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_var<T, F>(name: &str, lookup: &F) -> Result<Option<T>, ConfigurationError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup(name))
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigurationError::Invalid(format!("{name} has invalid value `{raw}`")))
        })
        .transpose()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Option<LlmProvider>,
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub base_url: Option<String>,
    /// Name of an environment variable holding the key for `provider`.
    pub api_key_env: Option<String>,
    pub request_timeout_secs: u64,
    #[serde(skip)]
    pub groq_api_key: Option<SecretValue>,
    #[serde(skip)]
    pub openai_api_key: Option<SecretValue>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            temperature: GenerationSettings::DEFAULT_TEMPERATURE,
            max_tokens: GenerationSettings::DEFAULT_MAX_TOKENS,
            base_url: None,
            api_key_env: None,
            request_timeout_secs: 30,
            groq_api_key: None,
            openai_api_key: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProvider {
    #[default]
    Duckduckgo,
    Searxng,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub provider: SearchProvider,
    pub endpoint: Option<String>,
    pub max_results: usize,
    pub timeout_secs: u64,
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: SearchProvider::default(),
            endpoint: None,
            max_results: DEFAULT_MAX_RESULTS,
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub deadline_secs: Option<u64>,
    pub max_history: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn missing_path() -> PathBuf {
        PathBuf::from("definitely/not/here/insightchain.toml")
    }

    #[test]
    fn defaults_without_file_pick_groq_from_env() {
        let lookup = vars(&[("GROQ_API_KEY", "gsk_test")]);
        let (path, required) = resolve_path(None, &lookup);
        assert_eq!(path, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(!required);

        let mut config = Config::default();
        ConfigLoader::apply_env(&mut config, &lookup).unwrap();
        assert_eq!(config.resolved_provider(), Some(LlmProvider::Groq));
        assert_eq!(config.llm_api_key().unwrap().expose(), "gsk_test");
        assert_eq!(config.generation_settings().model, "llama-3.1-8b-instant");
        assert_eq!(config.llm_base_url(), crate::llm::GROQ_API_BASE);
    }

    #[test]
    fn openai_only_credential_selects_openai() {
        let lookup = vars(&[("OPENAI_API_KEY", "sk-test"), ("OPENAI_MODEL", "gpt-4o-mini")]);
        let mut config = Config::default();
        ConfigLoader::apply_env(&mut config, &lookup).unwrap();
        assert_eq!(config.resolved_provider(), Some(LlmProvider::OpenAi));
        assert_eq!(config.generation_settings().model, "gpt-4o-mini");
    }

    #[test]
    fn no_credential_is_a_configuration_error() {
        let mut config = Config::default();
        ConfigLoader::apply_env(&mut config, &vars(&[])).unwrap();
        assert!(matches!(
            config.llm_api_key(),
            Err(ConfigurationError::MissingCredential)
        ));
        assert!(!config.has_credential());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = ConfigLoader::load_with(Some(missing_path()), vars(&[])).unwrap_err();
        assert!(matches!(err, ConfigurationError::Io { .. }));
    }

    #[test]
    fn file_settings_and_env_overrides_merge() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[llm]
provider = "openai"
model = "gpt-4o"
temperature = 0.2
api_key_env = "MY_KEY"

[search]
provider = "searxng"
endpoint = "http://localhost:8888"
max_results = 3

[pipeline]
deadline_secs = 90
"#
        )
        .unwrap();

        let config = ConfigLoader::load_with(
            Some(file.path().to_path_buf()),
            vars(&[("MY_KEY", "sk-file"), ("OPENAI_MAX_TOKENS", "512"), ("MAX_RESEARCH_HISTORY", "4")]),
        )
        .expect("config should load");

        assert_eq!(config.resolved_provider(), Some(LlmProvider::OpenAi));
        assert_eq!(config.llm_api_key().unwrap().expose(), "sk-file");
        let settings = config.generation_settings();
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.temperature, 0.2);
        assert_eq!(settings.max_tokens, 512);
        assert_eq!(config.search.provider, SearchProvider::Searxng);
        assert_eq!(config.search.max_results, 3);
        assert_eq!(config.pipeline_deadline(), Some(Duration::from_secs(90)));
        assert_eq!(config.pipeline.max_history, Some(4));
    }

    #[test]
    fn invalid_numeric_override_is_rejected() {
        let mut config = Config::default();
        let err = ConfigLoader::apply_env(&mut config, &vars(&[("AGENT_TIMEOUT", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::Invalid(ref msg) if msg.contains("AGENT_TIMEOUT")));
    }

    #[test]
    fn searxng_requires_endpoint() {
        let mut config = Config::default();
        config.search.provider = SearchProvider::Searxng;
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn malformed_toml_reports_path() {
        let err = ConfigLoader::parse(Path::new("bad.toml"), "[llm\nmodel = ").unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse { ref path, .. } if path == Path::new("bad.toml")));
    }
}

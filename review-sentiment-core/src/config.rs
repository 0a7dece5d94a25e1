use {
    std::{fs::read_to_string, path::PathBuf, time::Duration},
    tracing::warn,
    serde::Deserialize,
    crate::{
        collector::{parse_threshold, CollectorConfig, Target},
        error::CollectorError,
    },
};

#[derive(Deserialize, Debug)]
pub struct Config {
    pub steps: StepsConfig,
    pub infra: Option<InfraConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Debug)]
pub struct StepsConfig {
    #[serde(default)]
    pub collector: CollectorStepConfig,
    pub batch_classifier: Option<BatchClassifierStepConfig>,
    #[serde(default)]
    pub export: ExportStepConfig,
}

#[derive(Deserialize, Clone, Debug)]
pub struct CollectorStepConfig {
    pub enabled: bool,
    #[serde(default)]
    pub products: Vec<String>,
    target: Option<String>,
    confidence_threshold: Option<ThresholdSetting>,
    language: Option<String>,
    min_review_length: Option<usize>,
    max_consecutive_empty_pages: Option<u32>,
    max_consecutive_failures: Option<u32>,
    backoff_ms: Option<u64>,
    backoff_jitter_ms: Option<u64>,
    reviews_per_page: Option<u32>,
    max_pages_unbounded: Option<u32>,
}

/// Accepts `0.7`, `"70%"`, `"0.7"` or `"default"` in config files.
#[derive(Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum ThresholdSetting {
    Number(f32),
    Text(String),
}

#[derive(Deserialize, Clone, Debug)]
pub struct BatchClassifierStepConfig {
    pub enabled: bool,
    input: Option<String>,
    output: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ExportStepConfig {
    pub enabled: bool,
    output_dir: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct InfraConfig {
    source: Option<SourceConfig>,
    #[serde(default)]
    database: DatabaseConfig,
    #[serde(default)]
    model: ModelConfig,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SourceConfig {
    endpoint: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    connection_string: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ModelConfig {
    path: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            steps: StepsConfig::default(),
            infra: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for StepsConfig {
    fn default() -> Self {
        Self {
            collector: CollectorStepConfig::default(),
            batch_classifier: None,
            export: ExportStepConfig::default(),
        }
    }
}

impl Default for CollectorStepConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            products: Vec::new(),
            target: None,
            confidence_threshold: None,
            language: None,
            min_review_length: None,
            max_consecutive_empty_pages: None,
            max_consecutive_failures: None,
            backoff_ms: None,
            backoff_jitter_ms: None,
            reviews_per_page: None,
            max_pages_unbounded: None,
        }
    }
}

impl Default for BatchClassifierStepConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            input: None,
            output: None,
        }
    }
}

impl Default for ExportStepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_dir: None,
        }
    }
}

impl Default for InfraConfig {
    fn default() -> Self {
        Self {
            source: Some(SourceConfig::default()),
            database: DatabaseConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
        }
    }
}

impl Config {
    /// Reads `./config.toml`, then `/config/config.toml`.
    pub fn try_load() -> Result<Self, String> {
        read_to_string("./config.toml")
            .or_else(|_| read_to_string("/config/config.toml"))
            .map_err(|err| err.to_string())
            .and_then(|v| Self::parse(&v))
    }

    pub fn parse(config: &str) -> Result<Self, String> {
        toml::from_str(config).map_err(|err| err.to_string())
    }

    pub fn infra(&self) -> InfraConfig {
        self.infra.as_ref().cloned().unwrap_or_default()
    }
}

impl StepsConfig {
    pub fn batch_classifier(&self) -> BatchClassifierStepConfig {
        self.batch_classifier.as_ref().cloned().unwrap_or_default()
    }
}

impl CollectorStepConfig {
    /// Unrecognized targets fall back to the default of 50 reviews.
    pub fn target(&self) -> Target {
        self.target.as_deref()
            .and_then(|target| {
                let parsed = Target::parse(target);
                if parsed.is_none() {
                    warn!("unknown collection target \"{}\", using default", target);
                }
                parsed
            })
            .unwrap_or(Target::Count(50))
    }

    pub fn confidence_threshold(&self) -> Result<Option<f32>, CollectorError> {
        match &self.confidence_threshold {
            None => Ok(None),
            Some(ThresholdSetting::Number(threshold)) => parse_threshold(&threshold.to_string()),
            Some(ThresholdSetting::Text(threshold)) => parse_threshold(threshold),
        }
    }

    pub fn collector_config(&self) -> CollectorConfig {
        let defaults = CollectorConfig::default();

        CollectorConfig {
            language: self.language.clone().unwrap_or(defaults.language),
            min_review_length: self.min_review_length.unwrap_or(defaults.min_review_length),
            max_consecutive_empty_pages: self.max_consecutive_empty_pages.unwrap_or(defaults.max_consecutive_empty_pages),
            max_consecutive_failures: self.max_consecutive_failures.unwrap_or(defaults.max_consecutive_failures),
            backoff: self.backoff_ms.map(Duration::from_millis).unwrap_or(defaults.backoff),
            backoff_jitter: self.backoff_jitter_ms.map(Duration::from_millis).unwrap_or(defaults.backoff_jitter),
            reviews_per_page: self.reviews_per_page.filter(|v| *v > 0).unwrap_or(defaults.reviews_per_page),
            max_pages_unbounded: self.max_pages_unbounded.unwrap_or(defaults.max_pages_unbounded),
        }
    }
}

impl BatchClassifierStepConfig {
    pub fn input(&self) -> PathBuf {
        PathBuf::from(self.input.as_deref().unwrap_or("./reviews.csv"))
    }

    pub fn output(&self) -> PathBuf {
        PathBuf::from(self.output.as_deref().unwrap_or("./reviews_classified.csv"))
    }
}

impl ExportStepConfig {
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(self.output_dir.as_deref().unwrap_or("./output"))
    }
}

impl InfraConfig {
    pub fn source(&self) -> SourceConfig {
        self.source.as_ref().cloned().unwrap_or_default()
    }

    pub fn database(&self) -> &DatabaseConfig {
        &self.database
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }
}

impl SourceConfig {
    pub fn endpoint(&self) -> String {
        self.endpoint.as_ref().cloned().unwrap_or("http://review-proxy.default.svc.cluster.local:8080".to_owned())
    }

    pub fn api_key(&self) -> Option<&String> {
        self.api_key.as_ref()
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(30)
    }
}

impl DatabaseConfig {
    pub fn connection_string(&self) -> Option<&String> {
        self.connection_string.as_ref()
    }
}

impl ModelConfig {
    pub fn path(&self) -> PathBuf {
        PathBuf::from(self.path.as_deref().unwrap_or("./model/sentiment.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sections_use_defaults() {
        let config = Config::parse("[steps]\n").unwrap();

        assert!(!config.steps.collector.enabled);
        assert_eq!(config.steps.collector.target(), Target::Count(50));
        assert_eq!(config.steps.collector.confidence_threshold().unwrap(), None);
        assert_eq!(config.infra().source().timeout_secs(), 30);
        assert!(config.infra().database().connection_string().is_none());
        assert!(config.steps.export.enabled);
        assert!(!config.logging.json);
    }

    #[test]
    fn collector_section() {
        let config = Config::parse(r#"
            [steps.collector]
            enabled = true
            products = ["https://www.walmart.com/ip/Blender/123", "456"]
            target = "all"
            confidence_threshold = "70%"
            backoff_ms = 10
            reviews_per_page = 10

            [infra.database]
            connection_string = "sqlite::memory:"
        "#).unwrap();

        let collector = &config.steps.collector;
        assert_eq!(collector.products.len(), 2);
        assert_eq!(collector.target(), Target::All);
        assert_eq!(collector.confidence_threshold().unwrap(), Some(0.7));

        let collector_config = collector.collector_config();
        assert_eq!(collector_config.backoff, Duration::from_millis(10));
        assert_eq!(collector_config.reviews_per_page, 10);
        assert_eq!(collector_config.max_consecutive_failures, 3);
        assert_eq!(config.infra().database().connection_string().map(|v| v.as_str()), Some("sqlite::memory:"));
    }

    #[test]
    fn numeric_threshold() {
        let config = Config::parse("[steps.collector]\nenabled = true\nconfidence_threshold = 0.5\n").unwrap();
        assert_eq!(config.steps.collector.confidence_threshold().unwrap(), Some(0.5));

        let config = Config::parse("[steps.collector]\nenabled = true\nconfidence_threshold = 1.5\n").unwrap();
        assert!(config.steps.collector.confidence_threshold().is_err());
    }
}

use crate::core::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Command processor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Number of worker threads in the pool
    pub workers: usize,
    /// Maximum number of submissions waiting for a worker
    pub queue_capacity: usize,
    /// Prefix for worker thread names; the worker index is appended
    pub thread_name: String,
    /// Worker thread stack size in bytes (None = platform default)
    pub stack_size: Option<usize>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(2),
            queue_capacity: 10_000,
            thread_name: "cmd-worker".to_string(),
            stack_size: None,
        }
    }
}

impl ProcessorConfig {
    /// Create a new builder for ProcessorConfig
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::new()
    }

    /// Small pool for development and tests
    pub fn development() -> Self {
        Self {
            workers: 2,
            queue_capacity: 100,
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid(
                "workers must be greater than 0".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue_capacity must be greater than 0".to_string(),
            ));
        }
        if self.thread_name.is_empty() {
            return Err(ConfigError::Invalid(
                "thread_name must not be empty".to_string(),
            ));
        }
        if let Some(size) = self.stack_size {
            if size < 16 * 1024 {
                return Err(ConfigError::Invalid(
                    "stack_size must be at least 16 KiB".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.yaml`/`.yml` or `.json` file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&contents),
            Some("json") => Self::from_json_str(&contents),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

/// Builder for ProcessorConfig
pub struct ProcessorConfigBuilder {
    config: ProcessorConfig,
}

impl ProcessorConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ProcessorConfig::default(),
        }
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.config.stack_size = Some(bytes);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<ProcessorConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ProcessorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProcessorConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.workers >= 2);
    }

    #[test]
    fn test_development_config() {
        let config = ProcessorConfig::development();
        assert!(config.validate().is_ok());
        assert_eq!(config.workers, 2);
        assert_eq!(config.queue_capacity, 100);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = ProcessorConfig::default();

        config.workers = 0;
        assert!(config.validate().is_err());
        config.workers = 4;

        config.queue_capacity = 0;
        assert!(config.validate().is_err());
        config.queue_capacity = 10;

        config.stack_size = Some(1024);
        assert!(config.validate().is_err());
        config.stack_size = None;

        config.thread_name.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder() {
        let config = ProcessorConfig::builder()
            .workers(3)
            .queue_capacity(50)
            .thread_name("loader")
            .stack_size(256 * 1024)
            .build()
            .unwrap();

        assert_eq!(config.workers, 3);
        assert_eq!(config.queue_capacity, 50);
        assert_eq!(config.thread_name, "loader");
        assert_eq!(config.stack_size, Some(256 * 1024));

        assert!(ProcessorConfig::builder().workers(0).build().is_err());
    }

    #[test]
    fn test_yaml_partial_uses_defaults() {
        let config = ProcessorConfig::from_yaml_str("workers: 5\nthread_name: io\n").unwrap();
        assert_eq!(config.workers, 5);
        assert_eq!(config.thread_name, "io");
        assert_eq!(config.queue_capacity, 10_000);
    }

    #[test]
    fn test_json_roundtrip_and_rejection() {
        let config = ProcessorConfig::development();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(ProcessorConfig::from_json_str(&json).unwrap(), config);

        let err = ProcessorConfig::from_json_str(r#"{"workers": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_path_rejects_unknown_extension() {
        let path = std::env::temp_dir().join(format!("cmdexec-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "workers = 2").unwrap();
        let err = ProcessorConfig::from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ref ext) if ext == "toml"));
        std::fs::remove_file(&path).unwrap();
    }
}

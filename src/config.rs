// advisory-report-service/src/config.rs

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ReportServiceConfig {
    pub service: ServiceConfig,
    pub generation: GenerationConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// Retries beyond the first attempt.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub document_prefix: String,
    pub signed_url_ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "advisory-generated-documents".to_string(),
            document_prefix: "generated_documents".to_string(),
            signed_url_ttl_secs: 3600,
        }
    }
}

impl ReportServiceConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            // Start with default values
            .set_default("service.name", "advisory-report-service")?
            .set_default("service.log_level", "info")?
            .set_default("generation.max_retries", "3")?
            .set_default("generation.retry_base_delay_ms", "1000")?
            .set_default("storage.bucket", "advisory-generated-documents")?
            .set_default("storage.document_prefix", "generated_documents")?
            .set_default("storage.signed_url_ttl_secs", "3600")?
            // Load from config file if it exists
            .add_source(File::with_name("config").required(false))
            // Override with environment variables (e.g., REPORT__GENERATION__MAX_RETRIES)
            .add_source(Environment::with_prefix("REPORT").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_applies_defaults() {
        let cfg = ReportServiceConfig::load().unwrap();
        assert_eq!(cfg.service.name, "advisory-report-service");
        assert_eq!(cfg.generation.max_retries, 3);
        assert_eq!(cfg.generation.retry_base_delay_ms, 1000);
        assert_eq!(cfg.storage.signed_url_ttl_secs, 3600);
    }
}

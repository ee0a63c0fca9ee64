use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
    pub pipeline: PipelineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            logging: LoggingConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8080 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub groq_api_key: String,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self { groq_api_key: String::new(), model: "llama3-8b-8192".to_string() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info,chartgen_core=debug".to_string(), file: None }
    }
}

/// Tunables named directly in `spec.md` §6's environment-variable list.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub database_path: String,
    pub cache_ttl_secs: u64,
    pub idempotency_ttl_secs: u64,
    pub validation_threshold: f64,
    pub checkpoint_db_path: Option<String>,
    /// Catalog cache TTL (§4.1 default: 1 hour). Distinct from
    /// `cache_ttl_secs`, which governs C4's result cache (§4.5.5 default:
    /// 5 minutes).
    pub catalog_ttl_secs: u64,
    /// Descriptive-index relevance cutoff (§4.2 / §9 open question).
    pub descriptive_threshold: f64,
    /// Job Registry eviction TTL (§4.9).
    pub job_ttl_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            database_path: "data/chartgen.db".to_string(),
            cache_ttl_secs: 300,
            idempotency_ttl_secs: 300,
            validation_threshold: 0.3,
            checkpoint_db_path: None,
            catalog_ttl_secs: 3600,
            descriptive_threshold: 0.7,
            job_ttl_secs: 3600,
        }
    }
}

impl Config {
    /// Load configuration with environment variable override support.
    ///
    /// Loading order:
    /// 1. Start from defaults.
    /// 2. Override with environment variables (`spec.md` §6 names).
    /// 3. Validate the final configuration.
    pub fn load() -> Result<Self, anyhow::Error> {
        let mut config = Config::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            self.llm.groq_api_key = key;
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            self.pipeline.database_path = path;
        }

        if let Ok(ttl) = std::env::var("CACHE_TTL") {
            match ttl.parse() {
                Ok(val) => self.pipeline.cache_ttl_secs = val,
                Err(e) => tracing::warn!("invalid CACHE_TTL '{}': {} (keeping default)", ttl, e),
            }
        }

        if let Ok(ttl) = std::env::var("IDEMPOTENCY_TTL") {
            match ttl.parse() {
                Ok(val) => self.pipeline.idempotency_ttl_secs = val,
                Err(e) => tracing::warn!("invalid IDEMPOTENCY_TTL '{}': {} (keeping default)", ttl, e),
            }
        }

        if let Ok(threshold) = std::env::var("VALIDATION_THRESHOLD") {
            match threshold.parse() {
                Ok(val) => self.pipeline.validation_threshold = val,
                Err(e) => {
                    tracing::warn!("invalid VALIDATION_THRESHOLD '{}': {} (keeping default)", threshold, e)
                },
            }
        }

        if let Ok(path) = std::env::var("CHECKPOINT_DB_PATH") {
            self.pipeline.checkpoint_db_path = Some(path);
        }

        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("SERVER_PORT") {
            match port.parse() {
                Ok(val) => self.server.port = val,
                Err(e) => tracing::warn!("invalid SERVER_PORT '{}': {} (keeping default)", port, e),
            }
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.server.port == 0 {
            anyhow::bail!("server port cannot be 0");
        }
        if self.pipeline.database_path.is_empty() {
            anyhow::bail!("database path cannot be empty");
        }
        if !(0.0..=1.0).contains(&self.pipeline.validation_threshold) {
            anyhow::bail!("validation_threshold must be in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.pipeline.descriptive_threshold) {
            anyhow::bail!("descriptive_threshold must be in [0, 1]");
        }
        if self.llm.groq_api_key.is_empty() {
            tracing::warn!("GROQ_API_KEY is not set; the LLM gateway will fail every request");
        }
        Ok(())
    }
}

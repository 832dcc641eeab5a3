use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::types::LLMProvider;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub search: SearchConfig,
    pub research: ResearchConfig,
    pub jobs: JobConfig,
    pub logging: LoggingConfig,
    /// Values that were accepted but adjusted, logged once logging is up.
    #[serde(skip)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Overrides the provider's default endpoint
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub tavily_api_key: String,
    pub max_results: u32,
    pub max_tokens_per_source: usize,
    pub include_raw_content: bool,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResearchConfig {
    pub max_web_research_loops: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub cache_ttl_secs: u64,
    pub progress_interval_ms: u64,
    pub progress_step: u8,
    pub job_retention_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            tavily_api_key: String::new(),
            max_results: 1,
            max_tokens_per_source: 1000,
            include_raw_content: true,
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_web_research_loops: 3,
        }
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 86_400,
            progress_interval_ms: 2_000,
            progress_step: 5,
            job_retention_secs: 3_600,
            sweep_interval_secs: 300,
        }
    }
}

impl JobConfig {
    pub fn cache_ttl(&self) -> chrono::Duration {
        seconds_duration(self.cache_ttl_secs).unwrap_or(chrono::Duration::MAX)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }

    pub fn job_retention(&self) -> chrono::Duration {
        seconds_duration(self.job_retention_secs).unwrap_or(chrono::Duration::MAX)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl LLMProvider {
    fn api_key_var(&self) -> &'static str {
        match self {
            LLMProvider::Groq => "GROQ_API_KEY",
            LLMProvider::OpenAI => "OPENAI_API_KEY",
            LLMProvider::Nebius => "NEBIUS_API_KEY",
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let provider: LLMProvider = var("LLM_PROVIDER", "groq").parse()?;
        let api_key = lookup("LLM_API_KEY")
            .or_else(|| lookup(provider.api_key_var()))
            .unwrap_or_default();

        let mut warnings = Vec::new();
        let max_loops: i64 = parse_var(&lookup, "MAX_WEB_RESEARCH_LOOPS", 3)?;
        if max_loops < 0 {
            warnings.push(format!(
                "Negative MAX_WEB_RESEARCH_LOOPS ({}), clamping to 0",
                max_loops
            ));
        }

        let defaults = JobConfig::default();
        let cache_ttl_secs: u64 = parse_var(&lookup, "CACHE_TTL_SECS", defaults.cache_ttl_secs)?;
        seconds_duration(cache_ttl_secs)
            .with_context(|| format!("CACHE_TTL_SECS out of range: {}", cache_ttl_secs))?;
        let job_retention_secs: u64 = parse_var(
            &lookup,
            "JOB_RETENTION_SECS",
            defaults.job_retention_secs,
        )?;
        seconds_duration(job_retention_secs)
            .with_context(|| format!("JOB_RETENTION_SECS out of range: {}", job_retention_secs))?;

        let search_defaults = SearchConfig::default();

        Ok(Self {
            server: ServerConfig {
                port: parse_var(&lookup, "PORT", 3000)?,
                host: var("HOST", "0.0.0.0"),
                cors_allowed_origins: var("ALLOWED_ORIGINS", "*")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            llm: LLMConfig {
                provider,
                api_key,
                model: var("LLM_MODEL", "mistral-saba-24b"),
                temperature: parse_var(&lookup, "LLM_TEMPERATURE", 0.0)?,
                max_tokens: lookup("LLM_MAX_TOKENS")
                    .map(|v| v.parse().context("Invalid LLM_MAX_TOKENS"))
                    .transpose()?,
                base_url: lookup("LLM_BASE_URL").filter(|v| !v.is_empty()),
                timeout_secs: parse_var(&lookup, "LLM_TIMEOUT_SECS", 60)?,
            },
            search: SearchConfig {
                tavily_api_key: lookup("TAVILY_API_KEY").unwrap_or_default(),
                max_results: parse_var(&lookup, "SEARCH_MAX_RESULTS", search_defaults.max_results)?,
                max_tokens_per_source: parse_var(
                    &lookup,
                    "MAX_TOKENS_PER_SOURCE",
                    search_defaults.max_tokens_per_source,
                )?,
                include_raw_content: parse_var(
                    &lookup,
                    "SEARCH_INCLUDE_RAW_CONTENT",
                    search_defaults.include_raw_content,
                )?,
                timeout_secs: parse_var(&lookup, "SEARCH_TIMEOUT_SECS", search_defaults.timeout_secs)?,
                max_retries: parse_var(&lookup, "SEARCH_MAX_RETRIES", search_defaults.max_retries)?,
            },
            research: ResearchConfig {
                max_web_research_loops: max_loops.clamp(0, u32::MAX as i64) as u32,
            },
            jobs: JobConfig {
                cache_ttl_secs,
                progress_interval_ms: parse_var(
                    &lookup,
                    "PROGRESS_INTERVAL_MS",
                    defaults.progress_interval_ms,
                )?,
                progress_step: parse_var(&lookup, "PROGRESS_STEP", defaults.progress_step)?,
                job_retention_secs,
                sweep_interval_secs: parse_var(
                    &lookup,
                    "SWEEP_INTERVAL_SECS",
                    defaults.sweep_interval_secs,
                )?,
            },
            logging: LoggingConfig {
                log_dir: lookup("LOG_DIR").filter(|v| !v.is_empty()),
            },
            warnings,
        })
    }
}

/// Whole seconds as a signed duration, `None` if chrono cannot represent it.
fn seconds_duration(secs: u64) -> Option<chrono::Duration> {
    i64::try_from(secs).ok().and_then(chrono::Duration::try_seconds)
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.cors_allowed_origins, vec!["*".to_string()]);
        assert_eq!(config.llm.provider, LLMProvider::Groq);
        assert_eq!(config.search.max_results, 1);
        assert_eq!(config.search.max_tokens_per_source, 1000);
        assert!(config.search.include_raw_content);
        assert_eq!(config.research.max_web_research_loops, 3);
        assert_eq!(config.jobs.cache_ttl_secs, 86_400);
        assert_eq!(config.jobs.progress_interval(), Duration::from_secs(2));
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn test_provider_specific_api_key() {
        let config = config_from(&[("LLM_PROVIDER", "nebius"), ("NEBIUS_API_KEY", "nb-key")]).unwrap();
        assert_eq!(config.llm.provider, LLMProvider::Nebius);
        assert_eq!(config.llm.api_key, "nb-key");

        let config = config_from(&[
            ("LLM_PROVIDER", "nebius"),
            ("NEBIUS_API_KEY", "nb-key"),
            ("LLM_API_KEY", "generic"),
        ])
        .unwrap();
        assert_eq!(config.llm.api_key, "generic");
    }

    #[test]
    fn test_negative_loop_bound_clamps_to_zero() {
        let config = config_from(&[("MAX_WEB_RESEARCH_LOOPS", "-4")]).unwrap();
        assert_eq!(config.research.max_web_research_loops, 0);
        assert_eq!(config.warnings.len(), 1);
        assert!(config.warnings[0].contains("MAX_WEB_RESEARCH_LOOPS"));

        assert!(config_from(&[]).unwrap().warnings.is_empty());
    }

    #[test]
    fn test_unrepresentable_durations_are_errors() {
        let huge = "100000000000000000";
        let err = config_from(&[("CACHE_TTL_SECS", huge)]).unwrap_err();
        assert!(err.to_string().contains("CACHE_TTL_SECS"));
        let err = config_from(&[("JOB_RETENTION_SECS", huge)]).unwrap_err();
        assert!(err.to_string().contains("JOB_RETENTION_SECS"));

        let jobs = JobConfig {
            cache_ttl_secs: u64::MAX,
            job_retention_secs: u64::MAX,
            ..JobConfig::default()
        };
        assert_eq!(jobs.cache_ttl(), chrono::Duration::MAX);
        assert_eq!(jobs.job_retention(), chrono::Duration::MAX);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(config_from(&[("PORT", "not-a-port")]).is_err());
        assert!(config_from(&[("LLM_PROVIDER", "unknown")]).is_err());
        assert!(config_from(&[("CACHE_TTL_SECS", "-1")]).is_err());
    }

    #[test]
    fn test_origins_are_split_and_trimmed() {
        let config = config_from(&[("ALLOWED_ORIGINS", "http://a.test, http://b.test,")]).unwrap();
        assert_eq!(
            config.server.cors_allowed_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }
}

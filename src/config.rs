//! Runtime configuration
//!
//! Read from the process environment (after `.env` has been loaded by the
//! binary). CLI flags may override individual fields afterwards.

use crate::error::OrchestrationError;
use crate::llm::gemini::DEFAULT_GEMINI_MODEL;
use crate::Result;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_MAX_ITERATIONS: usize = 20;
pub const DEFAULT_PORT: u16 = 8080;

/// Which planner builds the step list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerStrategy {
    Llm,
    Keyword,
}

impl FromStr for PlannerStrategy {
    type Err = OrchestrationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "llm" | "plan" | "plan-and-execute" => Ok(PlannerStrategy::Llm),
            "keyword" | "router" => Ok(PlannerStrategy::Keyword),
            other => Err(OrchestrationError::ConfigError(format!(
                "unknown planner strategy '{}' (expected 'llm' or 'keyword')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub tavily_api_key: Option<String>,
    pub data_dir: PathBuf,
    pub planner: PlannerStrategy,
    pub max_iterations: usize,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            tavily_api_key: None,
            data_dir: PathBuf::from("./data"),
            planner: PlannerStrategy::Llm,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            port: DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_iterations = match non_empty("MAX_ITERATIONS") {
            Some(raw) => parse_number::<usize>("MAX_ITERATIONS", &raw)?,
            None => defaults.max_iterations,
        };
        if max_iterations == 0 {
            return Err(OrchestrationError::ConfigError(
                "MAX_ITERATIONS must be at least 1".to_string(),
            ));
        }

        let port = match non_empty("PORT").or_else(|| non_empty("API_PORT")) {
            Some(raw) => parse_number::<u16>("PORT", &raw)?,
            None => defaults.port,
        };

        let planner = match non_empty("PLANNER_STRATEGY") {
            Some(raw) => raw.parse()?,
            None => defaults.planner,
        };

        Ok(Self {
            gemini_api_key: non_empty("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: non_empty("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            tavily_api_key: non_empty("TAVILY_API_KEY"),
            data_dir: non_empty("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            planner,
            max_iterations,
            port,
        })
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        OrchestrationError::ConfigError(format!("{} must be a number, got '{}'", key, raw))
    })
}

use std::path::PathBuf;

use anyhow::Context;
use uuid::Uuid;

use rex_model::Limits;
use rex_observe::{LogFormat, LogLevel, LoggerConfig};

/// Daemon configuration, read from `REX_*` environment variables.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Identity stamped onto claimed tasks. Generated per process if unset.
    pub executor_id: String,
    /// Stack this node accepts; tasks tagged differently are skipped.
    pub stack: String,
    /// Total capacity the registry admits against.
    pub capacity: Limits,
    /// Host directory for per-action scratch files.
    pub temp_dir: PathBuf,
    /// Base directory for scratch containers.
    pub container_dir: PathBuf,
    pub logger: LoggerConfig,
    /// Seed a demo run-once at startup.
    pub demo: bool,
}

impl AgentConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let executor_id =
            env_or("REX_EXECUTOR_ID", || format!("executor-{}", Uuid::new_v4()));
        let stack = env_or("REX_STACK", String::new);

        let capacity = Limits::new(
            env_parsed("REX_MEMORY_MB", 1024)?,
            env_parsed("REX_DISK_MB", 4096)?,
        );

        let work_dir = std::env::var_os("REX_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("rex"));

        let mut logger = LoggerConfig::default();
        if let Ok(level) = std::env::var("REX_LOG_LEVEL") {
            logger.level = level
                .parse::<LogLevel>()
                .context("REX_LOG_LEVEL is not a valid filter")?;
        }
        if let Ok(format) = std::env::var("REX_LOG_FORMAT") {
            logger.format = format
                .parse::<LogFormat>()
                .context("REX_LOG_FORMAT is not a valid format")?;
        }

        Ok(Self {
            executor_id,
            stack,
            capacity,
            temp_dir: work_dir.join("tmp"),
            container_dir: work_dir.join("containers"),
            logger,
            demo: std::env::var("REX_DEMO").map(|v| v == "1").unwrap_or(false),
        })
    }
}

fn env_or(name: &str, default: impl FnOnce() -> String) -> String {
    std::env::var(name).unwrap_or_else(|_| default())
}

fn env_parsed(name: &str, default: u64) -> anyhow::Result<u64> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<u64>()
            .with_context(|| format!("{name} must be an integer, got {value:?}")),
        Err(_) => Ok(default),
    }
}

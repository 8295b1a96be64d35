//! 分层配置加载：内置默认值 → 可选的 TOML 文件 → `AURUM__` 前缀环境变量。

use aurum_core::config::AppConfig;
use config::{Config, ConfigError, Environment, File, FileFormat, Source};

/// 指定配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "AURUM_CONFIG";
/// 未指定时读取的配置文件 (不存在则跳过)
pub const DEFAULT_CONFIG_FILE: &str = "aurum.toml";

const ENV_PREFIX: &str = "AURUM";
const ENV_SEPARATOR: &str = "__";

/// 从进程环境加载配置，例如 `AURUM__CACHE__MAX_AGE_SECS=60`
pub fn load() -> Result<AppConfig, ConfigError> {
    let path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    layered(
        File::new(&path, FileFormat::Toml).required(false),
        env_source(),
    )
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}

/// 按优先级叠加默认值、文件与环境变量，并做取值检查
fn layered<F, E>(file: F, env: E) -> Result<AppConfig, ConfigError>
where
    F: Source + Send + Sync + 'static,
    E: Source + Send + Sync + 'static,
{
    let config: AppConfig = Config::builder()
        .add_source(Config::try_from(&AppConfig::default())?)
        .add_source(file)
        .add_source(env)
        .build()?
        .try_deserialize()?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.upstream.timeout_secs == 0 {
        return Err(ConfigError::Message(
            "upstream.timeout_secs must be greater than 0".to_string(),
        ));
    }
    if config.upstream.max_attempts == 0 {
        return Err(ConfigError::Message(
            "upstream.max_attempts must be at least 1".to_string(),
        ));
    }
    if config.cache.sweep_interval_secs == 0 {
        return Err(ConfigError::Message(
            "cache.sweep_interval_secs must be greater than 0".to_string(),
        ));
    }
    // 保留期短于新鲜窗口会让陈旧兜底失效
    if config.cache.retention_secs < config.cache.max_age_secs {
        return Err(ConfigError::Message(format!(
            "cache.retention_secs ({}) must not be shorter than cache.max_age_secs ({})",
            config.cache.retention_secs, config.cache.max_age_secs
        )));
    }
    Ok(())
}

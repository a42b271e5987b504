//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;
use crate::domain::song::DelayMinutes;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `KARAQ_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `KARAQ_SERVER__PORT=8080`
/// - `KARAQ_DATABASE__PATH=/data/karaq.db`
/// - `KARAQ_SESSION__GRACE_PERIOD_SECS=10`
/// - `KARAQ_QUEUE__ENFORCE_SINGLE_PLAYING=true`
///
/// # 返回
/// - `Ok(AppConfig)` - 成功加载的配置
/// - `Err(ConfigError)` - 加载失败
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 首先设置默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5070)?
        .set_default("database.path", "data/karaq.db")?
        .set_default("database.max_connections", 5)?
        .set_default("session.grace_period_secs", 5)?
        .set_default("session.default_song_duration_secs", 270)?
        .set_default("song.default_delay_minutes", 5)?
        .set_default("song.max_delay_minutes", 30)?
        .set_default("queue.enforce_single_playing", false)?
        .set_default("log.level", "info")?;

    // 2. 添加配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        // 搜索默认配置文件
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 添加环境变量（最高优先级）
    // 前缀: KARAQ_
    // 层级分隔符: __ (双下划线)
    // 例如: KARAQ_SESSION__GRACE_PERIOD_SECS=10
    // 注意: 环境变量名会被转换为小写
    builder = builder.add_source(
        Environment::with_prefix("KARAQ")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    // 4. 构建配置
    let config = builder.build()?;

    // 5. 反序列化为 AppConfig
    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    // 6. 验证配置
    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    // 验证端口范围
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    // 验证数据库路径
    if config.database.path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Database path cannot be empty".to_string(),
        ));
    }

    if config.database.max_connections == 0 {
        return Err(ConfigError::ValidationError(
            "Database max_connections cannot be 0".to_string(),
        ));
    }

    // 验证场次配置
    if config.session.grace_period_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Session grace period cannot be 0".to_string(),
        ));
    }

    if !(1..=3600).contains(&config.session.default_song_duration_secs) {
        return Err(ConfigError::ValidationError(format!(
            "Default song duration must be within 1..=3600 seconds, got {}",
            config.session.default_song_duration_secs
        )));
    }

    // 验证延后配置
    if !(1..=DelayMinutes::MAX).contains(&config.song.max_delay_minutes) {
        return Err(ConfigError::ValidationError(format!(
            "Max delay must be within 1..={} minutes, got {}",
            DelayMinutes::MAX,
            config.song.max_delay_minutes
        )));
    }

    if !(1..=config.song.max_delay_minutes).contains(&config.song.default_delay_minutes) {
        return Err(ConfigError::ValidationError(format!(
            "Default delay must be within 1..={} minutes, got {}",
            config.song.max_delay_minutes, config.song.default_delay_minutes
        )));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}:{}", config.server.host, config.server.port);
    tracing::info!("Database: {}", config.database.path);
    tracing::info!("Database Max Connections: {}", config.database.max_connections);
    tracing::info!("Session Grace Period: {}s", config.session.grace_period_secs);
    tracing::info!(
        "Default Song Duration: {}s",
        config.session.default_song_duration_secs
    );
    tracing::info!(
        "Delay Minutes: default {}, max {}",
        config.song.default_delay_minutes,
        config.song.max_delay_minutes
    );
    tracing::info!(
        "Enforce Single Playing: {}",
        config.queue.enforce_single_playing
    );
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

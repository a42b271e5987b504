//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::time::Duration;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 场次配置
    #[serde(default)]
    pub session: SessionConfig,

    /// 点歌配置
    #[serde(default)]
    pub song: SongConfig,

    /// 队列配置
    #[serde(default)]
    pub queue: QueueConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5070
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    #[serde(default = "default_db_path")]
    pub path: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/karaq.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// 获取数据库 URL
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.path)
    }
}

/// 场次配置
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// 结束宽限期（秒），期间可撤销结束
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,

    /// 新场次的默认单曲时长（秒），用于等待估算
    #[serde(default = "default_song_duration")]
    pub default_song_duration_secs: u32,
}

fn default_grace_period() -> u64 {
    5
}

fn default_song_duration() -> u32 {
    270
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: default_grace_period(),
            default_song_duration_secs: default_song_duration(),
        }
    }
}

impl SessionConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

/// 点歌配置
#[derive(Debug, Clone, Deserialize)]
pub struct SongConfig {
    /// 未指定时的延后分钟数
    #[serde(default = "default_delay_minutes")]
    pub default_delay_minutes: u32,

    /// 允许的最大延后分钟数（不超过 30）
    #[serde(default = "default_max_delay_minutes")]
    pub max_delay_minutes: u32,
}

fn default_delay_minutes() -> u32 {
    5
}

fn default_max_delay_minutes() -> u32 {
    30
}

impl Default for SongConfig {
    fn default() -> Self {
        Self {
            default_delay_minutes: default_delay_minutes(),
            max_delay_minutes: default_max_delay_minutes(),
        }
    }
}

/// 队列配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueConfig {
    /// 同一场次是否只允许一首歌处于 playing
    /// 默认关闭，由 DJ 自行保证
    #[serde(default)]
    pub enforce_single_playing: bool,
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5070);
        assert_eq!(config.database.path, "data/karaq.db");
        assert_eq!(config.session.grace_period(), Duration::from_secs(5));
        assert_eq!(config.session.default_song_duration_secs, 270);
        assert_eq!(config.song.default_delay_minutes, 5);
        assert!(!config.queue.enforce_single_playing);
    }

    #[test]
    fn test_server_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:5070");
    }

    #[test]
    fn test_database_url() {
        let config = DatabaseConfig::default();
        assert_eq!(config.database_url(), "sqlite:data/karaq.db?mode=rwc");
    }
}

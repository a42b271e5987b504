//! Karaq - 卡拉 OK 现场点歌队列服务
//!
//! - Domain: song/, session/ 生命周期状态机与队列位置模型
//! - Application: commands, queries, gateway, ports
//! - Infrastructure: http, memory (actor registry), persistence

use std::sync::Arc;

use karaq::application::{DelayPolicy, MachineRegistryPort};
use karaq::config::{load_config, print_config};
use karaq::domain::session::SongDuration;
use karaq::infrastructure::http::{AppState, HttpServer, ServerConfig};
use karaq::infrastructure::memory::{ActorRegistry, RegistrySettings};
use karaq::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, DatabaseConfig, SqliteSessionRepository, SqliteSongRepository,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // 初始化日志
    let log_filter = format!(
        "{},karaq={},tower_http=debug",
        config.log.level, config.log.level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    tracing::info!("Karaq - live song request queue");
    print_config(&config);

    // 确保数据目录存在
    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // 初始化数据库
    let db_config = DatabaseConfig {
        database_url: config.database.database_url(),
        max_connections: config.database.max_connections,
    };
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    // 创建 Repository 适配器
    let song_repo = Arc::new(SqliteSongRepository::new(pool.clone()));
    let session_repo = Arc::new(SqliteSessionRepository::new(pool));

    // 状态机注册表：实例按需从仓储加载
    let settings = RegistrySettings {
        grace_period: config.session.grace_period(),
        enforce_single_playing: config.queue.enforce_single_playing,
    };
    let actors = ActorRegistry::new(settings, song_repo.clone(), session_repo.clone()).arc();
    // 开始服务前恢复上次运行遗留的延后与宽限期定时器
    actors.recover().await?;
    let registry: Arc<dyn MachineRegistryPort> = actors;

    let delay_policy = DelayPolicy::new(
        config.song.default_delay_minutes,
        config.song.max_delay_minutes,
    )?;
    let default_song_duration = SongDuration::new(config.session.default_song_duration_secs)
        .map_err(|e| anyhow::anyhow!("Invalid default song duration: {}", e))?;

    // 创建 HTTP 服务器
    let server_config = ServerConfig::new(&config.server.host, config.server.port);
    let state = AppState::new(
        registry.clone(),
        song_repo,
        session_repo,
        delay_policy,
        default_song_duration,
    );

    let server = HttpServer::new(server_config, state);

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    // 取消所有挂起的定时器
    registry.shutdown().await;
    tracing::info!("Server shutdown complete");

    Ok(())
}

use booking_server::{Config, ServerState, print_banner, services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境 (dotenv + 日志)
    dotenv::dotenv().ok();

    let config = Config::from_env();
    booking_server::init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());

    // 打印横幅
    print_banner();

    tracing::info!(
        "📅 Booking server starting (env: {})",
        config.environment
    );

    // 2. 初始化服务器状态 (数据库、JWT、管理器、总线)
    let state = ServerState::initialize(&config).await;

    // 3. 启动后台任务 (事件转发器)
    state.start_background_tasks();

    // 4. 启动 HTTP 服务器，直到 ctrl-c
    if let Err(e) = services::serve(state).await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}

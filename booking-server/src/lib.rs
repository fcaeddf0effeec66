//! Booking Server - 资源预订服务
//!
//! # 架构概述
//!
//! 本模块是预订服务的主入口，提供以下核心功能：
//!
//! - **预订生命周期** (`bookings`): 时段抢占、取消、状态流转的唯一权威
//! - **数据库** (`db`): 嵌入式 SurrealDB 存储，事务级一致性
//! - **认证** (`auth`): JWT + Argon2 认证体系
//! - **事件流** (`message` + `api/events`): 领域事件经总线扇出到 WebSocket
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! booking-server/src/
//! ├── core/          # 配置、状态
//! ├── auth/          # JWT 认证、中间件
//! ├── bookings/      # 预订生命周期管理器 (核心)
//! ├── api/           # HTTP 路由和处理器
//! ├── services/      # HTTP 服务器
//! ├── message/       # 事件总线与转发
//! ├── db/            # 数据库层
//! └── utils/         # 工具函数
//! ```

pub mod api;
pub mod auth;
pub mod bookings;
pub mod core;
pub mod db;
pub mod message;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use auth::{Identity, JwtService};
pub use bookings::{BookingError, BookingManager};
pub use crate::core::{Config, ServerState};
pub use message::MessageBus;
pub use shared::message::{BusMessage, EventType};
pub use utils::{AppError, AppResponse, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

pub fn print_banner() {
    println!(
        r#"
    ____              __   _
   / __ )____  ____  / /__(_)___  ____ _
  / __  / __ \/ __ \/ //_/ / __ \/ __ `/
 / /_/ / /_/ / /_/ / ,< / / / / / /_/ /
/_____/\____/\____/_/|_/_/_/ /_/\__, /
                               /____/
    "#
    );
}

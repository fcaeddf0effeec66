//! 核心模块 - 配置和服务器状态
//!
//! - [`Config`] - 环境变量驱动的服务器配置
//! - [`ServerState`] - 所有子系统的共享引用
//! - [`CollectionVersions`] - 集合级递增版本号

pub mod config;
pub mod state;

pub use config::Config;
pub use state::{CollectionVersions, ServerState};

//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查 (公共)
//! - [`auth`] - 注册、登录、个人资料
//! - [`resources`] - 资源管理接口
//! - [`slots`] - 时段管理接口
//! - [`bookings`] - 预订生命周期接口
//! - [`events`] - WebSocket 事件流

pub mod auth;
pub mod health;

// Data models API
pub mod bookings;
pub mod resources;
pub mod slots;

// Realtime feed
pub mod events;

// Re-export common types for handlers
pub use crate::utils::{AppResponse, AppResult};

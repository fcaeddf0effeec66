//! 认证授权模块
//!
//! 提供 JWT 认证和中间件：
//! - [`JwtService`] - JWT 令牌服务
//! - [`Identity`] - 请求身份，显式传入各业务操作
//! - [`require_auth`] - 认证中间件
//! - [`require_admin`] - 管理员检查中间件

pub mod extractor;
pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, Identity, JwtConfig, JwtError, JwtService};
pub use middleware::{require_admin, require_auth};

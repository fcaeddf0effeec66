//! 服务层 - HTTP 服务器
//!
//! - [`http`] - 路由组装、监听与优雅关闭

pub mod http;

pub use http::{build_app, serve};

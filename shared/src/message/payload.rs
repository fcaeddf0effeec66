use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ==================== Notification Level ====================

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    /// 普通信息
    Info,
    /// 警告
    Warning,
    /// 错误
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ==================== Payloads ====================

/// 欢迎帧载荷 (服务端 -> 新连接的客户端)
///
/// 客户端用 versions 对比本地缓存版本，差距过大时触发全量刷新。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelcomePayload {
    /// 协议版本
    pub version: u16,
    /// 服务端本次启动的唯一标识，客户端用于检测重启
    pub server_epoch: String,
    /// 各集合当前版本号 (collection -> version)
    pub versions: HashMap<String, u64>,
}

/// 通知载荷 (服务端 -> 客户端)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// 标题
    pub title: String,
    /// 消息内容
    pub message: String,
    /// 通知级别
    pub level: NotificationLevel,
    /// 附加数据 (JSON)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// 同步信号载荷 (服务端 -> 所有客户端)
///
/// 某个集合发生变更时广播，通知客户端刷新数据。
///
/// # 示例
/// - `resource`: "slots"
/// - `version`: 42
/// - `action`: "updated"
/// - `id`: "slots:xyz"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload {
    /// 集合名 (例如: "resources", "slots", "bookings")
    pub resource: String,
    /// 集合级递增版本号
    pub version: u64,
    /// 变更类型 (例如: "created", "updated", "deleted")
    pub action: String,
    /// 实体 ID (必填)
    pub id: String,
    /// 实体数据 (可选，deleted 时为 None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

// ==================== Convenience Constructors ====================

impl NotificationPayload {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level: NotificationLevel::Info,
            data: None,
        }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level: NotificationLevel::Warning,
            data: None,
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level: NotificationLevel::Error,
            data: None,
        }
    }
}

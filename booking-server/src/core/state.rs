use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use uuid::Uuid;

use shared::message::{BusMessage, SyncPayload, WelcomePayload, PROTOCOL_VERSION};

use crate::auth::JwtService;
use crate::bookings::BookingManager;
use crate::core::Config;
use crate::db::models::{UserCreate, UserRole};
use crate::db::repository::UserRepository;
use crate::db::DbService;
use crate::message::{EventForwarder, MessageBus};

/// 集合版本管理器
///
/// 使用 DashMap 实现无锁并发的版本号管理。
/// 每个集合维护独立的版本号，支持原子递增。
///
/// # 使用场景
///
/// broadcast_sync 时自动生成递增的版本号，
/// 客户端通过对比版本号判断本地缓存的新旧。
#[derive(Debug)]
pub struct CollectionVersions {
    versions: DashMap<String, u64>,
}

impl CollectionVersions {
    /// 创建空的版本管理器
    pub fn new() -> Self {
        Self {
            versions: DashMap::new(),
        }
    }

    /// 递增指定集合的版本号并返回新值
    ///
    /// 如果集合不存在，从 0 开始递增（返回 1）
    pub fn increment(&self, collection: &str) -> u64 {
        let mut entry = self.versions.entry(collection.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// 获取指定集合的当前版本号
    ///
    /// 如果集合不存在，返回 0
    pub fn get(&self, collection: &str) -> u64 {
        self.versions.get(collection).map(|v| *v).unwrap_or(0)
    }

    /// 所有集合版本号的快照 (欢迎帧用)
    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.versions
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect()
    }
}

impl Default for CollectionVersions {
    fn default() -> Self {
        Self::new()
    }
}

/// 服务器状态 - 持有所有服务的单例引用
///
/// ServerState 是预订服务的核心数据结构，持有所有子系统的共享引用。
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | Surreal<Db> | 嵌入式数据库 |
/// | manager | Arc<BookingManager> | 预订生命周期管理 |
/// | bus | MessageBus | 事件总线 (WebSocket 扇出) |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
/// | collection_versions | Arc<CollectionVersions> | 集合版本管理 |
/// | server_epoch | String | 本次启动的唯一标识 |
///
/// # 使用示例
///
/// ```ignore
/// // 获取数据库连接
/// let db = state.get_db();
///
/// // 预订操作永远经过管理器
/// let outcome = state.manager.create_booking(&identity, req).await?;
///
/// // 管理端 CRUD 之后通知客户端
/// state.broadcast_sync("resources", "updated", &id, Some(&resource)).await;
/// ```
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 嵌入式数据库 (SurrealDB)
    pub db: Surreal<Db>,
    /// 预订生命周期管理器
    pub manager: Arc<BookingManager>,
    /// 事件总线
    pub bus: MessageBus,
    /// JWT 认证服务 (Arc 共享所有权)
    pub jwt_service: Arc<JwtService>,
    /// 集合版本管理器 (用于 broadcast_sync 自动递增版本号)
    pub collection_versions: Arc<CollectionVersions>,
    /// 本次启动的唯一标识，客户端用于检测服务端重启
    pub server_epoch: String,
}

impl ServerState {
    /// 创建服务器状态 (手动构造)
    ///
    /// 通常使用 [`initialize()`](Self::initialize) 方法代替
    pub fn new(
        config: Config,
        db: Surreal<Db>,
        manager: Arc<BookingManager>,
        bus: MessageBus,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            config,
            db,
            manager,
            bus,
            jwt_service,
            collection_versions: Arc::new(CollectionVersions::new()),
            server_epoch: Uuid::new_v4().to_string(),
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 数据库 (work_dir/data, 建表建索引)
    /// 2. JWT 服务
    /// 3. 预订管理器与事件总线
    /// 4. 管理员账号引导 (ADMIN_EMAIL / ADMIN_PASSWORD)
    ///
    /// # Panics
    ///
    /// 数据库初始化失败时 panic
    pub async fn initialize(config: &Config) -> Self {
        // 1. Initialize DB
        let db_path = config.db_path();
        let db_service = DbService::new(&db_path)
            .await
            .expect("Failed to initialize database");
        let db = db_service.db;

        // 2. Initialize services
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let manager = Arc::new(BookingManager::new(db.clone()));
        let bus = MessageBus::new();

        let state = Self::new(config.clone(), db, manager, bus, jwt_service);

        // 3. Bootstrap the admin account if configured
        state.ensure_admin_account().await;

        state
    }

    /// 启动后台任务
    ///
    /// 必须在服务器开始接受连接之前调用
    ///
    /// 启动的任务：
    /// - 事件转发器 (BookingManager -> MessageBus)
    pub fn start_background_tasks(&self) {
        let forwarder = EventForwarder::new(self.manager.subscribe(), self.bus.clone());
        tokio::spawn(forwarder.run());
        tracing::debug!("Event forwarder started in background");
    }

    /// 获取数据库实例
    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }

    /// 获取 JWT 服务
    pub fn jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    /// 获取事件总线
    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    /// 组装欢迎帧载荷 (新 WebSocket 连接)
    pub fn welcome_payload(&self) -> WelcomePayload {
        WelcomePayload {
            version: PROTOCOL_VERSION,
            server_epoch: self.server_epoch.clone(),
            versions: self.collection_versions.snapshot(),
        }
    }

    /// 广播同步消息
    ///
    /// 向所有连接的客户端广播集合变更通知。
    /// 版本号由 CollectionVersions 自动递增管理。
    ///
    /// # 参数
    /// - `collection`: 集合名 (如 "resources", "slots", "bookings")
    /// - `action`: 变更类型 ("created", "updated", "deleted")
    /// - `id`: 实体 ID
    /// - `data`: 实体数据 (deleted 时为 None)
    pub async fn broadcast_sync<T: serde::Serialize>(
        &self,
        collection: &str,
        action: &str,
        id: &str,
        data: Option<&T>,
    ) {
        let version = self.collection_versions.increment(collection);
        let payload = SyncPayload {
            resource: collection.to_string(),
            version,
            action: action.to_string(),
            id: id.to_string(),
            data: data.and_then(|d| serde_json::to_value(d).ok()),
        };
        let _ = self.bus.publish(BusMessage::sync(&payload)).await;
    }

    /// 管理员账号引导
    ///
    /// ADMIN_EMAIL 和 ADMIN_PASSWORD 都设置时，确保该邮箱对应的账号
    /// 存在。账号已存在则不做任何修改 (不会重置密码或提升角色)。
    async fn ensure_admin_account(&self) {
        let (Some(email), Some(password)) =
            (self.config.admin_email.clone(), self.config.admin_password.clone())
        else {
            return;
        };

        let users = UserRepository::new(self.db.clone());
        match users.find_by_email(&email).await {
            Ok(Some(_)) => {
                tracing::debug!(email = %email, "Admin account already present");
            }
            Ok(None) => {
                let data = UserCreate {
                    name: self.config.admin_name.clone(),
                    email: email.clone(),
                    password,
                };
                match users.create(data, UserRole::Admin).await {
                    Ok(_) => tracing::info!(email = %email, "Admin account bootstrapped"),
                    Err(e) => tracing::error!(email = %email, "Admin bootstrap failed: {}", e),
                }
            }
            Err(e) => {
                tracing::error!(email = %email, "Admin bootstrap lookup failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_versions_increment() {
        let versions = CollectionVersions::new();
        assert_eq!(versions.get("slots"), 0);
        assert_eq!(versions.increment("slots"), 1);
        assert_eq!(versions.increment("slots"), 2);
        assert_eq!(versions.increment("bookings"), 1);
        assert_eq!(versions.get("slots"), 2);

        let snapshot = versions.snapshot();
        assert_eq!(snapshot.get("slots"), Some(&2));
        assert_eq!(snapshot.get("bookings"), Some(&1));
    }
}

use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use crate::models::config::{StoreConfig, StoreKind};
use crate::models::{BlogPost, NewRecord, PostUpdate};

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// 查询条件
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Query {
    /// 只返回已发布的文章
    pub published_only: bool,
    /// 返回数量上限
    pub limit: Option<usize>,
}

impl Query {
    pub fn published(limit: usize) -> Self {
        Self {
            published_only: true,
            limit: Some(limit),
        }
    }

    pub fn all() -> Self {
        Self::default()
    }
}

/// 存储错误
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("记录不存在: {0}")]
    NotFound(Uuid),

    #[error("读写数据文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("数据文件格式错误: {0}")]
    Format(#[from] serde_json::Error),

    #[error("存储锁已损坏")]
    Poisoned,
}

/// `blog_posts` 表的访问接口
///
/// 每个方法对应一次独立的增删改查调用，结果按 `created_at` 倒序返回。
/// 访问控制不在这一层，由 [`crate::core::BlogService`] 负责。
pub trait PostStore: Send + Sync {
    fn insert(&self, record: NewRecord) -> Result<BlogPost, StoreError>;

    fn get(&self, id: Uuid) -> Result<BlogPost, StoreError>;

    fn list(&self, query: Query) -> Result<Vec<BlogPost>, StoreError>;

    fn update(&self, id: Uuid, update: &PostUpdate) -> Result<BlogPost, StoreError>;

    fn set_published(&self, id: Uuid, published: bool) -> Result<BlogPost, StoreError>;

    fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

/// 根据配置打开存储
pub fn open(config: &StoreConfig) -> Result<Arc<dyn PostStore>> {
    match config.kind {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreKind::File => {
            let path = config
                .path
                .clone()
                .unwrap_or_else(|| "blog_posts.json".into());
            Ok(Arc::new(FileStore::open(path)?))
        }
    }
}

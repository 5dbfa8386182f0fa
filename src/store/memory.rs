use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use super::{PostStore, Query, StoreError};
use crate::models::{BlogPost, NewRecord, PostUpdate};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// 内存存储
///
/// 行按插入顺序保存；创建时间相同时，后插入的排在前面。
#[derive(Clone)]
pub struct MemoryStore {
    rows: Arc<RwLock<Vec<BlogPost>>>,
    clock: Clock,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_posts(Vec::new())
    }

    pub fn from_posts(posts: Vec<BlogPost>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(posts)),
            clock: Arc::new(Utc::now),
        }
    }

    /// 使用自定义时钟生成 `created_at`
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn snapshot(&self) -> Result<Vec<BlogPost>, StoreError> {
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned)?;
        Ok(rows.clone())
    }

    pub(crate) fn restore(&self, posts: Vec<BlogPost>) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;
        *rows = posts;
        Ok(())
    }

    fn modify<F>(&self, id: Uuid, f: F) -> Result<BlogPost, StoreError>
    where
        F: FnOnce(&mut BlogPost),
    {
        let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;
        let post = rows
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound(id))?;
        f(post);
        Ok(post.clone())
    }
}

impl PostStore for MemoryStore {
    fn insert(&self, record: NewRecord) -> Result<BlogPost, StoreError> {
        let post = BlogPost {
            id: Uuid::new_v4(),
            title: record.title,
            excerpt: record.excerpt,
            content: record.content,
            category: record.category,
            cover_image_url: record.cover_image_url,
            read_time: record.read_time,
            published: record.published,
            created_at: (self.clock)(),
        };

        let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;
        rows.push(post.clone());
        debug!("插入文章 {} (共 {} 篇)", post.id, rows.len());
        Ok(post)
    }

    fn get(&self, id: Uuid) -> Result<BlogPost, StoreError> {
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned)?;
        rows.iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn list(&self, query: Query) -> Result<Vec<BlogPost>, StoreError> {
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned)?;

        // 倒序遍历后做稳定排序，时间相同时保持“后插入在前”
        let mut posts: Vec<BlogPost> = rows
            .iter()
            .rev()
            .filter(|p| !query.published_only || p.published)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        if let Some(limit) = query.limit {
            posts.truncate(limit);
        }
        Ok(posts)
    }

    fn update(&self, id: Uuid, update: &PostUpdate) -> Result<BlogPost, StoreError> {
        self.modify(id, |post| update.apply_to(post))
    }

    fn set_published(&self, id: Uuid, published: bool) -> Result<BlogPost, StoreError> {
        self.modify(id, |post| post.published = published)
    }

    fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;
        let before = rows.len();
        rows.retain(|p| p.id != id);
        if rows.len() == before {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

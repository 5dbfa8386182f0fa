use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{Action, BlogError, BlogResult};
use crate::models::{BlogPost, Config, Identity, NewPost, Notice, PostUpdate};
use crate::store::{PostStore, Query, StoreError};

/// 博客读写服务
///
/// 公开读取只返回已发布文章；编辑、发布切换和删除要求管理员身份，
/// 权限不足时不会调用存储。
#[derive(Clone)]
pub struct BlogService {
    store: Arc<dyn PostStore>,
    config: Arc<Config>,
}

impl BlogService {
    pub fn new(store: Arc<dyn PostStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 首页：最近发布的文章
    pub fn latest_published(&self) -> BlogResult<Vec<BlogPost>> {
        self.store
            .list(Query::published(self.config.public_limit))
            .map_err(|e| {
                error!("Error fetching posts: {}", e);
                BlogError::storage(Action::Load, e)
            })
    }

    /// 订阅源使用的已发布文章列表
    pub fn feed_posts(&self) -> BlogResult<Vec<BlogPost>> {
        self.store
            .list(Query::published(self.config.feed.limit))
            .map_err(|e| {
                error!("Error fetching feed posts: {}", e);
                BlogError::storage(Action::Load, e)
            })
    }

    /// 单篇公开文章，草稿视为不存在
    pub fn published_post(&self, id: Uuid) -> BlogResult<BlogPost> {
        match self.store.get(id) {
            Ok(post) if post.published => Ok(post),
            Ok(_) | Err(StoreError::NotFound(_)) => Err(BlogError::NotFound { id: id.to_string() }),
            Err(e) => {
                error!("Error fetching post {}: {}", id, e);
                Err(BlogError::storage(Action::Load, e))
            }
        }
    }

    /// 管理后台：全部文章（含草稿），任何已登录用户可查看
    pub fn admin_posts(&self, identity: &Identity) -> BlogResult<Vec<BlogPost>> {
        Self::require_signed_in(identity)?;
        self.store.list(Query::all()).map_err(|e| {
            error!("Error fetching posts: {}", e);
            BlogError::storage(Action::Load, e)
        })
    }

    /// 管理后台中的单篇文章（编辑对话框初始值）
    pub fn admin_post(&self, identity: &Identity, id: Uuid) -> BlogResult<BlogPost> {
        Self::require_signed_in(identity)?;
        self.store
            .get(id)
            .map_err(|e| Self::store_error(Action::Load, e))
    }

    /// 发布新文章
    pub fn publish(&self, identity: &Identity, post: NewPost) -> BlogResult<(BlogPost, Notice)> {
        let post = self.create(identity, NewPost { published: true, ..post }, Action::Publish)?;
        Ok((post, Notice::success("Blog post published successfully!")))
    }

    /// 保存草稿
    pub fn save_draft(&self, identity: &Identity, post: NewPost) -> BlogResult<(BlogPost, Notice)> {
        let post = self.create(identity, NewPost { published: false, ..post }, Action::SaveDraft)?;
        Ok((post, Notice::success("Draft saved successfully!")))
    }

    fn create(&self, identity: &Identity, post: NewPost, action: Action) -> BlogResult<BlogPost> {
        Self::require_admin(identity, action)?;
        let record = post.into_record(self.config.words_per_minute)?;

        let created = self.store.insert(record).map_err(|e| {
            error!("Error creating post: {}", e);
            BlogError::storage(action, e)
        })?;
        info!(
            "{} 创建文章 {} ({})",
            identity.user.as_deref().unwrap_or("-"),
            created.id,
            created.status_label()
        );
        Ok(created)
    }

    /// 保存编辑内容，不改变发布状态
    pub fn update(
        &self,
        identity: &Identity,
        id: Uuid,
        update: PostUpdate,
    ) -> BlogResult<(BlogPost, Notice)> {
        Self::require_admin(identity, Action::Update)?;
        update.validate()?;
        let update = update.normalized(self.config.words_per_minute)?;

        let post = self
            .store
            .update(id, &update)
            .map_err(|e| Self::store_error(Action::Update, e))?;
        info!("更新文章 {}", id);
        Ok((post, Notice::success("Post updated successfully")))
    }

    /// 切换发布状态
    pub fn toggle_publish(&self, identity: &Identity, id: Uuid) -> BlogResult<(BlogPost, Notice)> {
        Self::require_admin(identity, Action::Toggle)?;
        let current = self
            .store
            .get(id)
            .map_err(|e| Self::store_error(Action::Toggle, e))?;

        let post = self
            .store
            .set_published(id, !current.published)
            .map_err(|e| Self::store_error(Action::Toggle, e))?;
        let notice = if post.published {
            Notice::success("Post published")
        } else {
            Notice::success("Post unpublished")
        };
        info!("文章 {} 状态切换为 {}", id, post.status_label());
        Ok((post, notice))
    }

    /// 删除文章
    pub fn delete(&self, identity: &Identity, id: Uuid) -> BlogResult<Notice> {
        Self::require_admin(identity, Action::Delete)?;
        self.store
            .delete(id)
            .map_err(|e| Self::store_error(Action::Delete, e))?;
        info!("删除文章 {}", id);
        Ok(Notice::success("Post deleted successfully"))
    }

    fn require_signed_in(identity: &Identity) -> BlogResult<()> {
        if identity.is_signed_in() {
            Ok(())
        } else {
            Err(BlogError::Unauthenticated)
        }
    }

    fn require_admin(identity: &Identity, action: Action) -> BlogResult<()> {
        Self::require_signed_in(identity)?;
        if identity.is_admin {
            Ok(())
        } else {
            warn!(
                "拒绝 {} 执行 {}: 不是管理员",
                identity.user.as_deref().unwrap_or("-"),
                action
            );
            Err(BlogError::PermissionDenied { action })
        }
    }

    fn store_error(action: Action, err: StoreError) -> BlogError {
        match err {
            StoreError::NotFound(id) => BlogError::NotFound { id: id.to_string() },
            other => {
                error!("存储调用失败 ({}): {}", action, other);
                BlogError::storage(action, other)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Query};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 记录调用次数的存储，用于确认权限不足时没有发出调用
    struct CountingStore {
        inner: MemoryStore,
        mutations: AtomicUsize,
    }

    impl PostStore for CountingStore {
        fn insert(&self, record: crate::models::NewRecord) -> Result<BlogPost, StoreError> {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            self.inner.insert(record)
        }
        fn get(&self, id: Uuid) -> Result<BlogPost, StoreError> {
            self.inner.get(id)
        }
        fn list(&self, query: Query) -> Result<Vec<BlogPost>, StoreError> {
            self.inner.list(query)
        }
        fn update(&self, id: Uuid, update: &PostUpdate) -> Result<BlogPost, StoreError> {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            self.inner.update(id, update)
        }
        fn set_published(&self, id: Uuid, published: bool) -> Result<BlogPost, StoreError> {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            self.inner.set_published(id, published)
        }
        fn delete(&self, id: Uuid) -> Result<(), StoreError> {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(id)
        }
    }

    fn form(title: &str) -> NewPost {
        NewPost {
            title: title.into(),
            content: "Gradient boosting explained.".into(),
            category: "Machine Learning".into(),
            ..NewPost::default()
        }
    }

    #[test]
    fn non_admin_mutations_never_reach_the_store() {
        let store = Arc::new(CountingStore {
            inner: MemoryStore::new(),
            mutations: AtomicUsize::new(0),
        });
        let service = BlogService::new(store.clone(), Config::default());
        let admin = Identity::admin("editor@example.com");
        let reader = Identity::user("reader@example.com");

        let (post, _) = service.publish(&admin, form("seed")).unwrap();
        assert_eq!(store.mutations.load(Ordering::SeqCst), 1);

        let err = service.toggle_publish(&reader, post.id).unwrap_err();
        assert_eq!(err.notice().message, "You need admin privileges to modify posts");
        let err = service.delete(&reader, post.id).unwrap_err();
        assert_eq!(err.notice().message, "You need admin privileges to delete posts");
        let err = service
            .update(&reader, post.id, PostUpdate::from_post(&post))
            .unwrap_err();
        assert!(matches!(err, BlogError::PermissionDenied { action: Action::Update }));

        assert_eq!(store.mutations.load(Ordering::SeqCst), 1);
        // 非管理员仍可查看后台列表
        assert_eq!(service.admin_posts(&reader).unwrap().len(), 1);
    }

    #[test]
    fn anonymous_cannot_open_admin_list() {
        let service = BlogService::new(Arc::new(MemoryStore::new()), Config::default());
        assert!(matches!(
            service.admin_posts(&Identity::anonymous()),
            Err(BlogError::Unauthenticated)
        ));
    }

    #[test]
    fn invalid_form_is_rejected_before_insert() {
        let store = Arc::new(MemoryStore::new());
        let service = BlogService::new(store.clone(), Config::default());
        let err = service
            .publish(&Identity::admin("a@b.c"), NewPost { category: "".into(), ..form("x") })
            .unwrap_err();
        assert_eq!(err.notice().message, "Please fill in all required fields");
        assert!(store.is_empty());
    }

    #[test]
    fn incomplete_draft_asks_for_required_fields() {
        let store = Arc::new(MemoryStore::new());
        let service = BlogService::new(store.clone(), Config::default());
        let err = service
            .save_draft(&Identity::admin("a@b.c"), NewPost { content: " ".into(), ..form("x") })
            .unwrap_err();
        assert_eq!(
            err.notice().message,
            "Please fill in title, content, and category first"
        );
        assert!(store.is_empty());
    }

    #[test]
    fn drafts_are_not_public() {
        let service = BlogService::new(Arc::new(MemoryStore::new()), Config::default());
        let admin = Identity::admin("a@b.c");
        let (draft, notice) = service.save_draft(&admin, form("draft")).unwrap();
        assert_eq!(notice.message, "Draft saved successfully!");
        assert!(!draft.published);

        assert!(service.latest_published().unwrap().is_empty());
        assert!(matches!(
            service.published_post(draft.id),
            Err(BlogError::NotFound { .. })
        ));
    }

    #[test]
    fn toggle_notice_follows_new_state() {
        let service = BlogService::new(Arc::new(MemoryStore::new()), Config::default());
        let admin = Identity::admin("a@b.c");
        let (post, _) = service.publish(&admin, form("live")).unwrap();

        let (post, notice) = service.toggle_publish(&admin, post.id).unwrap();
        assert!(!post.published);
        assert_eq!(notice.message, "Post unpublished");

        let (post, notice) = service.toggle_publish(&admin, post.id).unwrap();
        assert!(post.published);
        assert_eq!(notice.message, "Post published");
    }

    #[test]
    fn update_keeps_published_flag() {
        let service = BlogService::new(Arc::new(MemoryStore::new()), Config::default());
        let admin = Identity::admin("a@b.c");
        let (post, _) = service.save_draft(&admin, form("before")).unwrap();

        let mut update = PostUpdate::from_post(&post);
        update.title = "after".into();
        update.read_time = None;
        let (updated, notice) = service.update(&admin, post.id, update).unwrap();

        assert_eq!(notice.message, "Post updated successfully");
        assert_eq!(updated.title, "after");
        assert!(!updated.published);
        assert_eq!(updated.id, post.id);
        assert_eq!(updated.created_at, post.created_at);
        assert_eq!(updated.read_time, "1 min read");
    }

    #[test]
    fn missing_post_maps_to_not_found() {
        let service = BlogService::new(Arc::new(MemoryStore::new()), Config::default());
        let admin = Identity::admin("a@b.c");
        let err = service.delete(&admin, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, BlogError::NotFound { .. }));
    }
}

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::{error, info};
use uuid::Uuid;

use super::{MemoryStore, PostStore, Query, StoreError};
use crate::models::{BlogPost, NewRecord, PostUpdate};

/// JSON 文件存储
///
/// 数据保存在内存中，每次修改成功后整体写回文件。
/// 写文件失败时撤销内存中的修改。修改操作串行执行，
/// 修改、写文件与撤销之间不会穿插其他写入。
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// 打开数据文件，不存在时从空表开始
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let posts: Vec<BlogPost> = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            Vec::new()
        };
        info!("从 {} 加载了 {} 篇文章", path.display(), posts.len());

        Ok(Self {
            path,
            inner: MemoryStore::from_posts(posts),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 先写入同目录下的临时文件，再原子替换数据文件
    fn persist(&self, rows: &[BlogPost]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(rows)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// 执行修改并写回文件，失败时恢复修改前的数据
    fn commit<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&MemoryStore) -> Result<T, StoreError>,
    {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let before = self.inner.snapshot()?;
        let value = f(&self.inner)?;
        let after = self.inner.snapshot()?;
        if let Err(e) = self.persist(&after) {
            error!("写入 {} 失败，撤销修改: {}", self.path.display(), e);
            self.inner.restore(before)?;
            return Err(e);
        }
        Ok(value)
    }
}

impl PostStore for FileStore {
    fn insert(&self, record: NewRecord) -> Result<BlogPost, StoreError> {
        self.commit(|rows| rows.insert(record))
    }

    fn get(&self, id: Uuid) -> Result<BlogPost, StoreError> {
        self.inner.get(id)
    }

    fn list(&self, query: Query) -> Result<Vec<BlogPost>, StoreError> {
        self.inner.list(query)
    }

    fn update(&self, id: Uuid, update: &PostUpdate) -> Result<BlogPost, StoreError> {
        self.commit(|rows| rows.update(id, update))
    }

    fn set_published(&self, id: Uuid, published: bool) -> Result<BlogPost, StoreError> {
        self.commit(|rows| rows.set_published(id, published))
    }

    fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.commit(|rows| rows.delete(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str) -> NewRecord {
        NewRecord {
            title: title.to_string(),
            excerpt: title.to_string(),
            content: "body".to_string(),
            category: "Statistics".to_string(),
            cover_image_url: Some("https://example.com/a.png".to_string()),
            read_time: "1 min read".to_string(),
            published: true,
        }
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("posts.json");

        let store = FileStore::open(&path).unwrap();
        let post = store.insert(record("persisted")).unwrap();
        store.set_published(post.id, false).unwrap();

        let reopened = FileStore::open(&path).unwrap();
        let loaded = reopened.get(post.id).unwrap();
        assert_eq!(loaded.title, "persisted");
        assert!(!loaded.published);
        assert_eq!(loaded.created_at, post.created_at);
    }

    #[test]
    fn failed_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // 目标路径是一个目录，rename 会失败
        let path = dir.path().join("posts.json");
        fs::create_dir_all(&path).unwrap();

        let store = FileStore {
            path: path.clone(),
            inner: MemoryStore::new(),
            write_lock: Mutex::new(()),
        };
        assert!(store.insert(record("lost")).is_err());
        assert!(store.list(Query::all()).unwrap().is_empty());
    }

    #[test]
    fn delete_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.json");

        let store = FileStore::open(&path).unwrap();
        let a = store.insert(record("a")).unwrap();
        store.insert(record("b")).unwrap();
        store.delete(a.id).unwrap();

        let reopened = FileStore::open(&path).unwrap();
        let titles: Vec<_> = reopened
            .list(Query::all())
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["b".to_string()]);
    }

    #[test]
    fn concurrent_inserts_are_all_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.json");
        let store = FileStore::open(&path).unwrap();

        std::thread::scope(|scope| {
            for t in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..25 {
                        store.insert(record(&format!("{}-{}", t, i))).unwrap();
                    }
                });
            }
        });

        assert_eq!(store.list(Query::all()).unwrap().len(), 200);
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.list(Query::all()).unwrap().len(), 200);
        // 没有遗留的临时文件
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}

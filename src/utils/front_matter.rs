use anyhow::{Context, Result};
use gray_matter::engine::YAML;
use gray_matter::Matter;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::models::NewPost;
use crate::utils::is_markdown_file;

/// 解析带 Front Matter 的 Markdown 文本
///
/// 支持的字段：`title`、`category`、`excerpt`、`cover`、`published`。
/// 没有标题时使用 `fallback_title`（通常是文件名）。
pub fn parse_post(raw: &str, fallback_title: &str) -> NewPost {
    let matter = Matter::<YAML>::new();
    let result = matter.parse(raw);

    let mut post = NewPost {
        title: fallback_title.to_string(),
        content: result.content.trim().to_string(),
        ..NewPost::default()
    };

    if let Some(data) = result.data {
        if let Ok(title) = data["title"].as_string() {
            post.title = title;
        }
        if let Ok(category) = data["category"].as_string() {
            post.category = category;
        }
        if let Ok(excerpt) = data["excerpt"].as_string() {
            post.excerpt = excerpt;
        }
        if let Ok(cover) = data["cover"].as_string() {
            post.cover_image = cover;
        }
        if let Ok(published) = data["published"].as_bool() {
            post.published = published;
        }
    }

    post
}

/// 读取单个文件
pub fn read_post(path: &Path) -> Result<NewPost> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("读取文件失败: {}", path.display()))?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled");
    Ok(parse_post(&raw, stem))
}

/// 遍历目录，收集所有 Markdown 文章（按路径排序）
pub fn collect_posts(dir: &Path) -> Result<Vec<(PathBuf, NewPost)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("跳过无法访问的路径: {}", e);
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() || !is_markdown_file(path) {
            continue;
        }
        debug!("发现文章: {}", path.display());
        files.push((path.to_path_buf(), read_post(path)?));
    }
    Ok(files)
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{Action, BlogError, BlogResult};
use crate::utils::read_time;

/// 博客文章（对应 `blog_posts` 表中的一行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    /// 唯一标识，创建后不可修改
    pub id: Uuid,
    /// 文章标题
    pub title: String,
    /// 文章摘要
    pub excerpt: String,
    /// 文章内容（原始Markdown）
    pub content: String,
    /// 分类
    pub category: String,
    /// 封面图片地址
    pub cover_image_url: Option<String>,
    /// 阅读时间，如 "3 min read"
    pub read_time: String,
    /// 是否公开
    pub published: bool,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl BlogPost {
    pub fn status_label(&self) -> &'static str {
        if self.published {
            "Published"
        } else {
            "Draft"
        }
    }
}

/// 写作表单提交的内容
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPost {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, alias = "cover_image_url")]
    pub cover_image: String,
    #[serde(default)]
    pub published: bool,
}

/// 准备写入存储的记录，id 和创建时间由存储分配
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub category: String,
    pub cover_image_url: Option<String>,
    pub read_time: String,
    pub published: bool,
}

impl NewPost {
    /// 检查必填字段：标题、内容、分类
    pub fn validate(&self) -> BlogResult<()> {
        let action = if self.published {
            Action::Publish
        } else {
            Action::SaveDraft
        };
        require_fields(action, &self.title, &self.content, &self.category)
    }

    /// 转换为存储记录：摘要为空时使用标题，计算阅读时间
    pub fn into_record(self, words_per_minute: usize) -> BlogResult<NewRecord> {
        self.validate()?;

        let excerpt = if self.excerpt.trim().is_empty() {
            self.title.clone()
        } else {
            self.excerpt
        };
        let read_time = read_time::calculate(&self.content, words_per_minute);

        Ok(NewRecord {
            title: self.title,
            excerpt,
            cover_image_url: normalize_cover(&self.cover_image)?,
            read_time,
            content: self.content,
            category: self.category,
            published: self.published,
        })
    }
}

/// 编辑对话框提交的修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostUpdate {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    /// 为空时根据新内容重新计算
    #[serde(default)]
    pub read_time: Option<String>,
}

impl PostUpdate {
    /// 以现有文章为初始值（对应打开编辑对话框）
    pub fn from_post(post: &BlogPost) -> Self {
        Self {
            title: post.title.clone(),
            excerpt: post.excerpt.clone(),
            content: post.content.clone(),
            category: post.category.clone(),
            cover_image_url: post.cover_image_url.clone(),
            read_time: Some(post.read_time.clone()),
        }
    }

    /// 编辑时同样要求标题、内容、分类
    pub fn validate(&self) -> BlogResult<()> {
        require_fields(Action::Update, &self.title, &self.content, &self.category)
    }

    pub(crate) fn normalized(mut self, words_per_minute: usize) -> BlogResult<Self> {
        self.cover_image_url = match self.cover_image_url.as_deref() {
            Some(raw) => normalize_cover(raw)?,
            None => None,
        };
        if self.read_time.as_deref().map_or(true, |t| t.trim().is_empty()) {
            self.read_time = Some(read_time::calculate(&self.content, words_per_minute));
        }
        Ok(self)
    }

    pub(crate) fn apply_to(&self, post: &mut BlogPost) {
        post.title = self.title.clone();
        post.excerpt = self.excerpt.clone();
        post.content = self.content.clone();
        post.category = self.category.clone();
        post.cover_image_url = self.cover_image_url.clone();
        if let Some(read_time) = &self.read_time {
            post.read_time = read_time.clone();
        }
    }
}

fn require_fields(action: Action, title: &str, content: &str, category: &str) -> BlogResult<()> {
    let fields: Vec<&'static str> = [("title", title), ("content", content), ("category", category)]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
    if fields.is_empty() {
        Ok(())
    } else {
        Err(BlogError::Validation { action, fields })
    }
}

fn normalize_cover(raw: &str) -> BlogResult<Option<String>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    Url::parse(raw)
        .map(|url| Some(url.to_string()))
        .map_err(|_| BlogError::InvalidCoverUrl {
            url: raw.to_string(),
        })
}

/// 调用方身份，由外部认证服务提供
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// 登录用户（邮箱），匿名时为空
    pub user: Option<String>,
    /// 是否拥有管理员角色
    pub is_admin: bool,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(email: impl Into<String>) -> Self {
        Self {
            user: Some(email.into()),
            is_admin: false,
        }
    }

    pub fn admin(email: impl Into<String>) -> Self {
        Self {
            user: Some(email.into()),
            is_admin: true,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// 提示消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

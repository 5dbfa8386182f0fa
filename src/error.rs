use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::Notice;

/// 博客操作错误类型
#[derive(Error, Debug)]
pub enum BlogError {
    #[error("{action} 缺少必填字段: {fields:?}")]
    Validation {
        action: Action,
        fields: Vec<&'static str>,
    },

    #[error("无效的封面图片地址: {url}")]
    InvalidCoverUrl {
        url: String,
    },

    #[error("需要登录")]
    Unauthenticated,

    #[error("权限不足: {action}")]
    PermissionDenied {
        action: Action,
    },

    #[error("文章不存在: {id}")]
    NotFound {
        id: String,
    },

    #[error("存储错误: 执行 {action} 时出错: {message}")]
    Storage {
        action: Action,
        message: String,
    },
}

/// 需要区分提示文案的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Load,
    Publish,
    SaveDraft,
    Update,
    Toggle,
    Delete,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Action::Load => "load",
            Action::Publish => "publish",
            Action::SaveDraft => "save_draft",
            Action::Update => "update",
            Action::Toggle => "toggle",
            Action::Delete => "delete",
        };
        f.write_str(name)
    }
}

impl BlogError {
    pub fn storage(action: Action, err: impl std::fmt::Display) -> Self {
        BlogError::Storage {
            action,
            message: err.to_string(),
        }
    }

    /// 给用户看的失败提示
    pub fn notice(&self) -> Notice {
        let message = match self {
            BlogError::Validation { action: Action::SaveDraft, .. } => {
                "Please fill in title, content, and category first"
            }
            BlogError::Validation { .. } => "Please fill in all required fields",
            BlogError::InvalidCoverUrl { .. } => "Cover image must be a valid URL",
            BlogError::Unauthenticated => "Please sign in to continue",
            BlogError::PermissionDenied { action: Action::Delete } => {
                "You need admin privileges to delete posts"
            }
            BlogError::PermissionDenied { .. } => "You need admin privileges to modify posts",
            BlogError::NotFound { .. } => "Post not found",
            BlogError::Storage { action, .. } => match action {
                Action::Load => "Failed to load posts",
                Action::Publish => "Failed to publish post. Please try again.",
                Action::SaveDraft => "Failed to save draft. Please try again.",
                Action::Update | Action::Toggle => "Failed to update post",
                Action::Delete => "Failed to delete post",
            },
        };
        Notice::error(message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            BlogError::Validation { .. } | BlogError::InvalidCoverUrl { .. } => {
                StatusCode::BAD_REQUEST
            }
            BlogError::Unauthenticated => StatusCode::UNAUTHORIZED,
            BlogError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            BlogError::NotFound { .. } => StatusCode::NOT_FOUND,
            BlogError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BlogError {
    fn into_response(self) -> Response {
        let body = json!({ "notice": self.notice() });
        (self.status(), Json(body)).into_response()
    }
}

pub type BlogResult<T> = Result<T, BlogError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoticeLevel;

    #[test]
    fn delete_permission_has_its_own_notice() {
        let err = BlogError::PermissionDenied { action: Action::Delete };
        assert_eq!(err.notice().message, "You need admin privileges to delete posts");

        let err = BlogError::PermissionDenied { action: Action::Toggle };
        assert_eq!(err.notice().message, "You need admin privileges to modify posts");
        assert_eq!(err.notice().level, NoticeLevel::Error);
    }

    #[test]
    fn draft_validation_has_its_own_notice() {
        let draft = BlogError::Validation {
            action: Action::SaveDraft,
            fields: vec!["title"],
        };
        assert_eq!(
            draft.notice().message,
            "Please fill in title, content, and category first"
        );

        let publish = BlogError::Validation {
            action: Action::Publish,
            fields: vec!["title"],
        };
        assert_eq!(publish.notice().message, "Please fill in all required fields");
        assert_eq!(publish.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn errors_map_to_status_codes() {
        assert_eq!(BlogError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            BlogError::NotFound { id: "x".into() }.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            BlogError::storage(Action::Load, "disk full").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

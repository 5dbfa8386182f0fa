use std::collections::HashMap;

use crate::models::config::AuthConfig;
use crate::models::Identity;

/// 身份解析接口
///
/// 登录、会话和角色管理由外部认证服务完成，这里只把请求携带的令牌
/// 映射为调用方身份。
pub trait IdentityProvider: Send + Sync {
    fn resolve(&self, token: Option<&str>) -> Identity;
}

/// 基于配置文件中令牌列表的身份解析
#[derive(Debug, Clone, Default)]
pub struct TokenIdentityProvider {
    users: HashMap<String, Identity>,
}

impl TokenIdentityProvider {
    pub fn from_config(config: &AuthConfig) -> Self {
        let users = config
            .users
            .iter()
            .map(|u| {
                let identity = Identity {
                    user: Some(u.email.clone()),
                    is_admin: u.admin,
                };
                (u.token.clone(), identity)
            })
            .collect();
        Self { users }
    }
}

impl IdentityProvider for TokenIdentityProvider {
    fn resolve(&self, token: Option<&str>) -> Identity {
        token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .and_then(|t| self.users.get(t).cloned())
            .unwrap_or_else(Identity::anonymous)
    }
}

/// 从 `Authorization: Bearer <token>` 中取出令牌
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim())
    } else {
        None
    }
}

/// 从 Cookie 头中取出 `blog_token`
pub fn cookie_token(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == "blog_token")
        .map(|(_, value)| value)
}

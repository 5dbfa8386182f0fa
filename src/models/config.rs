use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub url: Option<String>,
    /// 首页展示的最新文章数量
    pub public_limit: usize,
    /// 每分钟阅读字数
    pub words_per_minute: usize,
    /// 写作表单中的分类选项
    pub categories: Vec<String>,
    /// 首页主题网格
    pub topics: Vec<TopicConfig>,
    pub store: StoreConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// JSON 数据文件路径（kind = file 时使用）
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub users: Vec<UserConfig>,
}

/// 外部认证服务签发的令牌与角色映射
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub token: String,
    pub email: String,
    #[serde(default)]
    pub admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub enable: bool,
    pub limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "DataPulse".to_string(),
            subtitle: Some("Insights on data science, machine learning and AI".to_string()),
            description: None,
            author: None,
            language: Some("en".to_string()),
            url: Some("http://localhost:4000".to_string()),
            public_limit: 6,
            words_per_minute: 200,
            categories: [
                "Machine Learning",
                "Deep Learning",
                "Data Engineering",
                "AI Ethics",
                "Neural Networks",
                "Analytics",
                "Python",
                "Statistics",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            topics: [
                ("Machine Learning", 45),
                ("Big Data", 32),
                ("Data Privacy", 28),
                ("Deep Learning", 38),
                ("Analytics", 24),
                ("MLOps", 19),
            ]
            .iter()
            .map(|(name, count)| TopicConfig {
                name: name.to_string(),
                count: *count,
            })
            .collect(),
            store: StoreConfig::default(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Memory,
            path: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enable: true,
            limit: 20,
        }
    }
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// 加载配置，文件不存在时使用默认值
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }
}

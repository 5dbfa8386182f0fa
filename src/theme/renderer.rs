use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context as TeraContext, Tera};
use tracing::{debug, error};

use crate::models::{BlogPost, Config, Identity, NewPost, Notice};
use crate::utils::{markdown, slugify};

// 嵌入的模板文件
mod templates {
    pub const LAYOUT_HTML: &str = include_str!("../../embed/templates/layout.html");
    pub const INDEX_HTML: &str = include_str!("../../embed/templates/index.html");
    pub const POST_HTML: &str = include_str!("../../embed/templates/post.html");
    pub const ADMIN_HTML: &str = include_str!("../../embed/templates/admin.html");
    pub const WRITE_HTML: &str = include_str!("../../embed/templates/write.html");
}

/// 模板中使用的站点信息
#[derive(Debug, Serialize)]
struct SiteView<'a> {
    title: &'a str,
    subtitle: Option<&'a str>,
    description: Option<&'a str>,
    language: Option<&'a str>,
    feed: bool,
}

#[derive(Debug, Serialize)]
struct TopicView<'a> {
    name: &'a str,
    slug: String,
    count: u32,
}

#[derive(Debug, Serialize)]
struct IdentityView<'a> {
    signed_in: bool,
    user: Option<&'a str>,
    is_admin: bool,
}

/// 页面渲染器
#[derive(Clone)]
pub struct ThemeRenderer {
    /// 模板引擎
    pub tera: Tera,
    /// 站点配置
    pub config: Config,
}

impl ThemeRenderer {
    /// 创建渲染器并加载内置模板
    pub fn new(config: Config) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("layout.html", templates::LAYOUT_HTML),
            ("index.html", templates::INDEX_HTML),
            ("post.html", templates::POST_HTML),
            ("admin.html", templates::ADMIN_HTML),
            ("write.html", templates::WRITE_HTML),
        ])?;

        Self::register_filters(&mut tera);

        Ok(ThemeRenderer { tera, config })
    }

    /// 注册模板过滤器
    fn register_filters(tera: &mut Tera) {
        tera.register_filter("date_format", Self::date_format_filter);
        tera.register_filter("markdown", Self::markdown_filter);
    }

    /// 所有页面共享的上下文
    fn base_context(&self, notice: Option<&Notice>) -> TeraContext {
        let mut context = TeraContext::new();
        context.insert(
            "site",
            &SiteView {
                title: &self.config.title,
                subtitle: self.config.subtitle.as_deref(),
                description: self.config.description.as_deref(),
                language: self.config.language.as_deref(),
                feed: self.config.feed.enable,
            },
        );
        context.insert("notice", &notice);
        context.insert("year", &Utc::now().year());
        context
    }

    /// 首页：最新文章、主题网格、订阅表单
    pub fn render_index(&self, posts: &[BlogPost], notice: Option<&Notice>) -> Result<String> {
        let mut context = self.base_context(notice);
        let topics: Vec<TopicView> = self
            .config
            .topics
            .iter()
            .map(|t| TopicView {
                name: &t.name,
                slug: slugify(&t.name),
                count: t.count,
            })
            .collect();
        context.insert("posts", posts);
        context.insert("topics", &topics);
        self.render("index.html", &context)
    }

    /// 单篇文章页面
    pub fn render_post(&self, post: &BlogPost) -> Result<String> {
        let mut context = self.base_context(None);
        context.insert("post", post);
        self.render("post.html", &context)
    }

    /// 管理后台
    pub fn render_admin(
        &self,
        identity: &Identity,
        posts: &[BlogPost],
        editing: Option<&BlogPost>,
        notice: Option<&Notice>,
    ) -> Result<String> {
        let mut context = self.base_context(notice);
        context.insert(
            "identity",
            &IdentityView {
                signed_in: identity.is_signed_in(),
                user: identity.user.as_deref(),
                is_admin: identity.is_admin,
            },
        );
        context.insert("posts", posts);
        context.insert("editing", &editing);
        self.render("admin.html", &context)
    }

    /// 写作页面，`form` 用于回填上次提交的内容
    pub fn render_write(&self, form: &NewPost, notice: Option<&Notice>) -> Result<String> {
        let mut context = self.base_context(notice);
        context.insert("form", form);
        context.insert("categories", &self.config.categories);
        self.render("write.html", &context)
    }

    fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        debug!("渲染模板 {}", template);
        match self.tera.render(template, context) {
            Ok(result) => Ok(result),
            Err(e) => {
                error!("模板渲染失败: {:?}", e);
                Err(anyhow!(e))
            }
        }
    }

    fn date_format_filter(value: &tera::Value, args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
        if let Some(date) = value.as_str().and_then(|s| DateTime::parse_from_rfc3339(s).ok()) {
            let format = args.get("format")
                .and_then(|f| f.as_str())
                .unwrap_or("%b %-d, %Y");
            Ok(tera::Value::String(date.format(format).to_string()))
        } else {
            Ok(value.clone())
        }
    }

    fn markdown_filter(value: &tera::Value, _args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
        match value.as_str() {
            Some(text) => Ok(tera::Value::String(markdown::render(text))),
            None => Ok(value.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn post(title: &str, published: bool) -> BlogPost {
        BlogPost {
            id: Uuid::new_v4(),
            title: title.into(),
            excerpt: "An excerpt".into(),
            content: "## Heading\n\nSome *markdown*.".into(),
            category: "Neural Networks".into(),
            cover_image_url: None,
            read_time: "4 min read".into(),
            published,
            created_at: Utc.with_ymd_and_hms(2025, 12, 18, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn index_shows_cards_and_topics() {
        let renderer = ThemeRenderer::new(Config::default()).unwrap();
        let html = renderer
            .render_index(&[post("Sparse Attention <Tricks>", true)], None)
            .unwrap();
        assert!(html.contains("Sparse Attention &lt;Tricks&gt;"));
        assert!(html.contains("Dec 18, 2025"));
        assert!(html.contains("4 min read"));
        assert!(html.contains("topic-machine-learning"));
        assert!(html.contains("action=\"/newsletter\""));
    }

    #[test]
    fn empty_index_has_fallback() {
        let renderer = ThemeRenderer::new(Config::default()).unwrap();
        let notice = Notice::error("Failed to load posts");
        let html = renderer.render_index(&[], Some(&notice)).unwrap();
        assert!(html.contains("No articles published yet."));
        assert!(html.contains("Failed to load posts"));
    }

    #[test]
    fn post_content_is_rendered_as_markdown() {
        let renderer = ThemeRenderer::new(Config::default()).unwrap();
        let html = renderer.render_post(&post("Deep dive", true)).unwrap();
        assert!(html.contains("<h2>Heading</h2>"));
        assert!(html.contains("<em>markdown</em>"));
    }

    #[test]
    fn admin_actions_only_for_admins() {
        let renderer = ThemeRenderer::new(Config::default()).unwrap();
        let posts = vec![post("Live", true), post("Hidden", false)];

        let html = renderer
            .render_admin(&Identity::user("reader@example.com"), &posts, None, None)
            .unwrap();
        assert!(html.contains("Draft"));
        assert!(html.contains("don't have admin privileges"));
        assert!(!html.contains("/toggle"));

        let html = renderer
            .render_admin(&Identity::admin("editor@example.com"), &posts, Some(&posts[1]), None)
            .unwrap();
        assert!(html.contains("/toggle"));
        assert!(html.contains("Unpublish"));
        assert!(html.contains("Edit Post"));
    }

    #[test]
    fn write_form_lists_categories() {
        let renderer = ThemeRenderer::new(Config::default()).unwrap();
        let form = NewPost {
            category: "Python".into(),
            ..NewPost::default()
        };
        let html = renderer.render_write(&form, None).unwrap();
        assert!(html.contains("<option value=\"Python\" selected>"));
        assert!(html.contains("value=\"draft\""));
    }
}

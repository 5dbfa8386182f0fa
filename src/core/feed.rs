use rss::{Category, Channel, Guid, Item};

use crate::models::{BlogPost, Config};

/// 生成已发布文章的 RSS 2.0 订阅源
pub fn rss_channel(config: &Config, posts: &[BlogPost]) -> Channel {
    let base = config.url.clone().unwrap_or_default();
    let base = base.trim_end_matches('/');

    let mut channel = Channel::default();
    channel.set_title(config.title.clone());
    channel.set_link(format!("{}/", base));
    channel.set_description(
        config
            .description
            .clone()
            .or_else(|| config.subtitle.clone())
            .unwrap_or_default(),
    );
    channel.set_language(config.language.clone());

    for post in posts.iter().filter(|p| p.published) {
        let link = format!("{}/posts/{}", base, post.id);

        let mut category = Category::default();
        category.set_name(post.category.clone());

        let mut item = Item::default();
        item.set_title(post.title.clone());
        item.set_link(link.clone());
        item.set_guid(Guid {
            value: link,
            permalink: true,
        });
        item.set_pub_date(post.created_at.to_rfc2822());
        item.set_description(post.excerpt.clone());
        item.set_categories(vec![category]);
        channel.items.push(item);
    }

    channel
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn post(title: &str, published: bool) -> BlogPost {
        BlogPost {
            id: Uuid::new_v4(),
            title: title.into(),
            excerpt: format!("{} excerpt", title),
            content: "body".into(),
            category: "MLOps".into(),
            cover_image_url: None,
            read_time: "1 min read".into(),
            published,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn only_published_posts_become_items() {
        let config = Config::default();
        let live = post("Live", true);
        let channel = rss_channel(&config, &[live.clone(), post("Draft", false)]);

        assert_eq!(channel.items.len(), 1);
        let item = &channel.items[0];
        assert_eq!(item.title(), Some("Live"));
        assert_eq!(
            item.link(),
            Some(format!("http://localhost:4000/posts/{}", live.id).as_str())
        );
        assert!(channel.to_string().contains("<category>MLOps</category>"));
    }
}

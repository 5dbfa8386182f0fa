use chrono::{DateTime, Utc};
use std::path::Path;

pub mod front_matter;
pub mod markdown;
pub mod read_time;

/// 生成 URL 友好的别名
pub fn slugify(text: &str) -> String {
    slug::slugify(text)
}

/// 检查文件是否为 Markdown 文件
pub fn is_markdown_file<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    if let Some(ext) = path.extension() {
        ext == "md" || ext == "markdown"
    } else {
        false
    }
}

/// 卡片上显示的日期，如 "Dec 18, 2025"
pub fn display_date(date: &DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// 截取摘要，超出部分以省略号结尾
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_card_date() {
        let date = Utc.with_ymd_and_hms(2025, 12, 8, 10, 0, 0).unwrap();
        assert_eq!(display_date(&date), "Dec 8, 2025");
    }

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate_chars("数据科学博客", 2), "数据...");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn slugifies_topics() {
        assert_eq!(slugify("Machine Learning"), "machine-learning");
        assert!(is_markdown_file("post.md"));
        assert!(!is_markdown_file("post.txt"));
    }
}

/// 默认阅读速度：每分钟200个单词
pub const WORDS_PER_MINUTE: usize = 200;

/// 统计单词数（按空白分隔）
pub fn count_words(content: &str) -> usize {
    content.split_whitespace().count()
}

/// 计算阅读时间，向上取整，至少为1分钟
pub fn minutes(content: &str, words_per_minute: usize) -> usize {
    let wpm = words_per_minute.max(1);
    let words = count_words(content).max(1);
    words.div_ceil(wpm)
}

/// 生成 "N min read" 形式的阅读时间
pub fn calculate(content: &str, words_per_minute: usize) -> String {
    format!("{} min read", minutes(content, words_per_minute))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_to_whole_minutes() {
        assert_eq!(calculate("hello", WORDS_PER_MINUTE), "1 min read");
        assert_eq!(calculate(&"word ".repeat(400), WORDS_PER_MINUTE), "2 min read");
        assert_eq!(calculate(&"word ".repeat(401), WORDS_PER_MINUTE), "3 min read");
    }

    #[test]
    fn blank_content_is_one_minute() {
        assert_eq!(calculate("   \n ", WORDS_PER_MINUTE), "1 min read");
    }

    #[test]
    fn huge_reading_speed_does_not_overflow() {
        assert_eq!(minutes("a few words here", usize::MAX), 1);
        assert_eq!(minutes("", 0), 1);
    }

    #[test]
    fn mixed_whitespace_counts_words() {
        assert_eq!(count_words("  one\ttwo\n\nthree  "), 3);
    }
}

//! Theme name extraction

use regex::Regex;
use std::sync::LazyLock;

static THEME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)\btheme[:\s]+["']?([A-Za-z0-9_-]+)"#,
        r#"主题[:\s：]+["']?([A-Za-z0-9_-]+)"#,
        r"(?i)/themes?/([A-Za-z0-9_-]+)/",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("theme pattern is valid"))
    .collect()
});

/// Tokens that follow "theme" in prose or CSS without naming a theme
const STOPLIST: &[&str] = &[
    "the", "this", "a", "an", "is", "by", "and", "of", "for", "to", "color", "colors", "dark",
    "light", "default", "auto", "mode", "system", "toggle", "switch", "css", "js", "assets",
    "static", "name", "config",
];

/// First theme name mentioned in the page, in pattern order
pub fn detect_theme(html: &str) -> Option<String> {
    THEME_PATTERNS.iter().find_map(|re| {
        re.captures_iter(html)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .find(|token| is_theme_name(token))
            .map(|token| token.to_string())
    })
}

fn is_theme_name(token: &str) -> bool {
    let lower = token.to_lowercase();
    !STOPLIST.contains(&lower.as_str()) && !lower.chars().all(|c| c.is_ascii_digit())
}

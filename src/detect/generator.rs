//! Site-generator signatures
//!
//! The signature table is an ordered list and order is policy: when a page
//! carries markers of two generators, the one declared first wins. A Hexo
//! site that embeds a Gatsby widget is reported as Hexo. This is a known
//! imprecision of marker matching and is accepted as is.

use regex::{Regex, RegexBuilder};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Site generator (static site generator, CMS or hosted platform)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generator {
    Hexo,
    Hugo,
    Astro,
    Vitepress,
    Vuepress,
    Gatsby,
    Nextjs,
    Jekyll,
    Wordpress,
    Typecho,
    Ghost,
    Gridea,
    Halo,
    #[serde(rename = "11ty")]
    Eleventy,
    Nuxt,
    Zola,
    Pelican,
    Mkdocs,
    Docsify,
    Docusaurus,
    Notion,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Generator {
    /// Stable lower-case identifier, as stored in node records
    pub fn as_str(&self) -> &'static str {
        match self {
            Generator::Hexo => "hexo",
            Generator::Hugo => "hugo",
            Generator::Astro => "astro",
            Generator::Vitepress => "vitepress",
            Generator::Vuepress => "vuepress",
            Generator::Gatsby => "gatsby",
            Generator::Nextjs => "nextjs",
            Generator::Jekyll => "jekyll",
            Generator::Wordpress => "wordpress",
            Generator::Typecho => "typecho",
            Generator::Ghost => "ghost",
            Generator::Gridea => "gridea",
            Generator::Halo => "halo",
            Generator::Eleventy => "11ty",
            Generator::Nuxt => "nuxt",
            Generator::Zola => "zola",
            Generator::Pelican => "pelican",
            Generator::Mkdocs => "mkdocs",
            Generator::Docsify => "docsify",
            Generator::Docusaurus => "docusaurus",
            Generator::Notion => "notion",
            Generator::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Generator::Unknown
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Signature {
    generator: Generator,
    /// Matched against `<meta name="generator">` content and generator headers
    meta: Vec<Regex>,
    /// Matched against the raw page
    body: Vec<Regex>,
}

fn patterns(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .expect("generator signature pattern is valid")
        })
        .collect()
}

fn signature(generator: Generator, meta: &[&str], body: &[&str]) -> Signature {
    Signature {
        generator,
        meta: patterns(meta),
        body: patterns(body),
    }
}

static SIGNATURES: LazyLock<Vec<Signature>> = LazyLock::new(|| {
    vec![
        signature(
            Generator::Hexo,
            &[r"\bhexo\b"],
            &[r"powered by.{0,80}hexo", r"hexo-[\w.-]*\.(js|css)", r"/lib/hexo"],
        ),
        signature(
            Generator::Hugo,
            &[r"\bhugo\b"],
            &[r"data-hugo", r"hugo-[\w.-]*\.js", r"/hugo_stats\.json"],
        ),
        signature(
            Generator::Astro,
            &[r"\bastro\b"],
            &[r"astro-island", r"astro-slot", r"/_astro/", r"data-astro"],
        ),
        signature(
            Generator::Vitepress,
            &[r"vitepress"],
            &[r"vitepress", r"VPContent", r"VPDoc"],
        ),
        signature(
            Generator::Vuepress,
            &[r"vuepress"],
            &[r"vuepress", r"theme-container"],
        ),
        signature(
            Generator::Gatsby,
            &[r"\bgatsby\b"],
            &[r"___gatsby", r"gatsby-", r"/page-data/"],
        ),
        signature(
            Generator::Nextjs,
            &[r"next\.js"],
            &[r"/_next/", r"__NEXT_DATA__", r"next/dist"],
        ),
        signature(
            Generator::Jekyll,
            &[r"\bjekyll\b"],
            &[r"\bjekyll\b", r"powered by.{0,80}jekyll"],
        ),
        signature(
            Generator::Wordpress,
            &[r"wordpress"],
            &[r"/wp-content/", r"/wp-includes/", r"wp-json"],
        ),
        signature(
            Generator::Typecho,
            &[r"typecho"],
            &[r"typecho", r"powered by.{0,80}typecho"],
        ),
        signature(
            Generator::Ghost,
            &[r"\bghost\b"],
            &[r"/assets/built/", r"ghost-(portal|search|sdk)", r"/content/images/"],
        ),
        signature(
            Generator::Gridea,
            &[r"gridea"],
            &[r"gridea", r"powered by.{0,80}gridea"],
        ),
        signature(
            Generator::Halo,
            &[r"\bhalo\b"],
            &[r"powered by.{0,80}\bhalo\b", r"/themes/[^\s\x22']*halo", r"halo\.run"],
        ),
        signature(
            Generator::Eleventy,
            &[r"eleventy", r"\b11ty\b"],
            &[r"eleventy", r"\b11ty\b"],
        ),
        signature(
            Generator::Nuxt,
            &[r"\bnuxt\b"],
            &[r"__nuxt", r"/_nuxt/", r"\bnuxt\b"],
        ),
        signature(
            Generator::Zola,
            &[r"\bzola\b"],
            &[r"\bzola\b", r"powered by.{0,80}zola"],
        ),
        signature(
            Generator::Pelican,
            &[r"\bpelican\b"],
            &[r"\bpelican\b", r"powered by.{0,80}pelican"],
        ),
        signature(Generator::Mkdocs, &[r"mkdocs"], &[r"mkdocs"]),
        signature(Generator::Docsify, &[], &[r"docsify"]),
        signature(
            Generator::Docusaurus,
            &[r"docusaurus"],
            &[r"docusaurus"],
        ),
        signature(
            Generator::Notion,
            &[],
            &[r"notion-", r"super\.so", r"notion\.site"],
        ),
    ]
});

/// Headers some platforms use to announce themselves
const GENERATOR_HEADERS: &[&str] = &["x-generator", "x-powered-by"];

/// `<meta name="generator">` contents, joined
pub fn meta_generator(document: &Html) -> String {
    let Ok(selector) = Selector::parse("meta[name][content]") else {
        return String::new();
    };

    document
        .select(&selector)
        .filter(|e| {
            e.value()
                .attr("name")
                .is_some_and(|n| n.trim().eq_ignore_ascii_case("generator"))
        })
        .filter_map(|e| e.value().attr("content"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_match(text: &str, select: impl Fn(&Signature) -> &[Regex]) -> Option<Generator> {
    if text.is_empty() {
        return None;
    }
    SIGNATURES
        .iter()
        .find(|sig| select(sig).iter().any(|re| re.is_match(text)))
        .map(|sig| sig.generator)
}

/// Classify the generator of a page.
///
/// The declared generator (meta tag, then generator headers) is consulted
/// first; only when it names nothing known is the page body scanned for
/// structural markers. Both passes walk the table in declaration order.
pub fn detect_generator(document: &Html, html: &str, headers: &[(String, String)]) -> Generator {
    let declared = meta_generator(document);
    if let Some(generator) = first_match(&declared, |s| s.meta.as_slice()) {
        return generator;
    }

    let announced: String = headers
        .iter()
        .filter(|(name, _)| GENERATOR_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h)))
        .map(|(_, value)| value.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    if let Some(generator) = first_match(&announced, |s| s.meta.as_slice()) {
        return generator;
    }

    first_match(html, |s| s.body.as_slice()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(html: &str) -> Generator {
        detect_generator(&Html::parse_document(html), html, &[])
    }

    #[test]
    fn test_every_signature_compiles() {
        assert!(!SIGNATURES.is_empty());
        for sig in SIGNATURES.iter() {
            assert!(
                !sig.meta.is_empty() || !sig.body.is_empty(),
                "{:?} has no patterns",
                sig.generator
            );
        }
    }

    #[test]
    fn test_meta_generator_wins() {
        let html = r#"<html><head><meta name="generator" content="Hugo 0.120.4"></head>
            <body><script src="/_next/static/x.js"></script></body></html>"#;
        assert_eq!(detect(html), Generator::Hugo);
    }

    #[test]
    fn test_meta_name_is_case_insensitive() {
        let html = r#"<meta content="WordPress 6.4" name="Generator">"#;
        assert_eq!(detect(html), Generator::Wordpress);
    }

    #[test]
    fn test_body_markers() {
        assert_eq!(
            detect(r#"<link rel="stylesheet" href="/wp-content/themes/x/style.css">"#),
            Generator::Wordpress
        );
        assert_eq!(
            detect(r#"<script id="__NEXT_DATA__" type="application/json">{}</script>"#),
            Generator::Nextjs
        );
        assert_eq!(
            detect("<footer>Powered by <a href='https://hexo.io'>Hexo</a></footer>"),
            Generator::Hexo
        );
    }

    #[test]
    fn test_table_order_breaks_ties() {
        let html = r#"<div id="___gatsby"></div><footer>Powered by Hexo</footer>"#;
        assert_eq!(detect(html), Generator::Hexo);
    }

    #[test]
    fn test_header_announcement() {
        let html = "<p>plain</p>";
        let headers = vec![("x-powered-by".to_string(), "Ghost 5.0".to_string())];
        assert_eq!(
            detect_generator(&Html::parse_document(html), html, &headers),
            Generator::Ghost
        );
    }

    #[test]
    fn test_unknown_sentinel() {
        assert_eq!(detect("<html><body><p>hello</p></body></html>"), Generator::Unknown);
        assert_eq!(detect(""), Generator::Unknown);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Generator::Eleventy).unwrap(), "\"11ty\"");
        assert_eq!(serde_json::to_string(&Generator::Nextjs).unwrap(), "\"nextjs\"");
        let parsed: Generator = serde_json::from_str("\"blogger\"").unwrap();
        assert_eq!(parsed, Generator::Unknown);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let html = r#"<meta name="generator" content="Typecho 1.2"><div class="giscus"></div>"#;
        let first = detect(html);
        for _ in 0..5 {
            assert_eq!(detect(html), first);
        }
    }
}

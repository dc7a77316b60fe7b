//! Comment-system signatures

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Comment platform found on a page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    Giscus,
    Waline,
    Twikoo,
    Artalk,
    Disqus,
    Utterances,
    Gitalk,
    Valine,
    Cusdis,
    Isso,
    Remark42,
    Commento,
    Discuss,
    /// A comment section exists but its platform is unidentified
    #[serde(rename = "unknown-present", alias = "unknown")]
    UnknownPresent,
    /// No comment section found
    #[default]
    #[serde(rename = "none")]
    #[serde(other)]
    Absent,
}

impl CommentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentKind::Giscus => "giscus",
            CommentKind::Waline => "waline",
            CommentKind::Twikoo => "twikoo",
            CommentKind::Artalk => "artalk",
            CommentKind::Disqus => "disqus",
            CommentKind::Utterances => "utterances",
            CommentKind::Gitalk => "gitalk",
            CommentKind::Valine => "valine",
            CommentKind::Cusdis => "cusdis",
            CommentKind::Isso => "isso",
            CommentKind::Remark42 => "remark42",
            CommentKind::Commento => "commento",
            CommentKind::Discuss => "discuss",
            CommentKind::UnknownPresent => "unknown-present",
            CommentKind::Absent => "none",
        }
    }

    /// Whether a specific platform was identified
    pub fn is_identified(&self) -> bool {
        !matches!(self, CommentKind::UnknownPresent | CommentKind::Absent)
    }
}

impl fmt::Display for CommentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comment system with where its data lives and how commenters identify
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentSystem {
    #[serde(rename = "type", default)]
    pub kind: CommentKind,
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(default)]
    pub identity: Option<String>,
}

impl CommentSystem {
    fn bare(kind: CommentKind) -> Self {
        Self {
            kind,
            storage: None,
            identity: None,
        }
    }
}

struct Platform {
    kind: CommentKind,
    signatures: Vec<Regex>,
    storage: &'static str,
    identity: &'static str,
}

fn platform(
    kind: CommentKind,
    signatures: &[&str],
    storage: &'static str,
    identity: &'static str,
) -> Platform {
    Platform {
        kind,
        signatures: signatures
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .expect("comment signature pattern is valid")
            })
            .collect(),
        storage,
        identity,
    }
}

static PLATFORMS: LazyLock<Vec<Platform>> = LazyLock::new(|| {
    vec![
        platform(
            CommentKind::Giscus,
            &[r"giscus\.app", r"data-repo=", r#"class="giscus""#],
            "GitHub Discussions",
            "GitHub",
        ),
        platform(
            CommentKind::Waline,
            &[r"waline", r"data-server-url"],
            "self-hosted (Vercel/LeanCloud)",
            "anonymous/social login",
        ),
        platform(
            CommentKind::Twikoo,
            &[r"twikoo", r"\benvId\b"],
            "self-hosted (Vercel/Tencent Cloud)",
            "anonymous/social login",
        ),
        platform(
            CommentKind::Artalk,
            &[r"artalk"],
            "self-hosted",
            "anonymous/email",
        ),
        platform(
            CommentKind::Disqus,
            &[r"disqus\.com", r"disqus_shortname", r"disqus_thread"],
            "Disqus",
            "Disqus account",
        ),
        platform(
            CommentKind::Utterances,
            &[r"utteranc\.es", r"utterances"],
            "GitHub Issues",
            "GitHub",
        ),
        platform(CommentKind::Gitalk, &[r"gitalk"], "GitHub Issues", "GitHub"),
        platform(
            CommentKind::Valine,
            &[r"valine", r"leancloud"],
            "LeanCloud",
            "anonymous",
        ),
        platform(CommentKind::Cusdis, &[r"cusdis"], "self-hosted", "anonymous"),
        platform(
            CommentKind::Isso,
            &[r"\bisso\b", r"/isso/"],
            "self-hosted (SQLite)",
            "anonymous",
        ),
        platform(
            CommentKind::Remark42,
            &[r"remark42", r"remark_config"],
            "self-hosted",
            "anonymous/social login",
        ),
        platform(
            CommentKind::Commento,
            &[r"commento"],
            "Commento/self-hosted",
            "anonymous/social login",
        ),
        platform(
            CommentKind::Discuss,
            &[r"\bdiscuss\.", r"#discuss\b"],
            "self-hosted",
            "various",
        ),
    ]
});

static GENERIC_COMMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)comment|评论|留言").expect("generic comment pattern is valid")
});

/// Classify the comment system of a page.
///
/// The first platform in table order with a matching signature wins. A page
/// with comment markers but no known platform is `unknown-present`, distinct
/// from `none`.
pub fn detect_comment_system(html: &str) -> CommentSystem {
    if let Some(found) = PLATFORMS
        .iter()
        .find(|p| p.signatures.iter().any(|re| re.is_match(html)))
    {
        return CommentSystem {
            kind: found.kind,
            storage: Some(found.storage.to_string()),
            identity: Some(found.identity.to_string()),
        };
    }

    if GENERIC_COMMENTS.is_match(html) {
        CommentSystem::bare(CommentKind::UnknownPresent)
    } else {
        CommentSystem::bare(CommentKind::Absent)
    }
}

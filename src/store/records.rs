//! Persisted record types: nodes, edges and circle snapshots

use crate::crawl::normalize;
use crate::detect::{CommentKind, CommentSystem, Generator, PageFacts};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal state of a site fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Complete,
    #[default]
    Failed,
}

/// One classified (or unreachable) site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Site identity key
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub generator: Generator,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub comment_system: CommentSystem,
    #[serde(default)]
    pub article_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_url: Option<String>,
    #[serde(default)]
    pub status: FetchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl NodeRecord {
    /// Record for a site whose homepage was fetched and classified
    pub fn complete(url: &str, facts: PageFacts) -> Self {
        Self {
            url: normalize(url),
            name: Some(facts.name).filter(|n| !n.is_empty()),
            generator: facts.generator,
            theme: facts.theme,
            comment_system: facts.comment_system,
            article_count: facts.article_count,
            feed_url: facts.feed_url,
            status: FetchStatus::Complete,
            error: None,
            fetched_at: Utc::now(),
        }
    }

    /// Record for a site whose homepage could not be fetched
    pub fn failed(url: &str, error: impl Into<String>) -> Self {
        Self {
            url: normalize(url),
            name: None,
            generator: Generator::Unknown,
            theme: None,
            comment_system: CommentSystem::default(),
            article_count: None,
            feed_url: None,
            status: FetchStatus::Failed,
            error: Some(error.into()),
            fetched_at: Utc::now(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == FetchStatus::Complete
    }

    fn has_name(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.trim().is_empty())
    }

    /// Combine two records for the same key, keeping the more informative.
    ///
    /// A complete record is primary over a failed one; otherwise `newer` is.
    /// Each field group the primary leaves uninformative (no name, unknown
    /// generator, no theme, no comment system, no count, no feed) is filled
    /// from the other record.
    pub fn merge(self, newer: NodeRecord) -> NodeRecord {
        let (mut primary, other) = if self.is_complete() && !newer.is_complete() {
            (self, newer)
        } else {
            (newer, self)
        };

        if !primary.has_name() && other.has_name() {
            primary.name = other.name;
        }
        if !primary.generator.is_known() && other.generator.is_known() {
            primary.generator = other.generator;
        }
        if primary.theme.is_none() {
            primary.theme = other.theme;
        }
        if comment_rank(&primary.comment_system) < comment_rank(&other.comment_system) {
            primary.comment_system = other.comment_system;
        }
        if primary.article_count.is_none() {
            primary.article_count = other.article_count;
        }
        if primary.feed_url.is_none() {
            primary.feed_url = other.feed_url;
        }
        if primary.is_complete() {
            primary.error = None;
        }
        primary
    }
}

fn comment_rank(system: &CommentSystem) -> u8 {
    match system.kind {
        CommentKind::Absent => 0,
        CommentKind::UnknownPresent => 1,
        _ => 2,
    }
}

/// Relation between two sites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// Source lists target on its friend-links page
    FriendLink,
    /// Source is a member of the circle at target
    CircleMember,
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeType::FriendLink => write!(f, "friend_link"),
            EdgeType::CircleMember => write!(f, "circle_member"),
        }
    }
}

/// Directed edge `source -> target`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeType,
}

impl EdgeRecord {
    /// Edge with both endpoints normalized
    pub fn new(source: &str, target: &str, kind: EdgeType) -> Self {
        Self {
            source: normalize(source),
            target: normalize(target),
            kind,
        }
    }

    /// Both endpoints are usable keys
    pub fn is_valid(&self) -> bool {
        !self.source.is_empty() && !self.target.is_empty()
    }
}

/// Snapshot of a circle's membership at scrape time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleRecord {
    pub name: String,
    pub url: String,
    pub member_count: usize,
    pub members: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

impl CircleRecord {
    pub fn new(name: &str, url: &str, members: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            url: normalize(url),
            member_count: members.len(),
            members,
            fetched_at: Utc::now(),
        }
    }
}

//! Default values for configuration

/// Default browser user agent; many blogs block generic clients
pub fn default_crawl_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

/// Default Accept-Language, biased toward Chinese-language blogs
pub fn default_crawl_accept_language() -> String {
    "zh-CN,zh;q=0.9,en;q=0.8".to_string()
}

/// Default request timeout in seconds
pub fn default_crawl_timeout() -> u64 {
    15
}

/// Default number of attempts for a fetch that fails in transport
pub fn default_crawl_max_attempts() -> u32 {
    2
}

/// Default pause between attempts in milliseconds
pub fn default_crawl_retry_backoff() -> u64 {
    1000
}

/// Default redirect limit
pub fn default_crawl_max_redirects() -> usize {
    10
}

/// Encoding used when a page is neither declared nor valid UTF-8
pub fn default_crawl_fallback_encoding() -> String {
    "gb18030".to_string()
}

/// Default frontier entries drained per batch
pub fn default_batch_size() -> usize {
    50
}

/// Default worker pool width
pub fn default_batch_workers() -> usize {
    20
}

/// Default delay between sites in careful mode (milliseconds)
pub fn default_batch_careful_delay() -> u64 {
    500
}

/// Default node count at which continuous mode stops
pub fn default_batch_target() -> usize {
    1000
}

/// Default pause between batches in continuous mode (milliseconds)
pub fn default_batch_pause() -> u64 {
    1000
}

pub fn default_true() -> bool {
    true
}

pub fn default_false() -> bool {
    false
}

/// Conventional friend-link page paths, probed in order
pub fn default_friend_paths() -> Vec<String> {
    [
        "/links",
        "/friends",
        "/friend",
        "/link",
        "/blogroll",
        "/links.html",
        "/friends.html",
        "/friend.html",
        "/友链",
        "/友情链接",
        "/about/links",
        "/page/links",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

/// Archive listing paths used for article counting
pub fn default_archive_paths() -> Vec<String> {
    ["/archives", "/archive", "/posts", "/blog", "/articles"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

/// Default random-sample budget for circles without a member list
pub fn default_circle_random_attempts() -> usize {
    500
}

/// Default delay between circle API requests (milliseconds)
pub fn default_circle_request_delay() -> u64 {
    100
}

/// Default cap on per-member pages fetched from a circle index
pub fn default_circle_max_member_pages() -> usize {
    2000
}

/// Link-page circles scraped by default
pub fn default_circle_link_pages() -> Vec<super::LinkPageCircle> {
    vec![super::LinkPageCircle {
        name: "BlogsClub".to_string(),
        url: "https://www.blogsclub.org/".to_string(),
        page_url: Some("https://www.blogsclub.org/members.html".to_string()),
    }]
}

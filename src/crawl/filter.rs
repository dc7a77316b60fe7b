//! Blog-likelihood filter
//!
//! A precision-over-recall guard for outbound links: anything that looks like
//! platform infrastructure is rejected before it can become a graph edge.

use super::normalize::parse_lenient;

/// Hosts that are never personal blogs. Matched against the host itself and
/// any of its parent domains.
const DENIED_DOMAINS: &[&str] = &[
    // social
    "github.com",
    "twitter.com",
    "x.com",
    "weibo.com",
    "zhihu.com",
    "bilibili.com",
    "youtube.com",
    "facebook.com",
    "instagram.com",
    "telegram.org",
    "t.me",
    "discord.com",
    "discord.gg",
    "linkedin.com",
    "reddit.com",
    "pinterest.com",
    "tiktok.com",
    "douyin.com",
    "xiaohongshu.com",
    "douban.com",
    "tieba.baidu.com",
    // search
    "google.com",
    "baidu.com",
    "bing.com",
    "sogou.com",
    "so.com",
    // CDN and static assets
    "jsdelivr.net",
    "cloudflare.com",
    "unpkg.com",
    "cdnjs.com",
    "bootcdn.cn",
    "bootcdn.net",
    "bootcss.com",
    "staticfile.org",
    "cloudflareinsights.com",
    "loli.net",
    "googleapis.com",
    "gstatic.com",
    "dogecloud.com",
    "qiniu.com",
    "upyun.com",
    // avatars and images
    "gravatar.com",
    "wp.com",
    "githubusercontent.com",
    "cravatar.cn",
    "weavatar.com",
    "qlogo.cn",
    // payment and donation
    "afdian.com",
    "afdian.net",
    "paypal.com",
    "ko-fi.com",
    "patreon.com",
    // government and ICP filing
    "beian.miit.gov.cn",
    "icp.gov.cn",
    "mps.gov.cn",
    "beian.gov.cn",
    // hosting and cloud
    "vercel.app",
    "netlify.app",
    "herokuapp.com",
    "railway.app",
    "amazonaws.com",
    "aliyuncs.com",
    "qcloud.com",
    "tencentcloud.com",
    "azure.com",
    "cloudfront.net",
    "akamai.com",
    // analytics
    "google-analytics.com",
    "googletagmanager.com",
    "umami.is",
    "plausible.io",
    "clarity.ms",
    "hotjar.com",
    "cnzz.com",
    "busuanzi.ibruce.info",
    // forms and surveys
    "wjx.cn",
    "wenjuan.com",
    "typeform.com",
    "jotform.com",
    // code hosting and Q&A
    "gitee.com",
    "gitlab.com",
    "bitbucket.org",
    "codepen.io",
    "jsfiddle.net",
    "stackoverflow.com",
    "stackexchange.com",
    "csdn.net",
    "jianshu.com",
    // comment platforms
    "giscus.app",
    "utteranc.es",
    "disqus.com",
    "disquscdn.com",
    // misc
    "geetest.com",
    "recaptcha.net",
    "hcaptcha.com",
    "browsehappy.com",
    "creativecommons.org",
    "opensource.org",
    "apple.com",
    "microsoft.com",
    "mozilla.org",
    "blogs.forum",
];

/// Host prefixes of status pages
const DENIED_HOST_PREFIXES: &[&str] = &["status.", "uptime."];

/// Path suffixes of non-page resources
const ASSET_EXTENSIONS: &[&str] = &[
    ".js", ".mjs", ".css", ".map", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".webp",
    ".avif", ".bmp", ".woff", ".woff2", ".ttf", ".otf", ".eot", ".xml", ".json", ".rss",
    ".atom", ".pdf", ".zip", ".mp3", ".mp4",
];

/// Whether a URL plausibly points at an independent blog
pub fn looks_like_blog(url: &str) -> bool {
    let Some(parsed) = parse_lenient(url) else {
        return false;
    };
    let Some(host) = parsed.host_str().map(|h| h.to_lowercase()) else {
        return false;
    };
    let host = host.trim_end_matches('.');

    if DENIED_HOST_PREFIXES.iter().any(|p| host.starts_with(p)) {
        return false;
    }

    if DENIED_DOMAINS.iter().any(|d| domain_matches(host, d)) {
        return false;
    }

    let path = parsed.path().to_lowercase();
    !ASSET_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

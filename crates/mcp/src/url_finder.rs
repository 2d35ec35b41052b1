use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

pub const DEFAULT_SEARCH_ENGINE: &str = "https://www.bing.com/search?q={query}";
const QUERY_PLACEHOLDER: &str = "{query}";

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:[a-zA-Z0-9][-a-zA-Z0-9]*\.)+[a-zA-Z][-a-zA-Z0-9]*(?::\d+)?(?:[/?#]\S*)?$",
    )
    .unwrap()
});

static TLD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\.(com|cn|net|org|edu|gov|io|co|me|tv|app|xyz|site|online|shop|store|tech|ai)$",
    )
    .unwrap()
});

struct Site {
    names: &'static [&'static str],
    template: &'static str,
}

const SITES: &[Site] = &[
    Site { names: &["baidu", "百度"], template: "https://www.baidu.com/s?wd={query}" },
    Site { names: &["google", "谷歌"], template: "https://www.google.com/search?q={query}" },
    Site { names: &["bing", "必应"], template: "https://www.bing.com/search?q={query}" },
    Site { names: &["taobao", "淘宝"], template: "https://s.taobao.com/search?q={query}" },
    Site { names: &["jd", "京东"], template: "https://search.jd.com/Search?keyword={query}" },
    Site { names: &["zhihu", "知乎"], template: "https://www.zhihu.com/search?type=content&q={query}" },
    Site { names: &["bilibili", "哔哩哔哩", "b站"], template: "https://search.bilibili.com/all?keyword={query}" },
    Site { names: &["weibo", "微博"], template: "https://s.weibo.com/weibo?q={query}" },
    Site { names: &["douyin", "抖音"], template: "https://www.douyin.com/search/{query}" },
    Site { names: &["xiaohongshu", "小红书"], template: "https://www.xiaohongshu.com/search_result?keyword={query}" },
    Site { names: &["tmall", "天猫"], template: "https://list.tmall.com/search_product.htm?q={query}" },
    Site { names: &["amazon"], template: "https://www.amazon.com/s?k={query}" },
    Site { names: &["亚马逊"], template: "https://www.amazon.cn/s?k={query}" },
    Site { names: &["twitter", "推特"], template: "https://twitter.com/search?q={query}" },
    Site { names: &["youtube", "油管"], template: "https://www.youtube.com/results?search_query={query}" },
    Site { names: &["facebook", "脸书"], template: "https://www.facebook.com/search/top?q={query}" },
    Site { names: &["instagram", "ins"], template: "https://www.instagram.com/explore/tags/{query}" },
    Site { names: &["weixin", "微信"], template: "https://weixin.sogou.com/weixin?type=2&query={query}" },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlSource {
    Explicit,
    Direct,
    Site(&'static str),
    Domain,
    DefaultEngine,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    pub url: String,
    pub source: UrlSource,
}

#[derive(Debug, Clone)]
pub struct UrlFinder {
    search_engine: String,
}

impl Default for UrlFinder {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_ENGINE)
    }
}

impl UrlFinder {
    pub fn new(search_engine: impl Into<String>) -> Self {
        Self {
            search_engine: search_engine.into(),
        }
    }

    pub fn search_engine(&self) -> &str {
        &self.search_engine
    }

    /// Picks the URL to open for `term`.
    ///
    /// An explicit URL always wins; otherwise, with `auto_find`, the term is
    /// checked as a URL, then for a leading site name, then for a word with a
    /// known TLD; the configured search engine is the fallback.
    pub fn resolve(&self, term: &str, explicit: Option<&str>, auto_find: bool) -> ResolvedUrl {
        if let Some(url) = explicit.map(str::trim).filter(|u| !u.is_empty()) {
            return ResolvedUrl {
                url: apply_query(url, term),
                source: UrlSource::Explicit,
            };
        }

        if auto_find {
            if let Some(found) = self.find(term) {
                debug!(term, url = %found.url, source = ?found.source, "inferred url");
                return found;
            }
        }

        ResolvedUrl {
            url: engine_url(&self.search_engine, term),
            source: UrlSource::DefaultEngine,
        }
    }

    pub fn find(&self, term: &str) -> Option<ResolvedUrl> {
        let term = term.trim();

        if URL_RE.is_match(term) {
            return Some(ResolvedUrl {
                url: with_scheme(term),
                source: UrlSource::Direct,
            });
        }

        if let Some((site, query)) = match_site(term) {
            return Some(ResolvedUrl {
                url: site.template.replace(QUERY_PLACEHOLDER, &urlencoding::encode(query)),
                source: UrlSource::Site(site.names[0]),
            });
        }

        term.split_whitespace()
            .find(|word| TLD_RE.is_match(word))
            .map(|word| ResolvedUrl {
                url: with_scheme(word),
                source: UrlSource::Domain,
            })
    }
}

fn match_site(term: &str) -> Option<(&'static Site, &str)> {
    for site in SITES {
        for name in site.names {
            let prefixes = [
                format!("{} ", name),
                format!("search {} ", name),
                format!("在{}上搜索", name),
                format!("在{}搜索", name),
            ];
            for prefix in &prefixes {
                if let Some(rest) = strip_prefix_ignore_case(term, prefix) {
                    return Some((site, rest.trim()));
                }
            }
            if strip_prefix_ignore_case(term, &format!("search {}", name)) == Some("") {
                return Some((site, ""));
            }
        }
    }
    None
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

pub fn with_scheme(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else if URL_RE.is_match(url) {
        format!("https://{}", url)
    } else {
        url.to_string()
    }
}

/// Combines a URL or template with the search term.
///
/// A `{query}` placeholder is substituted. URLs that look like search
/// endpoints get the encoded term as a `q` parameter; other URLs are opened
/// as they are.
pub fn apply_query(url: &str, term: &str) -> String {
    let url = with_scheme(url);
    let encoded = urlencoding::encode(term);

    if url.contains(QUERY_PLACEHOLDER) {
        return url.replace(QUERY_PLACEHOLDER, &encoded);
    }

    let looks_like_search = ["search", "query", "q="].iter().any(|k| url.contains(k));
    if !looks_like_search {
        return url;
    }

    let has_query_param = ["?q=", "&q=", "search=", "query="]
        .iter()
        .any(|k| url.contains(k));
    if has_query_param {
        return if url.ends_with('=') {
            format!("{}{}", url, encoded)
        } else {
            url
        };
    }

    append_q(&url, &encoded)
}

// Unlike `apply_query`, never drops the term.
fn engine_url(template: &str, term: &str) -> String {
    let url = with_scheme(template);
    let encoded = urlencoding::encode(term);

    if url.contains(QUERY_PLACEHOLDER) {
        url.replace(QUERY_PLACEHOLDER, &encoded)
    } else if url.ends_with('=') {
        format!("{}{}", url, encoded)
    } else {
        append_q(&url, &encoded)
    }
}

fn append_q(url: &str, encoded: &str) -> String {
    let separator = if url.contains('?') { "&q=" } else { "?q=" };
    format!("{}{}{}", url, separator, encoded)
}

use std::collections::VecDeque;
use std::time::Duration;

use scraper::{Html, Selector};
use url::Url;

/// Slack added on top of `2 * timeout` for the overall fetch budget, to
/// leave room for the fallback plain-GET pass without doubling the bound
/// again.
const OVERALL_BUDGET_SLACK: Duration = Duration::from_secs(2);

/// Produces up to `max_bytes` of concatenated rendered textual content from
/// a bounded, same-origin crawl of a domain. Tries HTTPS then HTTP; the
/// first scheme that yields any non-empty text wins. Falls back to a single
/// plain GET when the crawl comes up empty for both schemes. Every network
/// error is swallowed -- callers always get a string, possibly empty.
pub struct Fetcher {
    client: reqwest::Client,
    max_depth: u8,
    max_pages: u8,
    max_bytes: usize,
    overall_budget: Duration,
}

impl Fetcher {
    pub fn new(timeout: Duration, max_depth: u8, max_pages: u8, max_bytes: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("dnsentinel-fetcher/1.0")
            .build()
            .unwrap_or_default();

        Self {
            client,
            max_depth,
            max_pages,
            max_bytes,
            overall_budget: timeout * 2 + OVERALL_BUDGET_SLACK,
        }
    }

    /// The whole fetch -- both crawl attempts plus the plain-GET fallback,
    /// across both schemes -- is bounded by `overall_budget` regardless of
    /// how many pages or schemes that spans. A hung Classifier worker would
    /// otherwise stall the queue indefinitely.
    pub async fn fetch(&self, domain: &str) -> String {
        match tokio::time::timeout(self.overall_budget, self.fetch_unbounded(domain)).await {
            Ok(text) => text,
            Err(_) => {
                tracing::debug!(domain, "fetch exceeded overall budget, giving up");
                String::new()
            }
        }
    }

    async fn fetch_unbounded(&self, domain: &str) -> String {
        let host = domain.trim_end_matches('.');

        for scheme in ["https", "http"] {
            let root = format!("{scheme}://{host}/");
            let text = self.crawl(&root).await;
            if !text.is_empty() {
                return truncate_utf8(&text, self.max_bytes);
            }
        }

        for scheme in ["https", "http"] {
            let root = format!("{scheme}://{host}/");
            if let Ok(text) = self.plain_get(&root).await {
                if !text.is_empty() {
                    return truncate_utf8(&text, self.max_bytes);
                }
            }
        }

        String::new()
    }

    /// Bounded breadth-first crawl of same-origin pages, extracting body
    /// text. External links are never followed, matching the primary
    /// fetch's scope.
    async fn crawl(&self, root: &str) -> String {
        let Ok(root_url) = Url::parse(root) else {
            return String::new();
        };

        let mut visited = std::collections::HashSet::new();
        let mut frontier = VecDeque::new();
        frontier.push_back((root_url.clone(), 0u8));
        visited.insert(root_url.as_str().to_string());

        let mut collected = String::new();
        let mut pages_visited = 0u8;

        while let Some((url, depth)) = frontier.pop_front() {
            if pages_visited >= self.max_pages {
                break;
            }

            let Ok(body) = self.plain_get(url.as_str()).await else {
                continue;
            };
            if body.is_empty() {
                continue;
            }

            collected.push_str(&body);
            collected.push(' ');
            pages_visited += 1;

            if depth >= self.max_depth {
                continue;
            }

            for link in same_origin_links(&body, &url) {
                if visited.insert(link.as_str().to_string()) {
                    frontier.push_back((link, depth + 1));
                }
            }
        }

        collected
    }

    /// A single plain GET, rendering the response body to extracted text.
    async fn plain_get(&self, url: &str) -> Result<String, reqwest::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;
        Ok(extract_text(&body))
    }
}

fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let body_selector = Selector::parse("body").unwrap();
    document
        .select(&body_selector)
        .flat_map(|el| el.text())
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn same_origin_links(html: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let Ok(anchor_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&anchor_selector)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .filter(|url| url.origin() == base.origin())
        .collect()
}

/// Truncates `text` to at most `max_bytes` bytes, stepping back to the
/// nearest UTF-8 character boundary rather than splitting one.
fn truncate_utf8(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_a_char_boundary() {
        let text = "héllo world"; // é is 2 bytes
        let truncated = truncate_utf8(text, 2);
        assert!(truncated.is_char_boundary(truncated.len()));
        assert!(truncated.len() <= 2);
    }

    #[test]
    fn extracts_body_text_and_collapses_whitespace() {
        let html = "<html><body>  Hello   <b>World</b>  </body></html>";
        assert_eq!(extract_text(html), "Hello World");
    }

    #[test]
    fn same_origin_links_excludes_external_hosts() {
        let base = Url::parse("https://example.com/").unwrap();
        let html = r#"<a href="/about">About</a><a href="https://other.com/x">Other</a>"#;
        let links = same_origin_links(html, &base);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), "https://example.com/about");
    }
}

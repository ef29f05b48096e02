// src/ingest/scrapers/mod.rs
pub mod mlh;
pub mod mock;

use std::time::Duration;

use once_cell::sync::OnceCell;
use regex::Regex;

pub use mlh::MlhScraper;
pub use mock::{MockScenario, MockScraper};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.114 Safari/537.36";

/// Shared client shape for scrapers: browser user agent and a hard timeout.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Collapse whitespace and trim. Empty results become `None`.
pub fn clean_text(s: &str) -> Option<String> {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    let out = re_ws.replace_all(s, " ").trim().to_string();
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

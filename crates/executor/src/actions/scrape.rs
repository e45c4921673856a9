//! Content-scrape capability: fetch a page and reduce it to readable text

use std::time::Duration;

use scraper::{Html, Selector};
use serde_json::Value;

use crate::{str_arg, ExecError};

const TEXT_CAP: usize = 8_000;

pub(crate) async fn fetch(args: &Value, timeout: Duration) -> Result<String, ExecError> {
    let url = str_arg(args, "url")?;

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ExecError::Failed(format!("http client error: {}", e)))?;

    let response = client.get(&url).send().await.map_err(|e| {
        if e.is_timeout() {
            ExecError::Timeout(format!("fetch of '{}' timed out", url))
        } else {
            ExecError::Failed(format!("fetch failed: {}", e))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ExecError::Failed(format!(
            "fetch of '{}' returned HTTP {}",
            url,
            status.as_u16()
        )));
    }

    let html = response
        .text()
        .await
        .map_err(|e| ExecError::Failed(format!("cannot read page body: {}", e)))?;

    Ok(to_readable_text(&url, &html))
}

fn to_readable_text(url: &str, html: &str) -> String {
    let document = Html::parse_document(html);
    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let mut text = html2text::from_read(html.as_bytes(), 80);
    crate::cap_output(&mut text, TEXT_CAP, "\n... (content truncated)");

    if title.is_empty() {
        format!("{}\n\n{}", url, text)
    } else {
        format!("{} — {}\n\n{}", title, url, text)
    }
}

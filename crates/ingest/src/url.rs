//! URL adapter: fetch a page and reduce it to plain text.

use crate::html::html_to_text;
use cf_domain::error::{Error, Result};

pub async fn fetch_url_text(client: &reqwest::Client, url: &str) -> Result<(String, Vec<String>)> {
    let response = client.get(url).send().await.map_err(|e| classify_reqwest(e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(classify_status(status, url));
    }
    let body = response.text().await.map_err(|e| classify_reqwest(e))?;
    let text = html_to_text(&body);
    let mut warnings = Vec::new();
    if text.trim().is_empty() {
        warnings.push(format!("{url} yielded no extractable text"));
    }
    Ok((text, warnings))
}

fn classify_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() || e.is_connect() {
        Error::UpstreamTransient {
            provider: "url_ingest".into(),
            message: e.to_string(),
        }
    } else {
        Error::UpstreamPermanent {
            provider: "url_ingest".into(),
            message: e.to_string(),
        }
    }
}

fn classify_status(status: reqwest::StatusCode, url: &str) -> Error {
    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        Error::UpstreamTransient {
            provider: "url_ingest".into(),
            message: format!("{url} returned {status}"),
        }
    } else {
        Error::UpstreamPermanent {
            provider: "url_ingest".into(),
            message: format!("{url} returned {status}"),
        }
    }
}

//! YouTube adapter: fetch the transcript track list for a video, prefer
//! an English track, and reduce the transcript to plain text.

use crate::html::html_to_text;
use cf_domain::error::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

const TIMEDTEXT_BASE: &str = "https://www.youtube.com/api/timedtext";

fn video_id_from_url(url: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?:v=|youtu\.be/|/embed/)([A-Za-z0-9_-]{6,})").unwrap()
    });
    re.captures(url).map(|c| c[1].to_string())
}

fn lang_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"lang_code="([^"]+)""#).unwrap())
}

pub async fn fetch_youtube_transcript(
    client: &reqwest::Client,
    url: &str,
) -> Result<(String, Vec<String>)> {
    fetch_youtube_transcript_from(client, url, TIMEDTEXT_BASE).await
}

async fn fetch_youtube_transcript_from(
    client: &reqwest::Client,
    url: &str,
    timedtext_base: &str,
) -> Result<(String, Vec<String>)> {
    let video_id = video_id_from_url(url)
        .ok_or_else(|| Error::InputError(format!("not a recognizable youtube url: {url}")))?;

    let list_url = format!("{timedtext_base}?type=list&v={video_id}");
    let list_body = client
        .get(&list_url)
        .send()
        .await
        .map_err(classify_reqwest)?
        .text()
        .await
        .map_err(classify_reqwest)?;

    let tracks: Vec<String> = lang_code_re()
        .captures_iter(&list_body)
        .map(|c| c[1].to_string())
        .collect();

    let mut warnings = Vec::new();
    let chosen = tracks
        .iter()
        .find(|t| t.eq_ignore_ascii_case("en") || t.eq_ignore_ascii_case("en-US"))
        .or_else(|| tracks.first());

    let Some(lang) = chosen else {
        warnings.push(format!("{url} has no transcript tracks available"));
        return Ok((String::new(), warnings));
    };
    if !lang.eq_ignore_ascii_case("en") && !lang.eq_ignore_ascii_case("en-US") {
        warnings.push(format!(
            "no english transcript for {url}, falling back to '{lang}'"
        ));
    }

    let transcript_url = format!("{timedtext_base}?v={video_id}&lang={lang}");
    let transcript_body = client
        .get(&transcript_url)
        .send()
        .await
        .map_err(classify_reqwest)?
        .text()
        .await
        .map_err(classify_reqwest)?;

    let text = html_to_text(&transcript_body);
    if text.trim().is_empty() {
        warnings.push(format!("{url} transcript track '{lang}' was empty"));
    }
    Ok((text, warnings))
}

fn classify_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() || e.is_connect() {
        Error::UpstreamTransient {
            provider: "youtube_ingest".into(),
            message: e.to_string(),
        }
    } else {
        Error::UpstreamPermanent {
            provider: "youtube_ingest".into(),
            message: e.to_string(),
        }
    }
}

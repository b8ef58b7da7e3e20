//! Basic HTML-to-text reduction: strip tags, collapse whitespace.

use regex::Regex;
use std::sync::OnceLock;

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<script.*?</script>|<style.*?</style>|<[^>]+>").unwrap())
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Strip tags/scripts/styles and collapse runs of whitespace to a single
/// space, leaving plain readable text.
pub fn html_to_text(html: &str) -> String {
    let stripped = tag_re().replace_all(html, " ");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    whitespace_re().replace_all(&decoded, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_collapses_whitespace() {
        let html = "<html><body><h1>Title</h1>\n\n<p>Hello   world.</p></body></html>";
        assert_eq!(html_to_text(html), "Title Hello world.");
    }

    #[test]
    fn strips_script_and_style_blocks() {
        let html = "<p>Keep</p><script>var x = 1;</script><style>.a{color:red}</style>";
        assert_eq!(html_to_text(html), "Keep");
    }

    #[test]
    fn decodes_common_entities() {
        assert_eq!(html_to_text("<p>Fish &amp; chips</p>"), "Fish & chips");
    }
}

//! PDF adapter: bytes-in/text-out. No PDF parsing library is wired in
//! here — real extraction is out of scope (§1) — but the adapter
//! signature is load-bearing so a parser can be dropped in later without
//! touching the dispatcher.

use cf_domain::error::{Error, Result};
use std::path::Path;

/// Extract text from PDF bytes. Placeholder: returns empty text with a
/// warning, since no PDF-parsing crate is in scope.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<(String, Vec<String>)> {
    if bytes.is_empty() {
        return Ok((String::new(), vec!["pdf source is empty".into()]));
    }
    Ok((
        String::new(),
        vec!["pdf text extraction is not implemented; source contributed no text".into()],
    ))
}

pub async fn read_pdf_text(path: &Path) -> Result<(String, Vec<String>)> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::InputError(format!("pdf source not found: {}", path.display()))
        } else {
            Error::Io(e)
        }
    })?;
    extract_pdf_text(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bytes_warns() {
        let (text, warnings) = extract_pdf_text(&[]).unwrap();
        assert!(text.is_empty());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn nonempty_bytes_still_warns_not_implemented() {
        let (text, warnings) = extract_pdf_text(b"%PDF-1.4").unwrap();
        assert!(text.is_empty());
        assert_eq!(warnings.len(), 1);
    }
}

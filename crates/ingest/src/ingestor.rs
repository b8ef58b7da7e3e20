//! SourceIngestor: dispatches each `SourceRef` to its adapter and
//! collects the results as `ExtractedSource` (§4.4).

use crate::pdf::read_pdf_text;
use crate::types::SourceRef;
use crate::url::fetch_url_text;
use crate::youtube::fetch_youtube_transcript;
use cf_domain::models::ExtractedSource;

pub struct SourceIngestor {
    client: reqwest::Client,
}

impl Default for SourceIngestor {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceIngestor {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Extract every source. Per-source failures or empty text become
    /// warnings on that source, not early returns; the caller (the
    /// orchestrator) decides whether the overall batch is usable.
    pub async fn extract_all(&self, refs: &[SourceRef]) -> Vec<ExtractedSource> {
        let mut out = Vec::with_capacity(refs.len());
        for source_ref in refs {
            out.push(self.extract_one(source_ref).await);
        }
        out
    }

    async fn extract_one(&self, source_ref: &SourceRef) -> ExtractedSource {
        let origin_ref = source_ref.origin_label();
        let result = match source_ref {
            SourceRef::Url(url) => fetch_url_text(&self.client, url).await,
            SourceRef::PdfPath(path) => read_pdf_text(path).await,
            SourceRef::Youtube(url) => fetch_youtube_transcript(&self.client, url).await,
        };

        match result {
            Ok((text, warnings)) => {
                let byte_count = text.len();
                ExtractedSource {
                    origin_ref,
                    content_text: text,
                    byte_count,
                    warnings,
                }
            }
            Err(e) => {
                tracing::warn!(origin_ref = %origin_ref, error = %e, "source ingestion failed");
                ExtractedSource {
                    origin_ref: origin_ref.clone(),
                    content_text: String::new(),
                    byte_count: 0,
                    warnings: vec![format!("failed to ingest {origin_ref}: {e}")],
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_pdf_path_becomes_warning_not_panic() {
        let ingestor = SourceIngestor::new();
        let refs = vec![SourceRef::PdfPath("/nonexistent/path.pdf".into())];
        let extracted = ingestor.extract_all(&refs).await;
        assert_eq!(extracted.len(), 1);
        assert!(extracted[0].is_empty());
        assert_eq!(extracted[0].warnings.len(), 1);
    }
}

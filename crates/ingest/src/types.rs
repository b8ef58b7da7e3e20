use std::path::PathBuf;

/// A single input source, as submitted by the client. Dispatch to the
/// matching adapter happens purely on this tag (§4.4).
#[derive(Debug, Clone)]
pub enum SourceRef {
    Url(String),
    PdfPath(PathBuf),
    Youtube(String),
}

impl SourceRef {
    pub fn origin_label(&self) -> String {
        match self {
            SourceRef::Url(u) => u.clone(),
            SourceRef::PdfPath(p) => p.display().to_string(),
            SourceRef::Youtube(u) => u.clone(),
        }
    }
}

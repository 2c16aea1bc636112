//! Loading input documents as plain text

use crate::error::EngineError;
use pdf::file::FileOptions;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Text of one input document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Path it was read from
    pub source: PathBuf,
    /// Extracted text
    pub text: String,
}

/// Load a `.pdf`, `.md` or `.txt` file
///
/// PDF parsing runs on the blocking pool.
pub async fn load_document(path: &Path) -> Result<Document, EngineError> {
    if !path.is_file() {
        return Err(EngineError::Document(format!("file not found: {}", path.display())));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let text = match extension.as_str() {
        "pdf" => {
            let bytes = tokio::fs::read(path).await?;
            tokio::task::spawn_blocking(move || extract_pdf_text(&bytes))
                .await
                .map_err(|e| EngineError::Document(e.to_string()))??
        }
        "md" | "markdown" | "txt" => tokio::fs::read_to_string(path).await?,
        other => {
            return Err(EngineError::Document(format!(
                "unsupported document type '{}': {}",
                other,
                path.display()
            )))
        }
    };

    debug!(path = %path.display(), chars = text.len(), "Document loaded");
    Ok(Document {
        source: path.to_path_buf(),
        text,
    })
}

/// Text drawn by the content streams of every page, one page per paragraph
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, EngineError> {
    let file = FileOptions::cached()
        .load(bytes)
        .map_err(|e| EngineError::Document(e.to_string()))?;
    let resolver = file.resolver();

    let mut pages = Vec::new();
    for page_num in 0..file.num_pages() {
        let page = file
            .get_page(page_num)
            .map_err(|e| EngineError::Document(e.to_string()))?;
        let Some(content) = &page.contents else {
            continue;
        };
        let operations = content
            .operations(&resolver)
            .map_err(|e| EngineError::Document(e.to_string()))?;

        let mut text = String::new();
        for op in operations.iter() {
            if let pdf::content::Op::TextDraw { text: drawn } = op {
                if !text.is_empty() && !text.ends_with(char::is_whitespace) {
                    text.push(' ');
                }
                text.push_str(&drawn.to_string_lossy());
            }
        }
        if !text.trim().is_empty() {
            pages.push(text);
        }
    }
    Ok(pages.join("\n\n"))
}

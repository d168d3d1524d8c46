//! Document loading and chunking for the embedding index.

mod pdf;
mod splitter;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::config::EmbeddingsConfig;
use crate::error::{ProcessingError, ServiceError, ServiceResult};

pub use splitter::TextSplitter;

/// A piece of the indexed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    pub chunk_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
}

/// Document section
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: Option<String>,
    pub content: String,
    pub page_number: Option<i32>,
}

/// Document ingestion service
pub struct IngestionService {
    splitter: TextSplitter,
}

impl IngestionService {
    pub fn new(config: &EmbeddingsConfig) -> Self {
        Self {
            splitter: TextSplitter::new(
                config.chunk_size,
                config.chunk_overlap,
                config.separator.clone(),
            ),
        }
    }

    /// Read a document and split it into chunks
    pub fn load_document(&self, path: &Path) -> ServiceResult<Vec<Chunk>> {
        if !path.is_file() {
            return Err(ServiceError::Processing(ProcessingError::NotFound {
                path: path.display().to_string(),
            }));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        info!(path = %path.display(), format = %extension, "Loading document");

        let sections = match extension.as_str() {
            "pdf" => pdf::extract_pdf(path)?,
            "md" | "markdown" => parse_markdown_sections(&read_text(path)?),
            "txt" | "text" => plain_text_sections(&read_text(path)?),
            _ => {
                return Err(ServiceError::Processing(
                    ProcessingError::UnsupportedFormat { format: extension },
                ));
            }
        };

        let chunks = self.create_chunks(&sections);
        if chunks.is_empty() {
            return Err(ServiceError::Processing(ProcessingError::EmptyDocument {
                path: path.display().to_string(),
            }));
        }

        info!(
            path = %path.display(),
            sections = sections.len(),
            chunks = chunks.len(),
            "Document split into chunks"
        );

        Ok(chunks)
    }

    /// Split every section, numbering chunks across the whole document
    fn create_chunks(&self, sections: &[Section]) -> Vec<Chunk> {
        sections
            .iter()
            .flat_map(|section| {
                self.splitter
                    .split(&section.content)
                    .into_iter()
                    .map(move |content| (section, content))
            })
            .enumerate()
            .map(|(chunk_index, (section, content))| Chunk {
                id: Uuid::new_v4().to_string(),
                content,
                chunk_index,
                page_number: section.page_number,
                section_title: section.title.clone(),
            })
            .collect()
    }
}

fn read_text(path: &Path) -> ServiceResult<String> {
    std::fs::read_to_string(path).map_err(|e| ServiceError::Processing(ProcessingError::Io(e)))
}

fn plain_text_sections(content: &str) -> Vec<Section> {
    if content.trim().is_empty() {
        return Vec::new();
    }
    vec![Section {
        title: None,
        content: content.trim().to_string(),
        page_number: None,
    }]
}

fn push_section(title: Option<String>, body: &mut String, sections: &mut Vec<Section>) {
    if !body.trim().is_empty() {
        sections.push(Section {
            title,
            content: body.trim().to_string(),
            page_number: None,
        });
    }
    body.clear();
}

/// Parse markdown into sections based on ATX headers
fn parse_markdown_sections(content: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut body = String::new();
    let mut title: Option<String> = None;

    for line in content.lines() {
        if line.starts_with('#') {
            push_section(title.take(), &mut body, &mut sections);
            title = Some(line.trim_start_matches('#').trim().to_string());
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }
    push_section(title, &mut body, &mut sections);

    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn service(chunk_size: usize, chunk_overlap: usize) -> IngestionService {
        IngestionService::new(&EmbeddingsConfig {
            model: "embedding-001".to_string(),
            chunk_size,
            chunk_overlap,
            separator: "\n\n".to_string(),
            top_k: 3,
            batch_size: 100,
        })
    }

    fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_markdown_sections() {
        let markdown = r#"
# History

Founded as a port.

## Trade

Spices and tiles.

# Food

Fish curry.
"#;

        let sections = parse_markdown_sections(markdown);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].title.as_deref(), Some("History"));
        assert_eq!(sections[1].title.as_deref(), Some("Trade"));
        assert_eq!(sections[2].content, "Fish curry.");
    }

    #[test]
    fn test_markdown_without_headers() {
        let sections = parse_markdown_sections("just a paragraph\n");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, None);
    }

    #[test]
    fn test_load_text_document() {
        let file = temp_file(".txt", "first paragraph\n\nsecond paragraph\n\nthird paragraph");
        let chunks = service(35, 0).load_document(file.path()).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "first paragraph\n\nsecond paragraph");
        assert_eq!(chunks[1].content, "third paragraph");
        assert_eq!(chunks[1].chunk_index, 1);
    }

    #[test]
    fn test_chunk_index_spans_sections() {
        let file = temp_file(".md", "# A\n\none\n\n# B\n\ntwo\n");
        let chunks = service(1000, 200).load_document(file.path()).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].section_title.as_deref(), Some("A"));
        assert_eq!(chunks[1].section_title.as_deref(), Some("B"));
        assert_eq!(chunks[1].chunk_index, 1);
    }

    #[test]
    fn test_load_errors() {
        let svc = service(1000, 200);

        let err = svc
            .load_document(Path::new("/definitely/not/here.pdf"))
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Processing(ProcessingError::NotFound { .. })
        ));

        let docx = temp_file(".docx", "binary");
        let err = svc.load_document(docx.path()).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Processing(ProcessingError::UnsupportedFormat { .. })
        ));

        let blank = temp_file(".txt", "   \n");
        let err = svc.load_document(blank.path()).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Processing(ProcessingError::EmptyDocument { .. })
        ));
    }
}

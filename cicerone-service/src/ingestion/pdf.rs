//! PDF text extraction via PDFium, one section per page.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{ProcessingError, ServiceError, ServiceResult};

use super::Section;

/// Create a new Pdfium instance (dynamically linked).
///
/// Searches for libpdfium in:
/// 1. Current directory (./libpdfium.so)
/// 2. vendor/pdfium/lib/
/// 3. System library paths
fn create_pdfium() -> Result<Pdfium, ProcessingError> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "./vendor/pdfium/lib/",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| ProcessingError::TextExtraction {
            page: 0,
            source: Box::new(std::io::Error::other(format!(
                "Failed to load PDFium library, install libpdfium or place it in ./vendor/pdfium/lib/: {:?}",
                e
            ))),
        })?;

    Ok(Pdfium::new(bindings))
}

/// Extract page texts from a PDF, dropping lines repeated on most pages.
pub fn extract_pdf(path: &Path) -> ServiceResult<Vec<Section>> {
    let pdfium = create_pdfium()?;

    let document =
        pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| ProcessingError::TextExtraction {
                page: 0,
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Failed to load PDF: {:?}", e),
                )),
            })?;

    let page_count = document.pages().len();
    info!(pages = page_count, "Reading PDF pages");

    let mut pages: Vec<(i32, String)> = Vec::new();
    for (page_index, page) in document.pages().iter().enumerate() {
        let page_num = page_index as i32 + 1;

        let text = page.text().map_err(|e| {
            warn!(page = page_num, error = ?e, "Failed to get text object for page");
            ProcessingError::TextExtraction {
                page: page_num as u32,
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Failed to extract text from page {}: {:?}", page_num, e),
                )),
            }
        })?;

        let page_text = text.all().trim().to_string();
        if !page_text.is_empty() {
            pages.push((page_num, page_text));
        }
    }

    let sections = pages_to_sections(pages);
    if sections.is_empty() {
        return Err(ServiceError::Processing(ProcessingError::EmptyDocument {
            path: path.display().to_string(),
        }));
    }

    debug!(
        pages = page_count,
        sections = sections.len(),
        "PDF text extracted"
    );

    Ok(sections)
}

/// Strip repeated header/footer lines and turn pages into sections
fn pages_to_sections(pages: Vec<(i32, String)>) -> Vec<Section> {
    let repeated = detect_repeated_lines(&pages);
    if !repeated.is_empty() {
        info!(
            line_count = repeated.len(),
            "Filtering lines repeated across pages"
        );
    }

    pages
        .into_iter()
        .filter_map(|(page_num, text)| {
            let clean = if repeated.is_empty() {
                text
            } else {
                text.lines()
                    .filter(|line| !repeated.contains(line.trim()))
                    .collect::<Vec<_>>()
                    .join("\n")
            };

            if clean.trim().is_empty() {
                None
            } else {
                Some(Section {
                    title: None,
                    content: clean,
                    page_number: Some(page_num),
                })
            }
        })
        .collect()
}

/// Lines that appear on more than half of the pages (watermarks, running headers).
fn detect_repeated_lines(pages: &[(i32, String)]) -> HashSet<String> {
    if pages.len() < 2 {
        return HashSet::new();
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (_, text) in pages {
        let unique: HashSet<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        for line in unique {
            *counts.entry(line).or_insert(0) += 1;
        }
    }

    let threshold = pages.len() / 2;
    counts
        .into_iter()
        .filter(|(_, count)| *count > threshold)
        .map(|(line, _)| line.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_lines_are_removed() {
        let pages = vec![
            (1, "City Guide\nThe port handles cargo.".to_string()),
            (2, "City Guide\nBeaches line the coast.".to_string()),
            (3, "City Guide\nTemples date back centuries.".to_string()),
        ];

        let sections = pages_to_sections(pages);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].content, "The port handles cargo.");
        assert_eq!(sections[2].page_number, Some(3));
        assert!(sections.iter().all(|s| !s.content.contains("City Guide")));
    }

    #[test]
    fn test_single_page_keeps_everything() {
        let pages = vec![(1, "Header\nBody".to_string())];
        assert!(detect_repeated_lines(&pages).is_empty());

        let sections = pages_to_sections(pages);
        assert_eq!(sections[0].content, "Header\nBody");
    }

    #[test]
    fn test_page_with_only_repeated_lines_is_dropped() {
        let pages = vec![
            (1, "Draft".to_string()),
            (2, "Draft\nReal content".to_string()),
            (3, "Draft\nMore content".to_string()),
        ];
        let sections = pages_to_sections(pages);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].page_number, Some(2));
    }
}

//! Whole-document watermark removal using lopdf

use std::path::{Path, PathBuf};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};
use crate::config::FilterConfig;
use crate::error::{Error, Result};
use crate::pdf::annotations::clean_page_annotations;
use crate::pdf::filter::{ContentFilter, FilterOutcome};
use crate::pdf::resources::PageResources;

/// Options for cleaning one PDF file
#[derive(Debug, Clone)]
pub struct CleanOptions {
    /// Source PDF
    pub input_path: PathBuf,
    /// Where the cleaned PDF is written (may equal `input_path`)
    pub output_path: PathBuf,
    /// Heuristic thresholds and keywords
    pub config: FilterConfig,
    /// Remove the catalog's `/OCProperties` so no layer stays hidden or forced on
    pub strip_optional_content: bool,
}

impl CleanOptions {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            config: FilterConfig::default(),
            strip_optional_content: false,
        }
    }
}

/// What happened to one page's content stream
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// Watermark operations were removed and the new content stored
    Cleaned {
        dropped_operations: usize,
        dropped_scopes: usize,
        dropped_marked_regions: usize,
        dropped_text_objects: usize,
    },
    /// Nothing matched; the page content was left as is
    Unchanged,
    /// Decoding or storing failed; the original content was left in place
    Skipped { reason: String },
}

impl From<&FilterOutcome> for PageOutcome {
    fn from(outcome: &FilterOutcome) -> Self {
        if !outcome.changed() {
            return PageOutcome::Unchanged;
        }
        PageOutcome::Cleaned {
            dropped_operations: outcome.dropped,
            dropped_scopes: outcome.dropped_scopes,
            dropped_marked_regions: outcome.dropped_marked_regions,
            dropped_text_objects: outcome.dropped_text_objects,
        }
    }
}

/// Per-page result of a cleaning run
#[derive(Debug, Clone)]
pub struct PageReport {
    /// 1-based page number
    pub page_number: u32,
    pub annotations_removed: usize,
    pub content: PageOutcome,
}

/// Result of cleaning a whole document
#[derive(Debug, Clone, Default)]
pub struct CleanReport {
    pub pages: Vec<PageReport>,
    pub optional_content_removed: bool,
}

impl CleanReport {
    /// Pages whose content or annotations changed
    pub fn pages_changed(&self) -> usize {
        self.pages
            .iter()
            .filter(|page| {
                page.annotations_removed > 0 || matches!(page.content, PageOutcome::Cleaned { .. })
            })
            .count()
    }

    /// Pages left untouched because their content could not be processed
    pub fn pages_skipped(&self) -> usize {
        self.pages
            .iter()
            .filter(|page| matches!(page.content, PageOutcome::Skipped { .. }))
            .count()
    }

    /// Total content operations removed across all pages
    pub fn operations_dropped(&self) -> usize {
        self.pages
            .iter()
            .map(|page| match page.content {
                PageOutcome::Cleaned { dropped_operations, .. } => dropped_operations,
                _ => 0,
            })
            .sum()
    }

    /// Total annotations removed across all pages
    pub fn annotations_removed(&self) -> usize {
        self.pages.iter().map(|page| page.annotations_removed).sum()
    }
}

/// Remove watermarks from a PDF file and save the result
///
/// # Example
///
/// ```no_run
/// use pdf_unwatermark::pdf::{clean_pdf, CleanOptions};
///
/// let options = CleanOptions::new("handout.pdf", "handout-clean.pdf");
/// let report = clean_pdf(&options).expect("Failed to clean PDF");
/// println!("{} pages changed", report.pages_changed());
/// ```
pub fn clean_pdf(options: &CleanOptions) -> Result<CleanReport> {
    let mut doc = load_document(&options.input_path)?;

    let report = clean_document(&mut doc, &options.config, options.strip_optional_content);

    doc.compress();
    doc.save(&options.output_path).map_err(lopdf::Error::from)?;

    log::info!(
        "{}: {} of {} pages changed, {} operations and {} annotations removed",
        options.input_path.display(),
        report.pages_changed(),
        report.pages.len(),
        report.operations_dropped(),
        report.annotations_removed(),
    );

    Ok(report)
}

/// Remove watermarks from every page of an already loaded document
///
/// Pages are processed one at a time. A page whose content cannot be decoded
/// or stored keeps its original content and is reported as skipped.
pub fn clean_document(
    doc: &mut Document,
    config: &FilterConfig,
    strip_optional_content: bool,
) -> CleanReport {
    doc.decompress();

    let mut report = CleanReport {
        optional_content_removed: strip_optional_content && remove_optional_content(doc),
        ..CleanReport::default()
    };

    for (page_number, page_id) in doc.get_pages() {
        let annotations_removed = match clean_page_annotations(doc, page_id, config) {
            Ok(removed) => removed,
            Err(e) => {
                log::warn!("page {}: could not update annotations: {}", page_number, e);
                0
            }
        };

        let content = match clean_page_content(doc, page_id, config) {
            Ok(outcome) => outcome,
            Err(reason) => {
                log::warn!("page {}: leaving content unchanged: {}", page_number, reason);
                PageOutcome::Skipped { reason }
            }
        };

        report.pages.push(PageReport {
            page_number,
            annotations_removed,
            content,
        });
    }

    report
}

/// Load a document, rejecting missing files and documents without pages
pub(crate) fn load_document(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    if doc.get_pages().is_empty() {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    Ok(doc)
}

/// Operator appended to each content stream before decoding
///
/// The decoder stops quietly at the first token it cannot parse, so a stream
/// only counts as fully decoded when this marker comes back as its last,
/// operand-free operation.
const END_OF_STREAM: &str = "UnwatermarkEndOfStream";

/// Decode every content stream of a page, in order, into one operation list
///
/// Each stream is decoded on its own so the last token of one stream never
/// runs into the first token of the next.
pub(crate) fn decode_page_operations(
    doc: &Document,
    page_id: ObjectId,
) -> std::result::Result<Vec<Operation>, String> {
    let mut operations = Vec::new();

    for stream_id in doc.get_page_contents(page_id) {
        let stream = doc
            .get_object(stream_id)
            .and_then(Object::as_stream)
            .map_err(|e| format!("could not read content stream {:?}: {}", stream_id, e))?;
        let mut data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        data.extend_from_slice(b"\n");
        data.extend_from_slice(END_OF_STREAM.as_bytes());
        data.push(b'\n');

        let mut decoded = Content::decode(&data)
            .map_err(|e| format!("could not parse content stream {:?}: {}", stream_id, e))?
            .operations;
        match decoded.pop() {
            Some(last) if last.operator == END_OF_STREAM && last.operands.is_empty() => {}
            _ => {
                return Err(format!(
                    "could not parse content stream {:?}: stopped after {} operations",
                    stream_id,
                    decoded.len(),
                ))
            }
        }
        operations.extend(decoded);
    }

    Ok(operations)
}

/// Run the content filter over a page without modifying the document
pub(crate) fn filter_page_content(
    doc: &Document,
    page_id: ObjectId,
    resources: &PageResources,
    config: &FilterConfig,
) -> std::result::Result<FilterOutcome, String> {
    let operations = decode_page_operations(doc, page_id)?;
    Ok(ContentFilter::new(resources, config).filter(operations))
}

/// Filter one page's content and store it back if anything was removed
fn clean_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    config: &FilterConfig,
) -> std::result::Result<PageOutcome, String> {
    let resources = PageResources::load(doc, page_id, config);
    let outcome = filter_page_content(doc, page_id, &resources, config)?;
    let page_outcome = PageOutcome::from(&outcome);
    if !outcome.changed() {
        return Ok(page_outcome);
    }

    let encoded = Content { operations: outcome.operations }
        .encode()
        .map_err(|e| format!("could not serialize content: {}", e))?;
    doc.change_page_content(page_id, encoded)
        .map_err(|e| format!("could not store content: {}", e))?;

    Ok(page_outcome)
}

/// Drop the catalog's optional content configuration
fn remove_optional_content(doc: &mut Document) -> bool {
    let catalog_id = match doc.trailer.get(b"Root") {
        Ok(Object::Reference(id)) => *id,
        _ => return false,
    };

    match doc.get_object_mut(catalog_id) {
        Ok(Object::Dictionary(catalog)) => catalog.remove(b"OCProperties").is_some(),
        _ => false,
    }
}

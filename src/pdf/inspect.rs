//! Dry-run watermark detection

use std::path::Path;
use crate::config::FilterConfig;
use crate::error::Result;
use crate::pdf::annotations::count_watermark_annotations;
use crate::pdf::clean::{filter_page_content, load_document, PageOutcome};
use crate::pdf::resources::PageResources;

/// What the cleaner would remove from one page
#[derive(Debug, Clone)]
pub struct PageFindings {
    /// 1-based page number
    pub page_number: u32,
    /// ExtGState names at or below the alpha threshold
    pub low_alpha_states: Vec<String>,
    /// Number of Form XObjects in the page resources
    pub form_xobjects: usize,
    /// Annotations that would be removed
    pub watermark_annotations: usize,
    /// Content filter result; nothing is written back
    pub content: PageOutcome,
}

/// Report, page by page, what [`crate::pdf::clean_pdf`] would remove
pub fn inspect_pdf(path: &Path, config: &FilterConfig) -> Result<Vec<PageFindings>> {
    let doc = load_document(path)?;

    let findings = doc
        .get_pages()
        .into_iter()
        .map(|(page_number, page_id)| {
            let resources = PageResources::load(&doc, page_id, config);
            let content = match filter_page_content(&doc, page_id, &resources, config) {
                Ok(outcome) => PageOutcome::from(&outcome),
                Err(reason) => PageOutcome::Skipped { reason },
            };

            PageFindings {
                page_number,
                low_alpha_states: resources
                    .low_alpha
                    .iter()
                    .map(|name| String::from_utf8_lossy(name).into_owned())
                    .collect(),
                form_xobjects: resources
                    .xobjects
                    .keys()
                    .filter(|name| resources.is_form_xobject(name))
                    .count(),
                watermark_annotations: count_watermark_annotations(&doc, page_id, config),
                content,
            }
        })
        .collect();

    Ok(findings)
}

//! PDF watermark detection and removal

pub mod alpha;
pub mod annotations;
pub mod clean;
pub mod filter;
pub mod inspect;
pub mod resources;

// Re-export commonly used items
pub use alpha::{low_alpha_states, LowAlphaSet};
pub use annotations::{clean_page_annotations, filter_annotations, is_watermark_annotation};
pub use clean::{clean_document, clean_pdf, CleanOptions, CleanReport, PageOutcome, PageReport};
pub use filter::{ContentFilter, FilterOutcome};
pub use inspect::{inspect_pdf, PageFindings};
pub use resources::{PageResources, XObjectMap};

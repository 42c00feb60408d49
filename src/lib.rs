//! PDF Unwatermark Library
//!
//! A cross-platform library for stripping watermark overlays from PDF pages.
//! This library provides functionality to:
//! - Find low-opacity graphics states in page resources
//! - Remove watermark and keyword-matching stamp annotations
//! - Filter content streams scope by scope, dropping low-opacity overlays
//!   and `/Artifact` or `/Watermark` marked-content regions
//! - Report what would be removed without changing the file
//!
//! # Example
//!
//! ```no_run
//! use pdf_unwatermark::pdf::{clean_pdf, CleanOptions};
//!
//! let options = CleanOptions::new("handout.pdf", "handout-clean.pdf");
//! let report = clean_pdf(&options).expect("Failed to clean PDF");
//! println!("Removed {} operations", report.operations_dropped());
//! ```

pub mod config;
pub mod error;
pub mod pdf;

// Re-export commonly used items
pub use config::FilterConfig;
pub use error::{Error, Result};

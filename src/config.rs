//! Tunable parameters for the watermark heuristics

/// Keywords that mark a Stamp annotation as a watermark
pub const DEFAULT_WATERMARK_KEYWORDS: [&str; 6] =
    ["watermark", "confidential", "draft", "sample", "copy", "duplicate"];

/// Heuristic thresholds shared by the scanner, the annotation filter and the
/// content filter
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    /// ExtGState entries with `min(ca, CA)` at or below this value are low-alpha
    pub low_alpha_threshold: f32,
    /// Font size or text-matrix scale at which shown text counts as large
    pub large_text_threshold: f32,
    /// Lower-cased substrings searched for in Stamp annotation Contents/Name
    pub watermark_keywords: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            low_alpha_threshold: 0.45,
            large_text_threshold: 36.0,
            watermark_keywords: DEFAULT_WATERMARK_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

impl FilterConfig {
    /// Replace the keyword list, normalizing to lower case and dropping blanks
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.watermark_keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        self
    }
}

//! Block-structured content stream filter
//!
//! Watermark overlays usually live in their own `q ... Q` scope that selects a
//! low-opacity graphics state and then shows large text or paints a Form
//! XObject. The filter walks the decoded operations once, keeping a stack of
//! open scopes. Each scope buffers its operations and collects signals. When
//! the scope closes, its whole body is either dropped or spliced into the
//! enclosing scope.
//!
//! Marked-content regions tagged `/Artifact` or `/Watermark` are removed
//! unconditionally, wherever they appear.

use lopdf::content::Operation;
use lopdf::Object;
use crate::config::FilterConfig;
use crate::pdf::resources::{name_bytes, number, PageResources};

/// Marked-content tags that identify a watermark region
const WATERMARK_TAGS: [&[u8]; 2] = [b"Artifact", b"Watermark"];

/// Operators dropped while a suspected watermark text object is skipped
const TEXT_OPERATORS: [&str; 15] = [
    "Tj", "TJ", "'", "\"", "Tf", "Td", "TD", "T*", "Tm", "Tr", "Ts", "Tw", "Tz", "TL", "Tc",
];

/// Text-matrix shear above which text is considered rotated
const ROTATION_EPSILON: f32 = 0.1;

/// One open `q ... Q` scope and the signals seen inside it
#[derive(Debug, Default)]
struct Block {
    operations: Vec<Operation>,
    uses_low_alpha: bool,
    marked_watermark_depth: usize,
    has_large_text: bool,
    saw_form_draw: bool,
    last_font_size: f32,
    last_text_scale: f32,
    /// Informational only, never part of the drop decision
    rotation_like: bool,
}

impl Block {
    fn is_watermark(&self) -> bool {
        self.uses_low_alpha && (self.has_large_text || self.saw_form_draw)
    }
}

/// Result of filtering one content stream
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// Surviving operations in their original relative order
    pub operations: Vec<Operation>,
    /// Number of input operations present in `operations`
    pub kept: usize,
    /// Number of input operations removed
    pub dropped: usize,
    /// `q ... Q` scopes discarded as watermark overlays
    pub dropped_scopes: usize,
    /// Outermost `/Artifact` or `/Watermark` marked regions removed
    pub dropped_marked_regions: usize,
    /// `BT ... ET` objects skipped under a low-alpha state
    pub dropped_text_objects: usize,
}

impl FilterOutcome {
    /// Whether the filter removed anything
    pub fn changed(&self) -> bool {
        self.dropped > 0
    }
}

/// Watermark filter for the operations of one page
///
/// A filter holds no state between calls. Every [`ContentFilter::filter`]
/// run builds a fresh scope stack.
#[derive(Debug, Clone, Copy)]
pub struct ContentFilter<'a> {
    resources: &'a PageResources,
    large_text_threshold: f32,
}

impl<'a> ContentFilter<'a> {
    pub fn new(resources: &'a PageResources, config: &FilterConfig) -> Self {
        Self {
            resources,
            large_text_threshold: config.large_text_threshold,
        }
    }

    /// Filter a decoded operation sequence
    pub fn filter(&self, operations: Vec<Operation>) -> FilterOutcome {
        let mut pass = Pass::new(self);
        for op in operations {
            pass.step(op);
        }
        pass.finish()
    }
}

/// State of one left-to-right pass
struct Pass<'f, 'a> {
    filter: &'f ContentFilter<'a>,
    /// Index 0 is the page-level root and is never dropped
    stack: Vec<Block>,
    skipping_text_until_et: bool,
    outcome: FilterOutcome,
}

impl<'f, 'a> Pass<'f, 'a> {
    fn new(filter: &'f ContentFilter<'a>) -> Self {
        Self {
            filter,
            stack: vec![Block::default()],
            skipping_text_until_et: false,
            outcome: FilterOutcome::default(),
        }
    }

    fn top(&mut self) -> &mut Block {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn keep(&mut self, op: Operation) {
        self.top().operations.push(op);
    }

    fn drop_op(&mut self) {
        self.outcome.dropped += 1;
    }

    fn step(&mut self, op: Operation) {
        if self.top().marked_watermark_depth > 0 {
            self.step_in_marked_region(&op);
            self.drop_op();
            return;
        }

        if self.skipping_text_until_et && TEXT_OPERATORS.contains(&op.operator.as_str()) {
            self.drop_op();
            return;
        }

        match op.operator.as_str() {
            "BMC" | "BDC" => {
                if is_watermark_tag(&op) {
                    self.top().marked_watermark_depth += 1;
                    self.outcome.dropped_marked_regions += 1;
                    self.drop_op();
                } else {
                    self.keep(op);
                }
            }
            "EMC" => self.keep(op),
            "q" => {
                let mut block = Block::default();
                block.operations.push(op);
                self.stack.push(block);
            }
            "Q" => self.close_block(op),
            "gs" => {
                let low_alpha = op
                    .operands
                    .first()
                    .and_then(name_bytes)
                    .is_some_and(|name| self.filter.resources.low_alpha.contains(name));
                if low_alpha {
                    self.top().uses_low_alpha = true;
                }
                self.keep(op);
            }
            "Tf" => {
                if let Some(size) = op.operands.get(1).and_then(number) {
                    self.top().last_font_size = size;
                }
                self.keep(op);
            }
            "Tm" => {
                if let Some((scale, rotated)) = text_matrix_signals(&op.operands) {
                    let block = self.top();
                    block.last_text_scale = scale;
                    block.rotation_like |= rotated;
                }
                self.keep(op);
            }
            "BT" => {
                if self.top().uses_low_alpha {
                    self.skipping_text_until_et = true;
                    self.outcome.dropped_text_objects += 1;
                    self.drop_op();
                } else {
                    self.keep(op);
                }
            }
            "ET" => {
                if self.skipping_text_until_et {
                    self.skipping_text_until_et = false;
                    self.drop_op();
                } else {
                    self.keep(op);
                }
            }
            "Tj" | "TJ" | "'" | "\"" => {
                let threshold = self.filter.large_text_threshold;
                let block = self.top();
                if block.last_font_size >= threshold || block.last_text_scale >= threshold {
                    block.has_large_text = true;
                }
                self.keep(op);
            }
            "Do" => {
                let is_form = op
                    .operands
                    .first()
                    .and_then(name_bytes)
                    .is_some_and(|name| self.filter.resources.is_form_xobject(name));
                if is_form && self.top().uses_low_alpha {
                    self.top().saw_form_draw = true;
                    self.drop_op();
                } else {
                    self.keep(op);
                }
            }
            _ => self.keep(op),
        }
    }

    /// Track nesting inside a tagged region; the caller drops `op`
    fn step_in_marked_region(&mut self, op: &Operation) {
        let block = self.top();
        match op.operator.as_str() {
            "BMC" | "BDC" => block.marked_watermark_depth += 1,
            "EMC" => block.marked_watermark_depth -= 1,
            _ => {}
        }
    }

    fn close_block(&mut self, op: Operation) {
        if self.stack.len() == 1 {
            // Unbalanced Q at page level
            self.keep(op);
            return;
        }

        let Some(block) = self.stack.pop() else {
            return;
        };

        if block.is_watermark() {
            log::debug!(
                "dropping {}-operation scope (large text: {}, form draw: {}, rotated: {})",
                block.operations.len() + 1,
                block.has_large_text,
                block.saw_form_draw,
                block.rotation_like,
            );
            self.outcome.dropped += block.operations.len() + 1;
            self.outcome.dropped_scopes += 1;
        } else {
            let parent = self.top();
            parent.operations.extend(block.operations);
            parent.operations.push(op);
        }
    }

    fn finish(mut self) -> FilterOutcome {
        // Unterminated q scopes are flattened, never dropped
        while self.stack.len() > 1 {
            if let Some(block) = self.stack.pop() {
                self.top().operations.extend(block.operations);
            }
        }

        let mut outcome = self.outcome;
        outcome.operations = self.stack.pop().map(|root| root.operations).unwrap_or_default();
        outcome.kept = outcome.operations.len();
        outcome
    }
}

/// Whether a BMC/BDC names a watermark region, by tag or by property Subtype
fn is_watermark_tag(op: &Operation) -> bool {
    let tag = op.operands.first().and_then(name_bytes);
    let subtype = match op.operands.get(1) {
        Some(Object::Dictionary(props)) => props.get(b"Subtype").ok().and_then(name_bytes),
        _ => None,
    };

    [tag, subtype]
        .into_iter()
        .flatten()
        .any(|name| WATERMARK_TAGS.contains(&name))
}

/// Scale and rotation signals of a `Tm` operation, None if malformed
fn text_matrix_signals(operands: &[Object]) -> Option<(f32, bool)> {
    if operands.len() != 6 {
        return None;
    }
    let a = number(&operands[0])?;
    let b = number(&operands[1])?;
    let c = number(&operands[2])?;
    let d = number(&operands[3])?;

    let scale = a.abs().max(d.abs());
    let rotated = b.abs() > ROTATION_EPSILON || c.abs() > ROTATION_EPSILON;
    Some((scale, rotated))
}

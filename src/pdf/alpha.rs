//! Low-opacity graphics state detection

use std::collections::BTreeSet;
use lopdf::{Dictionary, Document, Object};
use crate::pdf::resources::{number, resolve, resolve_dict};

/// ExtGState resource names whose effective opacity is low
pub type LowAlphaSet = BTreeSet<Vec<u8>>;

/// Collect the ExtGState entries with `min(ca, CA) <= threshold`
///
/// Entries that are not dictionaries, or whose alpha values are not numbers,
/// are skipped.
pub fn low_alpha_states(doc: &Document, ext_gstate: &Dictionary, threshold: f32) -> LowAlphaSet {
    ext_gstate
        .iter()
        .filter(|(_, entry)| effective_alpha(doc, entry).is_some_and(|alpha| alpha <= threshold))
        .map(|(name, _)| name.clone())
        .collect()
}

/// Lower of fill (`ca`, default 1.0) and stroke (`CA`, default `ca`) alpha
pub fn effective_alpha(doc: &Document, entry: &Object) -> Option<f32> {
    let state = resolve_dict(doc, entry)?;

    let fill = match state.get(b"ca") {
        Ok(obj) => number(resolve(doc, obj))?,
        Err(_) => 1.0,
    };
    let stroke = match state.get(b"CA") {
        Ok(obj) => number(resolve(doc, obj))?,
        Err(_) => fill,
    };

    Some(fill.min(stroke))
}

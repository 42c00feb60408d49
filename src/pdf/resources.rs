//! Page resource lookup
//!
//! Resources may sit on the page itself or be inherited from an ancestor in the
//! page tree, and every level (the Resources dictionary, its ExtGState and
//! XObject sub-dictionaries, and their entries) may be an indirect reference.

use std::collections::BTreeMap;
use lopdf::{Dictionary, Document, Object, ObjectId};
use crate::config::FilterConfig;
use crate::pdf::alpha::{low_alpha_states, LowAlphaSet};

/// XObject resource name mapped to its Subtype (None when unreadable)
pub type XObjectMap = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

/// Page tree depth after which a `/Parent` chain is treated as cyclic
const MAX_INHERITANCE_DEPTH: usize = 64;

/// The two resource views the content filter needs for one page
#[derive(Debug, Clone, Default)]
pub struct PageResources {
    /// ExtGState names whose opacity is at or below the configured threshold
    pub low_alpha: LowAlphaSet,
    /// XObject names and their Subtypes
    pub xobjects: XObjectMap,
}

impl PageResources {
    /// Resolve the page's resources and scan them
    ///
    /// A page without resources yields empty sets, which makes the content
    /// filter a pass-through apart from marked watermark regions.
    pub fn load(doc: &Document, page_id: ObjectId, config: &FilterConfig) -> Self {
        let Some(resources) = page_resources(doc, page_id) else {
            return Self::default();
        };

        let low_alpha = sub_dictionary(doc, resources, b"ExtGState")
            .map(|ext_gstate| low_alpha_states(doc, ext_gstate, config.low_alpha_threshold))
            .unwrap_or_default();

        let xobjects = sub_dictionary(doc, resources, b"XObject")
            .map(|xobjects| xobject_subtypes(doc, xobjects))
            .unwrap_or_default();

        Self { low_alpha, xobjects }
    }

    /// Whether `name` resolves to a Form XObject
    pub fn is_form_xobject(&self, name: &[u8]) -> bool {
        matches!(self.xobjects.get(name), Some(Some(subtype)) if subtype.as_slice() == b"Form")
    }
}

/// Find the effective Resources dictionary of a page, following `/Parent`
pub fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(res) = node.get(b"Resources") {
            return resolve_dict(doc, res);
        }

        match node.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => node = doc.get_dictionary(*parent_id).ok()?,
            _ => return None,
        }
    }

    None
}

/// Map each XObject entry name to its Subtype
fn xobject_subtypes(doc: &Document, xobjects: &Dictionary) -> XObjectMap {
    xobjects
        .iter()
        .map(|(name, value)| {
            let subtype = resolve_dict(doc, value)
                .and_then(|dict| dict.get(b"Subtype").ok())
                .and_then(|obj| name_bytes(resolve(doc, obj)))
                .map(|subtype| subtype.to_vec());
            (name.clone(), subtype)
        })
        .collect()
}

/// Look up a resource category (ExtGState, XObject, ...) as a dictionary
pub(crate) fn sub_dictionary<'a>(
    doc: &'a Document,
    resources: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Dictionary> {
    resources.get(key).ok().and_then(|obj| resolve_dict(doc, obj))
}

/// Follow a single indirect reference; anything else is returned unchanged
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// View an object as a dictionary; streams expose their stream dictionary
pub(crate) fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj) {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

/// Numeric value of an Integer or Real operand
pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(n) => Some(*n as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Raw bytes of a Name object
pub(crate) fn name_bytes(obj: &Object) -> Option<&[u8]> {
    match obj {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

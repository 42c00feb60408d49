//! Watermark annotation removal

use lopdf::{Dictionary, Document, Object, ObjectId};
use crate::config::FilterConfig;
use crate::error::Result;
use crate::pdf::resources::{name_bytes, resolve, resolve_dict};

/// Decide whether one annotation dictionary is a watermark
///
/// `/Watermark` annotations always are. `/Stamp` annotations are when their
/// Contents or Name contains one of the configured keywords.
pub fn is_watermark_annotation(doc: &Document, annot: &Dictionary, keywords: &[String]) -> bool {
    let subtype = annot.get(b"Subtype").ok().and_then(|obj| name_bytes(resolve(doc, obj)));

    match subtype {
        Some(b"Watermark") => true,
        Some(b"Stamp") => [b"Contents".as_slice(), b"Name".as_slice()]
            .into_iter()
            .filter_map(|key| annot.get(key).ok())
            .filter_map(|obj| text_of(resolve(doc, obj)))
            .any(|text| {
                let text = text.to_lowercase();
                keywords.iter().any(|keyword| text.contains(keyword.as_str()))
            }),
        _ => false,
    }
}

/// Filter an annotation array, preserving order
///
/// Entries that cannot be resolved to a dictionary are kept.
pub fn filter_annotations(doc: &Document, annots: &[Object], config: &FilterConfig) -> Vec<Object> {
    annots
        .iter()
        .filter(|entry| match resolve_dict(doc, entry) {
            Some(annot) => !is_watermark_annotation(doc, annot, &config.watermark_keywords),
            None => true,
        })
        .cloned()
        .collect()
}

/// Count the watermark annotations on a page without changing it
pub fn count_watermark_annotations(doc: &Document, page_id: ObjectId, config: &FilterConfig) -> usize {
    page_annotations(doc, page_id)
        .map(|annots| annots.len() - filter_annotations(doc, &annots, config).len())
        .unwrap_or(0)
}

/// Remove watermark annotations from a page and return how many were removed
///
/// When nothing is left, `/Annots` is removed from the page instead of being
/// stored as an empty array.
pub fn clean_page_annotations(
    doc: &mut Document,
    page_id: ObjectId,
    config: &FilterConfig,
) -> Result<usize> {
    let Some(annots) = page_annotations(doc, page_id) else {
        return Ok(0);
    };

    let kept = filter_annotations(doc, &annots, config);
    let removed = annots.len() - kept.len();
    if removed == 0 {
        return Ok(0);
    }

    let page_dict = doc.get_dictionary_mut(page_id)?;
    if kept.is_empty() {
        page_dict.remove(b"Annots");
    } else {
        page_dict.set("Annots", Object::Array(kept));
    }

    Ok(removed)
}

/// Read a page's `/Annots` array, direct or indirect
fn page_annotations(doc: &Document, page_id: ObjectId) -> Option<Vec<Object>> {
    let page_dict = doc.get_dictionary(page_id).ok()?;
    match resolve(doc, page_dict.get(b"Annots").ok()?) {
        Object::Array(annots) => Some(annots.clone()),
        _ => None,
    }
}

/// Text of a string or name object, decoding PDF text strings
fn text_of(obj: &Object) -> Option<String> {
    match obj {
        Object::String(..) => lopdf::decode_text_string(obj).ok(),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, StringFormat};

    fn literal(text: &str) -> Object {
        Object::String(text.as_bytes().to_vec(), StringFormat::Literal)
    }

    fn keywords() -> Vec<String> {
        FilterConfig::default().watermark_keywords
    }

    #[test]
    fn test_watermark_subtype_always_matches() {
        let doc = Document::with_version("1.5");
        let annot = dictionary! { "Subtype" => "Watermark" };
        assert!(is_watermark_annotation(&doc, &annot, &keywords()));
    }

    #[test]
    fn test_stamp_matches_keyword_case_insensitively() {
        let doc = Document::with_version("1.5");
        let annot = dictionary! { "Subtype" => "Stamp", "Contents" => literal("DRAFT COPY") };
        assert!(is_watermark_annotation(&doc, &annot, &keywords()));

        let named = dictionary! { "Subtype" => "Stamp", "Name" => "Confidential" };
        assert!(is_watermark_annotation(&doc, &named, &keywords()));
    }

    #[test]
    fn test_stamp_without_keyword_kept() {
        let doc = Document::with_version("1.5");
        let annot = dictionary! { "Subtype" => "Stamp", "Name" => "Approved" };
        assert!(!is_watermark_annotation(&doc, &annot, &keywords()));
    }

    #[test]
    fn test_keyword_on_other_subtype_ignored() {
        let doc = Document::with_version("1.5");
        let annot = dictionary! { "Subtype" => "Text", "Contents" => literal("draft notes") };
        assert!(!is_watermark_annotation(&doc, &annot, &keywords()));
    }

    #[test]
    fn test_utf16_contents_decoded() {
        let doc = Document::with_version("1.5");
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "Sample".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        let annot = dictionary! {
            "Subtype" => "Stamp",
            "Contents" => Object::String(bytes, StringFormat::Hexadecimal),
        };
        assert!(is_watermark_annotation(&doc, &annot, &keywords()));
    }

    #[test]
    fn test_pdfdoc_contents_decoded() {
        let doc = Document::with_version("1.5");
        // Guillemets in PDFDocEncoding, not valid UTF-8
        let annot = dictionary! {
            "Subtype" => "Stamp",
            "Contents" => Object::String(b"\xABConfidential\xBB".to_vec(), StringFormat::Literal),
        };
        assert!(is_watermark_annotation(&doc, &annot, &keywords()));
    }

    #[test]
    fn test_filter_keeps_order_and_malformed_entries() {
        let mut doc = Document::with_version("1.5");
        let link = doc.add_object(dictionary! { "Subtype" => "Link" });
        let mark = doc.add_object(dictionary! { "Subtype" => "Watermark" });
        let text = doc.add_object(dictionary! { "Subtype" => "Text" });
        let dangling = Object::Reference((999, 0));

        let annots = vec![link.into(), mark.into(), dangling.clone(), text.into()];
        let kept = filter_annotations(&doc, &annots, &FilterConfig::default());

        assert_eq!(kept, vec![Object::Reference(link), dangling, Object::Reference(text)]);
    }

    #[test]
    fn test_clean_page_removes_empty_annots() {
        let mut doc = Document::with_version("1.5");
        let mark = doc.add_object(dictionary! { "Subtype" => "Watermark" });
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Annots" => vec![mark.into()],
        });

        let removed = clean_page_annotations(&mut doc, page_id, &FilterConfig::default()).unwrap();
        assert_eq!(removed, 1);
        assert!(doc.get_dictionary(page_id).unwrap().get(b"Annots").is_err());
    }

    #[test]
    fn test_clean_page_with_indirect_annots_array() {
        let mut doc = Document::with_version("1.5");
        let link = doc.add_object(dictionary! { "Subtype" => "Link" });
        let stamp = doc.add_object(dictionary! {
            "Subtype" => "Stamp",
            "Contents" => literal("Duplicate"),
        });
        let array_id = doc.add_object(Object::Array(vec![stamp.into(), link.into()]));
        let page_id = doc.add_object(dictionary! { "Type" => "Page", "Annots" => array_id });

        assert_eq!(count_watermark_annotations(&doc, page_id, &FilterConfig::default()), 1);

        let removed = clean_page_annotations(&mut doc, page_id, &FilterConfig::default()).unwrap();
        assert_eq!(removed, 1);

        let annots = doc.get_dictionary(page_id).unwrap().get(b"Annots").unwrap();
        assert_eq!(annots, &Object::Array(vec![Object::Reference(link)]));
    }

    #[test]
    fn test_page_without_annots_untouched() {
        let mut doc = Document::with_version("1.5");
        let page_id = doc.add_object(dictionary! { "Type" => "Page" });

        let removed = clean_page_annotations(&mut doc, page_id, &FilterConfig::default()).unwrap();
        assert_eq!(removed, 0);
    }
}

//! Page-level lopdf helpers: page box lookup, resource registration and
//! content-stream appending.

use std::collections::BTreeSet;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Result, SignflowError};
use crate::geometry::DEFAULT_PAGE_HEIGHT;

/// Page tree attributes a page may inherit from its ancestors.
pub(crate) const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

const MAX_TREE_DEPTH: usize = 32;

fn op_err(e: impl std::fmt::Display) -> SignflowError {
    SignflowError::OperationError(e.to_string())
}

/// Look up `key` on the page or, failing that, on its ancestors.
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn as_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Height of the page's MediaBox, following inheritance and indirect arrays.
pub fn page_height(doc: &Document, page_id: ObjectId) -> f32 {
    let media_box = match inherited_attribute(doc, page_id, b"MediaBox") {
        Some(Object::Reference(id)) => doc.get_object(*id).ok(),
        other => other,
    };

    let values: Vec<f32> = match media_box {
        Some(Object::Array(arr)) => arr.iter().filter_map(as_number).collect(),
        _ => Vec::new(),
    };

    if values.len() == 4 {
        (values[3] - values[1]).abs()
    } else {
        DEFAULT_PAGE_HEIGHT
    }
}

/// Where a page's resource dictionary lives.
enum ResourcesLocation {
    Shared(ObjectId),
    Inline,
}

/// Make sure the page has a resource dictionary it can be extended through.
///
/// Inherited resources are copied onto the page so that additions do not
/// leak to sibling pages.
fn resources_location(doc: &mut Document, page_id: ObjectId) -> Result<ResourcesLocation> {
    let own = doc
        .get_dictionary(page_id)
        .map_err(op_err)?
        .get(b"Resources")
        .ok()
        .cloned();

    match own {
        Some(Object::Reference(id)) => Ok(ResourcesLocation::Shared(id)),
        Some(Object::Dictionary(_)) => Ok(ResourcesLocation::Inline),
        _ => {
            let inherited = match inherited_attribute(doc, page_id, b"Resources") {
                Some(Object::Reference(id)) => doc.get_dictionary(*id).ok().cloned(),
                Some(Object::Dictionary(dict)) => Some(dict.clone()),
                _ => None,
            };
            let page = doc
                .get_object_mut(page_id)
                .and_then(Object::as_dict_mut)
                .map_err(op_err)?;
            page.set("Resources", Object::Dictionary(inherited.unwrap_or_default()));
            Ok(ResourcesLocation::Inline)
        }
    }
}

fn resources_mut<'a>(
    doc: &'a mut Document,
    page_id: ObjectId,
    location: &ResourcesLocation,
) -> Result<&'a mut Dictionary> {
    match location {
        ResourcesLocation::Shared(id) => doc
            .get_object_mut(*id)
            .and_then(Object::as_dict_mut)
            .map_err(op_err),
        ResourcesLocation::Inline => doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .and_then(|page| page.get_mut(b"Resources"))
            .and_then(Object::as_dict_mut)
            .map_err(op_err),
    }
}

/// Names already used in one resource category (`Font`, `XObject`, ...).
pub(crate) fn resource_names(doc: &Document, page_id: ObjectId, category: &[u8]) -> BTreeSet<Vec<u8>> {
    let resources = match inherited_attribute(doc, page_id, b"Resources") {
        Some(Object::Reference(id)) => doc.get_dictionary(*id).ok(),
        Some(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };
    let entries = match resources.and_then(|r| r.get(category).ok()) {
        Some(Object::Reference(id)) => doc.get_dictionary(*id).ok(),
        Some(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };
    entries
        .map(|d| d.iter().map(|(k, _)| k.clone()).collect())
        .unwrap_or_default()
}

/// Register `target` under `/Resources /<category> /<name>` for the page.
pub(crate) fn add_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &[u8],
    name: &[u8],
    target: ObjectId,
) -> Result<()> {
    let location = resources_location(doc, page_id)?;

    let shared_category = match resources_mut(doc, page_id, &location)?.get(category) {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };

    if let Some(id) = shared_category {
        let entries = doc
            .get_object_mut(id)
            .and_then(Object::as_dict_mut)
            .map_err(op_err)?;
        entries.set(name.to_vec(), Object::Reference(target));
        return Ok(());
    }

    let resources = resources_mut(doc, page_id, &location)?;
    match resources.get_mut(category) {
        Ok(Object::Dictionary(entries)) => entries.set(name.to_vec(), Object::Reference(target)),
        _ => {
            let mut entries = Dictionary::new();
            entries.set(name.to_vec(), Object::Reference(target));
            resources.set(category.to_vec(), Object::Dictionary(entries));
        }
    }
    Ok(())
}

/// Append `operations` to the page as a new content stream.
///
/// When the page already has content, a `q` stream is put in front of it and
/// the overlay opens with `Q`, so whatever graphics state the original
/// content leaves behind cannot skew the overlay. Existing streams are never
/// modified.
pub(crate) fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    operations: Vec<Operation>,
) -> Result<()> {
    let existing = doc
        .get_dictionary(page_id)
        .map_err(op_err)?
        .get(b"Contents")
        .ok()
        .cloned();

    let existing: Vec<Object> = match existing {
        Some(Object::Array(arr)) => arr,
        Some(reference @ Object::Reference(_)) => vec![reference],
        _ => Vec::new(),
    };

    let mut ops = Vec::with_capacity(operations.len() + 3);
    if !existing.is_empty() {
        ops.push(Operation::new("Q", vec![]));
    }
    ops.push(Operation::new("q", vec![]));
    ops.extend(operations);
    ops.push(Operation::new("Q", vec![]));

    let mut encoded = b"\n".to_vec();
    encoded.extend(Content { operations: ops }.encode().map_err(op_err)?);
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    if !existing.is_empty() {
        let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        contents.push(Object::Reference(save_id));
        contents.extend(existing);
    }
    contents.push(Object::Reference(overlay_id));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(op_err)?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}

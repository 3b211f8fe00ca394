//! PDF Merge algorithm
//!
//! Combines multiple PDFs into a single document.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Document, Object, ObjectId};
use tracing::info;

use crate::error::{Result, SignflowError};
use crate::page::{inherited_attribute, INHERITABLE_KEYS};

/// Read every path and merge the documents in argument order.
pub fn merge_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<u8>> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| SignflowError::SourceNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        documents.push(bytes);
    }
    merge_documents(documents)
}

/// Merge multiple PDFs into one
///
/// The algorithm:
/// 1. If empty, return error
/// 2. Load every document; the first becomes the destination
/// 3. For each remaining source document:
///    a. Calculate ID offset to avoid conflicts
///    b. Import all objects with remapped IDs
///    c. Append pages to the destination
/// 4. Rebuild the destination's root Pages node as a flat list of the pages
/// 5. Compress and return the merged result
pub fn merge_documents(documents: Vec<Vec<u8>>) -> Result<Vec<u8>> {
    if documents.is_empty() {
        return Err(SignflowError::OperationError("No documents to merge".into()));
    }

    let mut loaded_docs = Vec::with_capacity(documents.len());
    for (i, doc_bytes) in documents.iter().enumerate() {
        let mut doc = Document::load_mem(doc_bytes).map_err(|e| {
            SignflowError::ParseError(format!("Failed to load document {}: {}", i, e))
        })?;
        flatten_inherited_attributes(&mut doc);
        loaded_docs.push(doc);
    }

    let mut dest = loaded_docs.remove(0);
    let mut dest_max_id = dest.max_id;
    let mut dest_page_refs = get_page_references(&dest);

    for source in loaded_docs.into_iter() {
        let source_pages = get_page_references(&source);
        let id_offset = dest_max_id;

        let mut remapped_objects = BTreeMap::new();
        for (old_id, object) in source.objects.into_iter() {
            let new_id = (old_id.0 + id_offset, old_id.1);
            remapped_objects.insert(new_id, remap_object_refs(object, id_offset));
        }
        dest.objects.extend(remapped_objects);

        dest_page_refs.extend(
            source_pages
                .into_iter()
                .map(|(num, gen)| (num + id_offset, gen)),
        );

        dest_max_id = (source.max_id + id_offset).max(dest_max_id);
    }

    dest.max_id = dest_max_id;
    update_page_tree(&mut dest, &dest_page_refs)?;
    info!("Merged {} documents into {} pages", documents.len(), dest_page_refs.len());

    dest.compress();

    let mut buffer = Vec::new();
    dest.save_to(&mut buffer)
        .map_err(|e| SignflowError::OperationError(format!("Failed to save merged PDF: {}", e)))?;

    Ok(buffer)
}

fn get_page_references(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().values().copied().collect()
}

/// Copy attributes a page inherits from intermediate Pages nodes onto the
/// page itself, since those nodes are dropped from the merged tree.
fn flatten_inherited_attributes(doc: &mut Document) {
    for page_id in get_page_references(doc) {
        let missing: Vec<(&[u8], Object)> = INHERITABLE_KEYS
            .iter()
            .filter(|key| {
                doc.get_dictionary(page_id)
                    .map(|page| page.get(key).is_err())
                    .unwrap_or(false)
            })
            .filter_map(|key| {
                inherited_attribute(doc, page_id, key).map(|value| (*key, value.clone()))
            })
            .collect();

        if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            for (key, value) in missing {
                page.set(key.to_vec(), value);
            }
        }
    }
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(value.clone(), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(value.clone(), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

fn root_pages_id(doc: &Document) -> Result<ObjectId> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| SignflowError::OperationError("No Root in trailer".into()))?;

    doc.get_dictionary(catalog_id)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| SignflowError::OperationError("No Pages in catalog".into()))
}

/// Point the root Pages node at `page_refs` and reparent every page to it.
fn update_page_tree(doc: &mut Document, page_refs: &[ObjectId]) -> Result<()> {
    let pages_id = root_pages_id(doc)?;

    let pages_dict = doc
        .get_object_mut(pages_id)
        .and_then(Object::as_dict_mut)
        .map_err(|_| SignflowError::OperationError("Invalid pages dictionary".into()))?;
    let kids = page_refs
        .iter()
        .map(|&id| Object::Reference(id))
        .collect::<Vec<_>>();
    pages_dict.set("Kids", Object::Array(kids));
    pages_dict.set("Count", Object::Integer(page_refs.len() as i64));

    for &page_id in page_refs {
        if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    Ok(())
}

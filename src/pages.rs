//! Page tree edits: hiding a page and moving a page to a new position.
//!
//! Indices are 0-based and always refer to the document as it is when the
//! operation runs.

use anyhow::{Result, anyhow, bail};
use lopdf::{Document, Object, ObjectId};
use std::collections::HashSet;
use std::fmt;

/// Attributes a page may inherit from its ancestor `Pages` nodes.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOperation {
    /// Removes the page from the page tree. The page object stays in the
    /// file, so its content can still be recovered.
    Delete { page: usize },
    /// Moves a page so that it ends up at index `to`.
    Move { from: usize, to: usize },
}

impl PageOperation {
    pub fn perform(&self, doc: &mut Document) -> Result<()> {
        match *self {
            PageOperation::Delete { page } => delete_page(doc, page).map(|_| ()),
            PageOperation::Move { from, to } => move_page(doc, from, to),
        }
    }
}

impl fmt::Display for PageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageOperation::Delete { page } => write!(f, "Deleting page: {}", page),
            PageOperation::Move { from, to } => write!(f, "Moving page {} to {}", from, to),
        }
    }
}

/// Deeper trees are not walked, matching lopdf's page iterator.
const MAX_TREE_DEPTH: usize = 256;

/// One entry of a `Kids` array that refers to a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageSlot {
    page: ObjectId,
    parent: ObjectId,
    position: usize,
}

/// Where a `Pages` node keeps its `Kids` array.
#[derive(Debug, Clone, Copy)]
enum KidsLocation {
    Inline(ObjectId),
    Indirect(ObjectId),
}

/// Page object ids in reading order.
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Hides the page at `index` and returns its object id.
pub fn delete_page(doc: &mut Document, index: usize) -> Result<ObjectId> {
    let slots = page_slots(doc)?;
    let Some(&slot) = slots.get(index) else {
        bail!(
            "Page {} is out of range (PDF has {} pages)",
            index,
            slots.len()
        );
    };

    remove_slot(doc, slot)?;
    Ok(slot.page)
}

pub fn move_page(doc: &mut Document, from: usize, to: usize) -> Result<()> {
    let slots = page_slots(doc)?;
    let total = slots.len();
    for index in [from, to] {
        if index >= total {
            bail!("Page {} is out of range (PDF has {} pages)", index, total);
        }
    }
    if from == to {
        return Ok(());
    }

    let moving = slots[from];
    // The page may land under a different parent.
    materialize_inherited(doc, moving.page, moving.parent)?;
    remove_slot(doc, moving)?;

    let slots = page_slots(doc)?;
    let (anchor, after) = match slots.get(to) {
        Some(&slot) => (slot, false),
        None => match slots.last() {
            Some(&slot) => (slot, true),
            None => bail!("Page tree is empty after removing page {}", from),
        },
    };
    insert_page(
        doc,
        moving.page,
        anchor.parent,
        anchor.position + usize::from(after),
    )
}

/// Walks the page tree in the same order as `Document::get_pages`, one slot
/// per page reference.
fn page_slots(doc: &Document) -> Result<Vec<PageSlot>> {
    let root = doc.catalog()?.get(b"Pages")?.as_reference()?;
    let mut slots = Vec::new();
    let mut path = Vec::new();
    collect_slots(doc, root, &mut path, &mut slots)?;
    Ok(slots)
}

fn collect_slots(
    doc: &Document,
    node: ObjectId,
    path: &mut Vec<ObjectId>,
    slots: &mut Vec<PageSlot>,
) -> Result<()> {
    if path.len() >= MAX_TREE_DEPTH || path.contains(&node) {
        return Ok(());
    }
    path.push(node);

    for (position, kid) in kids(doc, node)?.iter().enumerate() {
        let Ok(kid_id) = kid.as_reference() else {
            continue;
        };
        let Ok(kind) = doc
            .get_dictionary(kid_id)
            .and_then(|d| d.get(b"Type"))
            .and_then(|t| t.as_name())
        else {
            continue;
        };
        match kind {
            b"Page" => slots.push(PageSlot {
                page: kid_id,
                parent: node,
                position,
            }),
            b"Pages" => collect_slots(doc, kid_id, path, slots)?,
            _ => {}
        }
    }

    path.pop();
    Ok(())
}

fn kids_location(doc: &Document, node: ObjectId) -> Result<KidsLocation> {
    match doc.get_dictionary(node)?.get(b"Kids")? {
        Object::Reference(id) => Ok(KidsLocation::Indirect(*id)),
        _ => Ok(KidsLocation::Inline(node)),
    }
}

fn kids(doc: &Document, node: ObjectId) -> Result<&Vec<Object>> {
    let kids = match kids_location(doc, node)? {
        KidsLocation::Inline(id) => doc.get_dictionary(id)?.get(b"Kids")?.as_array()?,
        KidsLocation::Indirect(id) => doc.get_object(id)?.as_array()?,
    };
    Ok(kids)
}

fn kids_mut(doc: &mut Document, node: ObjectId) -> Result<&mut Vec<Object>> {
    let kids = match kids_location(doc, node)? {
        KidsLocation::Inline(id) => doc
            .get_dictionary_mut(id)?
            .get_mut(b"Kids")?
            .as_array_mut()?,
        KidsLocation::Indirect(id) => doc.get_object_mut(id)?.as_array_mut()?,
    };
    Ok(kids)
}

/// Adds `delta` to `Count` on `node` and every ancestor.
fn adjust_counts(doc: &mut Document, start: ObjectId, delta: i64) -> Result<()> {
    let mut visited = HashSet::new();
    let mut node = Some(start);
    while let Some(id) = node {
        if !visited.insert(id) {
            bail!("Page tree loops back to object {} {}", id.0, id.1);
        }
        let dict = doc.get_dictionary_mut(id)?;
        let count = dict
            .get(b"Count")
            .and_then(|c| c.as_i64())
            .map_err(|_| anyhow!("Pages node {} {} has no integer Count", id.0, id.1))?;
        let updated = count + delta;
        if updated < 0 {
            bail!(
                "Pages node {} {} has Count {}, cannot remove {} page(s)",
                id.0,
                id.1,
                count,
                -delta
            );
        }
        dict.set("Count", Object::Integer(updated));
        node = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    Ok(())
}

fn remove_slot(doc: &mut Document, slot: PageSlot) -> Result<()> {
    let kids = kids_mut(doc, slot.parent)?;
    if kids.get(slot.position).and_then(|kid| kid.as_reference().ok()) != Some(slot.page) {
        bail!(
            "Page object {} {} is not at Kids position {} of its parent",
            slot.page.0,
            slot.page.1,
            slot.position
        );
    }
    kids.remove(slot.position);

    adjust_counts(doc, slot.parent, -1)
}

fn insert_page(
    doc: &mut Document,
    page_id: ObjectId,
    parent_id: ObjectId,
    position: usize,
) -> Result<()> {
    let kids = kids_mut(doc, parent_id)?;
    let position = position.min(kids.len());
    kids.insert(position, Object::Reference(page_id));

    doc.get_dictionary_mut(page_id)?
        .set("Parent", Object::Reference(parent_id));
    adjust_counts(doc, parent_id, 1)
}

/// Copies attributes the page inherits from `parent` and its ancestors onto
/// the page.
fn materialize_inherited(doc: &mut Document, page_id: ObjectId, parent: ObjectId) -> Result<()> {
    let page = doc.get_dictionary(page_id)?;
    let mut missing: Vec<&[u8]> = INHERITABLE
        .iter()
        .copied()
        .filter(|key| !page.has(key))
        .collect();

    let mut inherited = Vec::new();
    let mut visited = HashSet::new();
    let mut node = Some(parent);
    while let Some(id) = node {
        if missing.is_empty() || !visited.insert(id) {
            break;
        }
        let dict = doc.get_dictionary(id)?;
        missing.retain(|key| match dict.get(key) {
            Ok(value) => {
                inherited.push((key.to_vec(), value.clone()));
                false
            }
            Err(_) => true,
        });
        node = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }

    let page = doc.get_dictionary_mut(page_id)?;
    for (key, value) in inherited {
        page.set(key, value);
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn reorder(ids: &[ObjectId], order: &[usize]) -> Vec<ObjectId> {
        order.iter().map(|&i| ids[i]).collect()
    }

    #[test]
    fn test_display() {
        assert_eq!(
            PageOperation::Delete { page: 3 }.to_string(),
            "Deleting page: 3"
        );
        assert_eq!(
            PageOperation::Move { from: 0, to: 2 }.to_string(),
            "Moving page 0 to 2"
        );
    }

    #[test]
    fn test_delete_hides_page_but_keeps_object() {
        let (mut doc, ids) = create_test_doc(&[4]);

        let removed = delete_page(&mut doc, 1).unwrap();

        assert_eq!(removed, ids[1]);
        assert_eq!(page_ids(&doc), reorder(&ids, &[0, 2, 3]));
        assert!(doc.get_object(ids[1]).is_ok());
        assert_eq!(count_of(&doc, root_pages_id(&doc)), 3);
    }

    #[test]
    fn test_delete_updates_counts_in_nested_tree() {
        let (mut doc, ids) = create_test_doc(&[2, 3]);
        let parent = parent_of(&doc, ids[3]);

        delete_page(&mut doc, 3).unwrap();

        assert_eq!(page_ids(&doc), reorder(&ids, &[0, 1, 2, 4]));
        assert_eq!(count_of(&doc, parent), 2);
        assert_eq!(count_of(&doc, root_pages_id(&doc)), 4);
    }

    #[test]
    fn test_delete_out_of_range_fails() {
        let (mut doc, ids) = create_test_doc(&[2]);

        let err = delete_page(&mut doc, 2).unwrap_err();

        assert!(err.to_string().contains("out of range"));
        assert_eq!(page_ids(&doc), ids);
    }

    #[test]
    fn test_move_forward() {
        let (mut doc, ids) = create_test_doc(&[4]);

        move_page(&mut doc, 0, 2).unwrap();

        assert_eq!(page_ids(&doc), reorder(&ids, &[1, 2, 0, 3]));
        assert_eq!(count_of(&doc, root_pages_id(&doc)), 4);
    }

    #[test]
    fn test_move_backward() {
        let (mut doc, ids) = create_test_doc(&[4]);

        move_page(&mut doc, 3, 0).unwrap();

        assert_eq!(page_ids(&doc), reorder(&ids, &[3, 0, 1, 2]));
    }

    #[test]
    fn test_move_to_last_position() {
        let (mut doc, ids) = create_test_doc(&[4]);

        move_page(&mut doc, 1, 3).unwrap();

        assert_eq!(page_ids(&doc), reorder(&ids, &[0, 2, 3, 1]));
    }

    #[test]
    fn test_move_same_index_is_noop() {
        let (mut doc, ids) = create_test_doc(&[3]);

        move_page(&mut doc, 1, 1).unwrap();

        assert_eq!(page_ids(&doc), ids);
    }

    #[test]
    fn test_move_out_of_range_fails() {
        let (mut doc, ids) = create_test_doc(&[3]);

        assert!(move_page(&mut doc, 3, 0).is_err());
        assert!(move_page(&mut doc, 0, 3).is_err());
        assert_eq!(page_ids(&doc), ids);
    }

    #[test]
    fn test_move_across_nested_parents() {
        let (mut doc, ids) = create_test_doc(&[2, 2]);
        let first_group = parent_of(&doc, ids[0]);
        let second_group = parent_of(&doc, ids[2]);

        move_page(&mut doc, 3, 0).unwrap();

        assert_eq!(page_ids(&doc), reorder(&ids, &[3, 0, 1, 2]));
        assert_eq!(parent_of(&doc, ids[3]), first_group);
        assert_eq!(count_of(&doc, first_group), 3);
        assert_eq!(count_of(&doc, second_group), 1);
        assert_eq!(count_of(&doc, root_pages_id(&doc)), 4);
    }

    #[test]
    fn test_move_keeps_inherited_attributes() {
        let (mut doc, ids) = create_test_doc(&[2, 2]);

        move_page(&mut doc, 2, 0).unwrap();

        let page = doc.get_dictionary(ids[2]).unwrap();
        assert_eq!(page.get(b"Rotate").unwrap().as_i64().unwrap(), 90);
        assert!(page.has(b"MediaBox"));
    }

    #[test]
    fn test_operations_apply_in_order() {
        let (mut doc, ids) = create_test_doc(&[5]);
        let operations = [
            PageOperation::Delete { page: 0 },
            PageOperation::Move { from: 3, to: 0 },
            PageOperation::Delete { page: 2 },
        ];

        for operation in &operations {
            operation.perform(&mut doc).unwrap();
        }

        assert_eq!(page_ids(&doc), reorder(&ids, &[4, 1, 3]));
    }

    /// Replaces the root `Kids` with `order` (indices into `ids`).
    fn set_root_kids(doc: &mut Document, ids: &[ObjectId], order: &[usize]) {
        let root = root_pages_id(doc);
        let kids = order.iter().map(|&i| Object::Reference(ids[i])).collect();
        let dict = doc.get_dictionary_mut(root).unwrap();
        dict.set("Kids", Object::Array(kids));
        dict.set("Count", Object::Integer(order.len() as i64));
    }

    /// Moves the root `Kids` array into its own object.
    fn make_root_kids_indirect(doc: &mut Document) -> ObjectId {
        let root = root_pages_id(doc);
        let kids = doc
            .get_dictionary(root)
            .and_then(|d| d.get(b"Kids"))
            .unwrap()
            .clone();
        let kids_id = doc.add_object(kids);
        doc.get_dictionary_mut(root)
            .unwrap()
            .set("Kids", Object::Reference(kids_id));
        kids_id
    }

    #[test]
    fn test_delete_removes_one_of_duplicated_kids() {
        let (mut doc, ids) = create_test_doc(&[2]);
        set_root_kids(&mut doc, &ids, &[0, 0, 1]);
        assert_eq!(page_ids(&doc).len(), 3);

        delete_page(&mut doc, 1).unwrap();

        assert_eq!(page_ids(&doc), reorder(&ids, &[0, 1]));
        assert_eq!(count_of(&doc, root_pages_id(&doc)), 2);
    }

    #[test]
    fn test_move_keeps_duplicated_kids() {
        let (mut doc, ids) = create_test_doc(&[2]);
        set_root_kids(&mut doc, &ids, &[0, 0, 1]);

        move_page(&mut doc, 0, 2).unwrap();

        assert_eq!(page_ids(&doc), reorder(&ids, &[0, 1, 0]));
        assert_eq!(count_of(&doc, root_pages_id(&doc)), 3);
    }

    #[test]
    fn test_delete_with_indirect_kids() {
        let (mut doc, ids) = create_test_doc(&[3]);
        let kids_id = make_root_kids_indirect(&mut doc);
        assert_eq!(page_ids(&doc), ids);

        delete_page(&mut doc, 0).unwrap();

        assert_eq!(page_ids(&doc), reorder(&ids, &[1, 2]));
        assert_eq!(doc.get_object(kids_id).unwrap().as_array().unwrap().len(), 2);
        assert_eq!(count_of(&doc, root_pages_id(&doc)), 2);
    }

    #[test]
    fn test_move_with_indirect_kids() {
        let (mut doc, ids) = create_test_doc(&[3]);
        make_root_kids_indirect(&mut doc);

        move_page(&mut doc, 2, 0).unwrap();

        assert_eq!(page_ids(&doc), reorder(&ids, &[2, 0, 1]));
        let root = doc.get_dictionary(root_pages_id(&doc)).unwrap();
        assert!(root.get(b"Kids").unwrap().as_reference().is_ok());
    }

    #[test]
    fn test_missing_count_is_an_error() {
        let (mut doc, _) = create_test_doc(&[2]);
        let root = root_pages_id(&doc);
        doc.get_dictionary_mut(root).unwrap().remove(b"Count");

        let err = delete_page(&mut doc, 0).unwrap_err();

        assert!(err.to_string().contains("no integer Count"));
    }

    #[test]
    fn test_count_cannot_go_negative() {
        let (mut doc, _) = create_test_doc(&[2]);
        let root = root_pages_id(&doc);
        doc.get_dictionary_mut(root)
            .unwrap()
            .set("Count", Object::Integer(0));

        let err = delete_page(&mut doc, 0).unwrap_err();

        assert!(err.to_string().contains("cannot remove"));
    }

    #[test]
    fn test_deleted_page_survives_save_and_load() {
        let (mut doc, _) = create_test_doc(&[3]);
        delete_page(&mut doc, 0).unwrap();

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        let reloaded = Document::load_mem(&buffer).unwrap();

        assert_eq!(reloaded.get_pages().len(), 2);
        let pages = reloaded
            .objects
            .values()
            .filter_map(|o| o.as_dict().ok())
            .filter(|d| d.get(b"Type").and_then(|t| t.as_name()).ok() == Some(&b"Page"[..]))
            .count();
        assert_eq!(pages, 3);
    }
}

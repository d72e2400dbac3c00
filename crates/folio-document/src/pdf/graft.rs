// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Object grafting — copy objects (and everything they reference) from one
// lopdf document into another.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::warn;

/// Copies objects from a source document into a target document.
///
/// Each source object is copied at most once per grafter: repeated and
/// cyclic references (shared fonts, annotation `/P` back-links) resolve to
/// the same target object.
///
/// Page-tree nodes are never pulled in by reference. A page's own `/Parent`
/// is dropped so the caller can link it into its own tree, and references to
/// pages that were not [seeded](Self::seed) become `Null`. Every other
/// `/Parent` (form fields, popups) is copied like any key.
pub struct Grafter<'a> {
    source: &'a Document,
    mapped: BTreeMap<ObjectId, ObjectId>,
}

impl<'a> Grafter<'a> {
    pub fn new(source: &'a Document) -> Self {
        Self {
            source,
            mapped: BTreeMap::new(),
        }
    }

    /// Declare that source object `id` is represented by `target_id`; later
    /// references to it resolve there instead of being copied.
    pub fn seed(&mut self, id: ObjectId, target_id: ObjectId) {
        self.mapped.insert(id, target_id);
    }

    /// Copy the object `id` into `target`, returning its id there.
    pub fn graft_id(&mut self, target: &mut Document, id: ObjectId) -> ObjectId {
        if let Some(&existing) = self.mapped.get(&id) {
            return existing;
        }

        // Reserve the target id before recursing so cycles terminate.
        let new_id = target.new_object_id();
        self.mapped.insert(id, new_id);

        let copied = match self.source.get_object(id) {
            Ok(object) => self.graft(target, object),
            Err(err) => {
                warn!(?id, %err, "Cannot resolve reference, using Null");
                Object::Null
            }
        };
        target.objects.insert(new_id, copied);
        new_id
    }

    /// Deep-copy a direct object, grafting every reference it contains.
    pub fn graft(&mut self, target: &mut Document, object: &Object) -> Object {
        match object {
            Object::Dictionary(dict) => Object::Dictionary(self.graft_dictionary(target, dict)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.graft(target, item))
                    .collect(),
            ),
            Object::Reference(id) => {
                if !self.mapped.contains_key(id) && self.is_page_tree_node(*id) {
                    return Object::Null;
                }
                Object::Reference(self.graft_id(target, *id))
            }
            Object::Stream(stream) => {
                let dict = self.graft_dictionary(target, &stream.dict);
                let mut copied = Stream::new(dict, stream.content.clone());
                copied.allows_compression = stream.allows_compression;
                Object::Stream(copied)
            }
            other => other.clone(),
        }
    }

    fn is_page_tree_node(&self, id: ObjectId) -> bool {
        self.source
            .get_dictionary(id)
            .is_ok_and(|dict| dict.has_type(b"Page") || dict.has_type(b"Pages"))
    }

    fn graft_dictionary(&mut self, target: &mut Document, dict: &Dictionary) -> Dictionary {
        let tree_node = dict.has_type(b"Page") || dict.has_type(b"Pages");
        let mut copied = Dictionary::new();
        for (key, value) in dict.iter() {
            if tree_node && key == b"Parent" {
                continue;
            }
            copied.set(key.clone(), self.graft(target, value));
        }
        copied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn shared_and_cyclic_references_are_copied_once() {
        let mut source = Document::with_version("1.7");
        let font_id = source.add_object(dictionary! { "Type" => "Font", "Subtype" => "Type1" });
        let a_id = source.new_object_id();
        let b_id = source.new_object_id();
        source.objects.insert(
            a_id,
            Object::Dictionary(dictionary! { "Font" => font_id, "Next" => b_id }),
        );
        source.objects.insert(
            b_id,
            Object::Dictionary(dictionary! { "Font" => font_id, "Next" => a_id }),
        );

        let mut target = Document::with_version("1.7");
        let mut grafter = Grafter::new(&source);
        let new_a = grafter.graft_id(&mut target, a_id);

        // a, b, and the shared font.
        assert_eq!(target.objects.len(), 3);
        let a = target.get_dictionary(new_a).expect("a copied");
        let new_b = a.get(b"Next").and_then(|o| o.as_reference()).expect("next");
        let b = target.get_dictionary(new_b).expect("b copied");
        assert_eq!(
            b.get(b"Next").and_then(|o| o.as_reference()).expect("back-link"),
            new_a
        );
        assert_eq!(
            a.get(b"Font").and_then(|o| o.as_reference()).expect("font"),
            b.get(b"Font").and_then(|o| o.as_reference()).expect("font"),
        );
    }

    #[test]
    fn parent_keys_are_dropped() {
        let mut source = Document::with_version("1.7");
        let parent = source.add_object(dictionary! { "Type" => "Pages" });
        let page = source.add_object(dictionary! { "Type" => "Page", "Parent" => parent });

        let mut target = Document::with_version("1.7");
        let copied = Grafter::new(&source).graft_id(&mut target, page);
        let dict = target.get_dictionary(copied).expect("page");
        assert!(dict.get(b"Parent").is_err());
        assert_eq!(target.objects.len(), 1);
    }

    #[test]
    fn annotation_parents_survive() {
        let mut source = Document::with_version("1.7");
        let pages = source.add_object(dictionary! { "Type" => "Pages" });
        let other_page = source.add_object(dictionary! { "Type" => "Page", "Parent" => pages });
        let page = source.new_object_id();
        let field = source.new_object_id();
        let widget = source.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Parent" => field,
            "P" => page,
        });
        let sibling = source.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Parent" => field,
            "P" => other_page,
        });
        source.objects.insert(
            field,
            Object::Dictionary(dictionary! {
                "FT" => "Tx",
                "T" => Object::string_literal("name"),
                "Kids" => vec![widget.into(), sibling.into()],
            }),
        );
        source.objects.insert(
            page,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => pages,
                "Annots" => vec![widget.into()],
            }),
        );

        let mut target = Document::with_version("1.7");
        let mut grafter = Grafter::new(&source);
        let new_page = target.new_object_id();
        grafter.seed(page, new_page);
        let annots = grafter.graft(&mut target, &Object::Array(vec![widget.into()]));

        let new_widget = annots.as_array().expect("array")[0]
            .as_reference()
            .expect("widget ref");
        let widget_dict = target.get_dictionary(new_widget).expect("widget");
        assert_eq!(widget_dict.get(b"P").and_then(|o| o.as_reference()).expect("P"), new_page);

        let new_field = widget_dict
            .get(b"Parent")
            .and_then(|o| o.as_reference())
            .expect("field link kept");
        let field_dict = target.get_dictionary(new_field).expect("field");
        let kids = field_dict.get(b"Kids").and_then(|o| o.as_array()).expect("kids");
        assert_eq!(kids[0].as_reference().expect("kid"), new_widget);

        // The sibling widget lives on a page that was not imported.
        let new_sibling = kids[1].as_reference().expect("sibling");
        let sibling_dict = target.get_dictionary(new_sibling).expect("sibling");
        assert!(matches!(sibling_dict.get(b"P"), Ok(Object::Null)));
        assert!(
            target
                .objects
                .values()
                .all(|o| o.as_dict().map_or(true, |d| !d.has_type(b"Page") && !d.has_type(b"Pages")))
        );
    }
}

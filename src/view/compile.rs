//! JSON view -> [`ViewTree`]
//!
//! One [`ViewCompiler`] builds one view. It owns the handle counter and the
//! group table for that view and borrows the instance's reference cache.

use serde_json::Value;

use crate::core::error::{ModelError, Result};
use crate::core::json::{as_u32, is_true, require, str_field, text_ref, u16_field, u32_field};
use crate::core::types::{GroupHandle, ObjectHandle, TextRef, ViewId};
use crate::hashtbl::{HashError, HashTable, KeyKind};

use super::resolve::{bind_object_id, ReferenceBinder, ReferenceCache};
use super::tree::{
    ChildSlot, ElementKind, Group, GroupChild, LeafChild, PresenceIndicator, PresenceOperator,
    ViewTree,
};

/// Nesting cap used unless [`ViewCompiler::with_max_depth`] says otherwise
pub const DEFAULT_MAX_DEPTH: usize = 64;

pub struct ViewCompiler<'a> {
    next_handle: u16,
    max_depth: usize,
    groups: Vec<Group>,
    by_handle: HashTable<usize>,
    base_reference: &'a str,
    cache: &'a mut ReferenceCache,
    binder: &'a dyn ReferenceBinder,
}

impl<'a> ViewCompiler<'a> {
    pub fn new(
        root_handle: u16,
        group_buckets: usize,
        base_reference: &'a str,
        cache: &'a mut ReferenceCache,
        binder: &'a dyn ReferenceBinder,
    ) -> Result<Self> {
        Ok(Self {
            next_handle: root_handle,
            max_depth: DEFAULT_MAX_DEPTH,
            groups: Vec::new(),
            by_handle: HashTable::create(group_buckets, KeyKind::Integer)?,
            base_reference,
            cache,
            binder,
        })
    }

    /// Fail views whose groups nest deeper than `max_depth`, root included
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Compile one entry of a document's `views` array.
    ///
    /// `document` is the enclosing document, consulted for a shared
    /// `equipmentType` when the view has none of its own.
    pub fn compile(mut self, view: &Value, document: &Value) -> Result<ViewTree> {
        let view_id = ViewId(u16_field(require(view, "viewId")?, "id").unwrap_or(0));

        let (kind, elements) = group_layout(view)?;
        let root_handle = self.take_handle();
        let root = self.add_group(kind, root_handle, elements.len())?;
        self.fill_group(root, kind, elements, 1)?;

        let internal = matches!(require(view, "internalView")?, Value::Bool(true));
        let equipment_type = view
            .get("equipmentType")
            .or_else(|| document.get("equipmentType"))
            .map(|e| text_ref(e, "set", "id"));

        tracing::debug!(
            "compiled {} ({} groups, {} reachable)",
            view_id,
            self.groups.len(),
            self.by_handle.len()
        );

        Ok(ViewTree {
            view_id,
            internal,
            equipment_type,
            groups: self.groups,
            by_handle: self.by_handle,
        })
    }

    fn take_handle(&mut self) -> GroupHandle {
        let handle = GroupHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        handle
    }

    /// Push a group into the arena and register its handle.
    ///
    /// A handle that is already taken leaves the new group unreachable.
    fn add_group(&mut self, kind: ElementKind, handle: GroupHandle, count: usize) -> Result<usize> {
        let declared = u16::try_from(count)
            .map_err(|_| ModelError::Parse(format!("{} declares {} elements", handle, count)))?;

        let index = self.groups.len();
        self.groups.push(Group::new(kind, handle, declared));

        match self.by_handle.insert(&handle.0, index) {
            Ok(()) => {}
            Err(HashError::DuplicateKey) => {
                tracing::warn!("{} is already registered; the new group is unreachable", handle);
            }
            Err(e) => return Err(e.into()),
        }
        Ok(index)
    }

    fn fill_group(
        &mut self,
        index: usize,
        kind: ElementKind,
        elements: &[Value],
        depth: usize,
    ) -> Result<()> {
        if depth > self.max_depth {
            return Err(ModelError::Parse(format!(
                "groups nest deeper than {} levels",
                self.max_depth
            )));
        }
        match kind {
            ElementKind::AllLeaves => {
                for (slot, element) in elements.iter().enumerate() {
                    let element_type = str_field(element, "viewElementType")
                        .ok_or_else(|| ModelError::missing("viewElementType"))?;
                    if element_type == "link" {
                        let group = &mut self.groups[index];
                        group.effective_count = group.effective_count.saturating_sub(1);
                        continue;
                    }
                    let leaf = self.leaf(element)?;
                    self.groups[index].children[slot] = Some(ChildSlot::Leaf(leaf));
                }
            }
            ElementKind::AllGroups => {
                for (slot, element) in elements.iter().enumerate() {
                    let child = self.group_child(element)?;
                    self.groups[index].children[slot] = Some(ChildSlot::Group(child));

                    let (sub_kind, sub_elements) = group_layout(element)?;
                    let handle = match u16_field(element, "id") {
                        Some(id) => GroupHandle(id),
                        None => self.take_handle(),
                    };
                    let sub = self.add_group(sub_kind, handle, sub_elements.len())?;
                    self.fill_group(sub, sub_kind, sub_elements, depth + 1)?;
                }
            }
        }
        Ok(())
    }

    fn group_child(&mut self, element: &Value) -> Result<GroupChild> {
        let label = text_ref(require(element, "label")?, "set", "id");
        // the counter is only advanced when the group itself is added
        let group_handle = GroupHandle(u16_field(element, "id").unwrap_or(self.next_handle));
        let presence = element
            .get("presenceIndicator")
            .map(|pi| self.presence_indicator(pi))
            .transpose()?;

        Ok(GroupChild {
            label,
            short_label: short_label(element),
            group_handle,
            presence,
            type_minor: is_true(element, "typeMinor"),
        })
    }

    fn leaf(&mut self, element: &Value) -> Result<LeafChild> {
        let label = text_ref(require(element, "label")?, "set", "id");
        let value_reference = require(element, "valueReference")?;

        Ok(LeafChild {
            label,
            short_label: short_label(element),
            attribute_id: u16_field(value_reference, "attributeId").unwrap_or(0),
            object: self.resolve_object(value_reference)?,
            ignore_presence: is_true(element, "ignorePresence"),
        })
    }

    fn presence_indicator(&mut self, json: &Value) -> Result<PresenceIndicator> {
        let value_reference = require(json, "valueReference")?;
        let attribute_id = u16_field(value_reference, "attributeId").unwrap_or(0);
        let object = self.resolve_object(value_reference)?;

        let operator = require(json, "operator")?
            .as_str()
            .map(PresenceOperator::from_name)
            .ok_or_else(|| ModelError::Parse("presence operator is not a string".to_string()))?;

        let constant = match json.get("constant") {
            Some(c @ Value::Object(_)) => u32_field(c, "id"),
            Some(c) => as_u32(c),
            None => None,
        };

        Ok(PresenceIndicator {
            object,
            attribute_id,
            operator,
            constant,
        })
    }

    fn resolve_object(&mut self, value_reference: &Value) -> Result<ObjectHandle> {
        if let Some(relative) = str_field(value_reference, "objectReference") {
            Ok(self.cache.resolve(self.base_reference, relative, self.binder))
        } else if let Some(object_id) = u32_field(value_reference, "bacoid") {
            Ok(bind_object_id(object_id, self.binder))
        } else {
            Err(ModelError::missing("objectReference"))
        }
    }
}

/// A group's element kind and element array.
///
/// The array must be non-empty and its first entry must carry a string
/// `viewElementType`.
fn group_layout(json: &Value) -> Result<(ElementKind, &[Value])> {
    let elements = require(json, "elements")?
        .as_array()
        .ok_or_else(|| ModelError::Parse("'elements' is not an array".to_string()))?;

    let first = elements
        .first()
        .ok_or_else(|| ModelError::Parse("group has no elements".to_string()))?;
    let tag = str_field(first, "viewElementType")
        .ok_or_else(|| ModelError::missing("viewElementType"))?;

    Ok((ElementKind::from_element_type(tag), elements.as_slice()))
}

fn short_label(element: &Value) -> TextRef {
    element
        .get("shortLabel")
        .map_or_else(TextRef::none, |s| text_ref(s, "set", "id"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::CollaboratorError;
    use serde_json::json;
    use std::cell::Cell;

    struct CountingBinder {
        calls: Cell<usize>,
    }

    impl ReferenceBinder for CountingBinder {
        fn bind_reference(&self, qualified_name: &str) -> std::result::Result<ObjectHandle, CollaboratorError> {
            self.calls.set(self.calls.get() + 1);
            Ok(ObjectHandle(qualified_name.len() as u32))
        }

        fn bind_object_id(&self, object_id: u32) -> std::result::Result<ObjectHandle, CollaboratorError> {
            Ok(ObjectHandle(object_id))
        }
    }

    fn leaf(reference: &str) -> Value {
        json!({
            "viewElementType": "value",
            "label": { "set": 501, "id": 1 },
            "valueReference": { "attributeId": 85, "objectReference": reference }
        })
    }

    fn compile(view: &Value) -> Result<(ViewTree, usize, usize)> {
        let mut cache = ReferenceCache::new(8).unwrap();
        let binder = CountingBinder { calls: Cell::new(0) };
        let tree = ViewCompiler::new(1000, 8, "AHU1", &mut cache, &binder)?
            .compile(view, &json!({}))?;
        Ok((tree, binder.calls.get(), cache.len()))
    }

    #[test]
    fn test_leaf_root() {
        let view = json!({
            "viewId": { "id": 3 },
            "internalView": true,
            "elements": [ leaf(".SAT"), leaf(".RAT") ]
        });
        let (tree, _, _) = compile(&view).unwrap();

        assert_eq!(tree.view_id, ViewId(3));
        assert!(tree.internal);
        let root = tree.group(GroupHandle(1000)).unwrap();
        assert_eq!(root.kind, ElementKind::AllLeaves);
        assert_eq!(root.declared_count, 2);

        match root.slot(0) {
            Some(ChildSlot::Leaf(leaf)) => {
                assert_eq!(leaf.attribute_id, 85);
                assert_eq!(leaf.object, ObjectHandle("AHU1SAT".len() as u32));
                assert!(leaf.short_label.is_none());
                assert!(!leaf.ignore_presence);
            }
            other => panic!("expected a leaf, got {:?}", other),
        }
    }

    #[test]
    fn test_synthetic_handles_follow_root() {
        let view = json!({
            "viewId": { "id": 1 },
            "internalView": false,
            "elements": [
                { "viewElementType": "group", "label": { "set": 1, "id": 1 },
                  "elements": [ leaf(".A") ] },
                { "viewElementType": "group", "label": { "set": 1, "id": 2 }, "id": 5,
                  "elements": [ leaf(".B") ] },
                { "viewElementType": "group", "label": { "set": 1, "id": 3 },
                  "elements": [ leaf(".C") ] }
            ]
        });
        let (tree, _, _) = compile(&view).unwrap();

        let root = tree.root().unwrap();
        let handles: Vec<u16> = root.group_children().map(|c| c.group_handle.0).collect();
        assert_eq!(handles, vec![1001, 5, 1002]);
        for handle in handles {
            assert!(tree.group(GroupHandle(handle)).is_some());
        }
        assert_eq!(tree.reachable_count(), 4);
    }

    #[test]
    fn test_explicit_root_handle_collision_is_unreachable() {
        let view = json!({
            "viewId": { "id": 1 },
            "internalView": false,
            "elements": [
                { "viewElementType": "group", "label": { "set": 1, "id": 1 }, "id": 1000,
                  "elements": [ leaf(".A"), leaf(".B") ] }
            ]
        });
        let (tree, _, _) = compile(&view).unwrap();

        assert_eq!(tree.groups().len(), 2);
        assert_eq!(tree.reachable_count(), 1);
        // lookup still finds the root, not the colliding child
        let found = tree.group(GroupHandle(1000)).unwrap();
        assert_eq!(found.kind, ElementKind::AllGroups);
        assert_eq!(tree.groups()[1].declared_count, 2);
    }

    #[test]
    fn test_link_elements_leave_holes() {
        let view = json!({
            "viewId": { "id": 1 },
            "internalView": false,
            "elements": [
                leaf(".A"),
                leaf(".B"),
                { "viewElementType": "link", "label": { "set": 1, "id": 9 } }
            ]
        });
        let (tree, _, _) = compile(&view).unwrap();

        let root = tree.root().unwrap();
        assert_eq!(root.declared_count, 3);
        assert_eq!(root.effective_count, 2);
        assert_eq!(root.slots().len(), 3);
        assert!(root.slot(2).is_none());
        assert_eq!(root.leaves().count(), 2);
    }

    #[test]
    fn test_repeated_reference_binds_once() {
        let view = json!({
            "viewId": { "id": 1 },
            "internalView": false,
            "elements": [
                { "viewElementType": "group", "label": { "set": 1, "id": 1 },
                  "presenceIndicator": {
                      "valueReference": { "attributeId": 85, "objectReference": ".Mode" },
                      "operator": "equal",
                      "constant": { "set": 4, "id": 2 }
                  },
                  "elements": [ leaf(".Mode"), leaf(".SAT") ] }
            ]
        });
        let (tree, calls, cached) = compile(&view).unwrap();

        assert_eq!(calls, 2);
        assert_eq!(cached, 2);
        let child = tree.root().unwrap().group_children().next().copied().unwrap();
        let presence = child.presence.unwrap();
        assert_eq!(presence.operator, PresenceOperator::Equal);
        assert_eq!(presence.constant, Some(2));
        assert_eq!(presence.object, ObjectHandle("AHU1Mode".len() as u32));
    }

    #[test]
    fn test_presence_constant_forms() {
        let group_with = |constant: Value| {
            json!({
                "viewId": { "id": 1 },
                "internalView": false,
                "elements": [
                    { "viewElementType": "group", "label": { "set": 1, "id": 1 },
                      "presenceIndicator": {
                          "valueReference": { "bacoid": 77 },
                          "operator": "less than",
                          "constant": constant
                      },
                      "elements": [ leaf(".A") ] }
                ]
            })
        };
        let constant_of = |view: Value| {
            let (tree, _, _) = compile(&view).unwrap();
            let child = tree.root().unwrap().group_children().next().copied().unwrap();
            child.presence.unwrap()
        };

        let literal = constant_of(group_with(json!(40)));
        assert_eq!(literal.constant, Some(40));
        assert_eq!(literal.object, ObjectHandle(77));
        assert_eq!(constant_of(group_with(json!({ "set": 4 }))).constant, None);
        assert_eq!(constant_of(group_with(json!("high"))).constant, None);
    }

    fn nested(depth: usize) -> Value {
        let mut elements = json!([ leaf(".A") ]);
        for level in 1..depth {
            elements = json!([ {
                "viewElementType": "group",
                "label": { "set": 1, "id": level },
                "elements": elements
            } ]);
        }
        json!({ "viewId": { "id": 1 }, "internalView": false, "elements": elements })
    }

    #[test]
    fn test_depth_cap() {
        let mut cache = ReferenceCache::new(8).unwrap();
        let binder = CountingBinder { calls: Cell::new(0) };

        let tree = ViewCompiler::new(1000, 8, "AHU1", &mut cache, &binder)
            .unwrap()
            .with_max_depth(4)
            .compile(&nested(4), &json!({}))
            .unwrap();
        assert_eq!(tree.groups().len(), 4);

        let result = ViewCompiler::new(1000, 8, "AHU1", &mut cache, &binder)
            .unwrap()
            .with_max_depth(4)
            .compile(&nested(5), &json!({}));
        assert!(matches!(result, Err(ModelError::Parse(_))));
    }

    #[test]
    fn test_default_depth_cap_stops_runaway_nesting() {
        let result = compile(&nested(DEFAULT_MAX_DEPTH + 1));
        assert!(matches!(result, Err(ModelError::Parse(_))));
        assert!(compile(&nested(DEFAULT_MAX_DEPTH)).is_ok());
    }

    #[test]
    fn test_missing_fields_abort() {
        let no_reference = json!({
            "viewId": { "id": 1 },
            "internalView": false,
            "elements": [
                { "viewElementType": "group", "label": { "set": 1, "id": 1 },
                  "elements": [
                      { "viewElementType": "value", "label": { "set": 1, "id": 2 },
                        "valueReference": { "attributeId": 4 } }
                  ] }
            ]
        });
        assert!(matches!(compile(&no_reference), Err(ModelError::Parse(_))));

        let no_internal = json!({ "viewId": { "id": 1 }, "elements": [ leaf(".A") ] });
        assert!(matches!(compile(&no_internal), Err(ModelError::Parse(_))));

        let empty = json!({ "viewId": { "id": 1 }, "internalView": true, "elements": [] });
        assert!(matches!(compile(&empty), Err(ModelError::Parse(_))));
    }
}

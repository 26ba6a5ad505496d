//! Compiled view trees: groups, child slots and presence indicators

use serde::{Deserialize, Serialize};

use crate::core::types::{AttributeId, GroupHandle, ObjectHandle, TextRef, ViewId};
use crate::hashtbl::HashTable;

/// What every child of a group is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    AllGroups,
    AllLeaves,
}

impl ElementKind {
    /// Classify a group from its first child's `viewElementType`
    pub fn from_element_type(tag: &str) -> Self {
        if tag == "group" {
            ElementKind::AllGroups
        } else {
            ElementKind::AllLeaves
        }
    }
}

/// Comparison applied by a presence indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceOperator {
    Equal,
    NotEqual,
    Greater,
    Lesser,
    /// Operator text not in the known set; never fails compilation
    Unrecognized,
}

impl PresenceOperator {
    pub fn from_name(name: &str) -> Self {
        match name {
            "equal" => PresenceOperator::Equal,
            "not equal" => PresenceOperator::NotEqual,
            "greater than" => PresenceOperator::Greater,
            "less than" => PresenceOperator::Lesser,
            _ => PresenceOperator::Unrecognized,
        }
    }
}

/// Gate on whether a menu node is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceIndicator {
    pub object: ObjectHandle,
    pub attribute_id: AttributeId,
    pub operator: PresenceOperator,
    /// `None` when the document gave no usable constant
    pub constant: Option<u32>,
}

impl PresenceIndicator {
    /// Compare a live point value against the constant.
    ///
    /// Returns `None` when the comparison cannot be made.
    pub fn evaluate(&self, live_value: u32) -> Option<bool> {
        let constant = self.constant?;
        match self.operator {
            PresenceOperator::Equal => Some(live_value == constant),
            PresenceOperator::NotEqual => Some(live_value != constant),
            PresenceOperator::Greater => Some(live_value > constant),
            PresenceOperator::Lesser => Some(live_value < constant),
            PresenceOperator::Unrecognized => None,
        }
    }
}

/// Slot pointing at a nested group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupChild {
    pub label: TextRef,
    /// [`TextRef::none`] when the document omits it
    pub short_label: TextRef,
    pub group_handle: GroupHandle,
    pub presence: Option<PresenceIndicator>,
    pub type_minor: bool,
}

/// Slot holding one data point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafChild {
    pub label: TextRef,
    pub short_label: TextRef,
    pub attribute_id: AttributeId,
    pub object: ObjectHandle,
    pub ignore_presence: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildSlot {
    Group(GroupChild),
    Leaf(LeafChild),
}

/// An interior menu node
#[derive(Debug)]
pub struct Group {
    pub kind: ElementKind,
    pub handle: GroupHandle,
    /// Length of the document's element array
    pub declared_count: u16,
    /// `declared_count` minus skipped link elements
    pub effective_count: u16,
    /// Exactly `declared_count` slots; skipped links leave `None` in place
    pub(crate) children: Box<[Option<ChildSlot>]>,
}

impl Group {
    pub(crate) fn new(kind: ElementKind, handle: GroupHandle, declared_count: u16) -> Self {
        Self {
            kind,
            handle,
            declared_count,
            effective_count: declared_count,
            children: (0..declared_count).map(|_| None).collect(),
        }
    }

    /// Slot at `index`; `None` for skipped or out-of-range slots
    pub fn slot(&self, index: usize) -> Option<&ChildSlot> {
        self.children.get(index).and_then(Option::as_ref)
    }

    pub fn slots(&self) -> &[Option<ChildSlot>] {
        &self.children
    }

    /// Populated slots in document order
    pub fn children(&self) -> impl Iterator<Item = &ChildSlot> {
        self.children.iter().flatten()
    }

    pub fn group_children(&self) -> impl Iterator<Item = &GroupChild> {
        self.children().filter_map(|slot| match slot {
            ChildSlot::Group(child) => Some(child),
            ChildSlot::Leaf(_) => None,
        })
    }

    pub fn leaves(&self) -> impl Iterator<Item = &LeafChild> {
        self.children().filter_map(|slot| match slot {
            ChildSlot::Leaf(leaf) => Some(leaf),
            ChildSlot::Group(_) => None,
        })
    }
}

/// One compiled view.
///
/// Groups live in an arena in compile order, root first. `by_handle` maps
/// handles to arena indices; a group whose handle collided with an earlier
/// one stays in the arena but has no entry there.
#[derive(Debug)]
pub struct ViewTree {
    pub view_id: ViewId,
    pub internal: bool,
    pub equipment_type: Option<TextRef>,
    pub(crate) groups: Vec<Group>,
    pub(crate) by_handle: HashTable<usize>,
}

impl ViewTree {
    pub fn group(&self, handle: GroupHandle) -> Option<&Group> {
        self.by_handle
            .get(&handle.0)
            .and_then(|&index| self.groups.get(index))
    }

    /// The root group, whatever handle it was registered under
    pub fn root(&self) -> Option<&Group> {
        self.groups.first()
    }

    /// Every compiled group, reachable or not
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Groups reachable by handle lookup
    pub fn reachable_count(&self) -> usize {
        self.by_handle.len()
    }
}

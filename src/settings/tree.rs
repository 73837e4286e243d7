//! Settings data model: an ordered, arbitrarily-nested tree of named nodes.
//!
//! Each node is either a *leaf* (a current value constrained by exactly one
//! of a numeric range or a fixed candidate list) or a *branch* (ordered named
//! children, browsed in insertion order). The root is always a branch. The
//! variant split makes the "a leaf never has both domains, a branch never has
//! a value" invariant a property of the types rather than a runtime check.

use std::fmt;

use crate::core::errors::{PanelError, Result};

// ──────────────────── values and domains ────────────────────

/// A leaf's current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    /// Integer value, constrained by a [`ValueDomain::Range`].
    Int(i64),
    /// Enumerated string value, constrained by [`ValueDomain::Candidates`].
    Choice(String),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Choice(s) => f.write_str(s),
        }
    }
}

/// The constraint attached to a leaf. Exactly one per leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueDomain {
    /// Inclusive integer range.
    Range { min: i64, max: i64 },
    /// Ordered set of allowed string values.
    Candidates(Vec<String>),
}

// ──────────────────── nodes ────────────────────

/// An editable leaf node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingLeaf {
    /// Current value.
    pub value: SettingValue,
    /// The single constraint for this leaf.
    pub domain: ValueDomain,
    /// Set on edit, cleared by [`collect`-style walks](crate::settings::navigator).
    pub dirty: bool,
}

impl SettingLeaf {
    /// Integer leaf with an inclusive range.
    #[must_use]
    pub fn ranged(value: i64, min: i64, max: i64) -> Self {
        debug_assert!(min <= value && value <= max);
        Self {
            value: SettingValue::Int(value),
            domain: ValueDomain::Range { min, max },
            dirty: false,
        }
    }

    /// Enumerated leaf with an ordered candidate list.
    #[must_use]
    pub fn choice(value: &str, candidates: &[&str]) -> Self {
        Self {
            value: SettingValue::Choice(value.to_string()),
            domain: ValueDomain::Candidates(
                candidates.iter().map(|c| (*c).to_string()).collect(),
            ),
            dirty: false,
        }
    }
}

/// A node in the settings tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingNode {
    /// Holds a value plus its domain.
    Leaf(SettingLeaf),
    /// Holds ordered named children.
    Branch(SettingBranch),
}

impl SettingNode {
    /// Whether this node is a branch awaiting deeper navigation.
    #[must_use]
    pub const fn is_branch(&self) -> bool {
        matches!(self, Self::Branch(_))
    }

    /// The leaf behind this node, if it is one.
    #[must_use]
    pub const fn as_leaf(&self) -> Option<&SettingLeaf> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            Self::Branch(_) => None,
        }
    }

    /// Mutable leaf access.
    pub const fn as_leaf_mut(&mut self) -> Option<&mut SettingLeaf> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            Self::Branch(_) => None,
        }
    }

    /// The branch behind this node, if it is one.
    #[must_use]
    pub const fn as_branch(&self) -> Option<&SettingBranch> {
        match self {
            Self::Branch(branch) => Some(branch),
            Self::Leaf(_) => None,
        }
    }
}

/// Ordered mapping `name → node`. Insertion order is browse order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingBranch {
    children: Vec<(String, SettingNode)>,
}

impl SettingBranch {
    /// Empty branch.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            children: Vec::new(),
        }
    }

    /// Append a named child. Order of insertion is preserved.
    pub fn insert(&mut self, name: &str, node: SettingNode) {
        debug_assert!(
            !self.children.iter().any(|(n, _)| n == name),
            "duplicate child name {name}"
        );
        self.children.push((name.to_string(), node));
    }

    /// Number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the branch has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Child name at a browse position.
    #[must_use]
    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.children.get(index).map(|(n, _)| n.as_str())
    }

    /// Child node at a browse position.
    #[must_use]
    pub fn child_at(&self, index: usize) -> Option<&SettingNode> {
        self.children.get(index).map(|(_, c)| c)
    }

    /// Mutable child node at a browse position.
    pub fn child_at_mut(&mut self, index: usize) -> Option<&mut SettingNode> {
        self.children.get_mut(index).map(|(_, c)| c)
    }

    /// Child node by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SettingNode> {
        self.children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    /// Mutable child node by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut SettingNode> {
        self.children
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    /// Iterate children in browse order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingNode)> {
        self.children.iter().map(|(n, c)| (n.as_str(), c))
    }
}

// ──────────────────── the tree ────────────────────

/// Name of the distinguished factory-reset leaf.
pub const RESET_LEAF: &str = "reset";

/// Dotted-path prefix under which per-alarm subtrees live.
pub const ALARM_BRANCH: &str = "alarm";

/// The full settings tree, rooted at a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsTree {
    root: SettingBranch,
}

impl SettingsTree {
    /// Compiled default tree.
    ///
    /// Shape and defaults follow the shipped appliance: screen and style
    /// selections at the top level, per-alarm subtrees two levels down, and
    /// the factory-reset leaf last so it is the final stop when rotating.
    #[must_use]
    pub fn defaults() -> Self {
        const WEEK_CANDIDATES: &[&str] = &[
            "mon", "tue", "wed", "thr", "fri", "sat", "sun", "wek", "hol", "tst",
        ];

        let alarm_defaults = [("alarm1", 6, 45), ("alarm2", 7, 30), ("alarm3", 5, 50)];

        let mut root = SettingBranch::new();
        root.insert(
            "initial_screen",
            SettingNode::Leaf(SettingLeaf::choice(
                "sensor",
                &["clock", "sensor", "alarm", "config"],
            )),
        );
        root.insert(
            "presence_mode",
            SettingNode::Leaf(SettingLeaf::ranged(1, 0, 1)),
        );
        root.insert(
            "clock_style",
            SettingNode::Leaf(SettingLeaf::ranged(6, 0, 10)),
        );

        let mut sens_style = SettingBranch::new();
        sens_style.insert("sens", SettingNode::Leaf(SettingLeaf::ranged(0, 0, 2)));
        sens_style.insert("clock", SettingNode::Leaf(SettingLeaf::ranged(7, 0, 11)));
        root.insert("sens_style", SettingNode::Branch(sens_style));

        let mut alarms = SettingBranch::new();
        for (name, hour, minute) in alarm_defaults {
            let mut alarm = SettingBranch::new();
            alarm.insert(
                "sw",
                SettingNode::Leaf(SettingLeaf::choice("OFF", &["ON", "OFF"])),
            );
            alarm.insert(
                "wek",
                SettingNode::Leaf(SettingLeaf::choice("wek", WEEK_CANDIDATES)),
            );
            alarm.insert("h", SettingNode::Leaf(SettingLeaf::ranged(hour, 0, 23)));
            alarm.insert("m", SettingNode::Leaf(SettingLeaf::ranged(minute, 0, 59)));
            alarms.insert(name, SettingNode::Branch(alarm));
        }
        root.insert(ALARM_BRANCH, SettingNode::Branch(alarms));

        root.insert(
            RESET_LEAF,
            SettingNode::Leaf(SettingLeaf::choice("no", &["no", "yes"])),
        );

        Self { root }
    }

    /// The root branch.
    #[must_use]
    pub const fn root(&self) -> &SettingBranch {
        &self.root
    }

    /// Mutable root branch.
    pub const fn root_mut(&mut self) -> &mut SettingBranch {
        &mut self.root
    }

    /// Leaf lookup by dotted path (`"alarm.alarm1.h"`).
    #[must_use]
    pub fn leaf(&self, dotted: &str) -> Option<&SettingLeaf> {
        let mut node: Option<&SettingNode> = None;
        let mut branch = &self.root;
        for segment in dotted.split('.') {
            let next = branch.get(segment)?;
            match next {
                SettingNode::Branch(b) => branch = b,
                SettingNode::Leaf(_) => {}
            }
            node = Some(next);
        }
        node.and_then(SettingNode::as_leaf)
    }

    /// Mutable leaf lookup by dotted path.
    pub fn leaf_mut(&mut self, dotted: &str) -> Option<&mut SettingLeaf> {
        let mut current: &mut SettingNode = {
            let (first, _) = dotted.split_once('.').unwrap_or((dotted, ""));
            self.root.get_mut(first)?
        };
        for segment in dotted.split('.').skip(1) {
            current = match current {
                SettingNode::Branch(b) => b.get_mut(segment)?,
                SettingNode::Leaf(_) => return None,
            };
        }
        current.as_leaf_mut()
    }

    /// Integer value of a ranged leaf, if the path names one.
    #[must_use]
    pub fn int(&self, dotted: &str) -> Option<i64> {
        match self.leaf(dotted)?.value {
            SettingValue::Int(v) => Some(v),
            SettingValue::Choice(_) => None,
        }
    }

    /// Choice value of an enumerated leaf, if the path names one.
    #[must_use]
    pub fn choice(&self, dotted: &str) -> Option<&str> {
        match &self.leaf(dotted)?.value {
            SettingValue::Choice(s) => Some(s.as_str()),
            SettingValue::Int(_) => None,
        }
    }

    /// Overwrite a leaf's value, validating against its domain.
    ///
    /// Used when loading a persisted snapshot; does not mark the leaf dirty.
    /// A value outside the leaf's domain is a snapshot corruption and is
    /// surfaced, not clamped.
    pub fn set_leaf_value(&mut self, dotted: &str, value: SettingValue) -> Result<()> {
        let Some(leaf) = self.leaf_mut(dotted) else {
            return Err(PanelError::SnapshotMismatch {
                path: dotted.to_string(),
                details: "no such leaf".to_string(),
            });
        };
        match (&leaf.domain, &value) {
            (ValueDomain::Range { min, max }, SettingValue::Int(v)) => {
                if v < min || v > max {
                    return Err(PanelError::SnapshotMismatch {
                        path: dotted.to_string(),
                        details: format!("{v} outside range {min}..={max}"),
                    });
                }
            }
            (ValueDomain::Candidates(cands), SettingValue::Choice(s)) => {
                if !cands.iter().any(|c| c == s) {
                    return Err(PanelError::ValueNotInCandidateSet {
                        path: dotted.to_string(),
                        value: s.clone(),
                    });
                }
            }
            _ => {
                return Err(PanelError::SnapshotMismatch {
                    path: dotted.to_string(),
                    details: "value kind does not match leaf domain".to_string(),
                });
            }
        }
        leaf.value = value;
        Ok(())
    }

    /// Depth-first walk over all leaves with their dotted paths.
    pub fn for_each_leaf<F: FnMut(&str, &SettingLeaf)>(&self, mut f: F) {
        fn walk<F: FnMut(&str, &SettingLeaf)>(prefix: &str, branch: &SettingBranch, f: &mut F) {
            for (name, node) in branch.iter() {
                let path = if prefix.is_empty() {
                    name.to_string()
                } else {
                    format!("{prefix}.{name}")
                };
                match node {
                    SettingNode::Leaf(leaf) => f(&path, leaf),
                    SettingNode::Branch(b) => walk(&path, b, f),
                }
            }
        }
        walk("", &self.root, &mut f);
    }

    /// Depth-first mutable walk over all leaves with their dotted paths.
    pub fn for_each_leaf_mut<F: FnMut(&str, &mut SettingLeaf)>(&mut self, mut f: F) {
        fn walk<F: FnMut(&str, &mut SettingLeaf)>(
            prefix: &str,
            branch: &mut SettingBranch,
            f: &mut F,
        ) {
            for i in 0..branch.len() {
                let name = branch.name_at(i).map(str::to_string);
                let Some(name) = name else { continue };
                let path = if prefix.is_empty() {
                    name
                } else {
                    format!("{prefix}.{name}")
                };
                match branch.child_at_mut(i) {
                    Some(SettingNode::Leaf(leaf)) => f(&path, leaf),
                    Some(SettingNode::Branch(b)) => walk(&path, b, f),
                    None => {}
                }
            }
        }
        walk("", &mut self.root, &mut f);
    }
}

impl Default for SettingsTree {
    fn default() -> Self {
        Self::defaults()
    }
}

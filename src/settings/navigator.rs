//! Cursor/traversal state machine over a [`SettingsTree`].
//!
//! Four logical buttons browse and edit an arbitrary-depth tree (bounded at
//! three levels for the supported settings): `K1` always rotates the
//! top-level item; `K2`–`K4` are contextual: they descend/rotate one more
//! level while the focus is a branch, and edit the focused value once the
//! focus is a leaf. Sibling rotation is an explicit index with arithmetic
//! wrap-around; deeper cursors reset whenever a shallower level rotates.

use crate::core::errors::{PanelError, Result};
use crate::io::buttons::ActionKey;
use crate::settings::tree::{
    ALARM_BRANCH, RESET_LEAF, SettingBranch, SettingNode, SettingValue, SettingsTree, ValueDomain,
};

/// Maximum supported tree depth.
const MAX_DEPTH: usize = 3;

// ──────────────────── render output ────────────────────

/// Two-line focus rendering, produced deterministically from cursor + tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusView {
    /// Title line: focused node name, `parent>child` breadcrumb for a hovered
    /// branch, or the sibling-name row at the deepest level.
    pub line0: String,
    /// Value / sibling line.
    pub line1: String,
    /// Column on line 1 where the edit cursor sits; `None` turns the cursor off.
    pub cursor_col: Option<u8>,
}

// ──────────────────── dirty collection ────────────────────

/// Result of a dirty-leaf sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtySummary {
    /// Dotted paths of leaves that were dirty (now cleared).
    pub paths: Vec<String>,
    /// Names of alarm subtrees (`alarm1`, …) containing a dirty leaf.
    pub affected_alarms: Vec<String>,
    /// The distinguished reset leaf requested a factory reset.
    pub factory_reset: bool,
}

impl DirtySummary {
    /// Whether anything at all was dirty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && !self.factory_reset
    }
}

// ──────────────────── the navigator ────────────────────

/// Traversal cursor over one settings tree.
///
/// Invariant: every `Some` index is a valid position in the tree at the
/// moment it is read back; callers must [`reset`](Self::reset) the cursor
/// after replacing the tree wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigNavigator {
    cursor: [Option<usize>; MAX_DEPTH],
}

impl ConfigNavigator {
    /// Fresh navigator with no focus.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cursor: [None; MAX_DEPTH],
        }
    }

    /// Drop all focus state (after a factory reset or tree reload).
    pub const fn reset(&mut self) {
        self.cursor = [None; MAX_DEPTH];
    }

    /// Make sure some top-level item is focused before rendering.
    pub fn ensure_focus(&mut self, tree: &SettingsTree) {
        if self.cursor[0].is_none() {
            self.rotate(tree, 0);
        }
    }

    /// Depth of the deepest set cursor, if any.
    #[must_use]
    pub const fn focus_depth(&self) -> Option<usize> {
        match self.cursor {
            [_, _, Some(_)] => Some(2),
            [_, Some(_), None] => Some(1),
            [Some(_), None, None] => Some(0),
            _ => None,
        }
    }

    /// Rotate the sibling cursor at `depth` to the next sibling, wrapping to
    /// the first after the last. Deeper cursors are reset to unset. A depth
    /// whose parent is missing or not a branch is a no-op.
    pub fn rotate(&mut self, tree: &SettingsTree, depth: usize) {
        let Some(parent) = self.parent_branch(tree, depth) else {
            return;
        };
        if parent.is_empty() {
            return;
        }
        let len = parent.len();
        let next = self.cursor[depth].map_or(0, |i| (i + 1) % len);
        self.cursor[depth] = Some(next);
        for deeper in self.cursor.iter_mut().skip(depth + 1) {
            *deeper = None;
        }
    }

    /// Apply one action key with the fixed contextual semantics.
    pub fn handle_key(&mut self, tree: &mut SettingsTree, key: ActionKey) -> Result<()> {
        self.ensure_focus(tree);
        match key {
            ActionKey::K1 => {
                self.rotate(tree, 0);
                Ok(())
            }
            ActionKey::K2 => {
                if self.cursor[1].is_some() || self.node_is_branch(tree, 1) {
                    self.rotate(tree, 1);
                    Ok(())
                } else {
                    self.edit(tree, 1)
                }
            }
            ActionKey::K3 => {
                if self.cursor[2].is_some() || (self.cursor[1].is_some() && self.node_is_branch(tree, 2)) {
                    self.rotate(tree, 2);
                    Ok(())
                } else if self.cursor[1].is_some() {
                    self.edit(tree, 1)
                } else {
                    // depth-0 leaf: this key is the decrement side
                    self.edit(tree, -1)
                }
            }
            ActionKey::K4 => {
                if self.cursor[2].is_some() {
                    self.edit(tree, 1)
                } else if self.cursor[1].is_some() && !self.node_is_branch(tree, 2) {
                    self.edit(tree, -1)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Edit the focused leaf forwards (increment / next candidate).
    pub fn edit_leaf_forward(&self, tree: &mut SettingsTree) -> Result<()> {
        self.edit(tree, 1)
    }

    /// Edit the focused leaf backwards (decrement / previous candidate).
    pub fn edit_leaf_backward(&self, tree: &mut SettingsTree) -> Result<()> {
        self.edit(tree, -1)
    }

    /// Produce the two-line rendering for the current focus. Pure: no cursor
    /// or tree state changes.
    #[must_use]
    pub fn render_focus(&self, tree: &SettingsTree) -> FocusView {
        let Some(i0) = self.cursor[0] else {
            return FocusView {
                line0: "config".to_string(),
                line1: String::new(),
                cursor_col: None,
            };
        };
        let root = tree.root();
        let name0 = root.name_at(i0).unwrap_or_default();
        let node0 = root.child_at(i0);

        if let Some(i2) = self.cursor[2] {
            // Deepest level: sibling names on the title line, values below,
            // cursor under the focused sibling.
            if let Some(branch) = self.parent_branch(tree, 2) {
                return render_sibling_row(branch, i2);
            }
        }

        if let Some(i1) = self.cursor[1]
            && let Some(parent) = self.parent_branch(tree, 1)
        {
            let name1 = parent.name_at(i1).unwrap_or_default();
            return match parent.child_at(i1) {
                Some(SettingNode::Branch(branch)) => FocusView {
                    line0: format!("{name0}>{name1}"),
                    line1: join_names(branch),
                    cursor_col: None,
                },
                Some(SettingNode::Leaf(leaf)) => FocusView {
                    line0: name1.to_string(),
                    line1: leaf.value.to_string(),
                    cursor_col: Some(0),
                },
                None => FocusView {
                    line0: name0.to_string(),
                    line1: String::new(),
                    cursor_col: None,
                },
            };
        }

        match node0 {
            Some(SettingNode::Branch(branch)) => FocusView {
                line0: format!("{name0} >"),
                line1: join_names(branch),
                cursor_col: None,
            },
            Some(SettingNode::Leaf(leaf)) => FocusView {
                line0: name0.to_string(),
                line1: leaf.value.to_string(),
                cursor_col: Some(0),
            },
            None => FocusView {
                line0: "config".to_string(),
                line1: String::new(),
                cursor_col: None,
            },
        }
    }

    /// Depth-first sweep collecting dirty leaves and clearing their flags.
    ///
    /// A dirty reset leaf set to `yes` short-circuits the walk: the caller
    /// must discard the snapshot and reinitialize from defaults, so per-leaf
    /// bookkeeping is moot.
    pub fn collect_dirty_and_clear(tree: &mut SettingsTree) -> DirtySummary {
        if let Some(leaf) = tree.leaf_mut(RESET_LEAF)
            && leaf.dirty
            && leaf.value == SettingValue::Choice("yes".to_string())
        {
            leaf.dirty = false;
            return DirtySummary {
                paths: vec![RESET_LEAF.to_string()],
                affected_alarms: Vec::new(),
                factory_reset: true,
            };
        }

        let mut summary = DirtySummary::default();
        let alarm_prefix = format!("{ALARM_BRANCH}.");
        tree.for_each_leaf_mut(|path, leaf| {
            if !leaf.dirty {
                return;
            }
            leaf.dirty = false;
            if let Some(rest) = path.strip_prefix(&alarm_prefix) {
                let alarm = rest.split('.').next().unwrap_or(rest);
                if !summary.affected_alarms.iter().any(|a| a == alarm) {
                    summary.affected_alarms.push(alarm.to_string());
                }
            }
            summary.paths.push(path.to_string());
        });
        summary
    }

    // ──────────────────── internals ────────────────────

    /// Branch containing the siblings rotated at `depth`, if the cursor
    /// prefix above it exists and names branches.
    fn parent_branch<'t>(&self, tree: &'t SettingsTree, depth: usize) -> Option<&'t SettingBranch> {
        let mut branch = tree.root();
        for level in 0..depth {
            let index = self.cursor[level]?;
            branch = branch.child_at(index)?.as_branch()?;
        }
        Some(branch)
    }

    /// Whether a `rotate(depth)` would have a branch to descend into, i.e.
    /// the node focused at `depth - 1` is a branch.
    fn node_is_branch(&self, tree: &SettingsTree, depth: usize) -> bool {
        let Some(fd) = depth.checked_sub(1) else {
            return false;
        };
        let Some(index) = self.cursor[fd] else {
            return false;
        };
        self.parent_branch(tree, fd)
            .and_then(|b| b.child_at(index))
            .is_some_and(SettingNode::is_branch)
    }

    /// Dotted path of the focused node, if any.
    fn focus_path(&self, tree: &SettingsTree) -> Option<String> {
        let mut branch = tree.root();
        let mut segments: Vec<&str> = Vec::new();
        for level in 0..MAX_DEPTH {
            let Some(index) = self.cursor[level] else {
                break;
            };
            segments.push(branch.name_at(index)?);
            match branch.child_at(index)? {
                SettingNode::Branch(b) => branch = b,
                SettingNode::Leaf(_) => break,
            }
        }
        if segments.is_empty() {
            None
        } else {
            Some(segments.join("."))
        }
    }

    /// Step the focused leaf's value by ±1 within its domain and mark it
    /// dirty. A no-op when the focus is not a leaf.
    fn edit(&self, tree: &mut SettingsTree, step: i64) -> Result<()> {
        let Some(path) = self.focus_path(tree) else {
            return Ok(());
        };
        let Some(leaf) = tree.leaf_mut(&path) else {
            return Ok(());
        };
        match (&leaf.domain, &leaf.value) {
            (ValueDomain::Range { min, max }, SettingValue::Int(v)) => {
                let next = if step > 0 {
                    if *v >= *max { *min } else { v + 1 }
                } else if *v <= *min {
                    *max
                } else {
                    v - 1
                };
                leaf.value = SettingValue::Int(next);
            }
            (ValueDomain::Candidates(cands), SettingValue::Choice(current)) => {
                let Some(idx) = cands.iter().position(|c| c == current) else {
                    return Err(PanelError::ValueNotInCandidateSet {
                        path,
                        value: current.clone(),
                    });
                };
                let len = cands.len() as i64;
                let next = (idx as i64 + step).rem_euclid(len) as usize;
                leaf.value = SettingValue::Choice(cands[next].clone());
            }
            _ => {
                return Err(PanelError::SnapshotMismatch {
                    path,
                    details: "value kind does not match leaf domain".to_string(),
                });
            }
        }
        leaf.dirty = true;
        Ok(())
    }
}

/// Child names joined for a branch-hover sibling line.
fn join_names(branch: &SettingBranch) -> String {
    branch
        .iter()
        .map(|(name, _)| name)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sibling names over values, column-aligned, cursor under the focused entry.
fn render_sibling_row(branch: &SettingBranch, focused: usize) -> FocusView {
    let mut line0 = String::new();
    let mut line1 = String::new();
    let mut cursor_col = 0u8;
    for (idx, (name, node)) in branch.iter().enumerate() {
        let value = match node {
            SettingNode::Leaf(leaf) => leaf.value.to_string(),
            SettingNode::Branch(_) => ">".to_string(),
        };
        let col = line0.len();
        if idx == focused {
            cursor_col = col as u8;
        }
        let width = name.len().max(value.len()) + 1;
        line0.push_str(name);
        for _ in name.len()..width {
            line0.push(' ');
        }
        while line1.len() < col {
            line1.push(' ');
        }
        line1.push_str(&value);
    }
    FocusView {
        line0: line0.trim_end().to_string(),
        line1: line1.trim_end().to_string(),
        cursor_col: Some(cursor_col),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tree() -> SettingsTree {
        SettingsTree::defaults()
    }

    /// Index of a named top-level entry in the default tree.
    fn top_index(tree: &SettingsTree, name: &str) -> usize {
        (0..tree.root().len())
            .find(|i| tree.root().name_at(*i) == Some(name))
            .expect("name present")
    }

    fn nav_at(tree: &SettingsTree, name: &str) -> ConfigNavigator {
        let mut nav = ConfigNavigator::new();
        nav.cursor[0] = Some(top_index(tree, name));
        nav
    }

    #[test]
    fn first_rotate_lands_on_first_item() {
        let tree = tree();
        let mut nav = ConfigNavigator::new();
        nav.rotate(&tree, 0);
        assert_eq!(nav.cursor[0], Some(0));
        assert_eq!(nav.focus_depth(), Some(0));
    }

    #[test]
    fn rotate_resets_deeper_cursors() {
        let tree = tree();
        let mut nav = nav_at(&tree, "alarm");
        nav.rotate(&tree, 1);
        nav.rotate(&tree, 2);
        assert_eq!(nav.focus_depth(), Some(2));
        nav.rotate(&tree, 0);
        assert_eq!(nav.cursor[1], None);
        assert_eq!(nav.cursor[2], None);
    }

    #[test]
    fn rotate_on_missing_parent_is_a_noop() {
        let tree = tree();
        let mut nav = ConfigNavigator::new();
        nav.rotate(&tree, 2); // no depth-0/1 cursor yet
        assert_eq!(nav.focus_depth(), None);

        let mut nav = nav_at(&tree, "clock_style"); // leaf, not a branch
        nav.rotate(&tree, 1);
        assert_eq!(nav.cursor[1], None);
    }

    #[test]
    fn k2_edits_top_level_leaf_and_marks_dirty() {
        let mut tree = tree();
        let mut nav = nav_at(&tree, "presence_mode");
        nav.handle_key(&mut tree, ActionKey::K2).unwrap();
        assert_eq!(tree.int("presence_mode"), Some(0)); // 1 wraps to 0 at max
        assert!(tree.leaf("presence_mode").unwrap().dirty);
    }

    #[test]
    fn k3_is_the_decrement_side_for_a_top_level_leaf() {
        let mut tree = tree();
        let mut nav = nav_at(&tree, "clock_style");
        nav.handle_key(&mut tree, ActionKey::K3).unwrap();
        assert_eq!(tree.int("clock_style"), Some(5));
    }

    #[test]
    fn k2_descends_into_a_branch_instead_of_editing() {
        let mut tree = tree();
        let mut nav = nav_at(&tree, "sens_style");
        nav.handle_key(&mut tree, ActionKey::K2).unwrap();
        assert_eq!(nav.focus_depth(), Some(1));
        assert_eq!(nav.cursor[1], Some(0)); // "sens"
    }

    #[test]
    fn contextual_keys_walk_the_alarm_subtree() {
        let mut tree = tree();
        let mut nav = nav_at(&tree, "alarm");

        nav.handle_key(&mut tree, ActionKey::K2).unwrap(); // -> alarm1
        assert_eq!(nav.focus_depth(), Some(1));
        nav.handle_key(&mut tree, ActionKey::K3).unwrap(); // -> sw
        assert_eq!(nav.focus_depth(), Some(2));
        nav.handle_key(&mut tree, ActionKey::K4).unwrap(); // edit sw forward
        assert_eq!(tree.choice("alarm.alarm1.sw"), Some("ON"));
        assert!(tree.leaf("alarm.alarm1.sw").unwrap().dirty);
    }

    #[test]
    fn ranged_edit_wraps_at_both_bounds() {
        let mut tree = tree();
        tree.set_leaf_value("alarm.alarm1.h", SettingValue::Int(23))
            .unwrap();
        let mut nav = nav_at(&tree, "alarm");
        nav.rotate(&tree, 1); // alarm1
        nav.rotate(&tree, 2); // sw
        nav.rotate(&tree, 2); // wek
        nav.rotate(&tree, 2); // h

        nav.edit_leaf_forward(&mut tree).unwrap();
        assert_eq!(tree.int("alarm.alarm1.h"), Some(0));
        nav.edit_leaf_backward(&mut tree).unwrap();
        assert_eq!(tree.int("alarm.alarm1.h"), Some(23));
    }

    #[test]
    fn candidate_edit_cycles_circularly() {
        let mut tree = tree();
        let mut nav = nav_at(&tree, "initial_screen");
        // sensor -> alarm -> config -> wraps to clock
        nav.edit_leaf_forward(&mut tree).unwrap();
        nav.edit_leaf_forward(&mut tree).unwrap();
        nav.edit_leaf_forward(&mut tree).unwrap();
        assert_eq!(tree.choice("initial_screen"), Some("clock"));
        nav.edit_leaf_backward(&mut tree).unwrap();
        assert_eq!(tree.choice("initial_screen"), Some("config"));
    }

    #[test]
    fn absent_candidate_value_is_surfaced_not_repaired() {
        let mut tree = tree();
        // Corrupt the leaf the way a bad snapshot would.
        tree.leaf_mut("initial_screen").unwrap().value = SettingValue::Choice("bogus".to_string());
        let mut nav = nav_at(&tree, "initial_screen");
        let err = nav.edit_leaf_forward(&mut tree).unwrap_err();
        assert_eq!(err.code(), "RMP-1101");
        assert_eq!(tree.choice("initial_screen"), Some("bogus"), "not clamped");
    }

    #[test]
    fn render_depth0_leaf_shows_name_and_value_with_cursor() {
        let tree = tree();
        let nav = nav_at(&tree, "clock_style");
        let view = nav.render_focus(&tree);
        assert_eq!(view.line0, "clock_style");
        assert_eq!(view.line1, "6");
        assert_eq!(view.cursor_col, Some(0));
    }

    #[test]
    fn render_branch_hover_shows_breadcrumb_and_children() {
        let tree = tree();
        let mut nav = nav_at(&tree, "alarm");
        let view = nav.render_focus(&tree);
        assert_eq!(view.line0, "alarm >");
        assert_eq!(view.line1, "alarm1 alarm2 alarm3");
        assert_eq!(view.cursor_col, None);

        nav.rotate(&tree, 1);
        let view = nav.render_focus(&tree);
        assert_eq!(view.line0, "alarm>alarm1");
        assert_eq!(view.line1, "sw wek h m");
    }

    #[test]
    fn render_sibling_row_aligns_values_under_names() {
        let tree = tree();
        let mut nav = nav_at(&tree, "alarm");
        nav.rotate(&tree, 1); // alarm1
        nav.rotate(&tree, 2); // sw
        nav.rotate(&tree, 2); // wek
        let view = nav.render_focus(&tree);
        assert_eq!(view.line0, "sw  wek h m");
        assert_eq!(view.line1, "OFF wek 6 45");
        assert_eq!(view.cursor_col, Some(4)); // under "wek"
    }

    #[test]
    fn collect_dirty_reports_affected_alarm_and_clears_flags() {
        let mut tree = tree();
        let mut nav = nav_at(&tree, "alarm");
        nav.rotate(&tree, 1); // alarm1
        nav.rotate(&tree, 2); // sw
        nav.rotate(&tree, 2); // wek
        nav.rotate(&tree, 2); // h
        nav.edit_leaf_forward(&mut tree).unwrap();

        let summary = ConfigNavigator::collect_dirty_and_clear(&mut tree);
        assert_eq!(summary.paths, vec!["alarm.alarm1.h".to_string()]);
        assert_eq!(summary.affected_alarms, vec!["alarm1".to_string()]);
        assert!(!summary.factory_reset);
        assert!(!tree.leaf("alarm.alarm1.h").unwrap().dirty);

        // Second sweep finds nothing.
        assert!(ConfigNavigator::collect_dirty_and_clear(&mut tree).is_empty());
    }

    #[test]
    fn dirty_reset_leaf_short_circuits_to_factory_reset() {
        let mut tree = tree();
        tree.leaf_mut("clock_style").unwrap().dirty = true;
        let reset = tree.leaf_mut(RESET_LEAF).unwrap();
        reset.value = SettingValue::Choice("yes".to_string());
        reset.dirty = true;

        let summary = ConfigNavigator::collect_dirty_and_clear(&mut tree);
        assert!(summary.factory_reset);
        assert!(summary.affected_alarms.is_empty());
        // The short-circuit leaves other flags for the caller's tree rebuild.
        assert!(tree.leaf("clock_style").unwrap().dirty);
    }

    #[test]
    fn reset_toggled_back_to_no_is_an_ordinary_dirty_leaf() {
        let mut tree = tree();
        let reset = tree.leaf_mut(RESET_LEAF).unwrap();
        reset.dirty = true; // value still "no"

        let summary = ConfigNavigator::collect_dirty_and_clear(&mut tree);
        assert!(!summary.factory_reset);
        assert_eq!(summary.paths, vec![RESET_LEAF.to_string()]);
    }

    // ──────────────────── property tests ────────────────────

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Rotating a level as many times as it has siblings returns to the
        /// original sibling (wrap-around closure).
        #[test]
        fn rotate_cycle_is_identity(start in 0usize..6, extra_laps in 1usize..3) {
            let tree = SettingsTree::defaults();
            let mut nav = ConfigNavigator::new();
            nav.cursor[0] = Some(start % tree.root().len());
            let before = nav.cursor;
            let len = tree.root().len();
            for _ in 0..(len * extra_laps) {
                nav.rotate(&tree, 0);
            }
            prop_assert_eq!(nav.cursor, before);
        }

        /// Edit forward then backward is identity for every leaf, from any
        /// reachable starting value.
        #[test]
        fn edit_forward_backward_is_identity(
            leaf_pick in 0usize..18,
            warmup in 0usize..70,
        ) {
            let mut tree = SettingsTree::defaults();
            let mut paths = Vec::new();
            tree.for_each_leaf(|p, _| paths.push(p.to_string()));
            let path = paths[leaf_pick % paths.len()].clone();

            // Position the cursor on that leaf via its dotted path.
            let mut nav = ConfigNavigator::new();
            let segments: Vec<&str> = path.split('.').collect();
            {
                let mut branch = tree.root();
                for (depth, segment) in segments.iter().enumerate() {
                    let idx = (0..branch.len())
                        .find(|i| branch.name_at(*i) == Some(*segment))
                        .unwrap();
                    nav.cursor[depth] = Some(idx);
                    if let Some(next) = branch.child_at(idx).and_then(SettingNode::as_branch) {
                        branch = next;
                    }
                }
            }

            // Drive the value to an arbitrary reachable point first.
            for _ in 0..warmup {
                nav.edit_leaf_forward(&mut tree).unwrap();
            }
            let before = tree.leaf(&path).unwrap().value.clone();
            nav.edit_leaf_forward(&mut tree).unwrap();
            nav.edit_leaf_backward(&mut tree).unwrap();
            prop_assert_eq!(&tree.leaf(&path).unwrap().value, &before);

            // And the other way round.
            nav.edit_leaf_backward(&mut tree).unwrap();
            nav.edit_leaf_forward(&mut tree).unwrap();
            prop_assert_eq!(&tree.leaf(&path).unwrap().value, &before);
        }
    }
}

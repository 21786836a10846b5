// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A small reference scene graph implementing [`TargetScene`].
//!
//! Hosts with their own scene graph implement [`TargetScene`] directly. This
//! module serves tests, demos, and simple hosts: a generational slot tree of
//! [`TargetNode`]s, each with a [`TargetShape`] in local space, a transform
//! relative to its parent, a global `z_index`, and [`TargetFlags`].
//!
//! World transforms are composed on query, so edits take effect immediately.
//! A node is enabled (or visible) only if it and all of its ancestors are.
//!
//! [`SharedScene`] wraps a tree in a read-write lock so a UI thread can edit
//! geometry while the sampling thread hit-tests.
//!
//! ```
//! use kurbo::{Affine, Point, Rect};
//! use understory_gaze::scene::{SceneTree, TargetNode};
//! use understory_gaze::types::TargetScene;
//!
//! let mut tree = SceneTree::new();
//! let panel = tree.insert(None, TargetNode {
//!     local_transform: Affine::translate((100.0, 50.0)),
//!     ..TargetNode::new(Rect::new(0.0, 0.0, 200.0, 100.0).into())
//! });
//! let button = tree.insert(Some(panel), TargetNode::new(Rect::new(10.0, 10.0, 60.0, 30.0).into()));
//!
//! let local = tree.screen_to_local(&button, Point::new(120.0, 70.0)).unwrap();
//! assert_eq!(local, Point::new(20.0, 20.0));
//! assert!(tree.contains_local(&button, local));
//! ```

use core::fmt;

use kurbo::{Affine, Point};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::shape::TargetShape;
use crate::types::TargetScene;

/// Determinants smaller than this make a transform non-invertible.
const MIN_DETERMINANT: f64 = 1e-12;

/// Identifier of a node in a [`SceneTree`] (generational).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TargetId(u32, u32);

impl TargetId {
    const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Per-node switches.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct TargetFlags: u8 {
        /// Node reacts to samples. Disabled nodes still occlude.
        const ENABLED = 0b0000_0001;
        /// Node is shown; invisible nodes contain no point.
        const VISIBLE = 0b0000_0010;
    }
}

impl Default for TargetFlags {
    fn default() -> Self {
        Self::ENABLED | Self::VISIBLE
    }
}

/// Local data of a scene node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TargetNode {
    /// Hit geometry in local space.
    pub shape: TargetShape,
    /// Transform from local space to the parent's space.
    pub local_transform: Affine,
    /// Global stacking rank; higher is nearer.
    pub z_index: i32,
    /// Enabled and visible switches.
    pub flags: TargetFlags,
    /// Inclusive hit slop in local units.
    pub hit_tolerance: f64,
}

impl TargetNode {
    /// An enabled, visible node at the origin with `shape`.
    pub fn new(shape: TargetShape) -> Self {
        Self {
            shape,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug)]
struct Slot {
    parent: Option<TargetId>,
    children: Vec<TargetId>,
    node: TargetNode,
}

/// Generational tree of hit-testable targets.
#[derive(Clone, Default)]
pub struct SceneTree {
    slots: Vec<Option<Slot>>,
    /// Last generation per slot (persists across frees).
    generations: Vec<u32>,
    free_list: Vec<usize>,
}

impl fmt::Debug for SceneTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alive = self.slots.iter().filter(|s| s.is_some()).count();
        f.debug_struct("SceneTree")
            .field("nodes_total", &self.slots.len())
            .field("nodes_alive", &alive)
            .field("free_list", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

impl SceneTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `node` under `parent` (or as a root). A stale parent makes it a root.
    pub fn insert(&mut self, parent: Option<TargetId>, node: TargetNode) -> TargetId {
        let slot = Slot {
            parent: None,
            children: Vec::new(),
            node,
        };
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.slots[idx] = Some(slot);
            (idx, generation)
        } else {
            self.slots.push(Some(slot));
            self.generations.push(1);
            (self.slots.len() - 1, 1)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "TargetId stores 32-bit slot indices."
        )]
        let id = TargetId(idx as u32, generation);
        if let Some(p) = parent.filter(|p| self.is_alive(*p)) {
            self.link(id, p);
        }
        id
    }

    /// Remove a node and its subtree. Stale ids are ignored.
    pub fn remove(&mut self, id: TargetId) {
        let Some(slot) = self.slot(id) else {
            return;
        };
        let parent = slot.parent;
        let children = slot.children.clone();
        if let Some(p) = parent
            && let Some(ps) = self.slot_mut(p)
        {
            ps.children.retain(|c| *c != id);
        }
        for child in children {
            self.remove(child);
        }
        self.slots[id.idx()] = None;
        self.free_list.push(id.idx());
    }

    /// Whether `id` refers to a live node.
    pub fn is_alive(&self, id: TargetId) -> bool {
        self.slot(id).is_some()
    }

    /// Local data of a live node.
    pub fn node(&self, id: TargetId) -> Option<&TargetNode> {
        self.slot(id).map(|s| &s.node)
    }

    /// Mutable local data of a live node.
    pub fn node_mut(&mut self, id: TargetId) -> Option<&mut TargetNode> {
        self.slot_mut(id).map(|s| &mut s.node)
    }

    /// Update the local transform.
    pub fn set_local_transform(&mut self, id: TargetId, tf: Affine) {
        if let Some(n) = self.node_mut(id) {
            n.local_transform = tf;
        }
    }

    /// Update the stacking rank.
    pub fn set_z_index(&mut self, id: TargetId, z: i32) {
        if let Some(n) = self.node_mut(id) {
            n.z_index = z;
        }
    }

    /// Toggle [`TargetFlags::ENABLED`].
    pub fn set_enabled(&mut self, id: TargetId, enabled: bool) {
        if let Some(n) = self.node_mut(id) {
            n.flags.set(TargetFlags::ENABLED, enabled);
        }
    }

    /// Toggle [`TargetFlags::VISIBLE`].
    pub fn set_visible(&mut self, id: TargetId, visible: bool) {
        if let Some(n) = self.node_mut(id) {
            n.flags.set(TargetFlags::VISIBLE, visible);
        }
    }

    /// Parent of a live node.
    pub fn parent_of(&self, id: TargetId) -> Option<TargetId> {
        self.slot(id).and_then(|s| s.parent)
    }

    /// Children of a live node; empty for stale ids.
    pub fn children_of(&self, id: TargetId) -> &[TargetId] {
        match self.slot(id) {
            Some(s) => &s.children,
            None => &[],
        }
    }

    /// Local-to-screen transform of a live node.
    pub fn world_transform(&self, id: TargetId) -> Option<Affine> {
        let mut tf = self.node(id)?.local_transform;
        let mut cur = self.parent_of(id);
        while let Some(p) = cur {
            tf = self.node(p)?.local_transform * tf;
            cur = self.parent_of(p);
        }
        Some(tf)
    }

    /// Whether the node and every ancestor carry all of `flags`.
    fn effective(&self, id: TargetId, flags: TargetFlags) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            match self.slot(c) {
                Some(s) if s.node.flags.contains(flags) => cur = s.parent,
                _ => return false,
            }
        }
        true
    }

    fn slot(&self, id: TargetId) -> Option<&Slot> {
        if self.generations.get(id.idx()) != Some(&id.1) {
            return None;
        }
        self.slots.get(id.idx()).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: TargetId) -> Option<&mut Slot> {
        if self.generations.get(id.idx()) != Some(&id.1) {
            return None;
        }
        self.slots.get_mut(id.idx()).and_then(Option::as_mut)
    }

    fn link(&mut self, id: TargetId, parent: TargetId) {
        if let Some(s) = self.slot_mut(id) {
            s.parent = Some(parent);
        }
        if let Some(ps) = self.slot_mut(parent) {
            ps.children.push(id);
        }
    }
}

impl TargetScene<TargetId> for SceneTree {
    fn screen_to_local(&self, target: &TargetId, screen: Point) -> Option<Point> {
        let tf = self.world_transform(*target)?;
        if tf.determinant().abs() < MIN_DETERMINANT {
            return None;
        }
        Some(tf.inverse() * screen)
    }

    fn local_to_screen(&self, target: &TargetId, local: Point) -> Option<Point> {
        self.world_transform(*target).map(|tf| tf * local)
    }

    fn contains_local(&self, target: &TargetId, local: Point) -> bool {
        self.effective(*target, TargetFlags::VISIBLE)
            && self
                .node(*target)
                .is_some_and(|n| n.shape.hit_local(local, n.hit_tolerance))
    }

    fn z_order(&self, target: &TargetId) -> i32 {
        self.node(*target).map_or(0, |n| n.z_index)
    }

    fn is_enabled(&self, target: &TargetId) -> bool {
        self.effective(*target, TargetFlags::ENABLED)
    }

    fn descendants(&self, target: &TargetId, out: &mut Vec<TargetId>) {
        for child in self.children_of(*target) {
            out.push(*child);
            self.descendants(child, out);
        }
    }
}

/// A [`SceneTree`] behind a read-write lock.
#[derive(Debug, Default)]
pub struct SharedScene {
    inner: RwLock<SceneTree>,
}

impl SharedScene {
    /// Wrap `tree`.
    pub fn new(tree: SceneTree) -> Self {
        Self {
            inner: RwLock::new(tree),
        }
    }

    /// Shared access for queries.
    pub fn read(&self) -> RwLockReadGuard<'_, SceneTree> {
        self.inner.read()
    }

    /// Exclusive access for edits.
    pub fn write(&self) -> RwLockWriteGuard<'_, SceneTree> {
        self.inner.write()
    }
}

impl TargetScene<TargetId> for SharedScene {
    fn screen_to_local(&self, target: &TargetId, screen: Point) -> Option<Point> {
        self.read().screen_to_local(target, screen)
    }

    fn local_to_screen(&self, target: &TargetId, local: Point) -> Option<Point> {
        self.read().local_to_screen(target, local)
    }

    fn contains_local(&self, target: &TargetId, local: Point) -> bool {
        self.read().contains_local(target, local)
    }

    fn z_order(&self, target: &TargetId) -> i32 {
        self.read().z_order(target)
    }

    fn is_enabled(&self, target: &TargetId) -> bool {
        self.read().is_enabled(target)
    }

    fn descendants(&self, target: &TargetId, out: &mut Vec<TargetId>) {
        self.read().descendants(target, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Circle, Rect};

    fn rect_node(r: Rect) -> TargetNode {
        TargetNode::new(TargetShape::Rect(r))
    }

    #[test]
    fn nested_transforms_compose() {
        let mut t = SceneTree::new();
        let root = t.insert(
            None,
            TargetNode {
                local_transform: Affine::translate((10.0, 10.0)),
                ..rect_node(Rect::new(0.0, 0.0, 100.0, 100.0))
            },
        );
        let child = t.insert(
            Some(root),
            TargetNode {
                local_transform: Affine::scale(2.0),
                ..rect_node(Rect::new(0.0, 0.0, 5.0, 5.0))
            },
        );
        let local = t.screen_to_local(&child, Point::new(18.0, 14.0)).unwrap();
        assert!((local.x - 4.0).abs() < 1e-9 && (local.y - 2.0).abs() < 1e-9);
        assert!(t.contains_local(&child, local));
        let back = t.local_to_screen(&child, local).unwrap();
        assert!((back.x - 18.0).abs() < 1e-9 && (back.y - 14.0).abs() < 1e-9);
    }

    #[test]
    fn singular_transform_is_unavailable() {
        let mut t = SceneTree::new();
        let id = t.insert(
            None,
            TargetNode {
                local_transform: Affine::scale_non_uniform(1.0, 0.0),
                ..rect_node(Rect::new(0.0, 0.0, 10.0, 10.0))
            },
        );
        assert!(t.screen_to_local(&id, Point::new(1.0, 1.0)).is_none());
        assert!(t.local_to_screen(&id, Point::new(1.0, 1.0)).is_some());
    }

    #[test]
    fn flags_are_inherited() {
        let mut t = SceneTree::new();
        let root = t.insert(None, rect_node(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let child = t.insert(Some(root), rect_node(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert!(t.is_enabled(&child));

        t.set_enabled(root, false);
        assert!(!t.is_enabled(&child));
        t.set_enabled(root, true);

        t.set_visible(root, false);
        assert!(!t.contains_local(&child, Point::new(5.0, 5.0)));
        assert!(t.is_enabled(&child), "visibility does not disable");
    }

    #[test]
    fn remove_drops_subtree_and_reuses_slots() {
        let mut t = SceneTree::new();
        let root = t.insert(None, TargetNode::default());
        let a = t.insert(Some(root), TargetNode::default());
        let b = t.insert(Some(a), TargetNode::default());

        let mut all = Vec::new();
        t.descendants(&root, &mut all);
        assert_eq!(all, vec![a, b]);

        t.remove(a);
        assert!(!t.is_alive(a) && !t.is_alive(b));
        assert!(t.children_of(root).is_empty());

        let c = t.insert(None, TargetNode::default());
        assert!(t.is_alive(c));
        assert!(!t.is_alive(a), "old generation stays stale after reuse");
        assert!(t.screen_to_local(&a, Point::ZERO).is_none());
    }

    #[test]
    fn tolerance_widens_hits_and_z_reads_back() {
        let mut t = SceneTree::new();
        let dot = t.insert(
            None,
            TargetNode {
                hit_tolerance: 2.0,
                z_index: 3,
                ..TargetNode::new(TargetShape::Circle(Circle::new((0.0, 0.0), 1.0)))
            },
        );
        assert!(t.contains_local(&dot, Point::new(2.5, 0.0)));
        assert_eq!(t.z_order(&dot), 3);
        t.set_z_index(dot, -1);
        assert_eq!(t.z_order(&dot), -1);
    }

    #[test]
    fn shared_scene_forwards_to_tree() {
        let shared = SharedScene::default();
        let id = shared
            .write()
            .insert(None, rect_node(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert!(shared.contains_local(&id, Point::new(1.0, 1.0)));
        shared.write().set_local_transform(id, Affine::translate((5.0, 0.0)));
        assert_eq!(
            shared.screen_to_local(&id, Point::new(6.0, 1.0)),
            Some(Point::new(1.0, 1.0))
        );
    }
}

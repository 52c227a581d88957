//! Bounding Volume Hierarchy
//!
//! Static tree rebuilt from scratch by [`Bvh::build`]. Items are reordered so
//! that every node covers a contiguous range of them; a node found fully
//! inside the query frustum contributes its whole range without further
//! tests.
//!
//! Splits are median splits along the longest axis of the node's centroid
//! bounds. A node becomes a leaf when it holds at most `max_leaf_elements`
//! items, reaches `max_depth`, or all of its centroids coincide.

use super::bounds::BoundingBox;
use super::frustum::{Containment, Frustum};

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    Leaf,
    Interior { left: u32, right: u32 },
}

#[derive(Debug, Clone, Copy)]
struct BvhNode {
    bounds: BoundingBox,
    first: u32,
    count: u32,
    kind: NodeKind,
}

/// Tree over `(key, box)` items.
#[derive(Debug, Clone)]
pub struct Bvh<K> {
    nodes: Vec<BvhNode>,
    items: Vec<(K, BoundingBox)>,
    depth: u32,
}

impl<K> Default for Bvh<K> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            items: Vec::new(),
            depth: 0,
        }
    }
}

impl<K: Copy> Bvh<K> {
    /// Builds a tree over `items`.
    #[must_use]
    pub fn build(items: Vec<(K, BoundingBox)>, max_leaf_elements: usize, max_depth: u32) -> Self {
        let mut bvh = Self {
            nodes: Vec::with_capacity((items.len() / max_leaf_elements.max(1)).max(1) * 2),
            items,
            depth: 0,
        };
        if !bvh.items.is_empty() {
            let count = bvh.items.len();
            bvh.build_node(0, count, 0, max_leaf_elements.max(1), max_depth);
        }
        bvh
    }

    fn build_node(&mut self, first: usize, count: usize, depth: u32, max_leaf: usize, max_depth: u32) -> u32 {
        let slice = &mut self.items[first..first + count];
        let bounds = slice.iter().fold(BoundingBox::EMPTY, |acc, (_, b)| acc.union(b));
        let centroids = slice
            .iter()
            .fold(BoundingBox::EMPTY, |acc, (_, b)| acc.union(&BoundingBox::new(b.center(), b.center())));

        let index = self.nodes.len() as u32;
        self.nodes.push(BvhNode {
            bounds,
            first: first as u32,
            count: count as u32,
            kind: NodeKind::Leaf,
        });
        self.depth = self.depth.max(depth);

        let spread = centroids.size();
        if count <= max_leaf || depth >= max_depth || spread.max_element() <= 0.0 {
            return index;
        }

        let axis = if spread.x >= spread.y && spread.x >= spread.z {
            0
        } else if spread.y >= spread.z {
            1
        } else {
            2
        };
        let mid = count / 2;
        slice.select_nth_unstable_by(mid, |(_, a), (_, b)| {
            a.center()[axis].total_cmp(&b.center()[axis])
        });

        let left = self.build_node(first, mid, depth + 1, max_leaf, max_depth);
        let right = self.build_node(first + mid, count - mid, depth + 1, max_leaf, max_depth);
        self.nodes[index as usize].kind = NodeKind::Interior { left, right };
        index
    }

    /// Appends the key of every item whose box intersects `frustum`
    /// (with `epsilon` slack) to `out`.
    pub fn query_frustum(&self, frustum: &Frustum, epsilon: f32, out: &mut Vec<K>) {
        if self.nodes.is_empty() {
            return;
        }
        let mut stack: Vec<u32> = Vec::with_capacity(2 * self.depth as usize + 2);
        stack.push(0);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            let range = node.first as usize..(node.first + node.count) as usize;
            match frustum.classify_aabb(&node.bounds, epsilon) {
                Containment::Outside => {}
                Containment::Inside => out.extend(self.items[range].iter().map(|(k, _)| *k)),
                Containment::Intersects => match node.kind {
                    NodeKind::Interior { left, right } => {
                        stack.push(right);
                        stack.push(left);
                    }
                    NodeKind::Leaf => out.extend(
                        self.items[range]
                            .iter()
                            .filter(|(_, b)| frustum.intersects_aabb(b, epsilon))
                            .map(|(k, _)| *k),
                    ),
                },
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Deepest node level reached by the last build (root is 0).
    #[inline]
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Bounds of the whole tree, or `None` when empty.
    #[must_use]
    pub fn root_bounds(&self) -> Option<BoundingBox> {
        self.nodes.first().map(|n| n.bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};

    fn grid(n: i32) -> Vec<(u32, BoundingBox)> {
        let mut items = Vec::new();
        for x in 0..n {
            for z in 0..n {
                let center = Vec3::new(x as f32 * 4.0 - 50.0, 0.0, z as f32 * -4.0);
                items.push((items.len() as u32, BoundingBox::from_center_extents(center, Vec3::splat(0.5))));
            }
        }
        items
    }

    #[test]
    fn query_matches_brute_force() {
        let items = grid(25);
        let frustum = Frustum::from_matrix(
            Mat4::perspective_rh(50f32.to_radians(), 1.5, 0.1, 60.0)
                * Mat4::look_at_rh(Vec3::new(0.0, 2.0, 5.0), Vec3::new(0.0, 0.0, -20.0), Vec3::Y),
        );

        let mut expected: Vec<u32> = items
            .iter()
            .filter(|(_, b)| frustum.intersects_aabb(b, 0.1))
            .map(|(k, _)| *k)
            .collect();
        let bvh = Bvh::build(items, 4, 10);
        let mut found = Vec::new();
        bvh.query_frustum(&frustum, 0.1, &mut found);

        expected.sort_unstable();
        found.sort_unstable();
        assert!(!expected.is_empty());
        assert_eq!(found, expected);
    }

    #[test]
    fn depth_limit_is_respected() {
        let bvh = Bvh::build(grid(20), 1, 3);
        assert!(bvh.depth() <= 3);
        assert_eq!(bvh.len(), 400);
    }

    #[test]
    fn coincident_boxes_form_a_leaf() {
        let items = (0..50u32)
            .map(|k| (k, BoundingBox::from_center_extents(Vec3::ZERO, Vec3::ONE)))
            .collect();
        let bvh = Bvh::build(items, 4, 10);
        assert_eq!(bvh.node_count(), 1);
    }
}

//! Bulk-loaded spatial index over items placed on a page plane.
//!
//! Items are packed once into a static geo-index R-tree (Hilbert-sorted) and
//! never mutated afterwards. Ids are stable: id == position in the input.

use geo_index::rtree::sort::HilbertSort;
use geo_index::rtree::{RTree as GeoRTree, RTreeBuilder, RTreeIndex, SimpleDistanceMetric};

use crate::geometry::{HasBBox, Point, Rect, center_distance_2};

/// Squared distance from a point to the centre of a box.
struct CenterDistance;

impl SimpleDistanceMetric<f64> for CenterDistance {
    fn distance(&self, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
        let dx = x1 - x2;
        let dy = y1 - y2;
        dx * dx + dy * dy
    }

    fn distance_to_bbox(
        &self,
        x: f64,
        y: f64,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    ) -> f64 {
        center_distance_2((x, y), (min_x, min_y, max_x, max_y))
    }
}

pub struct Plane<T> {
    /// Items in load order (id == index)
    seq: Vec<T>,
    /// Cached bbox per item
    bboxes: Vec<Rect>,
    /// None when no items were loaded
    tree: Option<GeoRTree<f64>>,
}

impl<T> Default for Plane<T> {
    fn default() -> Self {
        Self {
            seq: Vec::new(),
            bboxes: Vec::new(),
            tree: None,
        }
    }
}

impl<T: HasBBox> Plane<T> {
    /// Packs all items into the tree in one pass.
    pub fn bulk_load(objs: impl IntoIterator<Item = T>) -> Self {
        let seq: Vec<T> = objs.into_iter().collect();
        if seq.is_empty() {
            return Self::default();
        }

        let bboxes: Vec<Rect> = seq.iter().map(HasBBox::bbox).collect();
        let mut builder: RTreeBuilder<f64> = RTreeBuilder::new(seq.len() as u32);
        for bbox in &bboxes {
            builder.add(bbox.0, bbox.1, bbox.2, bbox.3);
        }
        let tree = builder.finish::<HilbertSort>();

        Self {
            seq,
            bboxes,
            tree: Some(tree),
        }
    }

    /// Finds objects whose bounding box intersects `bbox`, edges included.
    pub fn find(&self, bbox: Rect) -> Vec<&T> {
        self.find_with_indices(bbox)
            .into_iter()
            .map(|(_, obj)| obj)
            .collect()
    }

    /// Like [`Plane::find`], returning (id, object) pairs.
    pub fn find_with_indices(&self, bbox: Rect) -> Vec<(usize, &T)> {
        let Some(tree) = &self.tree else {
            return Vec::new();
        };
        let (x0, y0, x1, y1) = bbox;

        // Inclusive test, so touching and zero-area boxes are candidates.
        let intersects = |b: Rect| !(b.2 < x0 || x1 < b.0 || b.3 < y0 || y1 < b.1);

        tree.search(x0, y0, x1, y1)
            .into_iter()
            .map(|id| id as usize)
            .filter(|&id| id < self.seq.len() && intersects(self.bboxes[id]))
            .map(|id| (id, &self.seq[id]))
            .collect()
    }

    /// Objects ordered by distance from `point` to their box centre, nearest
    /// first. Ties break by id. `filter` is applied before the `k` cutoff.
    pub fn neighbors<F>(&self, point: Point, k: usize, filter: F) -> Vec<(usize, &T)>
    where
        F: Fn(&T) -> bool,
    {
        let Some(tree) = &self.tree else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }

        let (x, y) = point;
        let metric = CenterDistance;
        // Centre distance is no lower bound for tree nodes; rank every item.
        let ids = tree.neighbors_with_simple_distance(x, y, None, None, &metric);

        let mut results: Vec<(usize, f64)> = ids
            .into_iter()
            .map(|id| id as usize)
            .filter(|&id| id < self.seq.len() && filter(&self.seq[id]))
            .map(|id| (id, center_distance_2(point, self.bboxes[id])))
            .collect();

        // Stable tie-break by id for determinism
        results.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        results
            .into_iter()
            .take(k)
            .map(|(id, _)| (id, &self.seq[id]))
            .collect()
    }

    /// Iterates over all objects in load order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.seq.iter()
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

//! Spatial index over document-analysis blocks.
//!
//! Blocks with a bounding box are bulk-loaded into a static R-tree keyed by
//! normalized page coordinates. Page is an attribute on each entry, not an
//! index dimension.
//!
//! # Example
//! ```ignore
//! use textract_index_core::{QueryRect, SpatialIndex};
//!
//! let index = SpatialIndex::from_json_str(&json)?;
//! for hit in index.query(&QueryRect::new(0.1, 0.1, 0.3, 0.2), 0.5, Some(1))? {
//!     println!("{} ({:.0}%)", hit.text, hit.overlap_percentage * 100.0);
//! }
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{IndexError, Result};
use crate::geometry::{self, HasBBox, QueryRect, Rect};
use crate::model::{BlockType, BoundingBox, TextractDocument};
use crate::plane::Plane;
use crate::resolver::{BlockGraph, is_indexable_type};

/// Default minimum overlap ratio for queries.
pub const DEFAULT_OVERLAP_RATIO: f64 = 0.5;

/// One block stored in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub id: String,
    pub block_type: BlockType,
    pub text: String,
    pub confidence: Option<f64>,
    pub page: Option<u32>,
    pub bounding_box: BoundingBox,
}

impl HasBBox for IndexEntry {
    fn x0(&self) -> f64 {
        self.min_x
    }
    fn y0(&self) -> f64 {
        self.min_y
    }
    fn x1(&self) -> f64 {
        self.max_x
    }
    fn y1(&self) -> f64 {
        self.max_y
    }
}

impl IndexEntry {
    fn to_result(&self, overlap_percentage: f64) -> QueryResult {
        QueryResult {
            id: self.id.clone(),
            text: self.text.clone(),
            block_type: self.block_type.clone(),
            confidence: self.confidence,
            page: self.page,
            bounding_box: self.bounding_box,
            overlap_percentage,
        }
    }
}

/// A block matched by a query, annotated with how much of it was covered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub confidence: Option<f64>,
    pub page: Option<u32>,
    pub bounding_box: BoundingBox,
    /// Fraction of the block's own area inside the query rectangle.
    pub overlap_percentage: f64,
}

/// Query knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    /// Minimum fraction of an entry's area that must fall inside the query.
    pub overlap_ratio: f64,
    /// Restricts results to one page; entries without a page never match.
    pub page: Option<u32>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            overlap_ratio: DEFAULT_OVERLAP_RATIO,
            page: None,
        }
    }
}

impl QueryParams {
    pub fn new(overlap_ratio: f64, page: Option<u32>) -> Self {
        Self {
            overlap_ratio,
            page,
        }
    }
}

/// Counts gathered while building the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Blocks in the input.
    pub blocks_seen: usize,
    /// Blocks stored in the index.
    pub indexed: usize,
    /// Blocks dropped for having no bounding box.
    pub skipped_no_geometry: usize,
    /// Blocks dropped for having no text and a non-indexable type.
    pub skipped_no_text: usize,
}

struct IndexState {
    graph: BlockGraph,
    plane: Plane<IndexEntry>,
    pages: Vec<u32>,
    stats: BuildStats,
}

/// Immutable once built; share it behind an `Arc` and swap the `Arc` to
/// refresh. Queries before a successful build fail with
/// [`IndexError::NotInitialized`].
#[derive(Default)]
pub struct SpatialIndex {
    state: Option<IndexState>,
}

impl SpatialIndex {
    /// Creates an empty, un-initialized index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ready index from a document.
    pub fn build(document: TextractDocument) -> Result<Self> {
        let mut index = Self::new();
        index.initialize(document)?;
        Ok(index)
    }

    /// Builds a ready index from document-analysis JSON text.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Self::build(TextractDocument::from_json_str(s)?)
    }

    /// Builds the index from a JSON value with a `Blocks` array.
    pub fn initialize_json(&mut self, value: &Value) -> Result<&mut Self> {
        self.state = None;
        let document = TextractDocument::from_value(value)?;
        self.initialize(document)
    }

    /// Builds the index, replacing any previous contents.
    ///
    /// A block is indexed when it has a bounding box and either resolves to
    /// non-empty text or has an indexable type. On error the index is left
    /// un-initialized.
    pub fn initialize(&mut self, document: TextractDocument) -> Result<&mut Self> {
        self.state = None;
        document.validate()?;

        let graph = BlockGraph::new(document.blocks);
        let mut stats = BuildStats {
            blocks_seen: graph.len(),
            ..BuildStats::default()
        };
        let mut pages = BTreeSet::new();
        let mut entries = Vec::new();

        for block in graph.blocks() {
            let Some(bbox) = block.bounding_box() else {
                stats.skipped_no_geometry += 1;
                continue;
            };

            let text = graph.resolve_text(block);
            if text.is_empty() && !is_indexable_type(&block.block_type) {
                stats.skipped_no_text += 1;
                continue;
            }

            let (min_x, min_y, max_x, max_y) = bbox.to_rect();
            if let Some(page) = block.page {
                pages.insert(page);
            }
            entries.push(IndexEntry {
                min_x,
                min_y,
                max_x,
                max_y,
                id: block.id.clone(),
                block_type: block.block_type.clone(),
                text,
                confidence: block.confidence,
                page: block.page,
                bounding_box: *bbox,
            });
        }

        stats.indexed = entries.len();
        let plane = Plane::bulk_load(entries);

        tracing::debug!(
            blocks = stats.blocks_seen,
            indexed = stats.indexed,
            skipped_no_geometry = stats.skipped_no_geometry,
            skipped_no_text = stats.skipped_no_text,
            pages = pages.len(),
            "built spatial index"
        );
        tracing::debug!(counts = ?graph.type_counts(), "block type counts");

        self.state = Some(IndexState {
            graph,
            plane,
            pages: pages.into_iter().collect(),
            stats,
        });
        Ok(self)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    fn state(&self) -> Result<&IndexState> {
        self.state.as_ref().ok_or(IndexError::NotInitialized)
    }

    /// Returns entries overlapping `rect` by at least `overlap_ratio` of their
    /// own area, optionally restricted to `page`.
    ///
    /// Result order follows the tree search and is not meaningful.
    pub fn query(
        &self,
        rect: &QueryRect,
        overlap_ratio: f64,
        page: Option<u32>,
    ) -> Result<Vec<QueryResult>> {
        let state = self.state()?;
        rect.validate()?;
        if !(0.0..=1.0).contains(&overlap_ratio) {
            return Err(IndexError::InvalidRatio(overlap_ratio));
        }

        let search: Rect = rect.to_bbox();
        let candidates = state.plane.find(search);
        let candidate_count = candidates.len();

        let results: Vec<QueryResult> = candidates
            .into_iter()
            .filter(|entry| page.is_none_or(|p| entry.page == Some(p)))
            .filter_map(|entry| {
                let ratio = geometry::overlap_ratio(search, entry.bbox());
                (ratio >= overlap_ratio).then(|| entry.to_result(ratio))
            })
            .collect();

        tracing::trace!(
            candidates = candidate_count,
            results = results.len(),
            overlap_ratio,
            page = ?page,
            "spatial query"
        );
        Ok(results)
    }

    /// [`SpatialIndex::query`] with its arguments bundled.
    pub fn query_with(&self, rect: &QueryRect, params: &QueryParams) -> Result<Vec<QueryResult>> {
        self.query(rect, params.overlap_ratio, params.page)
    }

    /// The `k` entries nearest to a point, optionally on one page.
    ///
    /// Distance is measured to the centre of each entry's box, ties broken by
    /// load order. `overlap_percentage` is 1.0 when the point lies inside the
    /// entry's box and 0.0 otherwise.
    pub fn nearest(&self, x: f64, y: f64, k: usize, page: Option<u32>) -> Result<Vec<QueryResult>> {
        let state = self.state()?;
        if !x.is_finite() || !y.is_finite() {
            return Err(IndexError::InvalidRect(format!(
                "point ({x}, {y}) must have finite coordinates"
            )));
        }

        let point = (x, y);
        let results = state
            .plane
            .neighbors(point, k, |entry| page.is_none_or(|p| entry.page == Some(p)))
            .into_iter()
            .map(|(_, entry)| {
                let inside = geometry::contains(entry.bbox(), (x, y, x, y));
                entry.to_result(if inside { 1.0 } else { 0.0 })
            })
            .collect();
        Ok(results)
    }

    /// Resolved text of any block in the document, indexed or not.
    pub fn resolve_text(&self, id: &str) -> Result<Option<String>> {
        Ok(self.state()?.graph.resolve_text_by_id(id))
    }

    /// Number of indexed entries; zero before initialization.
    pub fn len(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.plane.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct pages among indexed entries, ascending.
    pub fn pages(&self) -> Result<&[u32]> {
        Ok(&self.state()?.pages)
    }

    pub fn stats(&self) -> Result<BuildStats> {
        Ok(self.state()?.stats)
    }

    /// The resolver over the full block set.
    pub fn graph(&self) -> Result<&BlockGraph> {
        Ok(&self.state()?.graph)
    }

    /// All indexed entries in load order.
    pub fn entries(&self) -> Result<impl Iterator<Item = &IndexEntry>> {
        Ok(self.state()?.plane.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{EPSILON, approx_eq};
    use crate::model::Block;

    fn word(id: &str, text: &str, bbox: BoundingBox, page: u32) -> Block {
        Block::new(id, BlockType::Word)
            .with_text(text)
            .with_page(page)
            .with_bounding_box(bbox)
    }

    #[test]
    fn test_query_before_initialize() {
        let index = SpatialIndex::new();
        assert!(!index.is_initialized());
        assert!(matches!(
            index.query(&QueryRect::full_page(), 0.5, None),
            Err(IndexError::NotInitialized)
        ));
        assert!(matches!(index.resolve_text("x"), Err(IndexError::NotInitialized)));
        assert!(matches!(index.stats(), Err(IndexError::NotInitialized)));
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn test_failed_initialize_clears_state() {
        let mut index = SpatialIndex::build(TextractDocument::new(vec![word(
            "w",
            "x",
            BoundingBox::new(0.1, 0.1, 0.1, 0.1),
            1,
        )]))
        .unwrap();
        assert!(index.is_initialized());

        let err = index.initialize_json(&serde_json::json!({"NoBlocks": []}));
        assert!(matches!(err, Err(IndexError::InvalidInput(_))));
        assert!(!index.is_initialized());
    }

    #[test]
    fn test_stats_and_pages() {
        let doc = TextractDocument::new(vec![
            word("a", "a", BoundingBox::new(0.1, 0.1, 0.1, 0.1), 2),
            word("b", "b", BoundingBox::new(0.3, 0.1, 0.1, 0.1), 1),
            Block::new("p", BlockType::Page),
            Block::new("para", "PARAGRAPH").with_bounding_box(BoundingBox::new(0.0, 0.0, 1.0, 1.0)),
        ]);
        let index = SpatialIndex::build(doc).unwrap();
        assert_eq!(index.pages().unwrap(), &[1, 2]);
        assert_eq!(
            index.stats().unwrap(),
            BuildStats {
                blocks_seen: 4,
                indexed: 2,
                skipped_no_geometry: 1,
                skipped_no_text: 1,
            }
        );
    }

    #[test]
    fn test_query_params_default() {
        let params = QueryParams::default();
        assert!(approx_eq(params.overlap_ratio, 0.5, EPSILON));
        assert_eq!(params.page, None);

        let parsed: QueryParams = serde_json::from_str(r#"{"page": 3}"#).unwrap();
        assert_eq!(parsed, QueryParams::new(0.5, Some(3)));
    }

    #[test]
    fn test_query_result_serialization() {
        let result = QueryResult {
            id: "w".to_string(),
            text: "Total".to_string(),
            block_type: BlockType::Word,
            confidence: Some(98.0),
            page: Some(1),
            bounding_box: BoundingBox::new(0.5, 0.25, 0.25, 0.125),
            overlap_percentage: 1.0,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": "w",
                "text": "Total",
                "type": "WORD",
                "confidence": 98.0,
                "page": 1,
                "boundingBox": {"Left": 0.5, "Top": 0.25, "Width": 0.25, "Height": 0.125},
                "overlapPercentage": 1.0
            })
        );
    }

    #[test]
    fn test_nearest_filters_page() {
        let doc = TextractDocument::new(vec![
            word("far", "far", BoundingBox::new(0.7, 0.7, 0.1, 0.1), 1),
            word("hit", "hit", BoundingBox::new(0.1, 0.1, 0.2, 0.2), 1),
            word("other_page", "x", BoundingBox::new(0.1, 0.1, 0.2, 0.2), 2),
        ]);
        let index = SpatialIndex::build(doc).unwrap();
        let hits = index.nearest(0.2, 0.2, 2, Some(1)).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["hit", "far"]);
        assert_eq!(hits[0].overlap_percentage, 1.0);
        assert_eq!(hits[1].overlap_percentage, 0.0);

        assert!(matches!(
            index.nearest(f64::NAN, 0.2, 1, None),
            Err(IndexError::InvalidRect(_))
        ));
    }
}

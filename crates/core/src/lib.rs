//! textract-index - a spatial index over document-analysis text blocks.
//!
//! Ingests the flat block list of an OCR / document-analysis result, resolves
//! each block's text through its CHILD relationships, and answers "which text
//! blocks overlap this rectangle by at least X%" queries, optionally per page.

pub mod error;
pub mod geometry;
pub mod index;
pub mod model;
pub mod plane;
pub mod resolver;

pub use error::{IndexError, Result};
pub use geometry::QueryRect;
pub use index::{BuildStats, IndexEntry, QueryParams, QueryResult, SpatialIndex};
pub use model::{Block, BlockType, BoundingBox, Relationship, RelationshipType, TextractDocument};
pub use resolver::{BlockGraph, is_indexable_type};

//! Block graph resolution.
//!
//! Structural blocks (tables, cells, key-value sets) carry no text of their
//! own; their text is the space-joined text of the blocks they reference
//! through CHILD relationships.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::model::{Block, BlockType};

/// Returns true for block types worth indexing even without text.
///
/// An empty TABLE or CELL still marks out a region of the page.
pub fn is_indexable_type(block_type: &BlockType) -> bool {
    matches!(
        block_type,
        BlockType::Line
            | BlockType::Word
            | BlockType::SelectionElement
            | BlockType::Table
            | BlockType::Cell
            | BlockType::TableTitle
            | BlockType::KeyValueSet
    )
}

/// Lookup table from block id to block, with text resolution over it.
#[derive(Debug, Clone, Default)]
pub struct BlockGraph {
    blocks: Vec<Block>,
    by_id: FxHashMap<String, usize>,
}

impl BlockGraph {
    /// Builds the id table. When an id repeats, the later block wins.
    pub fn new(blocks: Vec<Block>) -> Self {
        let mut by_id = FxHashMap::default();
        by_id.reserve(blocks.len());
        for (idx, block) in blocks.iter().enumerate() {
            if by_id.insert(block.id.clone(), idx).is_some() {
                tracing::warn!(id = %block.id, "duplicate block id; keeping the later block");
            }
        }
        Self { blocks, by_id }
    }

    pub fn get(&self, id: &str) -> Option<&Block> {
        self.by_id.get(id).map(|&idx| &self.blocks[idx])
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// CHILD blocks of `block` that exist in the graph, in relationship order.
    /// Dangling ids are skipped.
    pub fn children<'a>(&'a self, block: &'a Block) -> impl Iterator<Item = &'a Block> + 'a {
        block.child_ids().filter_map(move |id| self.get(id))
    }

    /// Resolves the text belonging to `block`.
    ///
    /// Direct text is returned verbatim. Otherwise the text of every reachable
    /// CHILD block is collected depth-first and joined with single spaces, then
    /// trimmed. Each block contributes at most once, which also stops cycles in
    /// malformed input. Returns an empty string when the subtree has no text.
    pub fn resolve_text(&self, block: &Block) -> String {
        if let Some(text) = block.text() {
            return text.to_string();
        }

        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut parts: Vec<&str> = Vec::new();
        let mut stack: Vec<&Block> = vec![block];

        while let Some(current) = stack.pop() {
            if !visited.insert(current.id.as_str()) {
                continue;
            }
            if let Some(text) = current.text() {
                parts.push(text);
                continue;
            }
            // Push in reverse so children pop in relationship order.
            let start = stack.len();
            stack.extend(self.children(current));
            stack[start..].reverse();
        }

        parts.join(" ").trim().to_string()
    }

    /// Resolves text by id; `None` when the id is unknown.
    pub fn resolve_text_by_id(&self, id: &str) -> Option<String> {
        self.get(id).map(|block| self.resolve_text(block))
    }

    /// Number of blocks per type, keyed by wire name.
    pub fn type_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for block in &self.blocks {
            *counts.entry(block.block_type.to_string()).or_insert(0) += 1;
        }
        counts
    }
}

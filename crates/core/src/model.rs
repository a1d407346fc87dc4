//! Document-analysis block model.
//!
//! Mirrors the JSON shape of an AWS Textract document-analysis response
//! (`{"Blocks": [...]}` with PascalCase fields). Only the fields the index
//! consumes are modelled; everything else in the response is ignored.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{IndexError, Result};
use crate::geometry::Rect;

/// Declares a string-tagged enum with a catch-all `Other(String)` variant.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $wire:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            /// A value this crate does not know about, kept verbatim.
            Other(String),
        }

        impl $name {
            /// The wire string for this value.
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $wire,)+
                    Self::Other(s) => s.as_str(),
                }
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                match s {
                    $($wire => Self::$variant,)+
                    other => Self::Other(other.to_string()),
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                match Self::from(s.as_str()) {
                    Self::Other(_) => Self::Other(s),
                    known => known,
                }
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                match value {
                    $name::Other(s) => s,
                    known => known.as_str().to_string(),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Categorical tag of a block (`BlockType`).
    pub enum BlockType {
        Page => "PAGE",
        Line => "LINE",
        Word => "WORD",
        Table => "TABLE",
        Cell => "CELL",
        MergedCell => "MERGED_CELL",
        TableTitle => "TABLE_TITLE",
        TableFooter => "TABLE_FOOTER",
        SelectionElement => "SELECTION_ELEMENT",
        KeyValueSet => "KEY_VALUE_SET",
        Title => "TITLE",
        Query => "QUERY",
        QueryResult => "QUERY_RESULT",
        Signature => "SIGNATURE",
        LayoutTitle => "LAYOUT_TITLE",
        LayoutHeader => "LAYOUT_HEADER",
        LayoutFooter => "LAYOUT_FOOTER",
        LayoutSectionHeader => "LAYOUT_SECTION_HEADER",
        LayoutPageNumber => "LAYOUT_PAGE_NUMBER",
        LayoutList => "LAYOUT_LIST",
        LayoutFigure => "LAYOUT_FIGURE",
        LayoutTable => "LAYOUT_TABLE",
        LayoutKeyValue => "LAYOUT_KEY_VALUE",
        LayoutText => "LAYOUT_TEXT",
    }
}

wire_enum! {
    /// Kind of link between blocks (`Relationships[].Type`).
    pub enum RelationshipType {
        Child => "CHILD",
        Value => "VALUE",
        ComplexFeatures => "COMPLEX_FEATURES",
        MergedCell => "MERGED_CELL",
        Title => "TITLE",
        Answer => "ANSWER",
        Table => "TABLE",
        TableTitle => "TABLE_TITLE",
        TableFooter => "TABLE_FOOTER",
    }
}

/// Normalized bounding box relative to the page, origin at the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Converts to (min_x, min_y, max_x, max_y).
    pub fn to_rect(&self) -> Rect {
        (
            self.left,
            self.top,
            self.left + self.width,
            self.top + self.height,
        )
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let fields = [
            ("Left", self.left),
            ("Top", self.top),
            ("Width", self.width),
            ("Height", self.height),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(format!("BoundingBox.{name} is not finite ({value})"));
            }
        }
        if self.width < 0.0 || self.height < 0.0 {
            return Err(format!(
                "BoundingBox has negative extent ({}x{})",
                self.width, self.height
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolygonPoint {
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Geometry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub polygon: Vec<PolygonPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "Type")]
    pub kind: RelationshipType,
    #[serde(rename = "Ids", default, deserialize_with = "null_as_empty")]
    pub ids: Vec<String>,
}

impl Relationship {
    pub fn child<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: RelationshipType::Child,
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// One semantic unit of a document-analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Block {
    pub id: String,
    pub block_type: BlockType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Advisory score in 0..=100, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub relationships: Vec<Relationship>,
}

impl Block {
    /// Creates a bare block with no text, geometry or relationships.
    pub fn new(id: impl Into<String>, block_type: impl Into<BlockType>) -> Self {
        Self {
            id: id.into(),
            block_type: block_type.into(),
            text: None,
            confidence: None,
            page: None,
            geometry: None,
            relationships: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_bounding_box(mut self, bbox: BoundingBox) -> Self {
        self.geometry
            .get_or_insert_with(Geometry::default)
            .bounding_box = Some(bbox);
        self
    }

    pub fn with_children<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relationships.push(Relationship::child(ids));
        self
    }

    /// Direct text of the block. Empty strings count as absent.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    pub fn bounding_box(&self) -> Option<&BoundingBox> {
        self.geometry.as_ref()?.bounding_box.as_ref()
    }

    /// Ids referenced by CHILD relationships, in order.
    pub fn child_ids(&self) -> impl Iterator<Item = &str> {
        self.relationships
            .iter()
            .filter(|rel| rel.kind == RelationshipType::Child)
            .flat_map(|rel| rel.ids.iter().map(String::as_str))
    }
}

/// A complete, already-assembled document-analysis result.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextractDocument {
    #[serde(rename = "Blocks")]
    pub blocks: Vec<Block>,
}

impl TextractDocument {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Parses a document-analysis response from JSON text.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_value(&value)
    }

    /// Validates and converts an already-parsed JSON value.
    ///
    /// The value must be an object with a `Blocks` array; every element must
    /// be a well-formed block.
    pub fn from_value(value: &Value) -> Result<Self> {
        let raw_blocks = value
            .get("Blocks")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                IndexError::InvalidInput("Blocks array is missing or invalid".to_string())
            })?;

        let mut blocks = Vec::with_capacity(raw_blocks.len());
        for (i, raw) in raw_blocks.iter().enumerate() {
            let block = Block::deserialize(raw)
                .map_err(|e| IndexError::InvalidInput(format!("block {i}: {e}")))?;
            blocks.push(block);
        }

        let doc = Self { blocks };
        doc.validate()?;
        Ok(doc)
    }

    /// Checks every bounding box for non-finite or negative values.
    pub fn validate(&self) -> Result<()> {
        for (i, block) in self.blocks.iter().enumerate() {
            if let Some(bbox) = block.bounding_box() {
                bbox.validate().map_err(|msg| {
                    IndexError::InvalidInput(format!("block {i} ({}): {msg}", block.id))
                })?;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl From<Vec<Block>> for TextractDocument {
    fn from(blocks: Vec<Block>) -> Self {
        Self::new(blocks)
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

//! Core domain types: document elements, their metadata, and run manifests.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version for the chunk-run manifest format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// ElementKind
// ---------------------------------------------------------------------------

/// The category of a document element, serialized as its PascalCase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Title,
    NarrativeText,
    Text,
    UncategorizedText,
    ListItem,
    Address,
    EmailAddress,
    FigureCaption,
    Formula,
    Header,
    Footer,
    PageBreak,
    PageNumber,
    CheckBox,
    Image,
    CodeSnippet,
    Table,
    TableChunk,
    CompositeElement,
}

impl ElementKind {
    /// True for the kinds a chunking run emits. A `Table` that fits the
    /// window is emitted as-is, so it counts too.
    pub fn is_chunk(self) -> bool {
        matches!(self, Self::CompositeElement | Self::Table | Self::TableChunk)
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

// ---------------------------------------------------------------------------
// Element
// ---------------------------------------------------------------------------

/// A single document element as produced by a partitioner, or a chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Element category.
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// Identifier; filled with a fresh UUID v7 when absent on input.
    #[serde(default = "new_element_id")]
    pub element_id: String,
    /// Text content. May be empty (e.g. `PageBreak`).
    #[serde(default)]
    pub text: String,
    /// Element metadata.
    #[serde(default)]
    pub metadata: ElementMetadata,
}

fn new_element_id() -> String {
    Uuid::now_v7().to_string()
}

impl Element {
    /// Create an element with a fresh id and empty metadata.
    pub fn new(kind: ElementKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            element_id: new_element_id(),
            text: text.into(),
            metadata: ElementMetadata::default(),
        }
    }

    /// Replace this element's metadata.
    pub fn with_metadata(mut self, metadata: ElementMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Shorthand for a `Title` element.
    pub fn title(text: impl Into<String>) -> Self {
        Self::new(ElementKind::Title, text)
    }

    /// Shorthand for a `NarrativeText` element.
    pub fn narrative(text: impl Into<String>) -> Self {
        Self::new(ElementKind::NarrativeText, text)
    }

    /// Shorthand for a `Table` element with optional HTML.
    pub fn table(text: impl Into<String>, html: Option<&str>) -> Self {
        let mut table = Self::new(ElementKind::Table, text);
        table.metadata.text_as_html = html.map(String::from);
        table
    }

    /// Copy of this element with `.metadata.orig_elements` cleared, so an
    /// element that is itself a chunk does not nest its own originals.
    pub fn without_orig_elements(&self) -> Self {
        let mut e = self.clone();
        e.metadata.orig_elements = None;
        e
    }
}

// ---------------------------------------------------------------------------
// ElementMetadata
// ---------------------------------------------------------------------------

/// How the values of one metadata field are merged when several elements
/// are combined into a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsolidationStrategy {
    /// Use the first populated value.
    First,
    /// Concatenate the lists of every element that has one.
    ListConcatenate,
    /// Union the lists, keeping order of first appearance.
    ListUnique,
    /// Join the stripped strings with a single space.
    StringConcatenate,
    /// Do not carry the field into the chunk.
    Drop,
}

/// Known metadata fields and the strategy used to consolidate each.
pub const FIELD_CONSOLIDATION_STRATEGIES: &[(&str, ConsolidationStrategy)] = &[
    ("category_depth", ConsolidationStrategy::Drop),
    ("detection_class_prob", ConsolidationStrategy::Drop),
    ("emphasized_text_contents", ConsolidationStrategy::ListConcatenate),
    ("emphasized_text_tags", ConsolidationStrategy::ListConcatenate),
    ("file_directory", ConsolidationStrategy::First),
    ("filename", ConsolidationStrategy::First),
    ("filetype", ConsolidationStrategy::First),
    ("header_footer_type", ConsolidationStrategy::Drop),
    ("image_path", ConsolidationStrategy::Drop),
    ("is_continuation", ConsolidationStrategy::Drop),
    ("languages", ConsolidationStrategy::ListUnique),
    ("last_modified", ConsolidationStrategy::First),
    ("link_texts", ConsolidationStrategy::ListConcatenate),
    ("link_urls", ConsolidationStrategy::ListConcatenate),
    ("orig_elements", ConsolidationStrategy::Drop),
    ("page_name", ConsolidationStrategy::First),
    ("page_number", ConsolidationStrategy::First),
    ("parent_id", ConsolidationStrategy::Drop),
    ("section", ConsolidationStrategy::StringConcatenate),
    ("sent_from", ConsolidationStrategy::First),
    ("sent_to", ConsolidationStrategy::First),
    ("subject", ConsolidationStrategy::First),
    ("text_as_html", ConsolidationStrategy::First),
    ("url", ConsolidationStrategy::First),
];

/// Look up the consolidation strategy for a known metadata field.
pub fn consolidation_strategy(field: &str) -> Option<ConsolidationStrategy> {
    FIELD_CONSOLIDATION_STRATEGIES
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, s)| *s)
}

/// Metadata attached to an element. Absent fields are not serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filetype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_texts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emphasized_text_contents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emphasized_text_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_from: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_to: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_depth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_class_prob: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_footer_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    /// Compact `<table>` HTML for `Table` and `TableChunk` elements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_as_html: Option<String>,
    /// Set on the second and later pieces of a split element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_continuation: Option<bool>,
    /// The source elements a chunk was formed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orig_elements: Option<Vec<Element>>,
    /// Ad-hoc fields not known to docchunk. Kept on round-trip, dropped on consolidation.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ElementMetadata {
    /// Merge the metadata of several elements into the metadata of one chunk.
    ///
    /// Each known field is resolved with its [`ConsolidationStrategy`]. A field
    /// that is `None` on every input stays `None`.
    pub fn consolidate<'a>(items: impl IntoIterator<Item = &'a ElementMetadata>) -> Self {
        let items: Vec<&ElementMetadata> = items.into_iter().collect();

        Self {
            filename: first(&items, |m| m.filename.as_ref()),
            file_directory: first(&items, |m| m.file_directory.as_ref()),
            filetype: first(&items, |m| m.filetype.as_ref()),
            last_modified: first(&items, |m| m.last_modified.as_ref()),
            languages: list_unique(&items, |m| m.languages.as_ref()),
            page_number: first(&items, |m| m.page_number.as_ref()),
            page_name: first(&items, |m| m.page_name.as_ref()),
            url: first(&items, |m| m.url.as_ref()),
            link_texts: list_concatenate(&items, |m| m.link_texts.as_ref()),
            link_urls: list_concatenate(&items, |m| m.link_urls.as_ref()),
            emphasized_text_contents: list_concatenate(&items, |m| {
                m.emphasized_text_contents.as_ref()
            }),
            emphasized_text_tags: list_concatenate(&items, |m| m.emphasized_text_tags.as_ref()),
            section: string_concatenate(&items, |m| m.section.as_deref()),
            subject: first(&items, |m| m.subject.as_ref()),
            sent_from: first(&items, |m| m.sent_from.as_ref()),
            sent_to: first(&items, |m| m.sent_to.as_ref()),
            text_as_html: first(&items, |m| m.text_as_html.as_ref()),
            ..Self::default()
        }
    }

    /// Clear every field whose strategy is [`ConsolidationStrategy::Drop`].
    ///
    /// Used where a single element's metadata is carried over whole, e.g. a table
    /// chunk; `parent_id` and friends would no longer point anywhere useful.
    pub fn clear_dropped_fields(&mut self) {
        self.category_depth = None;
        self.detection_class_prob = None;
        self.header_footer_type = None;
        self.image_path = None;
        self.is_continuation = None;
        self.orig_elements = None;
        self.parent_id = None;
    }
}

fn first<T: Clone>(
    items: &[&ElementMetadata],
    field: impl Fn(&ElementMetadata) -> Option<&T>,
) -> Option<T> {
    items.iter().find_map(|&m| field(m)).cloned()
}

fn list_concatenate<T: Clone>(
    items: &[&ElementMetadata],
    field: impl Fn(&ElementMetadata) -> Option<&Vec<T>>,
) -> Option<Vec<T>> {
    let mut populated = items.iter().filter_map(|&m| field(m)).peekable();
    populated.peek()?;
    Some(populated.flatten().cloned().collect())
}

fn list_unique<T: Clone + PartialEq>(
    items: &[&ElementMetadata],
    field: impl Fn(&ElementMetadata) -> Option<&Vec<T>>,
) -> Option<Vec<T>> {
    let all = list_concatenate(items, field)?;
    let mut unique: Vec<T> = Vec::with_capacity(all.len());
    for value in all {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    Some(unique)
}

fn string_concatenate(
    items: &[&ElementMetadata],
    field: impl Fn(&ElementMetadata) -> Option<&str>,
) -> Option<String> {
    let values: Vec<&str> = items.iter().filter_map(|&m| field(m)).map(str::trim).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.join(" "))
}

// ---------------------------------------------------------------------------
// ChunkingStrategy
// ---------------------------------------------------------------------------

/// Which semantic boundaries a chunking run respects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    /// Fill chunks as full as possible, no semantic boundaries.
    Basic,
    /// Start a new chunk on each `Title` (and optionally each new page).
    #[default]
    #[serde(alias = "by-title")]
    ByTitle,
}

impl std::fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::ByTitle => write!(f, "by_title"),
        }
    }
}

impl std::str::FromStr for ChunkingStrategy {
    type Err = crate::DocChunkError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "by_title" | "by-title" => Ok(Self::ByTitle),
            other => Err(crate::DocChunkError::config(format!(
                "unknown chunking strategy '{other}': expected 'basic' or 'by_title'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// ChunkManifest
// ---------------------------------------------------------------------------

/// The `manifest.json` written alongside the outputs of a batch chunking run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Tool version that produced the run.
    pub tool_version: String,
    /// Strategy used.
    pub strategy: ChunkingStrategy,
    /// Effective chunking options, as resolved from config and flags.
    pub options: serde_json::Value,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub completed_at: DateTime<Utc>,
    /// One entry per input file, in input order.
    pub files: Vec<ChunkedFile>,
}

/// Outcome of chunking a single input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkedFile {
    /// Input path as given.
    pub input: String,
    /// Output path, absent when the file failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// SHA-256 of the input bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Number of elements read.
    pub element_count: usize,
    /// Number of chunks written.
    pub chunk_count: usize,
    /// Error message when the file could not be chunked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(f: impl FnOnce(&mut ElementMetadata)) -> ElementMetadata {
        let mut m = ElementMetadata::default();
        f(&mut m);
        m
    }

    #[test]
    fn element_json_layout() {
        let json = r#"{
            "type": "NarrativeText",
            "element_id": "abc",
            "text": "Hello",
            "metadata": {"filename": "a.pdf", "page_number": 2, "custom_field": 7}
        }"#;
        let e: Element = serde_json::from_str(json).expect("parse element");
        assert_eq!(e.kind, ElementKind::NarrativeText);
        assert_eq!(e.element_id, "abc");
        assert_eq!(e.metadata.page_number, Some(2));
        assert_eq!(e.metadata.extra["custom_field"], serde_json::json!(7));

        let out = serde_json::to_value(&e).expect("serialize");
        assert_eq!(out["type"], "NarrativeText");
        assert_eq!(out["metadata"]["custom_field"], 7);
        assert!(out["metadata"].get("languages").is_none());
    }

    #[test]
    fn missing_element_id_is_generated() {
        let e: Element = serde_json::from_str(r#"{"type": "Title", "text": "Intro"}"#)
            .expect("parse element");
        assert!(!e.element_id.is_empty());
        assert!(e.metadata.filename.is_none());
    }

    fn fully_populated() -> ElementMetadata {
        ElementMetadata {
            filename: Some(String::new()),
            file_directory: Some(String::new()),
            filetype: Some(String::new()),
            last_modified: Some(String::new()),
            languages: Some(vec![]),
            page_number: Some(1),
            page_name: Some(String::new()),
            url: Some(String::new()),
            link_texts: Some(vec![]),
            link_urls: Some(vec![]),
            emphasized_text_contents: Some(vec![]),
            emphasized_text_tags: Some(vec![]),
            section: Some(String::new()),
            subject: Some(String::new()),
            sent_from: Some(vec![]),
            sent_to: Some(vec![]),
            parent_id: Some(String::new()),
            category_depth: Some(0),
            detection_class_prob: Some(0.5),
            header_footer_type: Some(String::new()),
            image_path: Some(String::new()),
            text_as_html: Some(String::new()),
            is_continuation: Some(true),
            orig_elements: Some(vec![]),
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn every_metadata_field_has_a_strategy() {
        let value = serde_json::to_value(fully_populated()).expect("serialize");
        let fields = value.as_object().expect("object");
        assert_eq!(fields.len(), FIELD_CONSOLIDATION_STRATEGIES.len());
        for name in fields.keys() {
            assert!(consolidation_strategy(name).is_some(), "no strategy for {name}");
        }
    }

    #[test]
    fn consolidate_applies_field_strategies() {
        let a = meta(|m| {
            m.filename = Some("doc.docx".into());
            m.languages = Some(vec!["lat".into()]);
            m.link_urls = Some(vec!["https://a".into()]);
            m.section = Some(" Intro ".into());
            m.parent_id = Some("p1".into());
            m.extra.insert("custom".into(), serde_json::json!(true));
        });
        let b = meta(|m| {
            m.filename = Some("other.docx".into());
            m.page_number = Some(3);
            m.languages = Some(vec!["lat".into(), "eng".into()]);
            m.link_urls = Some(vec!["https://b".into()]);
            m.section = Some("Body".into());
        });

        let c = ElementMetadata::consolidate([&a, &b]);
        assert_eq!(c.filename.as_deref(), Some("doc.docx"));
        assert_eq!(c.page_number, Some(3));
        assert_eq!(c.languages, Some(vec!["lat".to_string(), "eng".to_string()]));
        assert_eq!(
            c.link_urls,
            Some(vec!["https://a".to_string(), "https://b".to_string()])
        );
        assert_eq!(c.section.as_deref(), Some("Intro Body"));
        assert!(c.parent_id.is_none());
        assert!(c.extra.is_empty());
        assert!(c.link_texts.is_none());
    }

    #[test]
    fn clear_dropped_fields_keeps_first_fields() {
        let mut m = meta(|m| {
            m.filename = Some("t.html".into());
            m.parent_id = Some("p".into());
            m.is_continuation = Some(true);
        });
        m.clear_dropped_fields();
        assert_eq!(m.filename.as_deref(), Some("t.html"));
        assert!(m.parent_id.is_none());
        assert!(m.is_continuation.is_none());
    }

    #[test]
    fn clear_dropped_fields_matches_strategy_table() {
        let mut m = fully_populated();
        m.clear_dropped_fields();
        let value = serde_json::to_value(&m).expect("serialize");
        let fields = value.as_object().expect("object");

        for (name, strategy) in FIELD_CONSOLIDATION_STRATEGIES {
            let dropped = *strategy == ConsolidationStrategy::Drop;
            assert_eq!(
                fields.contains_key(*name),
                !dropped,
                "{name} ({strategy:?}) after clear_dropped_fields"
            );
        }
    }

    #[test]
    fn chunk_kinds() {
        assert!(ElementKind::CompositeElement.is_chunk());
        assert!(ElementKind::Table.is_chunk());
        assert!(ElementKind::TableChunk.is_chunk());
        assert!(!ElementKind::Title.is_chunk());
        assert!(!ElementKind::NarrativeText.is_chunk());
    }

    #[test]
    fn strategy_parsing() {
        assert_eq!("basic".parse::<ChunkingStrategy>().unwrap(), ChunkingStrategy::Basic);
        assert_eq!("by-title".parse::<ChunkingStrategy>().unwrap(), ChunkingStrategy::ByTitle);
        assert!("by_page".parse::<ChunkingStrategy>().is_err());
        assert_eq!(ChunkingStrategy::ByTitle.to_string(), "by_title");
    }

    #[test]
    fn elements_fixture_validates() {
        let fixture = std::fs::read_to_string(
            std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
                .join("../../../fixtures/json/elements.fixture.json"),
        )
        .expect("read fixture");
        let parsed: Vec<Element> =
            serde_json::from_str(&fixture).expect("deserialize fixture elements");
        assert_eq!(parsed[0].kind, ElementKind::Title);
        assert!(parsed.iter().any(|e| e.kind == ElementKind::Table));
    }
}

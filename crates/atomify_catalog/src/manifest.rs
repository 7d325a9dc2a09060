//! # Manifest Parsing
//!
//! JSON manifest → typed descriptors, one entry at a time.
//!
//! ```text
//! bytes ──> serde_json::Value ──> "examples" array ──┬─> RawEntry ──> SimulationDescriptor
//!            (Parse error)        (Schema error)      └─> SkippedEntry (per-entry warning)
//! ```
//!
//! Only the top-level structure is fatal. A bad entry is dropped and
//! reported; the rest of the manifest still loads.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{CatalogError, CatalogResult};
use crate::model::{FileRef, SimulationDescriptor};

/// Top-level field holding the entry array.
pub const EXAMPLES_FIELD: &str = "examples";

/// Why an entry was left out of the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The array element is not a JSON object.
    NotAnObject,
    /// A required field is missing or has the wrong type.
    Malformed(String),
    /// An earlier entry already claimed this id.
    DuplicateId,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "entry is not an object"),
            Self::Malformed(msg) => write!(f, "malformed entry: {msg}"),
            Self::DuplicateId => write!(f, "duplicate id"),
        }
    }
}

/// A manifest entry that did not make it into the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Position in the `examples` array.
    pub index: usize,
    /// The entry's id, if it had a readable one.
    pub id: Option<String>,
    /// What was wrong with it.
    pub reason: SkipReason,
}

impl fmt::Display for SkippedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "entry #{} ({id}): {}", self.index, self.reason),
            None => write!(f, "entry #{}: {}", self.index, self.reason),
        }
    }
}

/// Wire shape of one entry.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    id: String,
    title: String,
    description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    analysis_description: Option<String>,
    image_url: String,
    input_script: String,
    keywords: Vec<String>,
    files: Vec<RawFile>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFile {
    file_name: String,
    url: String,
}

/// Optional text that degrades to `None` on anything but a string.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        _ => None,
    })
}

impl From<RawEntry> for SimulationDescriptor {
    fn from(raw: RawEntry) -> Self {
        let keywords: BTreeSet<String> = raw.keywords.into_iter().collect();
        let files = raw
            .files
            .into_iter()
            .map(|f| FileRef {
                file_name: f.file_name,
                url: f.url,
            })
            .collect();

        SimulationDescriptor::new(
            raw.id,
            raw.title,
            raw.description,
            raw.analysis_description,
            raw.image_url,
            raw.input_script,
            keywords,
            files,
        )
    }
}

/// Descriptors and per-entry warnings from one manifest.
#[derive(Debug, Default)]
pub struct ParsedManifest {
    /// Accepted descriptors, in manifest order.
    pub descriptors: Vec<SimulationDescriptor>,
    /// Rejected entries, in manifest order.
    pub skipped: Vec<SkippedEntry>,
}

/// Parses manifest bytes.
///
/// # Errors
///
/// - [`CatalogError::Parse`] if the bytes are not JSON
/// - [`CatalogError::Schema`] if the top level is not an object with an
///   `examples` array
pub fn parse_manifest(bytes: &[u8]) -> CatalogResult<ParsedManifest> {
    let root: Value = serde_json::from_slice(bytes)?;

    let Value::Object(mut root) = root else {
        return Err(CatalogError::Schema("top level is not an object".to_string()));
    };
    let entries = match root.remove(EXAMPLES_FIELD) {
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(CatalogError::Schema(format!("`{EXAMPLES_FIELD}` is not an array")));
        }
        None => {
            return Err(CatalogError::Schema(format!("missing `{EXAMPLES_FIELD}` array")));
        }
    };

    let mut parsed = ParsedManifest::default();
    let mut seen: HashSet<String> = HashSet::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        let id = entry.get("id").and_then(Value::as_str).map(str::to_string);

        match parse_entry(entry) {
            Ok(descriptor) => {
                if seen.insert(descriptor.id.clone()) {
                    parsed.descriptors.push(descriptor);
                } else {
                    parsed.skipped.push(SkippedEntry {
                        index,
                        id,
                        reason: SkipReason::DuplicateId,
                    });
                }
            }
            Err(reason) => parsed.skipped.push(SkippedEntry { index, id, reason }),
        }
    }

    Ok(parsed)
}

fn parse_entry(entry: Value) -> Result<SimulationDescriptor, SkipReason> {
    if !entry.is_object() {
        return Err(SkipReason::NotAnObject);
    }
    serde_json::from_value::<RawEntry>(entry)
        .map(SimulationDescriptor::from)
        .map_err(|e| SkipReason::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: &str) -> Value {
        json!({
            "id": id,
            "title": format!("{id} title"),
            "description": "desc",
            "imageUrl": format!("simulations/{id}/{id}.png"),
            "inputScript": format!("{id}/{id}.in"),
            "keywords": ["water", "phase"],
            "files": [{ "fileName": "Input", "url": format!("{id}/{id}.in") }]
        })
    }

    fn manifest(entries: Vec<Value>) -> Vec<u8> {
        serde_json::to_vec(&json!({ "examples": entries })).unwrap()
    }

    #[test]
    fn test_well_formed_entries_in_order() {
        let parsed = parse_manifest(&manifest(vec![entry("vapor"), entry("lj")])).unwrap();

        let ids: Vec<_> = parsed.descriptors.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["vapor", "lj"]);
        assert!(parsed.skipped.is_empty());

        let vapor = &parsed.descriptors[0];
        assert_eq!(vapor.title, "vapor title");
        assert_eq!(vapor.analysis_description, None);
        assert!(vapor.keywords.contains("phase"));
        assert_eq!(vapor.files[0].file_name, "Input");
        assert!(!vapor.has_image());
    }

    #[test]
    fn test_file_missing_url_skips_whole_entry() {
        let mut bad = entry("broken");
        bad["files"] = json!([{ "fileName": "Input" }]);

        let parsed = parse_manifest(&manifest(vec![entry("a"), bad, entry("b")])).unwrap();

        assert_eq!(parsed.descriptors.len(), 2);
        assert_eq!(parsed.skipped.len(), 1);
        let skipped = &parsed.skipped[0];
        assert_eq!(skipped.index, 1);
        assert_eq!(skipped.id.as_deref(), Some("broken"));
        assert!(matches!(&skipped.reason, SkipReason::Malformed(msg) if msg.contains("url")));
    }

    #[test]
    fn test_wrong_types_and_non_objects_skip() {
        let mut numeric_title = entry("n");
        numeric_title["title"] = json!(42);
        let mut no_keywords = entry("k");
        no_keywords.as_object_mut().unwrap().remove("keywords");

        let parsed = parse_manifest(&manifest(vec![
            numeric_title,
            json!("just a string"),
            no_keywords,
            entry("ok"),
        ]))
        .unwrap();

        assert_eq!(parsed.descriptors.len(), 1);
        let reasons: Vec<_> = parsed.skipped.iter().map(|s| s.reason.clone()).collect();
        assert!(matches!(reasons[0], SkipReason::Malformed(_)));
        assert_eq!(reasons[1], SkipReason::NotAnObject);
        assert!(matches!(reasons[2], SkipReason::Malformed(_)));
        assert_eq!(parsed.skipped[1].id, None);
    }

    #[test]
    fn test_analysis_description_is_optional_and_lenient() {
        let mut with_text = entry("a");
        with_text["analysisDescription"] = json!("look at the RDF");
        let mut with_number = entry("b");
        with_number["analysisDescription"] = json!(3);
        let mut with_null = entry("c");
        with_null["analysisDescription"] = Value::Null;

        let parsed = parse_manifest(&manifest(vec![with_text, with_number, with_null])).unwrap();

        assert_eq!(parsed.descriptors.len(), 3);
        assert_eq!(
            parsed.descriptors[0].analysis_description.as_deref(),
            Some("look at the RDF")
        );
        assert_eq!(parsed.descriptors[1].analysis_description, None);
        assert_eq!(parsed.descriptors[2].analysis_description, None);
    }

    #[test]
    fn test_duplicate_id_first_wins() {
        let mut second = entry("vapor");
        second["title"] = json!("impostor");

        let parsed = parse_manifest(&manifest(vec![entry("vapor"), second])).unwrap();

        assert_eq!(parsed.descriptors.len(), 1);
        assert_eq!(parsed.descriptors[0].title, "vapor title");
        assert_eq!(parsed.skipped[0].reason, SkipReason::DuplicateId);
        assert_eq!(parsed.skipped[0].to_string(), "entry #1 (vapor): duplicate id");
    }

    #[test]
    fn test_top_level_errors() {
        assert!(matches!(parse_manifest(b"not json"), Err(CatalogError::Parse(_))));
        assert!(matches!(parse_manifest(b"[]"), Err(CatalogError::Schema(_))));
        assert!(matches!(
            parse_manifest(br#"{"simulations": []}"#),
            Err(CatalogError::Schema(msg)) if msg.contains("missing")
        ));
        assert!(matches!(
            parse_manifest(br#"{"examples": {}}"#),
            Err(CatalogError::Schema(msg)) if msg.contains("not an array")
        ));
    }

    #[test]
    fn test_empty_examples_is_empty_catalog() {
        let parsed = parse_manifest(br#"{"examples": []}"#).unwrap();
        assert!(parsed.descriptors.is_empty());
        assert!(parsed.skipped.is_empty());
    }
}

//! Persisted chunk record and its serde shape.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Sentinel sector used when no tenant is specified.
pub const DEFAULT_SECTOR: &str = "default";

fn default_sector() -> String {
    DEFAULT_SECTOR.to_string()
}

/// Coarse classification of what a chunk contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentTag {
    Text,
    Table,
    Code,
    List,
}

/// The atomic stored unit: one embedded excerpt of a source document.
///
/// Serialized field names are the on-disk contract; stores written by
/// earlier deployments lack the optional fields and the `sector_id`, and
/// must keep loading. A malformed optional field degrades to `None` rather
/// than poisoning the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Globally unique: source identity + upload timestamp + ordinal.
    pub id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    /// Logical origin (filename or URL); shared by sibling chunks.
    pub source: String,
    /// Origin kind tag, e.g. "pdf", "site", "youtube".
    #[serde(rename = "type")]
    pub kind: String,
    /// RFC 3339 ingestion timestamp.
    pub upload_date: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// Tenant partition key.
    #[serde(default = "default_sector")]
    pub sector_id: String,

    // Optional contextual metadata, carried through to retrieval results
    // for citation quality. Never used in ranking.
    #[serde(
        default,
        deserialize_with = "lenient_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub page: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_time: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub heading: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub content_tag: Option<ContentTag>,
}

/// Deserialize an optional field, treating malformed values as absent.
fn lenient_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(serde_json::from_value::<T>(value).ok())
}

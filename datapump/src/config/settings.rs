//! Settings read from the environment.

use std::env;
use std::path::PathBuf;

use datapump_pipeline::PipelineConfig;
use datapump_pipeline::config::{
    DEFAULT_FLUSH_EVERY, DEFAULT_MAX_BATCH_ACTIONS, DEFAULT_MAX_BATCH_BYTES,
};
use datapump_repository::IndexSettings;

use crate::DatapumpError;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default field holding the document id.
const DEFAULT_ID_FIELD: &str = "id";

/// Where documents are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

/// Everything one load needs to know.
#[derive(Debug, Clone)]
pub struct Settings {
    pub opensearch_url: String,
    pub index_name: String,
    pub document_type: Option<String>,
    pub bulk_actions: usize,
    pub bulk_size: usize,
    pub bulk_workers: usize,
    pub flush_every: usize,
    /// User index settings, applied on index creation and when the index
    /// is made permanent.
    pub index_settings: IndexSettings,
    pub input: Input,
    pub id_field: String,
    /// Promote the index to permanent settings once the load completes.
    pub make_permanent: bool,
}

impl Settings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `DATAPUMP_INDEX`: Target index (required)
    /// - `DATAPUMP_DOC_TYPE`: Mapping type for legacy clusters
    /// - `DATAPUMP_BULK_ACTIONS`: Documents per bulk request (default: 1000)
    /// - `DATAPUMP_BULK_SIZE`: Bytes per bulk request, 0 for no limit (default: 5 MiB)
    /// - `DATAPUMP_BULK_WORKERS`: Concurrent bulk workers (default: 1)
    /// - `DATAPUMP_FLUSH_EVERY`: Records between forced flushes (default: 100000)
    /// - `DATAPUMP_INDEX_SETTINGS`: JSON object of index settings
    /// - `DATAPUMP_INPUT`: Input file, `-` or unset for stdin
    /// - `DATAPUMP_ID_FIELD`: Field holding the document id (default: id)
    /// - `DATAPUMP_MAKE_PERMANENT`: Apply permanent settings afterwards (default: false)
    pub fn from_env() -> Result<Self, DatapumpError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DatapumpError> {
        let index_name = lookup("DATAPUMP_INDEX")
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| DatapumpError::config("DATAPUMP_INDEX must be set"))?;

        let index_settings = match lookup("DATAPUMP_INDEX_SETTINGS") {
            Some(raw) if !raw.trim().is_empty() => {
                let value = serde_json::from_str(&raw).map_err(|e| {
                    DatapumpError::config(format!("DATAPUMP_INDEX_SETTINGS is not valid JSON: {}", e))
                })?;
                IndexSettings::from_json(&value)?
            }
            _ => IndexSettings::default(),
        };

        let input = match lookup("DATAPUMP_INPUT") {
            Some(path) if !path.is_empty() && path != "-" => Input::File(PathBuf::from(path)),
            _ => Input::Stdin,
        };

        Ok(Self {
            opensearch_url: env_or_default(&lookup, "OPENSEARCH_URL", DEFAULT_OPENSEARCH_URL),
            index_name,
            document_type: lookup("DATAPUMP_DOC_TYPE").filter(|value| !value.is_empty()),
            bulk_actions: env_int_or_default(&lookup, "DATAPUMP_BULK_ACTIONS", DEFAULT_MAX_BATCH_ACTIONS),
            bulk_size: env_int_or_default(&lookup, "DATAPUMP_BULK_SIZE", DEFAULT_MAX_BATCH_BYTES),
            bulk_workers: env_int_or_default(&lookup, "DATAPUMP_BULK_WORKERS", 1),
            flush_every: env_int_or_default(&lookup, "DATAPUMP_FLUSH_EVERY", DEFAULT_FLUSH_EVERY),
            index_settings,
            input,
            id_field: env_or_default(&lookup, "DATAPUMP_ID_FIELD", DEFAULT_ID_FIELD),
            make_permanent: env_bool(&lookup, "DATAPUMP_MAKE_PERMANENT"),
        })
    }

    /// Pipeline configuration for this load.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let config = PipelineConfig::new(&self.index_name)
            .with_max_batch_actions(self.bulk_actions)
            .with_max_batch_bytes(self.bulk_size)
            .with_worker_count(self.bulk_workers)
            .with_flush_every(self.flush_every);

        match self.document_type {
            Some(ref document_type) => config.with_document_type(document_type),
            None => config,
        }
    }
}

fn env_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Unparseable values fall back to the default.
fn env_int_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> usize {
    lookup(key)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> bool {
    lookup(key)
        .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

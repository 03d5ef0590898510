//! Typed index settings.
//!
//! Settings are sent to the store as the `index` object of a settings
//! request. Every field is tri-state: left out of the request, set to an
//! explicit value, or explicitly removed (sent as `null`, which makes the
//! store fall back to its own default).

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::errors::StoreError;
use crate::version::StoreVersion;

/// Replica count applied when an index is made permanent.
pub const PERMANENT_REPLICA_COUNT: u32 = 5;

/// Refresh interval restored after a bulk load on stores that cannot unset keys.
pub const DEFAULT_REFRESH_INTERVAL: &str = "1s";

/// First major version that accepts `null` to unset an index setting.
///
/// Assumes Elasticsearch version numbering. OpenSearch restarted at 1.0 and
/// accepts `null` in every release, but reports versions below this bound,
/// so it receives the explicit literal defaults instead.
const NULL_UNSET_MIN_MAJOR: u32 = 5;

/// A single index setting.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting<T> {
    /// Not part of the request.
    Unset,
    /// Explicitly set to a value.
    Value(T),
    /// Explicitly removed, letting the store apply its default.
    Remove,
}

impl<T> Default for Setting<T> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<T: Clone> Setting<T> {
    /// Whether the setting is left out of requests.
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// `other` wins unless it is unset.
    fn overlay(&self, other: &Self) -> Self {
        if other.is_unset() {
            self.clone()
        } else {
            other.clone()
        }
    }

    fn to_json(&self, render: impl FnOnce(&T) -> Value) -> Option<Value> {
        match self {
            Self::Unset => None,
            Self::Value(v) => Some(render(v)),
            Self::Remove => Some(Value::Null),
        }
    }
}

/// How often the store makes new writes visible to search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshInterval {
    /// No automatic refresh, serialised as `"-1"`.
    Disabled,
    /// A store duration such as `"1s"` or `"30s"`.
    Interval(String),
}

impl RefreshInterval {
    fn as_json(&self) -> Value {
        match self {
            Self::Disabled => json!("-1"),
            Self::Interval(interval) => json!(interval),
        }
    }

    fn from_json(value: &Value) -> Result<Self, StoreError> {
        match value {
            Value::String(s) if s == "-1" => Ok(Self::Disabled),
            Value::String(s) => Ok(Self::Interval(s.clone())),
            Value::Number(n) if n.as_i64() == Some(-1) => Ok(Self::Disabled),
            Value::Number(n) => Ok(Self::Interval(n.to_string())),
            other => Err(StoreError::parse(format!(
                "refresh_interval must be a string or number, got {}",
                other
            ))),
        }
    }
}

/// How aggressively the store fsyncs its write-ahead log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslogDurability {
    /// Fsync on every request.
    Request,
    /// Fsync in the background.
    Async,
}

impl TranslogDurability {
    fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Async => "async",
        }
    }

    fn from_json(value: &Value) -> Result<Self, StoreError> {
        match value.as_str() {
            Some("request") => Ok(Self::Request),
            Some("async") => Ok(Self::Async),
            _ => Err(StoreError::parse(format!(
                "translog.durability must be \"request\" or \"async\", got {}",
                value
            ))),
        }
    }
}

/// Index-level settings with typed well-known keys and free-form custom keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexSettings {
    pub number_of_replicas: Setting<u32>,
    /// Only honoured at index creation; never resent afterwards.
    pub number_of_shards: Setting<u32>,
    pub refresh_interval: Setting<RefreshInterval>,
    pub translog_durability: Setting<TranslogDurability>,
    /// Any other user-supplied key, passed through as-is.
    pub custom: BTreeMap<String, Setting<Value>>,
}

impl IndexSettings {
    /// Settings that only touch the refresh interval.
    pub fn refresh_only(interval: RefreshInterval) -> Self {
        Self {
            refresh_interval: Setting::Value(interval),
            ..Default::default()
        }
    }

    /// Write-optimised overrides for a temporary index: no replicas, no
    /// refresh and asynchronous translog.
    pub fn temporary() -> Self {
        Self {
            number_of_replicas: Setting::Value(0),
            refresh_interval: Setting::Value(RefreshInterval::Disabled),
            translog_durability: Setting::Value(TranslogDurability::Async),
            ..Default::default()
        }
    }

    /// Parse user-supplied settings.
    ///
    /// Accepts an optional `index` wrapper, `index.`-prefixed keys, and
    /// translog durability either nested or dotted. `null` marks a key for
    /// removal.
    pub fn from_json(value: &Value) -> Result<Self, StoreError> {
        let object = value
            .as_object()
            .ok_or_else(|| StoreError::parse("index settings must be a JSON object"))?;

        let object = match object.get("index") {
            Some(Value::Object(inner)) if object.len() == 1 => inner,
            _ => object,
        };

        let mut settings = Self::default();
        for (key, value) in object {
            let key = key.strip_prefix("index.").unwrap_or(key);
            settings.insert(key, value)?;
        }
        Ok(settings)
    }

    fn insert(&mut self, key: &str, value: &Value) -> Result<(), StoreError> {
        match (key, value) {
            ("number_of_replicas", _) => {
                self.number_of_replicas = parse_setting(value, |v| parse_count(key, v))?;
            }
            ("number_of_shards", _) => {
                self.number_of_shards = parse_setting(value, |v| parse_count(key, v))?;
            }
            ("refresh_interval", _) => {
                self.refresh_interval = parse_setting(value, RefreshInterval::from_json)?;
            }
            ("translog.durability", _) => {
                self.translog_durability = parse_setting(value, TranslogDurability::from_json)?;
            }
            ("translog", Value::Object(translog)) => {
                for (sub_key, sub_value) in translog {
                    self.insert(&format!("translog.{}", sub_key), sub_value)?;
                }
            }
            _ => {
                let setting = if value.is_null() {
                    Setting::Remove
                } else {
                    Setting::Value(value.clone())
                };
                self.custom.insert(key.to_string(), setting);
            }
        }
        Ok(())
    }

    /// Overlay `other` on top of `self`; every field set in `other` wins.
    pub fn merge(&self, other: &IndexSettings) -> IndexSettings {
        let mut custom = self.custom.clone();
        for (key, setting) in &other.custom {
            if !setting.is_unset() {
                custom.insert(key.clone(), setting.clone());
            }
        }

        IndexSettings {
            number_of_replicas: self.number_of_replicas.overlay(&other.number_of_replicas),
            number_of_shards: self.number_of_shards.overlay(&other.number_of_shards),
            refresh_interval: self.refresh_interval.overlay(&other.refresh_interval),
            translog_durability: self
                .translog_durability
                .overlay(&other.translog_durability),
            custom,
        }
    }

    /// Compute the durable (permanent) variant of `base`.
    ///
    /// Stores from major version 5 onwards have the bulk-load overrides
    /// removed so their own defaults apply; older stores cannot unset keys
    /// and get the literal defaults instead. User settings are merged last
    /// and the shard count is always stripped, since it is immutable after
    /// creation.
    pub fn durable(
        base: &IndexSettings,
        user: &IndexSettings,
        version: &StoreVersion,
        replicas: u32,
    ) -> IndexSettings {
        let mut defaults = IndexSettings {
            number_of_replicas: Setting::Value(replicas),
            ..Default::default()
        };

        if version.major() >= NULL_UNSET_MIN_MAJOR {
            defaults.refresh_interval = Setting::Remove;
            defaults.translog_durability = Setting::Remove;
        } else {
            defaults.refresh_interval = Setting::Value(RefreshInterval::Interval(
                DEFAULT_REFRESH_INTERVAL.to_string(),
            ));
            defaults.translog_durability = Setting::Value(TranslogDurability::Request);
        }

        let mut settings = base.merge(&defaults).merge(user);
        settings.number_of_shards = Setting::Unset;
        settings
    }

    /// Whether nothing would be sent.
    pub fn is_empty(&self) -> bool {
        self.number_of_replicas.is_unset()
            && self.number_of_shards.is_unset()
            && self.refresh_interval.is_unset()
            && self.translog_durability.is_unset()
            && self.custom.values().all(Setting::is_unset)
    }

    /// Render the contents of the `index` settings object.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();

        if let Some(v) = self.number_of_replicas.to_json(|n| json!(n)) {
            map.insert("number_of_replicas".to_string(), v);
        }
        if let Some(v) = self.number_of_shards.to_json(|n| json!(n)) {
            map.insert("number_of_shards".to_string(), v);
        }
        if let Some(v) = self.refresh_interval.to_json(RefreshInterval::as_json) {
            map.insert("refresh_interval".to_string(), v);
        }
        if let Some(v) = self
            .translog_durability
            .to_json(|durability| json!(durability.as_str()))
        {
            map.insert("translog".to_string(), json!({ "durability": v }));
        }
        for (key, setting) in &self.custom {
            if let Some(v) = setting.to_json(Value::clone) {
                map.insert(key.clone(), v);
            }
        }

        Value::Object(map)
    }

    /// Render a settings-update request body: `{"index": {...}}`.
    pub fn to_request_body(&self) -> Value {
        json!({ "index": self.to_json() })
    }
}

fn parse_setting<T>(
    value: &Value,
    parse: impl FnOnce(&Value) -> Result<T, StoreError>,
) -> Result<Setting<T>, StoreError> {
    if value.is_null() {
        Ok(Setting::Remove)
    } else {
        parse(value).map(Setting::Value)
    }
}

fn parse_count(key: &str, value: &Value) -> Result<u32, StoreError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.parse::<u32>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        StoreError::parse(format!("{} must be a non-negative integer, got {}", key, value))
    })
}

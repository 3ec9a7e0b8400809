// Copyright © 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Rho rescale schedule: iteration number -> multiplicative factor.
//!
//! Loaded once from a JSON object such as `{"3": 0.5, "6": 2.0}`. Keys must be
//! non-negative integers, values strictly positive and finite, and no
//! iteration may appear twice (including spellings like `"3"` and `"03"`).

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RhoRescaleSchedule {
    factors: BTreeMap<u64, f64>,
}

impl RhoRescaleSchedule {
    /// Schedule with no entries; every lookup is absent.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from explicit entries, applying the same validation as loading.
    pub fn from_entries<I>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (u64, f64)>,
    {
        let mut factors = BTreeMap::new();
        for (iteration, factor) in entries {
            if !(factor.is_finite() && factor > 0.0) {
                return Err(ConfigError::BadFactor { iteration, factor });
            }
            if factors.insert(iteration, factor).is_some() {
                return Err(ConfigError::DuplicateIteration(iteration));
            }
        }
        Ok(Self { factors })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let RawEntries(entries) = serde_json::from_str(raw)?;
        let mut parsed = Vec::with_capacity(entries.len());
        for (key, factor) in entries {
            let iteration = key
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::BadIteration(key.clone()))?;
            parsed.push((iteration, factor));
        }
        Self::from_entries(parsed)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Load from an optional source; absent means an empty schedule.
    pub fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::empty()),
        }
    }

    pub fn lookup(&self, iteration: u64) -> Option<f64> {
        self.factors.get(&iteration).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// Product of every factor scheduled at or before `iteration`.
    pub fn net_factor_through(&self, iteration: u64) -> f64 {
        self.factors.range(..=iteration).map(|(_, f)| *f).product()
    }
}

// serde_json silently keeps the last of duplicate keys when deserialising into
// a map, so entries are collected in order and checked afterwards.
struct RawEntries(Vec<(String, f64)>);

impl<'de> Deserialize<'de> for RawEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RawEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping iteration numbers to rescale factors")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, f64>()? {
                    entries.push((key, value));
                }
                Ok(RawEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn lookup_hits_and_misses() {
        let s = RhoRescaleSchedule::from_json_str(r#"{"3": 0.5, "6": 2.0}"#)
            .expect("test: valid schedule");
        assert_eq!(s.len(), 2);
        assert_eq!(s.lookup(3), Some(0.5));
        assert_eq!(s.lookup(6), Some(2.0));
        assert_eq!(s.lookup(4), None);
        assert_eq!(s.lookup(0), None);
    }

    #[test]
    fn empty_schedule_never_rescales() {
        let s = RhoRescaleSchedule::empty();
        assert!(s.is_empty());
        for it in 0..100 {
            assert!(s.lookup(it).is_none());
        }
        let parsed = RhoRescaleSchedule::from_json_str("{}").expect("test: empty object");
        assert!(parsed.is_empty());
    }

    #[test]
    fn absent_source_is_empty() {
        let s = RhoRescaleSchedule::load_optional(None).expect("test: absent source");
        assert!(s.is_empty());
    }

    #[test]
    fn net_factor_accumulates() {
        let s = RhoRescaleSchedule::from_entries([(3, 0.5), (6, 2.0), (9, 4.0)])
            .expect("test: valid entries");
        assert_eq!(s.net_factor_through(2), 1.0);
        assert_eq!(s.net_factor_through(3), 0.5);
        assert_eq!(s.net_factor_through(6), 1.0);
        assert_eq!(s.net_factor_through(100), 4.0);
    }

    #[test]
    fn rejects_non_positive_factor() {
        let err = RhoRescaleSchedule::from_json_str(r#"{"2": 0.0}"#);
        assert!(matches!(err, Err(ConfigError::BadFactor { iteration: 2, .. })));
        let err = RhoRescaleSchedule::from_json_str(r#"{"2": -1.5}"#);
        assert!(matches!(err, Err(ConfigError::BadFactor { .. })));
    }

    #[test]
    fn rejects_non_integer_key() {
        let err = RhoRescaleSchedule::from_json_str(r#"{"three": 0.5}"#);
        assert!(matches!(err, Err(ConfigError::BadIteration(k)) if k == "three"));
        let err = RhoRescaleSchedule::from_json_str(r#"{"-1": 0.5}"#);
        assert!(matches!(err, Err(ConfigError::BadIteration(_))));
    }

    #[test]
    fn rejects_duplicate_iteration() {
        let err = RhoRescaleSchedule::from_json_str(r#"{"3": 0.5, "03": 2.0}"#);
        assert!(matches!(err, Err(ConfigError::DuplicateIteration(3))));
        let err = RhoRescaleSchedule::from_json_str(r#"{"3": 0.5, "3": 2.0}"#);
        assert!(matches!(err, Err(ConfigError::DuplicateIteration(3))));
    }

    #[test]
    fn rejects_non_object_and_non_numeric() {
        assert!(matches!(
            RhoRescaleSchedule::from_json_str("[0.5, 2.0]"),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            RhoRescaleSchedule::from_json_str(r#"{"3": "half"}"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut f = tempfile::NamedTempFile::new().expect("test: temp file");
        write!(f, r#"{{"1": 1.25}}"#).expect("test: write schedule");
        let s = RhoRescaleSchedule::load(f.path()).expect("test: load schedule");
        assert_eq!(s.lookup(1), Some(1.25));
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = RhoRescaleSchedule::load(Path::new("/nonexistent/rf.json"));
        assert!(matches!(err, Err(ConfigError::Io { .. })));
    }
}

//! Metric catalog: the universe of known metrics, loaded once from
//! `metrics.csv`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::core::error::{AgentError, Result};
use crate::store::ring_buffer::ScalarKind;

/// One row of `metrics.csv`, pre-parsing.
#[derive(Debug, Deserialize)]
struct MetricRow {
    name: String,
    subservice: String,
    #[serde(rename = "type")]
    kind: String,
    unit: String,
    is_list: String,
    counter: String,
}

/// Describes a metric's name, owning subservice kind, scalar type, unit,
/// list-ness and counter flag.
#[derive(Debug, Clone)]
pub struct MetricDescriptor {
    pub name: String,
    /// Owning subservice path fragment, e.g. `cpus`, `net/if`, `net`.
    pub subservice: String,
    pub kind: ScalarKind,
    pub unit: String,
    pub is_list: bool,
    pub counter: bool,
}

/// Template used to pre-allocate a node's metric ring buffers: all the
/// descriptors belonging to one subservice key.
#[derive(Debug, Clone, Default)]
pub struct RbTemplate {
    pub descriptors: Vec<MetricDescriptor>,
}

/// The metric universe, grouped by owning subservice.
#[derive(Debug, Default)]
pub struct MetricCatalog {
    by_name: HashMap<String, MetricDescriptor>,
    by_subservice: HashMap<String, RbTemplate>,
}

impl MetricCatalog {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join("metrics.csv");
        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| AgentError::Catalog(format!("cannot open {:?}: {e}", path)))?;

        let mut catalog = MetricCatalog::default();
        for result in reader.deserialize::<MetricRow>() {
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    warn!("skipping malformed metrics.csv row: {e}");
                    continue;
                }
            };
            let Some(kind) = parse_kind(&row.kind) else {
                warn!("skipping metric '{}': unknown type '{}'", row.name, row.kind);
                continue;
            };
            let descriptor = MetricDescriptor {
                name: row.name.clone(),
                subservice: row.subservice.clone(),
                kind,
                unit: row.unit,
                is_list: parse_bool(&row.is_list),
                counter: parse_bool(&row.counter),
            };
            catalog
                .by_subservice
                .entry(row.subservice)
                .or_default()
                .descriptors
                .push(descriptor.clone());
            catalog.by_name.insert(row.name, descriptor);
        }
        Ok(catalog)
    }

    pub fn get(&self, name: &str) -> Option<&MetricDescriptor> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// Template of metric descriptors for the given subservice key (e.g.
    /// `cpus/cpu`, `net`, `mem`), used to pre-allocate a newly observed
    /// node's metric ring buffers.
    pub fn template_for(&self, subservice: &str) -> Option<&RbTemplate> {
        self.by_subservice.get(subservice)
    }
}

fn parse_kind(s: &str) -> Option<ScalarKind> {
    match s {
        "int" => Some(ScalarKind::Int),
        "float" => Some(ScalarKind::Float),
        "str" | "string" => Some(ScalarKind::String),
        _ => None,
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(s.trim(), "1" | "true" | "True" | "TRUE")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_catalog(dir: &std::path::Path, contents: &str) {
        let mut f = std::fs::File::create(dir.join("metrics.csv")).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn loads_and_groups_by_subservice() {
        let dir = tempdir();
        write_catalog(
            &dir,
            "name,subservice,type,unit,is_list,counter\n\
             idle_time,cpus/cpu,float,percent,1,0\n\
             rx_drop,net/if,int,packets,1,1\n",
        );
        let catalog = MetricCatalog::load(&dir).unwrap();
        assert!(catalog.contains("idle_time"));
        assert!(catalog.get("rx_drop").unwrap().counter);
        assert_eq!(catalog.template_for("cpus/cpu").unwrap().descriptors.len(), 1);
    }

    #[test]
    fn skips_rows_with_unknown_type() {
        let dir = tempdir();
        write_catalog(
            &dir,
            "name,subservice,type,unit,is_list,counter\n\
             bogus,cpus/cpu,wat,percent,1,0\n",
        );
        let catalog = MetricCatalog::load(&dir).unwrap();
        assert!(!catalog.contains("bogus"));
    }

    fn tempdir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("healthcat-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}

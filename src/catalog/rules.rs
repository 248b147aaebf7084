//! Rule catalog: the set of compiled symptom rules, loaded once from
//! `rules.csv`, after the metric catalog so identifiers can be validated.

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::catalog::metrics::MetricCatalog;
use crate::core::error::{AgentError, Result};
use crate::rules::compiler::{compile, CompiledRule};
use crate::store::ring_buffer::Severity;

/// One row of `rules.csv`, pre-compilation.
#[derive(Debug, Deserialize)]
struct RuleRow {
    name: String,
    path: String,
    severity: String,
    rule: String,
}

/// A rule as declared: its owning subservice path, severity and compiled
/// expression.
#[derive(Debug, Clone)]
pub struct RuleDescriptor {
    pub name: String,
    /// Subservice path fragment this rule is evaluated against, e.g.
    /// `cpus/cpu`.
    pub path: String,
    pub severity: Severity,
    pub compiled: CompiledRule,
}

/// The full set of declared rules, grouped by owning subservice path.
#[derive(Debug, Default)]
pub struct RuleCatalog {
    by_path: std::collections::HashMap<String, Vec<RuleDescriptor>>,
}

impl RuleCatalog {
    pub fn load(dir: impl AsRef<Path>, metrics: &MetricCatalog) -> Result<Self> {
        let path = dir.as_ref().join("rules.csv");
        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| AgentError::Catalog(format!("cannot open {:?}: {e}", path)))?;

        let mut catalog = RuleCatalog::default();
        for result in reader.deserialize::<RuleRow>() {
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    warn!("skipping malformed rules.csv row: {e}");
                    continue;
                }
            };
            let Some(severity) = parse_severity(&row.severity) else {
                warn!("skipping rule '{}': unknown severity '{}'", row.name, row.severity);
                continue;
            };
            let compiled = match compile(&row.rule, metrics) {
                Ok(c) => c,
                Err(e) => {
                    warn!("skipping rule '{}': {e}", row.name);
                    continue;
                }
            };
            catalog
                .by_path
                .entry(row.path.clone())
                .or_default()
                .push(RuleDescriptor {
                    name: row.name,
                    path: row.path,
                    severity,
                    compiled,
                });
        }
        Ok(catalog)
    }

    pub fn for_path(&self, path: &str) -> &[RuleDescriptor] {
        self.by_path.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_path.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn parse_severity(s: &str) -> Option<Severity> {
    Severity::from_str_case_insensitive(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &std::path::Path, name: &str, contents: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn loads_compiles_and_groups_by_path() {
        let dir = std::env::temp_dir().join(format!("healthcat-rules-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        write_file(
            &dir,
            "metrics.csv",
            "name,subservice,type,unit,is_list,counter\n\
             idle_time,cpus/cpu,float,percent,1,0\n",
        );
        write_file(
            &dir,
            "rules.csv",
            "name,path,severity,rule\n\
             cpu_high,cpus/cpu,red,idle_time < 10\n",
        );
        let metrics = MetricCatalog::load(&dir).unwrap();
        let rules = RuleCatalog::load(&dir, &metrics).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.for_path("cpus/cpu").len(), 1);
    }

    #[test]
    fn skips_rule_referencing_unknown_metric() {
        let dir = std::env::temp_dir().join(format!("healthcat-rules2-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        write_file(
            &dir,
            "metrics.csv",
            "name,subservice,type,unit,is_list,counter\n\
             idle_time,cpus/cpu,float,percent,1,0\n",
        );
        write_file(
            &dir,
            "rules.csv",
            "name,path,severity,rule\n\
             bogus,cpus/cpu,red,nonexistent_metric < 10\n",
        );
        let metrics = MetricCatalog::load(&dir).unwrap();
        let rules = RuleCatalog::load(&dir, &metrics).unwrap();
        assert!(rules.is_empty());
    }
}

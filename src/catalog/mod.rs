//! Metric and rule catalogs: the declarative schema loaded once at
//! startup from CSV files under the resources directory.

pub mod metrics;
pub mod rules;

pub use metrics::{MetricCatalog, MetricDescriptor, RbTemplate};
pub use rules::{RuleCatalog, RuleDescriptor};

//! Compiles rule source text into a validated [`CompiledRule`]: parses,
//! then walks the AST confirming every identifier resolves to a catalog
//! metric name. There is no separate "safety allow-list" pass beyond
//! this — unlike a host-language AST walk over an open-ended node set,
//! our [`crate::rules::ast::Expr`] only contains constructs the grammar
//! permits by construction, so "parses successfully" already is the
//! allow-list check; only identifier validity remains to verify.

use crate::catalog::metrics::MetricCatalog;
use crate::core::error::{AgentError, Result};
use crate::rules::ast::Expr;
use crate::rules::parser::parse_rule;

#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub source: String,
    pub expr: Expr,
    pub identifiers: Vec<String>,
}

pub fn compile(source: &str, metrics: &MetricCatalog) -> Result<CompiledRule> {
    let expr = parse_rule(source).map_err(|reason| AgentError::RuleCompile {
        rule: source.to_string(),
        reason,
    })?;

    let mut identifiers = Vec::new();
    collect_identifiers(&expr, &mut identifiers);
    for ident in &identifiers {
        if !metrics.contains(ident) {
            return Err(AgentError::RuleCompile {
                rule: source.to_string(),
                reason: format!("unknown identifier '{ident}'"),
            });
        }
    }

    Ok(CompiledRule {
        source: source.to_string(),
        expr,
        identifiers,
    })
}

fn collect_identifiers(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Literal(_) => {}
        Expr::Ident(name) => out.push(name.clone()),
        Expr::WindowMod(_, inner) | Expr::Not(inner) => collect_identifiers(inner, out),
        Expr::Compare(lhs, _, rhs) | Expr::BoolOp(lhs, _, rhs) | Expr::Arith(lhs, _, rhs) => {
            collect_identifiers(lhs, out);
            collect_identifiers(rhs, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn catalog_with(rows: &str) -> MetricCatalog {
        let dir = std::env::temp_dir().join(format!("healthcompiler-{}-{}", std::process::id(), rows.len()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut f = std::fs::File::create(dir.join("metrics.csv")).unwrap();
        f.write_all(rows.as_bytes()).unwrap();
        MetricCatalog::load(&dir).unwrap()
    }

    #[test]
    fn compiles_known_identifier() {
        let metrics = catalog_with("name,subservice,type,unit,is_list,counter\nidle_time,cpus/cpu,float,percent,1,0\n");
        let compiled = compile("idle_time < 10", &metrics).unwrap();
        assert_eq!(compiled.identifiers, vec!["idle_time".to_string()]);
    }

    #[test]
    fn rejects_unknown_identifier() {
        let metrics = catalog_with("name,subservice,type,unit,is_list,counter\nidle_time,cpus/cpu,float,percent,1,0\n");
        assert!(compile("bogus < 10", &metrics).is_err());
    }
}

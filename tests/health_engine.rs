//! End-to-end coverage of the tick pipeline against the scenarios in the
//! engine's testable-properties list: graph reconciliation, metric
//! normalization and bottom-up symptom evaluation wired together the way
//! the daemon runs them every tick.

use subservice_agent::catalog::{MetricCatalog, RuleCatalog};
use subservice_agent::engine::{Aggregator, HostOs, MetricUpdater, SymptomEvaluator};
use subservice_agent::graph::{DependencyGraph, GraphUpdater};
use subservice_agent::store::{MetricStore, RingBuffer, ScalarKind};

fn load_shipped_catalogs() -> (MetricCatalog, RuleCatalog) {
    let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/resources");
    let metrics = MetricCatalog::load(dir).unwrap();
    let rules = RuleCatalog::load(dir, &metrics).unwrap();
    (metrics, rules)
}

#[test]
fn cpu_saturation_scenario_produces_positive_symptom_and_propagates() {
    let (metrics, rules) = load_shipped_catalogs();
    let store = MetricStore::new();
    let mut graph = DependencyGraph::new("h");
    let graph_updater = GraphUpdater::new(false);
    let metric_updater = MetricUpdater::new(HostOs::Linux);
    let evaluator = SymptomEvaluator::new(Aggregator::Malus, 20);

    // cpu0: steadily idle at 5% (saturated); cpu1: healthy, stays at 95%.
    for tick in 0..21u64 {
        store.append(
            &["stat/cpu", "cpu0", "total"],
            || RingBuffer::new("total", ScalarKind::Int).with_counter(true),
            (tick * 100) as i64,
        );
        store.append(
            &["stat/cpu", "cpu0", "idle"],
            || RingBuffer::new("idle", ScalarKind::Int).with_counter(true),
            (tick * 5) as i64,
        );
        store.append(
            &["stat/cpu", "cpu1", "total"],
            || RingBuffer::new("total", ScalarKind::Int).with_counter(true),
            (tick * 100) as i64,
        );
        store.append(
            &["stat/cpu", "cpu1", "idle"],
            || RingBuffer::new("idle", ScalarKind::Int).with_counter(true),
            (tick * 95) as i64,
        );

        graph_updater.tick(&mut graph, &store, &metrics, tick);
        metric_updater.tick(&graph, &store);
        evaluator.tick(&mut graph, &store, &metrics, &rules);
    }

    let cpu0 = graph.get_node("/node[name=h]/bm/cpus/cpu[name=cpu0]").unwrap();
    assert_eq!(cpu0.health_score, 50);

    let cpus = graph.get_node("/node[name=h]/bm/cpus").unwrap();
    assert_eq!(cpus.health_score, 50);
}

#[test]
fn soft_removal_keeps_vm_queryable_with_last_known_score() {
    let (metrics, rules) = load_shipped_catalogs();
    let store = MetricStore::new();
    let mut graph = DependencyGraph::new("h");
    let graph_updater = GraphUpdater::new(false);
    let evaluator = SymptomEvaluator::new(Aggregator::QuadraticMean, 20);

    store.append(&["virtualbox/vms", "vm1", "state"], || RingBuffer::new("state", ScalarKind::String), "running");
    graph_updater.tick(&mut graph, &store, &metrics, 1);
    evaluator.tick(&mut graph, &store, &metrics, &rules);
    assert!(graph.get_node("/node[name=h]/vm[name=vm1]").unwrap().active);

    store.remove_entry(&["virtualbox/vms"], "vm1");
    graph_updater.tick(&mut graph, &store, &metrics, 2);
    evaluator.tick(&mut graph, &store, &metrics, &rules);

    let vm = graph.get_node("/node[name=h]/vm[name=vm1]").unwrap();
    assert!(!vm.active);
    assert_eq!(vm.health_score, 100);
}

#[test]
fn quadratic_mean_propagation_matches_worked_example() {
    assert_eq!(Aggregator::QuadraticMean.aggregate(&[100, 100, 50]), 87);
}

#[test]
fn rule_referencing_unknown_metric_is_absent_from_live_set() {
    let dir = std::env::temp_dir().join(format!("healthpipeline-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("metrics.csv"), "name,subservice,type,unit,is_list,counter\nidle_time,cpus/cpu,float,percent,0,0\n").unwrap();
    std::fs::write(dir.join("rules.csv"), "name,path,severity,rule\nbad,cpus/cpu,red,nonexistent < 1\n").unwrap();

    let metrics = MetricCatalog::load(&dir).unwrap();
    let rules = RuleCatalog::load(&dir, &metrics).unwrap();
    assert!(rules.is_empty());
}

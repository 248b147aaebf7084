//! Node-local service-assurance health engine.
//!
//! Ingests low-level health signals about a host, its virtual machines
//! and kernel-bypass data-plane instances, assembles them into a
//! hierarchical subservice dependency graph, evaluates declarative
//! symptom rules against time-windowed metric history, and produces
//! per-subservice health scores and positive symptoms every tick.
//!
//! Raw collection (procfs, hypervisor APIs, VPP telemetry) and the
//! outward-facing transports (gNMI server, shared-memory mirror) are
//! external collaborators against the [`collectors::Collector`]
//! interface and the [`export`] surface; this crate is the engine that
//! sits between them.

pub mod catalog;
pub mod collectors;
pub mod core;
pub mod engine;
pub mod export;
pub mod graph;
pub mod rules;
pub mod store;

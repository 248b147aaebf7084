//! Ring buffers and the nested metric store they live in.

pub mod metric_store;
pub mod ring_buffer;

pub use metric_store::MetricStore;
pub use ring_buffer::{RingBuffer, Scalar, ScalarKind, Severity};

//! Interface definitions for the search store.
//!
//! This module defines the abstract `MetricIndexProvider` trait that allows
//! for dependency injection and swappable search backend implementations.

mod metric_index_provider;

pub use metric_index_provider::MetricIndexProvider;

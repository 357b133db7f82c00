// Library for tests to access modules

pub mod aggregation_cycle;
pub mod aggregator;
pub mod bucketizer;
pub mod classifier;
pub mod comparator;
pub mod config;
pub mod correlation;
pub mod error;
pub mod export;
pub mod ingest;
pub mod metrics_cache;
pub mod models;
pub mod phase;
pub mod routes;
pub mod sample_store;
pub mod version;

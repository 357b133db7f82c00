// Domain models: raw samples, buckets and everything derived from them

mod bucket;
mod correlation;
mod metrics;
mod sample;
mod summary;

pub use bucket::{Bucket, BucketRef, Observation};
pub use correlation::{CorrelatedInterval, Correlation, CorrelationClass, CorrelationCounts};
pub use metrics::{BadMomentFlag, BadReason, BucketMetrics, ScoredBucket};
pub use sample::{Sample, Source, TimeRange};
pub use summary::{PhaseRanking, PhaseSummary};

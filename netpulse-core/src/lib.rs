//! Netpulse Core Library
//!
//! Client-side latency probing for serverless benchmarking: a UDP exchange
//! loop against an echo peer with two-phase receive timeouts, minimum-RTT
//! convergence detection, and CSV export of the per-attempt time series.

pub mod config;
pub mod echo;
pub mod error;
pub mod phase;
pub mod probe;
pub mod recorder;
pub mod sample;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::{ProbeRequest, ProbeSettings, SettingsLoader};
pub use echo::EchoResponder;
pub use error::{ConfigError, ProbeError, ProbeResult, StorageError, ValidationError};
pub use phase::{ProbePhase, TimeoutSchedule};
pub use probe::{ProbeOutcome, ProbeState, Prober, RttVerdict};
pub use recorder::{SampleRecorder, PLACEHOLDER_KEY};
pub use sample::{ProbeSample, RttSummary};
pub use storage::{BlobStore, DirBlobStore, MemoryBlobStore};
pub use types::{Port, RequestId};

//! Parsing for `condor_q -pr usage.cpf` reports and the boost factor log.
//!
//! ```text
//! status text ──► status::parse_status ──► enrich::enrich ──► JobTable
//!                                             │
//!                                             └─► resource::ResourceQuantity (per column)
//! boost log ────► factors::aggregate_factors ──► FactorTable
//! ```
pub mod enrich;
pub mod factors;
pub mod resource;
pub mod status;

pub mod misc {
    pub mod parsing;
}

pub use enrich::{process_status, EnrichedJobRecord, JobStatus, JobTable, JobType};
pub use factors::{aggregate_factors, parse_factor_log, FactorTable, JobFactor};
pub use resource::{ResourceColumn, ResourceQuantity};
pub use status::{parse_status, RawJobRecord};

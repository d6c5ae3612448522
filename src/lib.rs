pub mod cli;
pub mod config;
pub mod engine;
pub mod extract;
pub mod grouping;
pub mod ingest;
pub mod job_plan;
pub mod page;
pub mod pipeline;
pub mod probe;
pub mod report;
pub mod util;

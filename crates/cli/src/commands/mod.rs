pub mod ingest;
pub mod onboard;
pub mod run;
pub mod runtime;
pub mod status;

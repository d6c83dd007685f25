pub mod config;
pub mod error;
pub mod store;
pub mod core {
    pub mod check;
    pub mod summary;
}
pub mod api {
    pub mod client;
    pub mod types;
}
pub mod orchestrator;
pub mod report;

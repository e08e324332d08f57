pub mod catalog;
pub mod challenges;
pub mod config;
pub mod engine;
pub mod error;
pub mod faults;
pub mod feedback;
pub mod graph;
pub mod metrics;
pub mod models;
pub mod output;
pub mod scoring;
pub mod state;

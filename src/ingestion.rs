//! Asynchronous match ingestion pipeline (spec.md §4.6-4.7/C6-C7).

pub mod api;
pub mod broker;
pub mod result_store;
pub mod worker;

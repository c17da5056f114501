//! `HistoryReader` adapters standing in for the storefront's relational store.

pub mod in_memory;
pub mod json_file;

pub use in_memory::InMemoryHistory;
pub use json_file::JsonFileHistory;

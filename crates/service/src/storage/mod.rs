//! Storage abstractions for service layer
//!
//! Contains the file-backed JSON document used by the record stores.

pub mod json_document;

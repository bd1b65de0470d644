//! Bookvault: a small catalog service for books with an optional PDF
//! attachment per record. Attachment bytes are persisted through a
//! pluggable storage strategy (inline database column or managed
//! filesystem directory) selected at startup.

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod storage;

//! onecourse - sell and deliver a single online course
//!
//! This library provides the core functionality for the onecourse backend:
//! the SQLite-backed student ledger, Stripe checkout and webhook
//! reconciliation, lesson and video management, and the API handlers.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod payments;
pub mod video;

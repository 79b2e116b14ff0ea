//! Core use-case services.
//!
//! # Responsibility
//! - Wrap registry operations with save scheduling and UI error reporting.
//! - Derive read-only dashboard views from registry state.

pub mod dashboard;
pub mod kanban_service;

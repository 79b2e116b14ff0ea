//! Storage layer behind the registry snapshots.
//!
//! # Responsibility
//! - Define the key/value contract the persistence layer writes through.
//! - Isolate SQLite query details and quota accounting from callers.
//!
//! # Invariants
//! - A write that would exceed the configured quota fails with
//!   `QuotaExceeded` and leaves the stored value untouched.

pub mod kv_repo;

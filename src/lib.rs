//! orgsync - org-mode task synchronization library
//!
//! This library reconciles two views of the same to-do tree: an
//! org-mode text file and a remote task-list service. The merge engine
//! is deterministic and idempotent; provenance of conflicting edits is
//! embedded in the org text as annotation lines, so merges can be
//! re-run without data loss and without shared global ids.
//!
//! # Core Concepts
//!
//! - **Task tree**: ordered n-ary tree behind a synthetic root
//! - **Codec**: lossless org text parsing and serialization
//! - **Fingerprint**: flattening nodes into comparable units
//! - **Matcher**: exact then similarity-based correspondence
//! - **Patcher**: applying remote edits and grafting new tasks
//! - **Strategy**: one pluggable seam per conflict decision
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.orgsync.toml`
//! - `conflict`: Merge decision seams and strategies
//! - `error`: Error types and result aliases
//! - `fingerprint`: Flattening and unit similarity
//! - `lock`: File locking and atomic writes
//! - `matcher`: Two-pass unit matching
//! - `merge`: Patching and grafting
//! - `org`: Org text codec
//! - `output`: Shared CLI output formatting
//! - `remote`: Task-service contract and conversions
//! - `storage`: JSON-file-backed task service
//! - `timestamp`: Planning timestamps and weekday display
//! - `tree`: Task tree data model

pub mod cli;
pub mod config;
pub mod conflict;
pub mod error;
pub mod fingerprint;
pub mod lock;
pub mod matcher;
pub mod merge;
pub mod org;
pub mod output;
pub mod remote;
pub mod storage;
pub mod timestamp;
pub mod tree;

pub use error::{Error, Result};

// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Error types shared across the engine.
//!
//! Everything fallible returns [`EngineError`]. Query-time misses on single
//! terms are not errors (the engine recovers with empty postings); these
//! variants cover the genuinely fatal cases: artifacts that are missing,
//! artifacts that exist but cannot be decoded, and broken invariants.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A dataset root, index artifact, or stopword list is missing.
    #[error("not found: {0}")]
    NotFound(PathBuf),

    /// An artifact exists but cannot be decoded.
    #[error("malformed {what}: {detail}")]
    Malformed { what: String, detail: String },

    /// An on-disk or in-memory invariant does not hold.
    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("config: {0}")]
    Config(#[from] config::ConfigError),
}

impl EngineError {
    /// Shorthand for the [`EngineError::Malformed`] variant.
    pub fn malformed(what: impl Into<String>, detail: impl ToString) -> Self {
        EngineError::Malformed {
            what: what.into(),
            detail: detail.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Engine configuration, loaded from an INI file.
//!
//! The five relevance sub-weights are normalized to sum to 1 at load time,
//! so downstream scoring can combine them without re-checking. `alpha`
//! scales the combined relevance aggregate and is left untouched.

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct Config {
    // [WEIGHTS] — normalized to sum to 1.
    pub header_weight: f64,
    pub bold_weight: f64,
    pub title_weight: f64,
    pub cosine_weight: f64,
    pub conjunctive_weight: f64,
    /// Scale applied to the combined relevance score (not normalized).
    pub alpha: f64,

    // [GENERAL]
    /// SimHash similarity above which a page counts as a near-duplicate.
    pub sim_thresh: f64,
    /// How many results a query returns.
    pub k_results: usize,
    /// Per-term postings cap at query time; non-positive means unlimited.
    pub r_docs: i64,
    /// PageRank iteration cap; non-positive means one pass per node.
    pub pagerank_max_iters: i32,
    pub damping_factor: f64,
    /// Default index folder.
    pub index_folder: String,
}

impl Config {
    /// Load and normalize configuration from an INI file.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Ini))
            .build()?;

        let mut loaded = Config {
            header_weight: settings.get_float("WEIGHTS.HEADER")?,
            bold_weight: settings.get_float("WEIGHTS.BOLD")?,
            title_weight: settings.get_float("WEIGHTS.TITLE")?,
            cosine_weight: settings.get_float("WEIGHTS.COSINE_SIMILARITY")?,
            conjunctive_weight: settings.get_float("WEIGHTS.CONJUNCTIVE")?,
            alpha: settings.get_float("WEIGHTS.ALPHA")?,
            sim_thresh: settings.get_float("GENERAL.SIM_THRESH")?,
            k_results: settings.get_int("GENERAL.KRESULTS")? as usize,
            r_docs: settings.get_int("GENERAL.RDOCS")?,
            pagerank_max_iters: settings.get_int("GENERAL.PAGERANK_MAX_ITERS")? as i32,
            damping_factor: settings.get_float("GENERAL.DAMPING_FACTOR")?,
            index_folder: settings.get_string("GENERAL.INDEX")?,
        };
        loaded.normalize_weights();
        Ok(loaded)
    }

    fn normalize_weights(&mut self) {
        let sum = self.header_weight
            + self.bold_weight
            + self.title_weight
            + self.cosine_weight
            + self.conjunctive_weight;
        if sum > 0.0 {
            self.header_weight /= sum;
            self.bold_weight /= sum;
            self.title_weight /= sum;
            self.cosine_weight /= sum;
            self.conjunctive_weight /= sum;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Config {
            header_weight: 0.15,
            bold_weight: 0.05,
            title_weight: 0.25,
            cosine_weight: 0.45,
            conjunctive_weight: 0.10,
            alpha: 1.0,
            sim_thresh: 0.95,
            k_results: 10,
            r_docs: 0,
            pagerank_max_iters: 50,
            damping_factor: 0.85,
            index_folder: "index".to_string(),
        };
        config.normalize_weights();
        config
    }
}

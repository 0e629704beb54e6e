// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! CLI definitions for the trawler command-line interface.
//!
//! Three subcommands: `index` builds an index from a crawled dataset,
//! `search` runs an interactive query loop against an existing index, and
//! `refactor` re-partitions an index onto new breakpoints without
//! re-crawling anything.

pub mod display;

use clap::{Parser, Subcommand, ValueEnum};

use trawler::cache::CacheStrategy;

#[derive(Parser)]
#[command(
    name = "trawler",
    about = "Web-corpus indexer and ranked search engine",
    version
)]
pub struct Cli {
    /// Path to the INI configuration file
    #[arg(long, default_value = "config.ini")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build an index from a crawled dataset
    Index {
        /// Which dataset to index: "test" or "large"
        #[arg(short, long, default_value = "test")]
        dataset: String,

        /// Documents held in memory between offloads
        #[arg(short, long, default_value = "1000")]
        chunk_size: usize,

        /// Spill partial indexes to disk as chunks fill
        #[arg(short, long)]
        offload: bool,

        /// Stop after indexing this many documents
        #[arg(short, long)]
        max_docs: Option<usize>,

        /// Partition breakpoints ("none" for a single partition)
        #[arg(short, long, num_args = 1.., default_values_t = default_breakpoints())]
        breakpoints: Vec<String>,
    },

    /// Query an index interactively
    Search {
        /// Index folder to search (defaults to the configured folder)
        #[arg(short, long)]
        index: Option<String>,

        /// Number of postings-cache slots
        #[arg(long, default_value = "25")]
        cache_size: usize,

        /// Cache replacement strategy
        #[arg(long, value_enum, default_value_t = StrategyArg::Timely)]
        strategy: StrategyArg,
    },

    /// Re-partition an existing index onto new breakpoints
    Refactor {
        /// Index folder to refactor
        #[arg(short, long)]
        index: String,

        /// New breakpoints, or a preset: "long", "mid", "short", "none"
        #[arg(short, long, num_args = 1..)]
        breakpoints: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    /// Circular replacement in insertion order
    Timely,
    /// Replace the least-hit entry
    Popularity,
}

impl From<StrategyArg> for CacheStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Timely => CacheStrategy::Timely,
            StrategyArg::Popularity => CacheStrategy::Popularity,
        }
    }
}

fn default_breakpoints() -> Vec<String> {
    vec!["a".to_string(), "i".to_string(), "r".to_string()]
}

/// Expand the named breakpoint presets; anything else passes through.
pub fn expand_breakpoints(args: &[String]) -> Vec<String> {
    if args.len() == 1 {
        match args[0].to_lowercase().as_str() {
            "none" => return Vec::new(),
            "short" => return "048cgkosw".chars().map(String::from).collect(),
            "mid" => {
                return "0123456789abcdefghijklmnopqrstuvwxyz"
                    .chars()
                    .map(String::from)
                    .collect()
            }
            "long" => {
                let mut breakpoints: Vec<String> = "0123456789abcdefghijklmnopqrstuvwxyz"
                    .chars()
                    .map(String::from)
                    .collect();
                breakpoints.extend(('a'..='z').map(|letter| format!("{}m", letter)));
                breakpoints.sort();
                return breakpoints;
            }
            _ => {}
        }
    }
    args.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_expand() {
        assert!(expand_breakpoints(&["none".into()]).is_empty());
        assert_eq!(expand_breakpoints(&["short".into()]).len(), 9);
        assert_eq!(expand_breakpoints(&["mid".into()]).len(), 36);
        assert_eq!(expand_breakpoints(&["long".into()]).len(), 62);
    }

    #[test]
    fn long_preset_is_sorted() {
        let breakpoints = expand_breakpoints(&["long".into()]);
        assert!(breakpoints.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn explicit_breakpoints_pass_through() {
        let args = vec!["a".to_string(), "i".to_string()];
        assert_eq!(expand_breakpoints(&args), args);
    }
}

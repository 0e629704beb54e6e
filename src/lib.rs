// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Text search over a pre-crawled web corpus.
//!
//! The engine is built once and queried many times. Building streams the
//! corpus through an external-memory pipeline; querying touches only the
//! postings lists a query needs.
//!
//! # Architecture
//!
//! ```text
//! build:  dataset/*.json ──▶ Indexer ──▶ Matrix ──▶ partial files
//!                               │                       │
//!                               ▼                       ▼
//!                           LinkGraph ──▶ PageRank ──▶ finalize ──▶ index/
//!
//! query:  query text ──▶ tokenize + stem ──▶ meta index lookup
//!                          ──▶ seek postings ──▶ score ──▶ top-k results
//! ```
//!
//! | Module     | Responsibility                                          |
//! |------------|---------------------------------------------------------|
//! | `text`     | Tokenization, frequencies, SimHash fingerprints         |
//! | `posting`  | The (term, document) occurrence record                  |
//! | `matrix`   | Partitioned inverted index: spill, merge, finalize      |
//! | `parser`   | HTML extraction and stemming                            |
//! | `indexer`  | Dataset walk, dedup, link-graph recording               |
//! | `pagerank` | Fixed-iteration authority computation                   |
//! | `cache`    | Query-side postings cache                               |
//! | `query`    | Random-access retrieval and composite scoring           |
//! | `refactor` | On-disk re-partitioning                                 |
//! | `config`   | INI configuration with normalized scoring weights       |

pub mod cache;
pub mod config;
pub mod error;
pub mod indexer;
pub mod matrix;
pub mod pagerank;
pub mod parser;
pub mod posting;
pub mod query;
pub mod refactor;
pub mod text;

pub use cache::{CacheStrategy, PostingsCache};
pub use config::Config;
pub use error::{EngineError, Result};
pub use indexer::{doc_id_for, Indexer, LinkGraph, Site};
pub use matrix::{IndexMeta, Matrix, PostingsList, Removed};
pub use pagerank::PageRanker;
pub use parser::{EnglishStemmer, PageParser, ParsedPage, Stemmer};
pub use posting::Posting;
pub use query::{QueryEngine, SearchResult};
pub use refactor::refactor;
pub use text::{simhash, simhash_similarity, tokenize, word_frequencies};

// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The ranked query engine.
//!
//! Opens a finalized index read-only and answers free-text queries without
//! ever loading a partition file wholesale: the meta index maps each term to
//! a byte offset, so one seek plus one line read fetches a postings list.
//! Lists come back pre-sorted by `(pagerank, tf_norm)` from the finalizer,
//! which is what makes the `r_docs` prefix cap safe.
//!
//! Scoring is a weighted combination of cosine similarity over log-damped
//! term frequencies, per-field hit counts (heading / title / bold), and a
//! conjunctive bonus for documents containing every query term, scaled by
//! `alpha` and topped with a flat authority term.
//!
//! Queries that stem entirely to stopwords, or return fewer than `k_results`
//! candidates, are retried once with stopwords kept.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::cache::{CacheStrategy, PostingsCache};
use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::matrix::{read_line_at, IndexMeta};
use crate::parser::{EnglishStemmer, Stemmer};
use crate::posting::Posting;
use crate::text::{tokenize, word_frequencies};

/// Flat additive authority term. PageRank already ordered every postings
/// list at finalize time, so query-time authority stays constant.
const AUTHORITY_SCORE: f64 = 1.0;

/// Default location of the stopword list, one word per line.
pub const STOPWORDS_PATH: &str = "data/stopwords.txt";

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub summary: String,
    pub score: f64,
}

#[derive(Debug, Clone)]
struct DocumentEntry {
    url: String,
    vector_length: f64,
    title: String,
    summary: String,
}

#[derive(Default)]
struct Candidate {
    cosine: f64,
    header: f64,
    title: f64,
    bold: f64,
    conjunctive: f64,
}

pub struct QueryEngine {
    meta: IndexMeta,
    meta_index: HashMap<String, (u64, usize)>,
    documents: HashMap<i64, DocumentEntry>,
    partitions: Vec<BufReader<File>>,
    cache: PostingsCache,
    stemmer: Box<dyn Stemmer>,
    stopwords: HashSet<String>,
    config: Config,
}

impl QueryEngine {
    /// Open every index artifact. Missing files are fatal here, never later:
    /// once `open` returns, per-term misses are the only lookup failure mode
    /// and they recover silently. Partition handles close on drop.
    pub fn open(
        index_folder: impl AsRef<Path>,
        config: Config,
        cache_size: usize,
        strategy: CacheStrategy,
        stopwords_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let folder = index_folder.as_ref();
        let meta = IndexMeta::load(folder)?;
        let meta_index = load_meta_index(folder)?;
        let documents = load_documents(folder)?;

        let mut partitions = Vec::with_capacity(meta.partition_count());
        for partition in 0..meta.partition_count() {
            let path = folder.join(format!("{}{}.csv", meta.filename, partition));
            let file = File::open(&path).map_err(|_| EngineError::NotFound(path.clone()))?;
            partitions.push(BufReader::new(file));
        }

        let stemmer: Box<dyn Stemmer> = Box::new(EnglishStemmer::new());
        let stopwords = load_stopwords(stopwords_path.as_ref(), stemmer.as_ref())?;

        Ok(QueryEngine {
            meta,
            meta_index,
            documents,
            partitions,
            cache: PostingsCache::new(cache_size, strategy),
            stemmer,
            stopwords,
            config,
        })
    }

    pub fn document_count(&self) -> usize {
        self.meta.document_count
    }

    /// Answer a query: the top `k_results` documents by composite score,
    /// plus the total number of scoring candidates.
    pub fn search(&mut self, query: &str) -> Result<(Vec<SearchResult>, usize)> {
        let (results, total, filtered_stopword) = self.search_pass(query, false)?;
        if filtered_stopword && total < self.config.k_results {
            let (results, total, _) = self.search_pass(query, true)?;
            return Ok((results, total));
        }
        Ok((results, total))
    }

    fn search_pass(
        &mut self,
        query: &str,
        use_stop_words: bool,
    ) -> Result<(Vec<SearchResult>, usize, bool)> {
        let stemmed: Vec<String> = tokenize(query)
            .iter()
            .map(|token| self.stemmer.stem(token))
            .collect();

        let mut filtered_stopword = false;
        let terms: Vec<String> = if use_stop_words {
            stemmed
        } else {
            stemmed
                .into_iter()
                .filter(|term| {
                    if self.stopwords.contains(term) {
                        filtered_stopword = true;
                        false
                    } else {
                        true
                    }
                })
                .collect()
        };
        if terms.is_empty() {
            return Ok((Vec::new(), 0, filtered_stopword));
        }

        // Deterministic term order keeps float accumulation reproducible.
        let query_frequencies: BTreeMap<String, u32> =
            word_frequencies(&terms).into_iter().collect();

        let document_count = self.meta.document_count as f64;
        let mut term_data: Vec<(f64, Vec<Posting>)> = Vec::new();
        for (term, &qtf) in &query_frequencies {
            let (df, postings) = self.fetch_postings(term)?;
            let weight = if df > 0 {
                (1.0 + f64::from(qtf).log10()) * (document_count / df as f64).log10()
            } else {
                0.0
            };
            term_data.push((weight, postings));
        }
        let query_norm = term_data.iter().map(|(w, _)| w * w).sum::<f64>().sqrt();

        let mut candidates: HashMap<i64, Candidate> = HashMap::new();
        for (weight, postings) in &term_data {
            for posting in postings {
                let candidate = candidates.entry(posting.id).or_default();
                if query_norm > 0.0 {
                    candidate.cosine += (weight / query_norm) * posting.tf();
                }
                if posting.header {
                    candidate.header += 1.0;
                }
                if posting.title {
                    candidate.title += 1.0;
                }
                if posting.bold {
                    candidate.bold += 1.0;
                }
            }
        }

        // Conjunctive bonus: documents containing every query term.
        let mut conjunction: Option<HashSet<i64>> = None;
        for (_, postings) in &term_data {
            let ids: HashSet<i64> = postings.iter().map(|p| p.id).collect();
            conjunction = Some(match conjunction {
                None => ids,
                Some(previous) => previous.intersection(&ids).copied().collect(),
            });
        }
        if let Some(ids) = conjunction {
            for id in ids {
                if let Some(candidate) = candidates.get_mut(&id) {
                    candidate.conjunctive = 1.0;
                }
            }
        }

        let config = &self.config;
        let mut scored: Vec<(i64, f64)> = candidates
            .into_iter()
            .map(|(id, mut candidate)| {
                if let Some(doc) = self.documents.get(&id) {
                    if doc.vector_length > 0.0 {
                        candidate.cosine /= doc.vector_length;
                    }
                }
                let relevance = config.alpha
                    * (config.cosine_weight * candidate.cosine
                        + config.header_weight * candidate.header
                        + config.title_weight * candidate.title
                        + config.bold_weight * candidate.bold
                        + config.conjunctive_weight * candidate.conjunctive);
                (id, relevance + AUTHORITY_SCORE)
            })
            .collect();

        let total = scored.iter().filter(|(_, score)| *score > 0.0).count();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        let results = scored
            .into_iter()
            .take(self.config.k_results)
            .filter_map(|(id, score)| {
                self.documents.get(&id).map(|doc| SearchResult {
                    url: doc.url.clone(),
                    title: doc.title.clone(),
                    summary: doc.summary.clone(),
                    score,
                })
            })
            .collect();
        Ok((results, total, filtered_stopword))
    }

    /// Postings for one term: cache first, then a single seek-and-read in
    /// the owning partition file. Terms absent from the meta index resolve
    /// to an empty list with `df = documentCount - 1`.
    fn fetch_postings(&mut self, term: &str) -> Result<(usize, Vec<Posting>)> {
        if let Some((df, postings)) = self.cache.get(term) {
            return Ok((df, postings.to_vec()));
        }

        let (df, postings) = match self.meta_index.get(term) {
            None => (self.meta.document_count.saturating_sub(1), Vec::new()),
            Some(&(offset, partition)) => {
                if partition >= self.partitions.len() {
                    return Err(EngineError::Invariant(format!(
                        "partition index {} out of range for term '{}'",
                        partition, term
                    )));
                }
                let line = read_line_at(&mut self.partitions[partition], offset)?;
                let (line_term, df, mut postings) = parse_term_line(&line)?;
                if line_term != term {
                    return Err(EngineError::Invariant(format!(
                        "meta index points '{}' at a row for '{}'",
                        term, line_term
                    )));
                }
                if df != postings.len() {
                    return Err(EngineError::Invariant(format!(
                        "row for '{}' declares {} postings but carries {}",
                        term,
                        df,
                        postings.len()
                    )));
                }
                if self.config.r_docs > 0 {
                    postings.truncate(self.config.r_docs as usize);
                }
                (df, postings)
            }
        };

        self.cache.insert(term.to_string(), df, postings.clone());
        Ok((df, postings))
    }
}

fn load_meta_index(folder: &Path) -> Result<HashMap<String, (u64, usize)>> {
    let path = folder.join("meta_index.json");
    let raw = fs::read_to_string(&path).map_err(|_| EngineError::NotFound(path.clone()))?;
    serde_json::from_str(&raw).map_err(|e| EngineError::malformed(path.display().to_string(), e))
}

fn load_documents(folder: &Path) -> Result<HashMap<i64, DocumentEntry>> {
    let path = folder.join("documents.csv");
    if !path.exists() {
        return Err(EngineError::NotFound(path));
    }
    let label = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new().has_headers(false).from_path(&path)?;
    let mut documents = HashMap::new();
    for record in reader.records() {
        let record = record?;
        if record.len() != 6 {
            return Err(EngineError::malformed(
                label.as_str(),
                format!("expected 6 columns, found {}", record.len()),
            ));
        }
        let doc_id: i64 = record[0]
            .parse()
            .map_err(|e| EngineError::malformed(label.as_str(), e))?;
        let vector_length: f64 = record[2]
            .parse()
            .map_err(|e| EngineError::malformed(label.as_str(), e))?;
        // PageRank column: validated but not needed at query time.
        record[5]
            .parse::<f64>()
            .map_err(|e| EngineError::malformed(label.as_str(), e))?;
        documents.insert(
            doc_id,
            DocumentEntry {
                url: record[1].to_string(),
                vector_length,
                title: record[3].to_string(),
                summary: record[4].to_string(),
            },
        );
    }
    Ok(documents)
}

fn load_stopwords(path: &Path, stemmer: &dyn Stemmer) -> Result<HashSet<String>> {
    let raw =
        fs::read_to_string(path).map_err(|_| EngineError::NotFound(PathBuf::from(path)))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|word| stemmer.stem(word))
        .collect())
}

/// Decode one `term, df, posting_json...` row.
fn parse_term_line(line: &str) -> Result<(String, usize, Vec<Posting>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    let record = reader
        .records()
        .next()
        .ok_or_else(|| EngineError::malformed("postings row", "empty line"))??;
    let mut fields = record.iter();
    let term = fields
        .next()
        .ok_or_else(|| EngineError::malformed("postings row", "missing term"))?
        .to_string();
    let df: usize = fields
        .next()
        .ok_or_else(|| EngineError::malformed("postings row", "missing document frequency"))?
        .parse()
        .map_err(|e| EngineError::malformed("postings row", e))?;
    let postings = fields
        .map(|raw| {
            serde_json::from_str::<Posting>(raw)
                .map_err(|e| EngineError::malformed("postings row", e))
        })
        .collect::<Result<Vec<Posting>>>()?;
    Ok((term, df, postings))
}

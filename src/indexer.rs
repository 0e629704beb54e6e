// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The build pipeline: walk a crawled dataset, parse each page, suppress
//! near-duplicates, and feed postings and link edges into the matrix.
//!
//! Each dataset file is a JSON record `{"url": ..., "content": <html>}`.
//! For every accepted page the pipeline:
//!
//! 1. canonicalizes the URL (fragment stripped),
//! 2. skips non-page filetypes (`.txt`, `.log`, `.xml`, `.git`),
//! 3. parses the HTML and stems the token stream,
//! 4. drops the page if its SimHash is too close to one already accepted,
//! 5. registers the document and one posting per distinct term,
//! 6. records the page's outgoing links in the link graph.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sha1::Digest;

use crate::error::{EngineError, Result};
use crate::matrix::Matrix;
use crate::parser::{EnglishStemmer, PageParser, Stemmer};
use crate::posting::Posting;
use crate::text::{simhash, simhash_similarity, word_frequencies};

pub const SMALL_DATASET_ROOT: &str = "data/analyst_dataset";
pub const LARGE_DATASET_ROOT: &str = "data/developer_dataset";

/// URL path suffixes that are crawled but never indexed.
const SKIPPED_FILETYPES: [&str; 4] = [".txt", ".log", ".xml", ".git"];

/// Stable 64-bit document id for a canonical URL: the first 8 bytes of its
/// SHA-1 digest, little-endian. Deterministic across runs; collisions are
/// possible in principle but negligible at realistic corpus sizes.
pub fn doc_id_for(url: &str) -> i64 {
    let digest = sha1::Sha1::digest(url.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_le_bytes(bytes)
}

/// Strip the fragment from a URL.
pub fn canonical_url(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}

fn is_skipped_filetype(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
    SKIPPED_FILETYPES.iter().any(|ext| path.ends_with(ext))
}

#[derive(Deserialize)]
struct DatasetRecord {
    url: String,
    content: String,
}

/// One accepted page, ready for matrix insertion.
pub struct Site {
    pub path: PathBuf,
    pub doc_id: i64,
    pub url: String,
    pub frequencies: HashMap<String, u32>,
    pub headers: HashSet<String>,
    pub bold: HashSet<String>,
    pub titles: HashSet<String>,
    pub title: String,
    pub summary: String,
    pub links: Vec<String>,
    pub fingerprint: u64,
}

/// Incoming-edge sets and out-degrees for every page seen during the build.
///
/// Out-degree counts links emitted, not distinct targets, and self-loops are
/// ordinary data. Pages that never link out keep an entry with out-degree
/// zero so PageRank still ranks them.
#[derive(Debug, Default)]
pub struct LinkGraph {
    entries: HashMap<i64, LinkEntry>,
}

#[derive(Debug, Default)]
pub struct LinkEntry {
    pub incoming: HashSet<i64>,
    pub out_degree: u32,
}

impl LinkGraph {
    pub fn record(&mut self, source: i64, targets: &[i64]) {
        self.entries.entry(source).or_default().out_degree += targets.len() as u32;
        for &target in targets {
            self.entries.entry(target).or_default().incoming.insert(source);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, doc_id: i64) -> Option<&LinkEntry> {
        self.entries.get(&doc_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &LinkEntry)> {
        self.entries.iter().map(|(&id, entry)| (id, entry))
    }
}

pub struct Indexer {
    paths: std::vec::IntoIter<PathBuf>,
    parser: PageParser,
    stemmer: Box<dyn Stemmer>,
    links: LinkGraph,
    fingerprints: Vec<u64>,
    sim_thresh: f64,
}

impl Indexer {
    /// Scan `dataset_root` recursively for `*.json` files. The root must
    /// exist; an empty tree is legal and simply yields no sites.
    pub fn new(dataset_root: impl AsRef<Path>, sim_thresh: f64) -> Result<Self> {
        let root = dataset_root.as_ref();
        if !root.is_dir() {
            return Err(EngineError::NotFound(root.to_path_buf()));
        }
        let pattern = format!("{}/**/*.json", root.display());
        let mut paths: Vec<PathBuf> = glob::glob(&pattern)
            .map_err(|e| EngineError::malformed("dataset glob", e))?
            .filter_map(std::result::Result::ok)
            .collect();
        paths.sort();

        Ok(Indexer {
            paths: paths.into_iter(),
            parser: PageParser::new(),
            stemmer: Box::new(EnglishStemmer::new()),
            links: LinkGraph::default(),
            fingerprints: Vec::new(),
            sim_thresh,
        })
    }

    /// The next accepted site, or `None` when the dataset is exhausted.
    /// Filtered filetypes, unreadable records, and near-duplicates are
    /// skipped silently (logged at debug/warn level).
    pub fn next_site(&mut self) -> Option<Site> {
        loop {
            let path = self.paths.next()?;
            match self.load_site(&path) {
                Some(site) => return Some(site),
                None => continue,
            }
        }
    }

    /// Register one accepted site in the matrix and the link graph.
    pub fn index_site(&mut self, matrix: &mut Matrix, site: &Site) {
        matrix.add_document(site.doc_id, &site.url, &site.title, &site.summary);
        for (term, &frequency) in &site.frequencies {
            let posting = Posting::new(
                site.doc_id,
                frequency,
                site.headers.contains(term),
                site.bold.contains(term),
                site.titles.contains(term),
            );
            matrix.add(term, posting);
        }
        let targets: Vec<i64> = site
            .links
            .iter()
            .map(|link| doc_id_for(canonical_url(link)))
            .collect();
        self.links.record(site.doc_id, &targets);
    }

    /// The accumulated link graph, for the ranker.
    pub fn links(&self) -> &LinkGraph {
        &self.links
    }

    fn load_site(&mut self, path: &Path) -> Option<Site> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("skipping unreadable dataset file {}: {}", path.display(), e);
                return None;
            }
        };
        let record: DatasetRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("skipping malformed dataset file {}: {}", path.display(), e);
                return None;
            }
        };

        let url = canonical_url(&record.url).to_string();
        if is_skipped_filetype(&url) {
            log::debug!("skipping filetype: {}", url);
            return None;
        }

        let page = self.parser.parse(&record.content, self.stemmer.as_ref());
        let frequencies = word_frequencies(&page.tokens);
        let fingerprint = simhash(&frequencies);
        if self.is_duplicate(fingerprint) {
            log::debug!("dropping near-duplicate page: {}", url);
            return None;
        }
        self.fingerprints.push(fingerprint);

        Some(Site {
            path: path.to_path_buf(),
            doc_id: doc_id_for(&url),
            url,
            frequencies,
            headers: page.headers,
            bold: page.bold,
            titles: page.titles,
            title: page.title.unwrap_or_default(),
            summary: page.summary,
            links: page.links,
            fingerprint,
        })
    }

    fn is_duplicate(&self, fingerprint: u64) -> bool {
        self.fingerprints.iter().any(|&accepted| {
            accepted == fingerprint
                || simhash_similarity(accepted, fingerprint) > self.sim_thresh
        })
    }
}

// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The partitioned inverted index ("matrix").
//!
//! Terms are routed to partitions by a sorted list of alphabetic breakpoints:
//! a term belongs to the first partition whose breakpoint sorts strictly
//! greater than it, or to the last partition otherwise. Each partition lives
//! in memory as an ordered term map and is periodically spilled to a numbered
//! partial file so the full corpus never has to fit in RAM.
//!
//! `finalize` merges the spilled partials per partition, ranks every term's
//! postings by `(pagerank desc, tf_norm desc)`, writes the immutable on-disk
//! artifacts, and records the byte offset of every term line in
//! `meta_index.json` so the query engine can seek straight to a postings list.
//!
//! On-disk layout inside the index folder:
//!
//! ```text
//! meta.json                    {"filename", "documentCount", "breakpoints"}
//! documents.csv                docId, url, vectorLength, title, summary, pageRank
//! <filename><i>.csv            term, df, posting_json, posting_json, ...
//! <filename><i>_partial<p>.csv transient spill files, deleted by finalize
//! meta_index.json              term -> [byte offset, partition index]
//! ```

use std::cmp::Ordering;
use std::collections::btree_map;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::posting::Posting;

pub type PostingsList = Vec<Posting>;
type PartitionData = BTreeMap<String, PostingsList>;

/// Index-wide metadata persisted as `meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub filename: String,
    #[serde(rename = "documentCount")]
    pub document_count: usize,
    pub breakpoints: Vec<String>,
}

impl IndexMeta {
    /// Number of partition files this index is divided into.
    pub fn partition_count(&self) -> usize {
        self.breakpoints.len() + 1
    }

    pub fn load(folder: &Path) -> Result<Self> {
        let path = folder.join("meta.json");
        let raw = fs::read_to_string(&path).map_err(|_| EngineError::NotFound(path.clone()))?;
        serde_json::from_str(&raw)
            .map_err(|e| EngineError::malformed(path.display().to_string(), e))
    }

    pub fn save(&self, folder: &Path) -> Result<()> {
        let file = File::create(folder.join("meta.json"))?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

/// What `Matrix::remove` gives back.
#[derive(Debug, Clone, PartialEq)]
pub enum Removed {
    Term(PostingsList),
    Posting(Posting),
}

/// Per-document registry entry collected during the build.
#[derive(Debug, Clone)]
struct DocumentRecord {
    url: String,
    title: String,
    summary: String,
}

pub struct Matrix {
    breakpoints: Vec<String>,
    partitions: Vec<PartitionData>,
    documents: BTreeMap<i64, DocumentRecord>,
    /// Running Σ (1 + log10 tf)² per document; square-rooted at finalize.
    lengths: BTreeMap<i64, f64>,
    root: PathBuf,
    filename: String,
    /// Monotonic spill counter: partials written so far per partition.
    counter: usize,
}

impl Matrix {
    /// Create a matrix rooted at `folder`. With `clean`, any existing index
    /// folder is deleted first; the folder is (re)created either way.
    pub fn new(
        breakpoints: Vec<String>,
        folder: impl AsRef<Path>,
        filename: &str,
        clean: bool,
    ) -> Result<Self> {
        if breakpoints.windows(2).any(|w| w[0] >= w[1]) {
            return Err(EngineError::Invariant(
                "breakpoints must be strictly ascending".into(),
            ));
        }
        let root = folder.as_ref().to_path_buf();
        if clean && root.exists() {
            fs::remove_dir_all(&root)?;
        }
        fs::create_dir_all(&root)?;

        let partition_count = breakpoints.len() + 1;
        Ok(Matrix {
            breakpoints,
            partitions: vec![BTreeMap::new(); partition_count],
            documents: BTreeMap::new(),
            lengths: BTreeMap::new(),
            root: root.clone(),
            filename: filename.to_string(),
            counter: 0,
        })
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Which partition a term belongs to: the first breakpoint that sorts
    /// strictly greater than the term wins, else the last partition.
    pub fn partition_for(&self, term: &str) -> usize {
        self.breakpoints
            .iter()
            .position(|brk| term < brk.as_str())
            .unwrap_or(self.breakpoints.len())
    }

    /// Register a document. First write wins; the vector-length accumulator
    /// starts at zero.
    pub fn add_document(&mut self, doc_id: i64, url: &str, title: &str, summary: &str) {
        if let btree_map::Entry::Vacant(entry) = self.documents.entry(doc_id) {
            entry.insert(DocumentRecord {
                url: url.to_string(),
                title: title.to_string(),
                summary: summary.to_string(),
            });
            self.lengths.insert(doc_id, 0.0);
        }
    }

    /// Insert a posting under `term`. If the document already holds a posting
    /// there, the two merge (frequency sum, flag disjunction). Either way the
    /// document's vector-length accumulator is credited with the new
    /// posting's squared log-damped term frequency.
    pub fn add(&mut self, term: &str, posting: Posting) {
        let credit = posting.tf().powi(2);
        let partition = self.partition_for(term);
        let postings = self.partitions[partition]
            .entry(term.to_string())
            .or_default();
        match postings.iter_mut().find(|p| p.id == posting.id) {
            Some(existing) => existing.merge(&posting),
            None => postings.push(posting),
        }
        *self.lengths.entry(posting.id).or_insert(0.0) += credit;
    }

    /// Remove a whole term (`doc_id` = None) or a single posting. Returns
    /// `None` when nothing matched. Removing the last posting of a term
    /// removes the term itself.
    pub fn remove(&mut self, term: &str, doc_id: Option<i64>) -> Option<Removed> {
        let partition = self.partition_for(term);
        let data = &mut self.partitions[partition];
        match doc_id {
            None => data.remove(term).map(Removed::Term),
            Some(id) => {
                let postings = data.get_mut(term)?;
                let index = postings.iter().position(|p| p.id == id)?;
                let removed = postings.remove(index);
                if postings.is_empty() {
                    data.remove(term);
                }
                Some(Removed::Posting(removed))
            }
        }
    }

    /// Unique terms currently held in memory (spilled partials not counted).
    pub fn size(&self) -> usize {
        self.partitions.iter().map(BTreeMap::len).sum()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Unique terms across the final partition files.
    pub fn scan_size(&self) -> Result<usize> {
        let mut total = 0;
        for i in 0..self.partition_count() {
            let file = File::open(self.partition_path(i))?;
            total += BufReader::new(file).lines().count();
        }
        Ok(total)
    }

    fn partition_path(&self, partition: usize) -> PathBuf {
        self.root.join(format!("{}{}.csv", self.filename, partition))
    }

    fn partial_path(&self, partition: usize, spill: usize) -> PathBuf {
        self.root
            .join(format!("{}{}_partial{}.csv", self.filename, partition, spill))
    }

    /// Spill every in-memory partition to a numbered partial file and clear
    /// it. Empty partitions still produce (empty) files so `finalize` can
    /// load the full `partition × spill` grid unconditionally.
    pub fn save(&mut self) -> Result<()> {
        for partition in 0..self.partition_count() {
            let path = self.partial_path(partition, self.counter);
            let mut writer = csv::WriterBuilder::new().flexible(true).from_path(&path)?;
            for (term, postings) in &self.partitions[partition] {
                let mut row = vec![term.clone()];
                for posting in postings {
                    row.push(serde_json::to_string(posting)?);
                }
                writer.write_record(&row)?;
            }
            writer.flush()?;
            self.partitions[partition].clear();
        }
        self.counter += 1;
        Ok(())
    }

    /// Merge all spilled partials, rank every postings list, and write the
    /// immutable index artifacts.
    ///
    /// When no partials are pending (a second call on an already-finalized
    /// matrix), the existing final partition files are used as the merge
    /// input instead, which makes the operation idempotent.
    pub fn finalize(&mut self, pageranks: &HashMap<i64, f64>) -> Result<()> {
        let meta = IndexMeta {
            filename: self.filename.clone(),
            document_count: self.documents.len(),
            breakpoints: self.breakpoints.clone(),
        };
        meta.save(&self.root)?;

        self.write_documents(pageranks)?;

        for partition in 0..self.partition_count() {
            let sources = self.load_partition_sources(partition)?;
            let mut merged = merge_sources(sources);
            rank_postings(&mut merged, pageranks);
            self.write_partition(partition, &merged)?;
        }

        self.delete_partials()?;
        self.counter = 0;

        let index = index_partition_files(&self.root, &self.filename, self.partition_count())?;
        let file = File::create(self.root.join("meta_index.json"))?;
        serde_json::to_writer_pretty(file, &index)?;
        Ok(())
    }

    fn write_documents(&self, pageranks: &HashMap<i64, f64>) -> Result<()> {
        let mut writer = csv::Writer::from_path(self.root.join("documents.csv"))?;
        for (doc_id, record) in &self.documents {
            let length = self.lengths.get(doc_id).copied().unwrap_or(0.0).sqrt();
            let pagerank = pageranks.get(doc_id).copied().unwrap_or_else(|| {
                log::warn!("document {} missing from pagerank output", doc_id);
                0.0
            });
            writer.write_record([
                doc_id.to_string(),
                record.url.clone(),
                length.to_string(),
                record.title.clone(),
                record.summary.clone(),
                pagerank.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// The merge inputs for one partition: all pending partial files, or the
    /// final file itself when nothing is pending.
    fn load_partition_sources(&self, partition: usize) -> Result<Vec<PartitionData>> {
        if self.counter == 0 {
            return Ok(vec![load_partition_file(&self.partition_path(partition), 1)?]);
        }
        (0..self.counter)
            .map(|spill| load_partition_file(&self.partial_path(partition, spill), 0))
            .collect()
    }

    fn write_partition(&self, partition: usize, data: &PartitionData) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(self.partition_path(partition))?;
        for (term, postings) in data {
            let mut row = vec![term.clone(), postings.len().to_string()];
            for posting in postings {
                row.push(serde_json::to_string(posting)?);
            }
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn delete_partials(&self) -> Result<()> {
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().contains("partial") {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

/// Parse one partition (or partial) file into a term map. `leading_skip`
/// is the number of non-posting fields after the term: 0 for partials,
/// 1 for final files (the document-frequency column).
///
/// A missing file reads as empty; a file that exists but does not parse is
/// fatal.
pub(crate) fn load_partition_file(path: &Path, leading_skip: usize) -> Result<PartitionData> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut data = BTreeMap::new();
    for record in reader.records() {
        let record = record?;
        let mut fields = record.iter();
        let term = fields
            .next()
            .ok_or_else(|| EngineError::malformed(path.display().to_string(), "empty row"))?
            .to_string();
        let postings = fields
            .skip(leading_skip)
            .map(|raw| {
                serde_json::from_str::<Posting>(raw)
                    .map_err(|e| EngineError::malformed(path.display().to_string(), e))
            })
            .collect::<Result<PostingsList>>()?;
        data.insert(term, postings);
    }
    Ok(data)
}

/// One sorted stream in the k-way merge.
struct HeapEntry {
    term: String,
    source: usize,
    postings: PostingsList,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.term == other.term && self.source == other.source
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // Reversed so the std max-heap pops the smallest term first.
    fn cmp(&self, other: &Self) -> Ordering {
        (&other.term, other.source).cmp(&(&self.term, self.source))
    }
}

/// K-way merge of sorted term maps. Postings for a term appearing in more
/// than one source are concatenated; ordering is repaired afterwards by
/// [`rank_postings`].
fn merge_sources(sources: Vec<PartitionData>) -> PartitionData {
    let mut streams: Vec<btree_map::IntoIter<String, PostingsList>> =
        sources.into_iter().map(BTreeMap::into_iter).collect();
    let mut heap = BinaryHeap::new();
    for (source, stream) in streams.iter_mut().enumerate() {
        if let Some((term, postings)) = stream.next() {
            heap.push(HeapEntry {
                term,
                source,
                postings,
            });
        }
    }

    let mut merged: PartitionData = BTreeMap::new();
    while let Some(entry) = heap.pop() {
        merged
            .entry(entry.term)
            .or_default()
            .extend(entry.postings);
        if let Some((term, postings)) = streams[entry.source].next() {
            heap.push(HeapEntry {
                term,
                source: entry.source,
                postings,
            });
        }
    }
    merged
}

/// Sort every term's postings by `(pagerank desc, tf_norm desc)` so that a
/// prefix read of the final file yields the best candidates first.
fn rank_postings(data: &mut PartitionData, pageranks: &HashMap<i64, f64>) {
    for postings in data.values_mut() {
        let length = postings
            .iter()
            .map(|p| p.tf().powi(2))
            .sum::<f64>()
            .sqrt();
        postings.sort_by(|a, b| {
            let key_a = (
                pageranks.get(&a.id).copied().unwrap_or(0.0),
                a.tf_norm(length),
            );
            let key_b = (
                pageranks.get(&b.id).copied().unwrap_or(0.0),
                b.tf_norm(length),
            );
            key_b.partial_cmp(&key_a).unwrap_or(Ordering::Equal)
        });
    }
}

/// Scan the final partition files and record, for every term, the byte
/// offset of its line and the partition it lives in.
pub(crate) fn index_partition_files(
    root: &Path,
    filename: &str,
    partition_count: usize,
) -> Result<BTreeMap<String, (u64, usize)>> {
    let mut index = BTreeMap::new();
    for partition in 0..partition_count {
        let path = root.join(format!("{}{}.csv", filename, partition));
        let mut reader = BufReader::new(File::open(&path)?);
        let mut offset = reader.stream_position()?;
        let mut line = String::new();
        loop {
            line.clear();
            let read = reader.read_line(&mut line)?;
            if read == 0 {
                break;
            }
            let term = line.split(',').next().unwrap_or("").trim_end();
            if term.is_empty() {
                break;
            }
            index.insert(term.to_string(), (offset, partition));
            offset += read as u64;
        }
    }
    Ok(index)
}

/// Seek to a recorded offset in an open partition file and read the single
/// term line that starts there.
pub(crate) fn read_line_at(reader: &mut BufReader<File>, offset: u64) -> Result<String> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line)
}

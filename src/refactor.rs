// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Re-partition a finalized index onto a new set of breakpoints.
//!
//! Runs entirely on the on-disk artifacts: partition files are read in
//! order (they are term-sorted, and partitions are contiguous slices of the
//! keyspace), each row is routed to its new segment, and rows are appended
//! in bounded batches so memory stays flat regardless of index size. Row
//! tails (document frequency plus posting JSON) pass through untouched.
//!
//! The rewritten `meta.json` keeps the original document count, and
//! `meta_index.json` is rebuilt by rescanning the new files.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::{EngineError, Result};
use crate::matrix::{index_partition_files, IndexMeta};

/// Rows buffered per segment before an append to disk.
const BUFFER_LIMIT: usize = 5000;

/// Append-only writer for one output segment at a time.
struct SegmentDumper<'a> {
    root: &'a Path,
    name: &'a str,
    segment: usize,
    buffer: Vec<(String, Vec<String>)>,
}

impl<'a> SegmentDumper<'a> {
    fn new(root: &'a Path, name: &'a str) -> Self {
        SegmentDumper {
            root,
            name,
            segment: 0,
            buffer: Vec::new(),
        }
    }

    fn segment_path(&self, segment: usize) -> PathBuf {
        self.root.join(format!("{}{}.csv", self.name, segment))
    }

    fn push(&mut self, term: String, tail: Vec<String>) -> Result<()> {
        self.buffer.push((term, tail));
        if self.buffer.len() >= BUFFER_LIMIT {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.segment_path(self.segment))?;
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
        for (term, tail) in self.buffer.drain(..) {
            let mut row = vec![term];
            row.extend(tail);
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Close out the current segment and start the next one.
    fn advance(&mut self) -> Result<()> {
        self.flush()?;
        self.segment += 1;
        Ok(())
    }

    /// Final flush, then make sure every segment file exists: segments past
    /// the last term still need (empty) files for the query engine to open.
    fn finish(mut self, segment_count: usize) -> Result<()> {
        self.flush()?;
        for segment in 0..segment_count {
            let path = self.segment_path(segment);
            if !path.exists() {
                File::create(path)?;
            }
        }
        Ok(())
    }
}

/// Stream the index under `folder` into `new_name` files partitioned on
/// `breakpoints`. With `clean`, the old partition files are deleted after
/// the copy. The new filename must differ from the current one, since both
/// sets of files coexist mid-stream.
pub fn refactor(
    folder: impl AsRef<Path>,
    new_name: &str,
    breakpoints: &[String],
    clean: bool,
) -> Result<()> {
    let folder = folder.as_ref();
    let meta = IndexMeta::load(folder)?;
    if meta.filename == new_name {
        return Err(EngineError::Invariant(
            "refactor target filename matches the existing index filename".into(),
        ));
    }
    if breakpoints.windows(2).any(|w| w[0] >= w[1]) {
        return Err(EngineError::Invariant(
            "breakpoints must be strictly ascending".into(),
        ));
    }

    let mut dumper = SegmentDumper::new(folder, new_name);
    let mut breaks = breakpoints.iter();
    let mut current_break = breaks.next();
    let mut data: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut source_id = 0usize;

    loop {
        while let Some((term, tail)) = data.pop_first() {
            match current_break {
                Some(brk) if term.as_str() >= brk.as_str() => {
                    // This term opens a later segment; re-buffer it and
                    // advance, then re-test against the next breakpoint.
                    data.insert(term, tail);
                    dumper.advance()?;
                    current_break = breaks.next();
                }
                _ => dumper.push(term, tail)?,
            }
        }

        let source = folder.join(format!("{}{}.csv", meta.filename, source_id));
        if !source.exists() {
            break;
        }
        load_raw_rows(&source, &mut data)?;
        source_id += 1;
    }
    dumper.finish(breakpoints.len() + 1)?;

    if clean {
        let mut old_id = 0usize;
        loop {
            let path = folder.join(format!("{}{}.csv", meta.filename, old_id));
            if !path.exists() {
                break;
            }
            fs::remove_file(path)?;
            old_id += 1;
        }
    }

    IndexMeta {
        filename: new_name.to_string(),
        document_count: meta.document_count,
        breakpoints: breakpoints.to_vec(),
    }
    .save(folder)?;

    let index = index_partition_files(folder, new_name, breakpoints.len() + 1)?;
    let file = File::create(folder.join("meta_index.json"))?;
    serde_json::to_writer_pretty(file, &index)?;
    Ok(())
}

/// Read one partition file as raw `(term, tail-fields)` rows.
fn load_raw_rows(path: &Path, data: &mut BTreeMap<String, Vec<String>>) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    for record in reader.records() {
        let record = record?;
        let mut fields = record.iter();
        let term = fields
            .next()
            .ok_or_else(|| EngineError::malformed(path.display().to_string(), "empty row"))?
            .to_string();
        data.insert(term, fields.map(str::to_string).collect());
    }
    Ok(())
}

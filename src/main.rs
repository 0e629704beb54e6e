// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Trawler CLI: build, search, and refactor web-corpus indexes.
//!
//! ```bash
//! # Build an index from the small crawled dataset
//! trawler index --dataset test --offload
//!
//! # Query it interactively
//! trawler search --index index
//!
//! # Re-partition an existing index
//! trawler refactor --index index --breakpoints mid
//! ```

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Instant;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use trawler::cache::CacheStrategy;
use trawler::indexer::{LARGE_DATASET_ROOT, SMALL_DATASET_ROOT};
use trawler::query::STOPWORDS_PATH;
use trawler::{Config, EngineError, Indexer, Matrix, PageRanker, QueryEngine};

mod cli;

use cli::display::{result_row, styled, timing_ms, BOLD, DIM};
use cli::{expand_breakpoints, Cli, Commands};

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let outcome = match cli.command {
        Commands::Index {
            dataset,
            chunk_size,
            offload,
            max_docs,
            breakpoints,
        } => run_index(&config, &dataset, chunk_size, offload, max_docs, &breakpoints),
        Commands::Search {
            index,
            cache_size,
            strategy,
        } => run_search(&config, index.as_deref(), cache_size, strategy.into()),
        Commands::Refactor { index, breakpoints } => run_refactor(&index, &breakpoints),
    };

    if let Err(e) = outcome {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

fn run_index(
    config: &Config,
    dataset: &str,
    chunk_size: usize,
    offload: bool,
    max_docs: Option<usize>,
    breakpoints: &[String],
) -> trawler::Result<()> {
    let breakpoints = expand_breakpoints(breakpoints);
    let dataset_root = if dataset == "large" {
        LARGE_DATASET_ROOT
    } else {
        SMALL_DATASET_ROOT
    };
    let chunk_size = chunk_size.max(1);

    eprintln!("Index dataset: {} ({})", dataset, dataset_root);
    eprintln!("Chunk size: {} | Offload: {}", chunk_size, if offload { "yes" } else { "no" });
    eprintln!("Breakpoints: {:?}", breakpoints);

    let start = Instant::now();
    let mut indexer = Indexer::new(dataset_root, config.sim_thresh)?;
    let mut matrix = Matrix::new(breakpoints, &config.index_folder, "matrix", true)?;

    let progress = ProgressBar::new_spinner();
    progress
        .set_style(ProgressStyle::with_template("{spinner:.cyan} {pos} pages {msg}").unwrap());

    let mut count: usize = 0;
    while let Some(site) = indexer.next_site() {
        indexer.index_site(&mut matrix, &site);
        count += 1;
        progress.inc(1);
        if count % chunk_size == 0 && offload {
            progress.set_message("offloading...");
            matrix.save()?;
            progress.set_message("");
        }
        if max_docs.is_some_and(|limit| count >= limit) {
            break;
        }
    }
    progress.finish_and_clear();
    eprintln!("Finished dataset: {} pages", count);

    eprintln!("Computing PageRank over {} nodes...", indexer.links().len());
    let pageranks = PageRanker::from_config(config).run(indexer.links());

    matrix.save()?;
    eprintln!("Consolidating index...");
    matrix.finalize(&pageranks)?;

    let elapsed = start.elapsed().as_secs_f64();
    write_summary(config, &matrix, count, elapsed)?;
    eprintln!("✅ Indexed {} pages in {:.2} s", count, elapsed);
    Ok(())
}

/// Human-readable size/time report next to the index artifacts.
fn write_summary(
    config: &Config,
    matrix: &Matrix,
    pages: usize,
    elapsed: f64,
) -> trawler::Result<()> {
    let folder = Path::new(&config.index_folder);
    let mut sizes = Vec::new();
    for partition in 0..matrix.partition_count() {
        let path = folder.join(format!("matrix{}.csv", partition));
        sizes.push(fs::metadata(path)?.len() as f64);
    }
    let total: f64 = sizes.iter().sum();

    let mut report = format!(
        "Number of pages: {}\nNumber of unique tokens: {}\n",
        pages,
        matrix.scan_size()?
    );
    for (partition, size) in sizes.iter().enumerate() {
        report.push_str(&format!(
            "  Matrix {} Filesize: {:.4} kb | {:.4} mb | {:.4} gb\n",
            partition,
            size / 1024.0,
            size / 1024f64.powi(2),
            size / 1024f64.powi(3)
        ));
    }
    report.push_str(&format!(
        "Total Index File Size: {:.4} kb | {:.4} mb | {:.4} gb\n",
        total / 1024.0,
        total / 1024f64.powi(2),
        total / 1024f64.powi(3)
    ));
    report.push_str(&format!(
        "Time to Create Index: {:.2} seconds | {:.2} minutes\n",
        elapsed,
        elapsed / 60.0
    ));
    fs::write(folder.join("summary.txt"), report)?;
    Ok(())
}

fn run_search(
    config: &Config,
    index: Option<&str>,
    cache_size: usize,
    strategy: CacheStrategy,
) -> trawler::Result<()> {
    let folder = index.unwrap_or(&config.index_folder);
    println!("Search index: {}", folder);
    println!("Cache size: {}", cache_size);

    let mut engine = QueryEngine::open(
        folder,
        config.clone(),
        cache_size,
        strategy,
        STOPWORDS_PATH,
    )?;
    println!(
        "{} documents. Enter a query; a blank line exits.",
        engine.document_count()
    );

    let stdin = io::stdin();
    loop {
        print!("\n{} ", styled(BOLD, "q:>"));
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let query = line.trim();
        if query.is_empty() {
            break;
        }

        let start = Instant::now();
        let (results, total) = engine.search(query)?;
        let elapsed = start.elapsed().as_nanos();

        for (rank, result) in results.iter().enumerate() {
            println!("{}", result_row(rank + 1, &result.url, &result.title));
        }
        println!("  Results: {} / {}", results.len(), total);
        println!("  Time: {}", styled(DIM, &timing_ms(elapsed)));
    }
    Ok(())
}

fn run_refactor(folder: &str, breakpoints: &[String]) -> trawler::Result<()> {
    let breakpoints = expand_breakpoints(breakpoints);
    eprintln!(
        "Refactoring {} onto {} breakpoint(s)",
        folder,
        breakpoints.len()
    );
    // Preferred filename first; fall back when it collides with the index's
    // current one.
    match trawler::refactor(folder, "matrix", &breakpoints, true) {
        Err(EngineError::Invariant(_)) => trawler::refactor(folder, "index", &breakpoints, true)?,
        other => other?,
    }
    eprintln!("✅ Refactor complete");
    Ok(())
}

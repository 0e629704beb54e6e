//! Test utilities shared across integration tests.
//!
//! Builds throwaway corpora (JSON dataset files), runs the full build
//! pipeline into a temp index folder, and opens query engines against it.

use std::fs;
use std::path::{Path, PathBuf};

use trawler::cache::CacheStrategy;
use trawler::{Config, Indexer, Matrix, PageRanker, QueryEngine};

/// Write one dataset page as the crawler would have stored it.
pub fn write_page(dataset: &Path, name: &str, url: &str, html: &str) {
    let record = serde_json::json!({ "url": url, "content": html });
    fs::write(dataset.join(format!("{}.json", name)), record.to_string()).unwrap();
}

/// A plain-body page: the shortest route to "this url contains these words".
pub fn write_body_page(dataset: &Path, name: &str, url: &str, body: &str) {
    write_page(
        dataset,
        name,
        url,
        &format!("<html><body><p>{}</p></body></html>", body),
    );
}

/// Run the whole build pipeline. Returns the number of accepted pages.
pub fn build_index(
    dataset: &Path,
    index_folder: &Path,
    breakpoints: Vec<String>,
    config: &Config,
) -> usize {
    let mut indexer = Indexer::new(dataset, config.sim_thresh).unwrap();
    let mut matrix = Matrix::new(breakpoints, index_folder, "matrix", true).unwrap();
    let mut count = 0;
    while let Some(site) = indexer.next_site() {
        indexer.index_site(&mut matrix, &site);
        count += 1;
    }
    let pageranks = PageRanker::from_config(config).run(indexer.links());
    matrix.save().unwrap();
    matrix.finalize(&pageranks).unwrap();
    count
}

/// Write a stopword list next to the index and return its path.
pub fn write_stopwords(folder: &Path, words: &[&str]) -> PathBuf {
    let path = folder.join("stopwords.txt");
    fs::write(&path, words.join("\n")).unwrap();
    path
}

pub fn open_engine(index_folder: &Path, stopwords: &Path, config: &Config) -> QueryEngine {
    QueryEngine::open(
        index_folder,
        config.clone(),
        25,
        CacheStrategy::Timely,
        stopwords,
    )
    .unwrap()
}

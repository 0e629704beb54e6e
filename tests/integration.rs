//! End-to-end tests: build a throwaway corpus, run the full pipeline, and
//! query the finalized index through the public API.

mod common;

use std::collections::BTreeMap;
use std::fs;

use tempfile::tempdir;
use trawler::cache::CacheStrategy;
use trawler::{Config, EngineError, QueryEngine};

use common::{build_index, open_engine, write_body_page, write_page, write_stopwords};

fn breakpoints() -> Vec<String> {
    vec!["a".into(), "i".into(), "r".into()]
}

/// Near-duplicate suppression off (exact duplicates still drop), so tiny
/// corpora with overlapping vocabulary don't lose documents by accident.
fn lenient_config() -> Config {
    Config {
        sim_thresh: 1.0,
        ..Config::default()
    }
}

#[test]
fn single_term_query_returns_the_owning_document() {
    let dir = tempdir().unwrap();
    let dataset = dir.path().join("data");
    fs::create_dir(&dataset).unwrap();
    write_body_page(&dataset, "doc1", "http://corpus.test/doc1", "apple banana apple");
    write_body_page(&dataset, "doc2", "http://corpus.test/doc2", "banana cherry");

    let index = dir.path().join("index");
    let config = lenient_config();
    assert_eq!(build_index(&dataset, &index, breakpoints(), &config), 2);

    let stopwords = write_stopwords(dir.path(), &["the", "of"]);
    let mut engine = open_engine(&index, &stopwords, &config);

    let (results, total) = engine.search("apple").unwrap();
    assert_eq!(total, 1);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].url, "http://corpus.test/doc1");
}

#[test]
fn conjunctive_bonus_ranks_complete_matches_first() {
    let dir = tempdir().unwrap();
    let dataset = dir.path().join("data");
    fs::create_dir(&dataset).unwrap();
    write_body_page(&dataset, "d1", "http://corpus.test/d1", "cat dog");
    write_body_page(&dataset, "d2", "http://corpus.test/d2", "cat bird");
    write_body_page(&dataset, "d3", "http://corpus.test/d3", "dog bird");

    let index = dir.path().join("index");
    let config = lenient_config();
    build_index(&dataset, &index, breakpoints(), &config);

    let stopwords = write_stopwords(dir.path(), &["the"]);
    let mut engine = open_engine(&index, &stopwords, &config);

    let (results, total) = engine.search("cat dog").unwrap();
    assert_eq!(total, 3);
    assert_eq!(results[0].url, "http://corpus.test/d1");
    assert_eq!(results.len(), 3);
}

#[test]
fn title_matches_outrank_body_matches() {
    let dir = tempdir().unwrap();
    let dataset = dir.path().join("data");
    fs::create_dir(&dataset).unwrap();
    write_page(
        &dataset,
        "d1",
        "http://corpus.test/body",
        "<html><body><p>rust systems programming guide</p></body></html>",
    );
    write_page(
        &dataset,
        "d2",
        "http://corpus.test/title",
        "<html><head><title>rust</title></head>\
         <body><p>web framework comparison notes</p></body></html>",
    );

    let index = dir.path().join("index");
    let config = lenient_config();
    assert_eq!(build_index(&dataset, &index, breakpoints(), &config), 2);

    let stopwords = write_stopwords(dir.path(), &["the"]);
    let mut engine = open_engine(&index, &stopwords, &config);

    let (results, total) = engine.search("rust").unwrap();
    assert_eq!(total, 2);
    assert_eq!(results[0].url, "http://corpus.test/title");
    assert_eq!(results[0].title, "rust");
    assert_eq!(results[1].url, "http://corpus.test/body");
}

#[test]
fn identical_pages_are_deduplicated() {
    let dir = tempdir().unwrap();
    let dataset = dir.path().join("data");
    fs::create_dir(&dataset).unwrap();
    write_body_page(&dataset, "a", "http://corpus.test/original", "identical page body words");
    write_body_page(&dataset, "b", "http://corpus.test/mirror", "identical page body words");

    let index = dir.path().join("index");
    let config = lenient_config();
    assert_eq!(build_index(&dataset, &index, breakpoints(), &config), 1);

    let stopwords = write_stopwords(dir.path(), &["the"]);
    let mut engine = open_engine(&index, &stopwords, &config);

    let (results, total) = engine.search("identical").unwrap();
    assert_eq!(total, 1);
    assert_eq!(results[0].url, "http://corpus.test/original");
}

#[test]
fn terms_land_in_their_breakpoint_partitions() {
    let dir = tempdir().unwrap();
    let dataset = dir.path().join("data");
    fs::create_dir(&dataset).unwrap();
    write_body_page(&dataset, "d", "http://corpus.test/d", "hat zoo");

    let index = dir.path().join("index");
    let config = lenient_config();
    build_index(&dataset, &index, breakpoints(), &config);

    let raw = fs::read_to_string(index.join("meta_index.json")).unwrap();
    let meta_index: BTreeMap<String, (u64, usize)> = serde_json::from_str(&raw).unwrap();
    assert_eq!(meta_index["hat"].1, 1);
    assert_eq!(meta_index["zoo"].1, 3);
}

#[test]
fn repeated_queries_hit_the_cache_with_identical_results() {
    let dir = tempdir().unwrap();
    let dataset = dir.path().join("data");
    fs::create_dir(&dataset).unwrap();
    write_body_page(&dataset, "d1", "http://corpus.test/d1", "orbit satellite launch");
    write_body_page(&dataset, "d2", "http://corpus.test/d2", "satellite weather data");

    let index = dir.path().join("index");
    let config = lenient_config();
    build_index(&dataset, &index, breakpoints(), &config);

    let stopwords = write_stopwords(dir.path(), &["the"]);
    for strategy in [CacheStrategy::Timely, CacheStrategy::Popularity] {
        let mut engine =
            QueryEngine::open(&index, config.clone(), 4, strategy, &stopwords).unwrap();
        let (cold, cold_total) = engine.search("satellite orbit").unwrap();
        let (warm, warm_total) = engine.search("satellite orbit").unwrap();
        assert_eq!(cold_total, warm_total);
        assert_eq!(cold.len(), warm.len());
        for (a, b) in cold.iter().zip(&warm) {
            assert_eq!(a.url, b.url);
            assert_eq!(a.score, b.score);
        }
    }
}

#[test]
fn all_stopword_query_retries_with_stopwords_kept() {
    let dir = tempdir().unwrap();
    let dataset = dir.path().join("data");
    fs::create_dir(&dataset).unwrap();
    write_body_page(&dataset, "d1", "http://corpus.test/d1", "the cat sat");

    let index = dir.path().join("index");
    let config = lenient_config();
    build_index(&dataset, &index, breakpoints(), &config);

    let stopwords = write_stopwords(dir.path(), &["the"]);
    let mut engine = open_engine(&index, &stopwords, &config);

    let (results, total) = engine.search("the").unwrap();
    assert_eq!(total, 1);
    assert_eq!(results[0].url, "http://corpus.test/d1");
}

#[test]
fn empty_and_unknown_queries_return_nothing() {
    let dir = tempdir().unwrap();
    let dataset = dir.path().join("data");
    fs::create_dir(&dataset).unwrap();
    write_body_page(&dataset, "d1", "http://corpus.test/d1", "plain content");

    let index = dir.path().join("index");
    let config = lenient_config();
    build_index(&dataset, &index, breakpoints(), &config);

    let stopwords = write_stopwords(dir.path(), &["the"]);
    let mut engine = open_engine(&index, &stopwords, &config);

    let (results, total) = engine.search("").unwrap();
    assert!(results.is_empty());
    assert_eq!(total, 0);

    let (results, total) = engine.search("!!! ???").unwrap();
    assert!(results.is_empty());
    assert_eq!(total, 0);

    let (results, total) = engine.search("qqzzxy").unwrap();
    assert!(results.is_empty());
    assert_eq!(total, 0);
}

#[test]
fn r_docs_caps_postings_to_the_best_prefix() {
    let dir = tempdir().unwrap();
    let dataset = dir.path().join("data");
    fs::create_dir(&dataset).unwrap();
    // "shared" appears 5 times in d1 and once in d2; with equal PageRank the
    // finalizer orders d1 first, so an r_docs of 1 keeps only d1.
    write_body_page(
        &dataset,
        "d1",
        "http://corpus.test/heavy",
        "shared shared shared shared shared",
    );
    write_body_page(&dataset, "d2", "http://corpus.test/light", "shared filler words");

    let index = dir.path().join("index");
    let mut config = lenient_config();
    build_index(&dataset, &index, breakpoints(), &config);
    config.r_docs = 1;

    let stopwords = write_stopwords(dir.path(), &["the"]);
    let mut engine = open_engine(&index, &stopwords, &config);

    let (results, total) = engine.search("shared").unwrap();
    assert_eq!(total, 1);
    assert_eq!(results[0].url, "http://corpus.test/heavy");
}

#[test]
fn missing_index_folder_is_not_found() {
    let dir = tempdir().unwrap();
    let stopwords = write_stopwords(dir.path(), &["the"]);
    let result = QueryEngine::open(
        dir.path().join("nope"),
        Config::default(),
        4,
        CacheStrategy::Timely,
        &stopwords,
    );
    assert!(matches!(result, Err(EngineError::NotFound(_))));
}

#[test]
fn malformed_meta_is_rejected_before_opening() {
    let dir = tempdir().unwrap();
    let index = dir.path().join("index");
    fs::create_dir(&index).unwrap();
    fs::write(index.join("meta.json"), "{ not json").unwrap();

    let stopwords = write_stopwords(dir.path(), &["the"]);
    let result = QueryEngine::open(
        &index,
        Config::default(),
        4,
        CacheStrategy::Timely,
        &stopwords,
    );
    assert!(matches!(result, Err(EngineError::Malformed { .. })));
}

#[test]
fn missing_stopword_list_is_fatal() {
    let dir = tempdir().unwrap();
    let dataset = dir.path().join("data");
    fs::create_dir(&dataset).unwrap();
    write_body_page(&dataset, "d1", "http://corpus.test/d1", "content");

    let index = dir.path().join("index");
    let config = lenient_config();
    build_index(&dataset, &index, breakpoints(), &config);

    let result = QueryEngine::open(
        &index,
        config,
        4,
        CacheStrategy::Timely,
        dir.path().join("absent.txt"),
    );
    assert!(matches!(result, Err(EngineError::NotFound(_))));
}

#[test]
fn document_metadata_survives_the_round_trip() {
    let dir = tempdir().unwrap();
    let dataset = dir.path().join("data");
    fs::create_dir(&dataset).unwrap();
    write_page(
        &dataset,
        "d1",
        "http://corpus.test/d1",
        "<html><head><title>Gardening Notes</title></head>\
         <body><p>growing tomatoes in small spaces</p></body></html>",
    );

    let index = dir.path().join("index");
    let config = lenient_config();
    build_index(&dataset, &index, breakpoints(), &config);

    let stopwords = write_stopwords(dir.path(), &["in"]);
    let mut engine = open_engine(&index, &stopwords, &config);

    let (results, _) = engine.search("tomatoes").unwrap();
    assert_eq!(results[0].title, "Gardening Notes");
    assert!(results[0].summary.contains("growing tomatoes"));
}

#[test]
fn fragment_urls_collapse_to_one_document() {
    let dir = tempdir().unwrap();
    let dataset = dir.path().join("data");
    fs::create_dir(&dataset).unwrap();
    write_body_page(
        &dataset,
        "a",
        "http://corpus.test/page#section-1",
        "unique fragment content",
    );

    let index = dir.path().join("index");
    let config = lenient_config();
    build_index(&dataset, &index, breakpoints(), &config);

    let stopwords = write_stopwords(dir.path(), &["the"]);
    let mut engine = open_engine(&index, &stopwords, &config);

    let (results, _) = engine.search("fragment").unwrap();
    assert_eq!(results[0].url, "http://corpus.test/page");
}

#[test]
fn skipped_filetypes_never_enter_the_index() {
    let dir = tempdir().unwrap();
    let dataset = dir.path().join("data");
    fs::create_dir(&dataset).unwrap();
    write_body_page(&dataset, "a", "http://corpus.test/robots.txt", "robot rules");
    write_body_page(&dataset, "b", "http://corpus.test/page", "regular page");

    let index = dir.path().join("index");
    let config = lenient_config();
    assert_eq!(build_index(&dataset, &index, breakpoints(), &config), 1);
}

//! Property tests over the text utilities and the partition function.

use proptest::prelude::*;
use tempfile::tempdir;
use trawler::{simhash, simhash_similarity, tokenize, word_frequencies, Matrix, Posting};

proptest! {
    #[test]
    fn tokens_contain_only_word_characters(input in ".*") {
        for token in tokenize(&input) {
            prop_assert!(!token.is_empty());
            prop_assert!(token.chars().all(|c| c.is_alphanumeric() || c == '_'));
        }
    }

    #[test]
    fn tokenizing_joined_tokens_is_identity(
        words in prop::collection::vec("[a-z0-9_]{1,8}", 0..10)
    ) {
        let joined = words.join(" ");
        prop_assert_eq!(tokenize(&joined), words);
    }

    #[test]
    fn frequencies_sum_to_token_count(text in "[a-z ]{0,100}") {
        let tokens = tokenize(&text);
        let total: u32 = word_frequencies(&tokens).values().sum();
        prop_assert_eq!(total as usize, tokens.len());
    }

    #[test]
    fn simhash_ignores_token_order(mut words in prop::collection::vec("[a-z]{1,6}", 1..15)) {
        let forward = simhash(&word_frequencies(&words));
        words.reverse();
        let backward = simhash(&word_frequencies(&words));
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn similarity_is_symmetric_and_bounded(a in any::<u64>(), b in any::<u64>()) {
        let similarity = simhash_similarity(a, b);
        prop_assert!((0.0..=1.0).contains(&similarity));
        prop_assert_eq!(similarity, simhash_similarity(b, a));
        prop_assert_eq!(simhash_similarity(a, a), 1.0);
    }

    #[test]
    fn posting_json_round_trips(
        id in any::<i64>(),
        frequency in 1u32..100_000,
        header: bool,
        bold: bool,
        title: bool,
    ) {
        let posting = Posting::new(id, frequency, header, bold, title);
        let json = serde_json::to_string(&posting).unwrap();
        let back: Posting = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, posting);
    }

    #[test]
    fn partition_assignment_is_total_and_monotone(
        mut terms in prop::collection::vec("[a-z]{1,6}", 1..20)
    ) {
        let dir = tempdir().unwrap();
        let matrix = Matrix::new(
            vec!["a".into(), "i".into(), "r".into()],
            dir.path(),
            "matrix",
            false,
        )
        .unwrap();
        terms.sort();
        let partitions: Vec<usize> = terms.iter().map(|t| matrix.partition_for(t)).collect();
        prop_assert!(partitions.iter().all(|&p| p < matrix.partition_count()));
        prop_assert!(partitions.windows(2).all(|w| w[0] <= w[1]));
    }
}

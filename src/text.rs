// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Tokenization, word-frequency counting, and SimHash fingerprints.
//!
//! The tokenizer is deliberately dumb: maximal runs of word characters
//! (letters, digits, underscore), case preserved. Lowercasing and stemming
//! happen in the caller, so the same tokenizer serves the indexer, the
//! query engine, and the near-duplicate detector.
//!
//! SimHash is the 64-bit locality-sensitive fingerprint used for duplicate
//! suppression: documents with mostly-equal term distributions produce
//! fingerprints that agree in most bit positions.

use std::collections::HashMap;

use sha1::{Digest, Sha1};

/// True for characters that belong inside a token.
#[inline]
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split `input` into the ordered sequence of maximal word-character runs.
///
/// Empty input (or input with no word characters) yields an empty vector.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in input.chars() {
        if is_word_char(c) {
            current.push(c);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Count occurrences of each token.
pub fn word_frequencies<S: AsRef<str>>(tokens: &[S]) -> HashMap<String, u32> {
    let mut frequencies = HashMap::new();
    for token in tokens {
        *frequencies.entry(token.as_ref().to_string()).or_insert(0) += 1;
    }
    frequencies
}

/// SHA-1 the token's UTF-8 bytes and fold the first 8 digest bytes into a
/// little-endian 64-bit integer.
fn token_hash(token: &str) -> u64 {
    let digest = Sha1::digest(token.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Compute the 64-bit SimHash of a term-frequency distribution.
///
/// Each distinct token votes on all 64 bit positions with weight equal to
/// its frequency: +f where its hash has a 1 bit, -f where it has a 0 bit.
/// Accumulator position 0 lands in the most significant bit of the result.
pub fn simhash(frequencies: &HashMap<String, u32>) -> u64 {
    let mut accumulator = [0i64; 64];
    for (token, &frequency) in frequencies {
        let hash = token_hash(token);
        let weight = i64::from(frequency);
        for (bit, slot) in accumulator.iter_mut().enumerate() {
            if (hash >> bit) & 1 == 1 {
                *slot += weight;
            } else {
                *slot -= weight;
            }
        }
    }
    let mut fingerprint = 0u64;
    for &total in &accumulator {
        fingerprint = (fingerprint << 1) | u64::from(total > 0);
    }
    fingerprint
}

/// Fraction of the 64 bit positions on which two fingerprints agree.
pub fn simhash_similarity(a: u64, b: u64) -> f64 {
    f64::from((a ^ b).count_zeros()) / 64.0
}

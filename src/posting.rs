// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The posting record: one (term, document) occurrence.
//!
//! A posting carries the document id, the in-document term frequency, and
//! three field flags recording whether the term appeared inside a heading,
//! a bold span, or the document title. Within one term's postings list the
//! document id is unique; re-inserting the same document merges into the
//! existing posting instead of duplicating it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub id: i64,
    pub frequency: u32,
    #[serde(default)]
    pub header: bool,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub title: bool,
}

impl Posting {
    pub fn new(id: i64, frequency: u32, header: bool, bold: bool, title: bool) -> Self {
        Posting {
            id,
            frequency,
            header,
            bold,
            title,
        }
    }

    /// Fold another posting for the same document into this one: frequencies
    /// add, field flags accumulate as a disjunction.
    pub fn merge(&mut self, other: &Posting) {
        debug_assert_eq!(self.id, other.id);
        self.frequency += other.frequency;
        self.header |= other.header;
        self.bold |= other.bold;
        self.title |= other.title;
    }

    /// Log-damped term frequency: `1 + log10(frequency)`.
    pub fn tf(&self) -> f64 {
        1.0 + f64::from(self.frequency).log10()
    }

    /// Term frequency normalized by the containing list's L2 length.
    pub fn tf_norm(&self, length: f64) -> f64 {
        self.tf() / length
    }
}

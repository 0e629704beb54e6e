// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Authority computation over the extracted link graph.
//!
//! Plain fixed-iteration power method with simultaneous (snapshot) updates:
//! `R'[i] = (1 - d) + d · Σ_{j → i} R[j] / out(j)`. There is no convergence
//! check; the iteration count is `min(|V|, max_iters)`, with a non-positive
//! `max_iters` meaning `|V|`. Dangling pages contribute nothing; their lost
//! mass is not redistributed. The final vector is normalized to sum to 1.

use std::collections::HashMap;

use crate::config::Config;
use crate::indexer::LinkGraph;

pub struct PageRanker {
    damping: f64,
    max_iters: i32,
}

impl PageRanker {
    pub fn new(damping: f64, max_iters: i32) -> Self {
        PageRanker { damping, max_iters }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.damping_factor, config.pagerank_max_iters)
    }

    /// Compute the PageRank of every node in `links`.
    pub fn run(&self, links: &LinkGraph) -> HashMap<i64, f64> {
        let mut ranks: HashMap<i64, f64> = links.iter().map(|(id, _)| (id, 1.0)).collect();

        let node_count = links.len();
        let iterations = if self.max_iters > 0 {
            node_count.min(self.max_iters as usize)
        } else {
            node_count
        };

        for _ in 0..iterations {
            let previous = ranks.clone();
            for (id, rank) in ranks.iter_mut() {
                let inflow: f64 = links
                    .get(*id)
                    .map(|entry| {
                        entry
                            .incoming
                            .iter()
                            .map(|source| {
                                let out = links
                                    .get(*source)
                                    .map(|e| e.out_degree)
                                    .unwrap_or(0);
                                previous[source] / f64::from(out.max(1))
                            })
                            .sum()
                    })
                    .unwrap_or(0.0);
                *rank = (1.0 - self.damping) + self.damping * inflow;
            }
        }

        let total: f64 = ranks.values().sum();
        if total > 0.0 {
            for rank in ranks.values_mut() {
                *rank /= total;
            }
        }
        ranks
    }
}

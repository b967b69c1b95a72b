//! Greedy near-duplicate clustering over perceptual digests.
//!
//! # Algorithm
//!
//! Candidates are visited in scan order. Each candidate not yet matched
//! becomes an anchor and is compared with every later unmatched candidate.
//! A candidate joins the anchor's group when the mean of its structural and
//! gradient Hamming distances to the anchor is at most the threshold.
//!
//! Groups are stars around their anchor: members are each close to the
//! anchor but are not checked against one another. The search is a plain
//! O(n²) scan with no index.

use std::collections::HashSet;

use super::groups::ImageRecord;
use crate::scanner::PerceptualDigests;

/// A cluster found by [`cluster_similar`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarCluster {
    /// Positions in the candidate slice; the anchor comes first and the
    /// rest follow in scan order.
    pub members: Vec<usize>,
    /// Smallest combined distance (whole bits) among the pairs that
    /// triggered inclusion.
    pub similarity: u32,
}

/// Pick the records that take part in similarity clustering.
///
/// Only records with perceptual digests qualify. When `collapse_exact` is
/// set, records sharing an exact digest are reduced to the first one
/// encountered, so byte-identical files are never compared again. Records
/// without an exact digest are never collapsed.
///
/// Returns indices into `records`, in scan order.
#[must_use]
pub fn select_candidates(records: &[ImageRecord], collapse_exact: bool) -> Vec<usize> {
    let mut seen: HashSet<&str> = HashSet::new();

    records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.perceptual.is_some())
        .filter(|(_, record)| match (collapse_exact, record.exact_digest.as_deref()) {
            (true, Some(digest)) => seen.insert(digest),
            _ => true,
        })
        .map(|(i, _)| i)
        .collect()
}

/// Cluster digests with the greedy anchor scan.
///
/// `on_anchor(done, total)` is called once per anchor visited, with a
/// monotonically increasing `done` count.
pub fn cluster_similar<F>(
    digests: &[&PerceptualDigests],
    threshold: u32,
    mut on_anchor: F,
) -> Vec<SimilarCluster>
where
    F: FnMut(usize, usize),
{
    let total = digests.len();
    let limit = threshold.saturating_mul(2);
    let mut matched = vec![false; total];
    let mut clusters = Vec::new();

    for i in 0..total {
        if matched[i] {
            continue;
        }

        on_anchor(i + 1, total);

        let anchor = digests[i];
        let mut members = vec![i];
        let mut min_sum = u32::MAX;

        for j in (i + 1)..total {
            if matched[j] {
                continue;
            }

            let sum = anchor.distance_sum(digests[j]);
            if sum <= limit {
                members.push(j);
                matched[j] = true;
                min_sum = min_sum.min(sum);
            }
        }

        if members.len() > 1 {
            matched[i] = true;
            log::debug!(
                "Similar cluster anchored at candidate {}: {} members, min distance {:.1}",
                i,
                members.len(),
                f64::from(min_sum) / 2.0
            );
            clusters.push(SimilarCluster {
                members,
                similarity: min_sum / 2,
            });
        }
    }

    clusters
}

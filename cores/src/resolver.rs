
use serde::Serialize;

use crate::directory::Candidate;
use crate::similarity;

pub const DEFAULT_MATCH_THRESHOLD: f64 = 90.0;

/// Knobs for accepting a fuzzy match.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchPolicy {
    /// Minimum score (inclusive) for a match to be accepted.
    pub threshold: f64,
    /// Score substring matches by length ratio instead of edit distance.
    pub containment: bool,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            containment: true,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// Set only when the best score reaches the policy threshold.
    pub candidate_id: Option<String>,
    /// The best candidate's name, present even when it was not accepted.
    pub display_name: Option<String>,
    pub score: f64,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        self.candidate_id.is_some()
    }

    fn empty() -> Self {
        Self {
            candidate_id: None,
            display_name: None,
            score: 0.0,
        }
    }
}

/// Best score of `query` against any of the candidate's names.
pub fn candidate_score(query: &str, candidate: &Candidate, policy: &MatchPolicy) -> f64 {
    candidate.names()
        .into_iter()
        .map(|name| similarity::score(query, name, policy.containment))
        .fold(0.0, f64::max)
}

/// Picks the best scoring candidate for `query`.
///
/// Equal scores keep the earlier candidate, so the result only depends on
/// input order when there is an exact tie.
pub fn resolve(query: &str, candidates: &[Candidate], policy: &MatchPolicy) -> MatchResult {
    let mut best: Option<(&Candidate, f64)> = None;
    for candidate in candidates {
        let score = candidate_score(query, candidate, policy);
        let improves = best.map_or(true, |(_, best_score)| score > best_score);
        if improves {
            best = Some((candidate, score));
        }
    }
    let Some((candidate, score)) = best else {
        return MatchResult::empty();
    };
    let candidate_id = if score >= policy.threshold {
        Some(candidate.id.clone())
    } else {
        None
    };
    MatchResult {
        candidate_id,
        display_name: Some(candidate.preferred_name().to_string()),
        score,
    }
}

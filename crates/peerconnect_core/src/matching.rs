//! crates/peerconnect_core/src/matching.rs
//!
//! Skill-overlap scoring and ranking of candidate profiles.
//! Only skills contribute to the score; interests are displayed but not ranked.

use std::collections::HashSet;

use crate::domain::{MatchResult, Profile};

fn skill_set(profile: &Profile) -> HashSet<String> {
    profile.skills.iter().map(|s| s.to_lowercase()).collect()
}

/// Number of distinct skills the two profiles share, compared case-insensitively.
pub fn score(reference: &Profile, candidate: &Profile) -> usize {
    let reference_skills = skill_set(reference);
    skill_set(candidate)
        .iter()
        .filter(|skill| reference_skills.contains(*skill))
        .count()
}

/// The candidate's skills that also appear in the reference profile, in the
/// candidate's order, each listed once.
pub fn shared_skills(reference: &Profile, candidate: &Profile) -> Vec<String> {
    let reference_skills = skill_set(reference);
    let mut seen = HashSet::new();
    candidate
        .skills
        .iter()
        .filter(|skill| {
            let folded = skill.to_lowercase();
            reference_skills.contains(&folded) && seen.insert(folded)
        })
        .cloned()
        .collect()
}

/// Scores every candidate against `reference` and orders them by descending score.
///
/// Ties keep the input order. Without a reference profile every score is 0
/// and the input order is returned unchanged.
pub fn rank(reference: Option<&Profile>, candidates: Vec<Profile>) -> Vec<MatchResult> {
    let mut results: Vec<MatchResult> = candidates
        .into_iter()
        .map(|candidate| {
            let score = reference.map_or(0, |r| score(r, &candidate));
            MatchResult { candidate, score }
        })
        .collect();

    // `sort_by` is stable.
    results.sort_by(|a, b| b.score.cmp(&a.score));
    results
}

/// Drops the reference's own record (matched by email) from a store listing.
pub fn others(reference: Option<&Profile>, all: Vec<Profile>) -> Vec<Profile> {
    match reference {
        Some(me) => all.into_iter().filter(|p| !p.has_email(&me.email)).collect(),
        None => all,
    }
}

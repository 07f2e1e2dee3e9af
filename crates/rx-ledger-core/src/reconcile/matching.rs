//! Advisory name similarity between family members.

use strsim::jaro_winkler;

use crate::models::FamilyMember;
use crate::report::PossibleMatch;

/// Existing members whose normalized names resemble `member`'s, best first.
///
/// Only members other than `member` itself are considered. The caller is
/// expected to pass members that share the same date-of-birth key.
pub fn similar_members(
    member: &FamilyMember,
    candidates: &[FamilyMember],
    threshold: f64,
) -> Vec<PossibleMatch> {
    let mut matches: Vec<PossibleMatch> = candidates
        .iter()
        .filter(|c| c.id != member.id)
        .filter_map(|c| {
            let similarity = jaro_winkler(&member.name_key, &c.name_key);
            (similarity >= threshold).then(|| PossibleMatch {
                family_member_id: c.id.clone(),
                name: c.name.clone(),
                similarity,
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches
}

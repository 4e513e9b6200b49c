use std::collections::HashMap;

use uuid::Uuid;

use crate::session::models::{LeaderboardEntry, ParticipantState};

/// Ranks participants by total score, highest first. Equal scores keep
/// join order so the ranking is stable between recomputations.
pub fn rank(participants: &HashMap<Uuid, ParticipantState>) -> Vec<LeaderboardEntry> {
    let mut standings: Vec<&ParticipantState> = participants.values().collect();
    standings.sort_by(|a, b| {
        b.total_score
            .cmp(&a.total_score)
            .then(a.join_seq.cmp(&b.join_seq))
    });

    standings
        .into_iter()
        .map(|p| LeaderboardEntry {
            participant_id: p.id,
            display_name: p.display_name.clone(),
            total_score: p.total_score,
        })
        .collect()
}

use super::Conflict;
use crate::model::{AssignmentId, MentorId, Registry, Session};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Première séance du mentor (toutes affectations, actives ou non) dont
/// l'instant est égal à l'un des candidats. L'égalité exacte est le seul
/// critère : aucune notion de durée ou de chevauchement.
pub(crate) fn find_collision(
    registry: &Registry,
    mentor: &MentorId,
    candidates: &[DateTime<Utc>],
    exclude: Option<&AssignmentId>,
) -> Option<Conflict> {
    if candidates.is_empty() {
        return None;
    }
    let wanted: HashSet<DateTime<Utc>> = candidates.iter().copied().collect();

    let owned: HashSet<&AssignmentId> = registry
        .assignments
        .iter()
        .filter(|a| &a.mentor == mentor && Some(&a.id) != exclude)
        .map(|a| &a.id)
        .collect();

    let mut hits: Vec<&Session> = registry
        .sessions
        .iter()
        .filter(|s| owned.contains(&s.assignment) && wanted.contains(&s.start_time))
        .collect();
    hits.sort_by_key(|s| (s.start_time, s.number));

    let hit = hits.first()?;
    let batch = registry
        .find_assignment(&hit.assignment)
        .and_then(|a| registry.find_batch(&a.batch));
    let class = batch.and_then(|b| registry.find_class(&b.class));

    Some(Conflict {
        mentor: mentor.clone(),
        assignment: hit.assignment.clone(),
        session: hit.id.clone(),
        at: hit.start_time,
        batch_name: batch.map_or_else(|| "?".to_string(), |b| b.name.clone()),
        class_name: class.map_or_else(|| "?".to_string(), |c| c.name.clone()),
    })
}

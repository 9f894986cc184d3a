use super::SchedError;
use crate::model::{BatchId, MentorId, Registry};

/// Contrôle ponctuel de charge : recalculé à chaque appel, sans compteur en cache.
/// Le plafond est inclusif (`load + taille == ceiling` passe).
pub(crate) fn check_capacity(
    registry: &Registry,
    mentor: &MentorId,
    candidate: &BatchId,
    ceiling: usize,
) -> Result<(), SchedError> {
    let current_load = registry.mentor_load(mentor);
    let candidate_size = registry.mentee_count(candidate);
    check_load(mentor, current_load, candidate_size, ceiling)
}

pub(crate) fn check_load(
    mentor: &MentorId,
    current_load: usize,
    candidate_size: usize,
    ceiling: usize,
) -> Result<(), SchedError> {
    if current_load + candidate_size > ceiling {
        return Err(SchedError::Capacity {
            mentor: mentor.clone(),
            current_load,
            candidate_size,
            ceiling,
        });
    }
    Ok(())
}

use super::SchedError;
use crate::model::{Batch, BatchId, ClassId, MenteeId, Registry};
use crate::policy::Policy;
use tracing::{info, warn};

/// Découpe d'un vivier de `pool_size` étudiants en tailles de batches
/// (3 batches standards au plus, reliquat autonome à partir de 10).
pub fn partition(pool_size: usize, min_batch_size: usize) -> Result<Vec<usize>, SchedError> {
    partition_with(pool_size, min_batch_size, 3, 10)
}

/// Variante paramétrée de [`partition`].
///
/// - Au plus `max_standard` batches pleins : le reste est ajouté au dernier.
/// - Au-delà : exactement `max_standard` batches pleins, puis le reste forme
///   un batch s'il atteint `min_leftover`, ou est réparti un par un sur les
///   premiers batches (ordre cyclique fixe).
pub fn partition_with(
    pool_size: usize,
    min_batch_size: usize,
    max_standard: usize,
    min_leftover: usize,
) -> Result<Vec<usize>, SchedError> {
    if min_batch_size == 0 || max_standard == 0 {
        return Err(SchedError::validation("batch sizing policy must be positive"));
    }
    if pool_size < min_batch_size {
        return Err(SchedError::InsufficientPool {
            available: pool_size,
            required: min_batch_size,
        });
    }

    let full_batches = pool_size / min_batch_size;
    let remainder = pool_size % min_batch_size;

    if full_batches <= max_standard {
        let mut sizes = vec![min_batch_size; full_batches];
        if remainder > 0 {
            match sizes.last_mut() {
                Some(last) => *last += remainder,
                None => sizes.push(remainder),
            }
        }
        return Ok(sizes);
    }

    let mut sizes = vec![min_batch_size; max_standard];
    let rest = pool_size - min_batch_size * max_standard;
    if rest >= min_leftover {
        sizes.push(rest);
    } else {
        for i in 0..rest {
            sizes[i % max_standard] += 1;
        }
    }
    Ok(sizes)
}

/// Prochain suffixe numérique libre pour `prefix` dans la classe (1 par défaut).
pub(crate) fn next_batch_number(registry: &Registry, class: &ClassId, prefix: &str) -> u32 {
    registry
        .batches_in_class(class)
        .filter_map(|b| b.name.strip_prefix(prefix))
        .filter(|suffix| !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|suffix| suffix.parse::<u32>().ok())
        .max()
        .map_or(1, |n| n + 1)
}

/// Place les étudiants sans batch de la classe, dans l'ordre des numéros
/// d'inscription, dans de nouveaux batches nommés séquentiellement.
pub(crate) fn auto_batch(
    registry: &mut Registry,
    class: &ClassId,
    policy: &Policy,
) -> Result<Vec<BatchId>, SchedError> {
    if registry.find_class(class).is_none() {
        return Err(SchedError::UnknownClass(class.to_string()));
    }
    let pool: Vec<MenteeId> = registry
        .unbatched_mentees(class)
        .into_iter()
        .map(|m| m.id.clone())
        .collect();
    let sizes = partition_with(
        pool.len(),
        policy.min_batch_size,
        policy.max_standard_batches,
        policy.min_leftover_batch,
    )?;

    let start = next_batch_number(registry, class, &policy.batch_prefix);
    let mut created = Vec::with_capacity(sizes.len());
    let mut cursor = 0usize;
    for (offset, size) in (0u32..).zip(sizes.iter().copied()) {
        let batch = Batch::new(format!("{}{}", policy.batch_prefix, start + offset), class.clone());
        let slice = &pool[cursor..cursor + size];
        for mentee in registry.mentees.iter_mut().filter(|m| slice.contains(&m.id)) {
            mentee.batch = Some(batch.id.clone());
        }
        cursor += size;
        created.push(batch.id.clone());
        registry.batches.push(batch);
    }

    info!(
        class = %class,
        batches = created.len(),
        students = pool.len(),
        ?sizes,
        "auto-batching done"
    );
    Ok(created)
}

/// Affectation manuelle d'étudiants à un batch existant de leur classe.
/// La capacité du mentor n'est pas revalidée (signalée seulement).
pub(crate) fn manual_batch(
    registry: &mut Registry,
    batch: &BatchId,
    students: &[MenteeId],
    policy: &Policy,
) -> Result<usize, SchedError> {
    if students.is_empty() {
        return Err(SchedError::validation(
            "You must select a batch and at least one student.",
        ));
    }
    let class = registry
        .find_batch(batch)
        .map(|b| b.class.clone())
        .ok_or_else(|| SchedError::UnknownBatch(batch.to_string()))?;

    for id in students {
        let mentee = registry
            .find_mentee(id)
            .ok_or_else(|| SchedError::UnknownMentee(id.to_string()))?;
        if mentee.class != class {
            return Err(SchedError::validation(format!(
                "student {} does not belong to the batch's class",
                mentee.reg_num
            )));
        }
    }

    let mut moved = 0usize;
    for mentee in registry.mentees.iter_mut().filter(|m| students.contains(&m.id)) {
        mentee.batch = Some(batch.clone());
        moved += 1;
    }

    if let Some(assignment) = registry.active_assignment_for_batch(batch) {
        let load = registry.mentor_load(&assignment.mentor);
        if load > policy.mentee_ceiling {
            warn!(
                mentor = %assignment.mentor,
                load,
                ceiling = policy.mentee_ceiling,
                "manual batching pushed mentor over the mentee ceiling"
            );
        }
    }
    info!(batch = %batch, moved, "manual batch assignment");
    Ok(moved)
}

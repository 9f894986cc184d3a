use super::{Env, SchedError};
use crate::model::{
    Class, ClassId, ImportId, Mentee, MenteeId, MenteeRow, Mentor, MentorId, PendingImport,
    Registry,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{info, warn};

pub(super) fn add_class(registry: &mut Registry, name: &str) -> Result<ClassId, SchedError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SchedError::validation("Class name cannot be empty."));
    }
    if registry.find_class_by_name(name).is_some() {
        return Err(SchedError::validation(format!("Class '{name}' already exists.")));
    }
    let class = Class::new(name);
    let id = class.id.clone();
    registry.insert_class(class)?;
    Ok(id)
}

pub(super) fn archive_class(registry: &mut Registry, id: &ClassId) -> Result<(), SchedError> {
    let class = registry
        .find_class_mut(id)
        .ok_or_else(|| SchedError::UnknownClass(id.to_string()))?;
    class.is_archived = true;
    Ok(())
}

pub(super) fn delete_class(registry: &mut Registry, id: &ClassId) -> Result<(), SchedError> {
    let name = registry
        .find_class(id)
        .map(|c| c.name.clone())
        .ok_or_else(|| SchedError::UnknownClass(id.to_string()))?;
    registry.remove_class(id);
    info!(class = %name, "class and its batches, assignments and sessions deleted");
    Ok(())
}

pub(super) fn add_mentor(registry: &mut Registry, mentor: Mentor) -> Result<MentorId, SchedError> {
    if mentor.name.trim().is_empty() {
        return Err(SchedError::validation("mentor name cannot be empty"));
    }
    let id = mentor.id.clone();
    registry.mentors.push(mentor);
    Ok(id)
}

pub(super) fn delete_mentor(registry: &mut Registry, id: &MentorId) -> Result<(), SchedError> {
    if registry.find_mentor(id).is_none() {
        return Err(SchedError::UnknownMentor(id.to_string()));
    }
    registry.remove_mentor(id);
    info!(mentor = %id, "mentor and their assignments deleted");
    Ok(())
}

pub(super) fn add_mentee(registry: &mut Registry, mentee: Mentee) -> Result<MenteeId, SchedError> {
    if mentee.reg_num.trim().is_empty() || mentee.name.trim().is_empty() {
        return Err(SchedError::validation("registration number and name are required"));
    }
    if registry.find_class(&mentee.class).is_none() {
        return Err(SchedError::UnknownClass(mentee.class.to_string()));
    }
    if registry.find_mentee_by_reg_num(&mentee.reg_num).is_some() {
        return Err(SchedError::validation(format!(
            "registration number {} already exists",
            mentee.reg_num
        )));
    }
    let id = mentee.id.clone();
    registry.insert_mentee(mentee)?;
    Ok(id)
}

/// Prépare un import : rien n'est créé avant `confirm_import`.
pub(super) fn stage_import(
    registry: &mut Registry,
    env: &Env<'_>,
    class: &ClassId,
    rows: Vec<MenteeRow>,
    now: DateTime<Utc>,
) -> Result<ImportId, SchedError> {
    if registry.find_class(class).is_none() {
        return Err(SchedError::UnknownClass(class.to_string()));
    }
    if rows.is_empty() {
        return Err(SchedError::validation("import contains no rows"));
    }
    registry.pending_imports.retain(|p| p.expires_at > now);

    let pending = PendingImport {
        id: ImportId::random(),
        class: class.clone(),
        rows,
        expires_at: now + env.policy.import_ttl(),
    };
    let id = pending.id.clone();
    info!(import = %id, rows = pending.rows.len(), "import staged");
    registry.pending_imports.push(pending);
    Ok(id)
}

pub(super) fn confirm_import(
    registry: &mut Registry,
    id: &ImportId,
    now: DateTime<Utc>,
) -> Result<Vec<MenteeId>, SchedError> {
    let pos = registry
        .pending_imports
        .iter()
        .position(|p| &p.id == id)
        .ok_or_else(|| SchedError::UnknownImport(id.to_string()))?;
    let pending = registry.pending_imports.remove(pos);
    if pending.expires_at <= now {
        warn!(import = %id, "staged import expired");
        return Err(SchedError::validation("staged import has expired, upload the file again"));
    }

    {
        let mut seen = HashSet::new();
        for row in &pending.rows {
            if !seen.insert(row.reg_num.as_str())
                || registry.find_mentee_by_reg_num(&row.reg_num).is_some()
            {
                return Err(SchedError::validation(format!(
                    "registration number {} already exists",
                    row.reg_num
                )));
            }
        }
    }

    let mut created = Vec::with_capacity(pending.rows.len());
    for row in pending.rows {
        let mut mentee = Mentee::new(row.reg_num, row.name, pending.class.clone());
        mentee.email = row.email;
        created.push(mentee.id.clone());
        registry.insert_mentee(mentee)?;
    }
    info!(import = %id, created = created.len(), "import confirmed");
    Ok(created)
}

pub(super) fn discard_import(registry: &mut Registry, id: &ImportId) -> Result<(), SchedError> {
    let before = registry.pending_imports.len();
    registry.pending_imports.retain(|p| &p.id != id);
    if registry.pending_imports.len() == before {
        return Err(SchedError::UnknownImport(id.to_string()));
    }
    Ok(())
}

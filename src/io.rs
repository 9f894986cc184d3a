use crate::model::{MenteeRow, Registry, SessionStatus};
use anyhow::{bail, Context};
use chrono_tz::Tz;
use csv::{ReaderBuilder, WriterBuilder};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Import d'étudiants depuis CSV : header `reg_num,name[,email]`.
pub fn read_mentee_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<MenteeRow>> {
    let path = path.as_ref();
    let rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    parse_mentee_rows(rdr)
}

pub fn parse_mentee_rows<R: std::io::Read>(mut rdr: csv::Reader<R>) -> anyhow::Result<Vec<MenteeRow>> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for (line, rec) in rdr.records().enumerate() {
        let rec = rec?;
        let row = line + 2;
        let reg_num = rec.get(0).context("missing reg_num")?.trim();
        let name = rec.get(1).context("missing name")?.trim();
        if reg_num.is_empty() || name.is_empty() {
            bail!("row {row}: registration number and name are required");
        }
        if !seen.insert(reg_num.to_string()) {
            bail!("row {row}: duplicate registration number {reg_num}");
        }
        let email = rec
            .get(2)
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        if let Some(email) = &email {
            if !email.contains('@') {
                bail!("row {row}: invalid email {email}");
            }
        }
        out.push(MenteeRow {
            reg_num: reg_num.to_string(),
            name: name.to_string(),
            email,
        });
    }
    Ok(out)
}

/// Enregistrement exportable : liste de champs explicite, sans introspection.
pub trait CsvRecord {
    fn header() -> &'static [&'static str];
    fn fields(&self) -> Vec<String>;
}

/// Vue plate d'une séance pour l'export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRow {
    pub session_id: String,
    pub number: u32,
    pub class: String,
    pub batch: String,
    pub mentor: String,
    pub start_utc: String,
    pub start_local: String,
    pub status: SessionStatus,
}

impl CsvRecord for SessionRow {
    fn header() -> &'static [&'static str] {
        &[
            "session_id",
            "number",
            "class",
            "batch",
            "mentor",
            "start_utc",
            "start_local",
            "status",
        ]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.session_id.clone(),
            self.number.to_string(),
            self.class.clone(),
            self.batch.clone(),
            self.mentor.clone(),
            self.start_utc.clone(),
            self.start_local.clone(),
            self.status.to_string(),
        ]
    }
}

/// Séances triées chronologiquement, heures locales dans `zone`.
pub fn session_rows(registry: &Registry, zone: Tz) -> Vec<SessionRow> {
    let mut sessions: Vec<_> = registry.sessions.iter().collect();
    sessions.sort_by_key(|s| (s.start_time, s.number));
    sessions
        .into_iter()
        .map(|s| {
            let assignment = registry.find_assignment(&s.assignment);
            let batch = assignment.and_then(|a| registry.find_batch(&a.batch));
            let class = batch.and_then(|b| registry.find_class(&b.class));
            let mentor = assignment.and_then(|a| registry.find_mentor(&a.mentor));
            SessionRow {
                session_id: s.id.as_str().to_string(),
                number: s.number,
                class: class.map(|c| c.name.clone()).unwrap_or_default(),
                batch: batch.map(|b| b.name.clone()).unwrap_or_default(),
                mentor: mentor.map(|m| m.name.clone()).unwrap_or_default(),
                start_utc: s.start_time.to_rfc3339(),
                start_local: s.start_time.with_timezone(&zone).format("%Y-%m-%d %H:%M").to_string(),
                status: s.status,
            }
        })
        .collect()
}

pub fn write_records<W: std::io::Write, R: CsvRecord>(writer: W, rows: &[R]) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(false).from_writer(writer);
    w.write_record(R::header())?;
    for row in rows {
        w.write_record(row.fields())?;
    }
    w.flush()?;
    Ok(())
}

/// Export CSV des séances.
pub fn export_sessions_csv<P: AsRef<Path>>(path: P, registry: &Registry, zone: Tz) -> anyhow::Result<()> {
    let path = path.as_ref();
    let file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_records(file, &session_rows(registry, zone))
}

/// Export JSON du registre (jolie mise en forme)
pub fn export_registry_json<P: AsRef<Path>>(path: P, registry: &Registry) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(registry)?;
    fs::write(path, s)?;
    Ok(())
}

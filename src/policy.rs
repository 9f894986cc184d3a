use anyhow::{bail, Context};
use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Borne des durées en minutes (un an).
pub const MAX_POLICY_MINUTES: i64 = 525_600;

/// Paramètres institutionnels du planificateur.
///
/// Les valeurs par défaut reproduisent les règles en vigueur : plafond de
/// 45 étudiants par mentor, batches de 20, fuseau `Asia/Kolkata`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub mentee_ceiling: usize,
    pub min_batch_size: usize,
    /// Nombre de batches pleins émis avant de traiter le reliquat.
    pub max_standard_batches: usize,
    /// Taille minimale d'un reliquat pour former son propre batch.
    pub min_leftover_batch: usize,
    pub missed_grace_minutes: i64,
    pub live_window_minutes: i64,
    /// Nom IANA du fuseau d'affichage et de saisie.
    pub timezone: String,
    pub batch_prefix: String,
    pub import_ttl_minutes: i64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            mentee_ceiling: 45,
            min_batch_size: 20,
            max_standard_batches: 3,
            min_leftover_batch: 10,
            missed_grace_minutes: 60,
            live_window_minutes: 60,
            timezone: "Asia/Kolkata".to_string(),
            batch_prefix: "B".to_string(),
            import_ttl_minutes: 30,
        }
    }
}

impl Policy {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let policy: Policy = serde_json::from_slice(&data)
            .with_context(|| format!("parsing policy {}", path.display()))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.min_batch_size == 0 {
            bail!("min_batch_size must be > 0");
        }
        if self.max_standard_batches == 0 {
            bail!("max_standard_batches must be > 0");
        }
        if self.missed_grace_minutes < 0 || self.live_window_minutes <= 0 {
            bail!("grace and live window durations must be positive");
        }
        if self.import_ttl_minutes <= 0 {
            bail!("import_ttl_minutes must be > 0");
        }
        for (name, minutes) in [
            ("missed_grace_minutes", self.missed_grace_minutes),
            ("live_window_minutes", self.live_window_minutes),
            ("import_ttl_minutes", self.import_ttl_minutes),
        ] {
            if minutes > MAX_POLICY_MINUTES {
                bail!("{name} must not exceed {MAX_POLICY_MINUTES}");
            }
        }
        if self.batch_prefix.is_empty() || self.batch_prefix.chars().any(|c| c.is_ascii_digit()) {
            bail!("batch_prefix must be non-empty and contain no digits");
        }
        self.zone()?;
        Ok(())
    }

    /// Fuseau institutionnel.
    pub fn zone(&self) -> anyhow::Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("unknown time zone {}: {e}", self.timezone))
    }

    pub fn missed_grace(&self) -> Duration {
        Duration::minutes(self.missed_grace_minutes)
    }

    pub fn live_window(&self) -> Duration {
        Duration::minutes(self.live_window_minutes)
    }

    pub fn import_ttl(&self) -> Duration {
        Duration::minutes(self.import_ttl_minutes)
    }
}

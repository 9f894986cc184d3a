use super::types::SchedError;
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use tracing::debug;

/// Au-delà, la règle de congé est considérée comme excluant toute date.
const MAX_CONSECUTIVE_SKIPS: u32 = 520;

/// Récurrence hebdomadaire fixe : jour + heure locale, `count` occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceSpec {
    pub start_date: NaiveDate,
    pub weekday: Weekday,
    pub time: NaiveTime,
    pub count: u32,
}

impl RecurrenceSpec {
    pub fn new(
        start_date: NaiveDate,
        weekday: Weekday,
        time: NaiveTime,
        count: u32,
    ) -> Result<Self, SchedError> {
        if count < 1 {
            return Err(SchedError::validation("number of weeks must be at least 1"));
        }
        Ok(Self {
            start_date,
            weekday,
            time,
            count,
        })
    }

    /// Saisie brute : date `YYYY-MM-DD`, jour 0..=6 (0 = lundi), heure `HH:MM`.
    pub fn parse(start_date: &str, weekday: u8, time: &str, count: u32) -> Result<Self, SchedError> {
        let start_date = NaiveDate::parse_from_str(start_date.trim(), "%Y-%m-%d").map_err(|_| {
            SchedError::validation(format!("invalid start date '{start_date}', expected YYYY-MM-DD"))
        })?;
        let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
            .map_err(|_| SchedError::validation(format!("invalid time '{time}', expected HH:MM")))?;
        Self::new(start_date, weekday_from_index(weekday)?, time, count)
    }

    /// Instants UTC des séances, congés exclus.
    pub fn instants(&self, zone: Tz) -> Result<Vec<DateTime<Utc>>, SchedError> {
        let local = generate_occurrences(
            self.start_date,
            self.weekday,
            self.time,
            self.count,
            is_third_saturday,
        )?;
        let out = local
            .iter()
            .map(|dt| localize(*dt, zone))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            count = out.len(),
            first = ?out.first(),
            last = ?out.last(),
            "generated weekly calendar"
        );
        Ok(out)
    }
}

pub fn weekday_from_index(index: u8) -> Result<Weekday, SchedError> {
    Ok(match index {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        6 => Weekday::Sun,
        _ => {
            return Err(SchedError::validation(format!(
                "invalid day of week {index}, expected 0 (Monday) to 6 (Sunday)"
            )))
        }
    })
}

/// Samedi tombant du 15 au 21 du mois (approximation du « troisième samedi »).
pub fn is_third_saturday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Sat && (15..=21).contains(&date.day())
}

/// Occurrences locales : premier `weekday` à partir de `start_date` (inclus),
/// puis pas de 7 jours en sautant les dates où `holiday` est vrai.
pub fn generate_occurrences<H>(
    start_date: NaiveDate,
    weekday: Weekday,
    time: NaiveTime,
    count: u32,
    holiday: H,
) -> Result<Vec<NaiveDateTime>, SchedError>
where
    H: Fn(NaiveDate) -> bool,
{
    if count < 1 {
        return Err(SchedError::validation("number of weeks must be at least 1"));
    }
    let days_ahead = (7 + weekday.num_days_from_monday() - start_date.weekday().num_days_from_monday()) % 7;
    let mut current = advance(start_date, u64::from(days_ahead))?;

    let wanted = count as usize;
    let mut out = Vec::with_capacity(wanted);
    let mut skipped = 0u32;
    loop {
        if holiday(current) {
            skipped += 1;
            if skipped > MAX_CONSECUTIVE_SKIPS {
                return Err(SchedError::validation(
                    "holiday rule excludes every candidate date",
                ));
            }
        } else {
            skipped = 0;
            out.push(current.and_time(time));
            if out.len() == wanted {
                return Ok(out);
            }
        }
        current = advance(current, 7)?;
    }
}

/// Heure locale du fuseau institutionnel → instant UTC.
pub fn localize(local: NaiveDateTime, zone: Tz) -> Result<DateTime<Utc>, SchedError> {
    zone.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            SchedError::validation(format!("{local} does not exist in time zone {}", zone.name()))
        })
}

fn advance(date: NaiveDate, days: u64) -> Result<NaiveDate, SchedError> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(|| SchedError::validation("date overflow while generating calendar"))
}

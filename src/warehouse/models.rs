//! Typed row structs for the star schema.
//!
//! One struct per table, field order matching the declared column order in
//! `schema.rs`. Transformations in the etl module produce these; the store
//! binds them to the generated INSERT statements.

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Timelike, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct SongRow {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i64,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRow {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub user_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeRow {
    /// Epoch milliseconds, the semantic key of the time table.
    pub start_time: i64,
    pub hour: u32,
    pub day: u32,
    /// Week of year, zero-padded two digits, Sunday-first-week convention
    /// ("00".."53"): days before the year's first Sunday fall in week 00.
    pub week: String,
    pub month: u32,
    pub year: i32,
    /// 0 = Monday .. 6 = Sunday.
    pub weekday: u32,
}

impl TimeRow {
    /// Derive the full time dimension from a millisecond epoch timestamp,
    /// decomposed on the UTC wall clock. Pure and deterministic.
    pub fn from_epoch_ms(ts: i64) -> Result<TimeRow> {
        let datetime: DateTime<Utc> = DateTime::from_timestamp_millis(ts)
            .with_context(|| format!("Timestamp {} is out of range", ts))?;
        Ok(TimeRow {
            start_time: ts,
            hour: datetime.hour(),
            day: datetime.day(),
            week: format!("{:02}", sunday_week_of_year(&datetime)),
            month: datetime.month(),
            year: datetime.year(),
            weekday: datetime.weekday().num_days_from_monday(),
        })
    }
}

/// Week number with Sunday as the first day of the week, as strftime's %U
/// computes it: (yday + 7 - wday) / 7 with zero-based yday and Sunday = 0.
fn sunday_week_of_year(datetime: &DateTime<Utc>) -> u32 {
    let yday = datetime.ordinal0();
    let wday = datetime.weekday().num_days_from_sunday();
    (yday + 7 - wday) / 7
}

#[derive(Debug, Clone, PartialEq)]
pub struct SongplayRow {
    pub start_time: i64,
    pub user_id: Option<i64>,
    pub level: Option<String>,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

fn push_bulk_field(line: &mut String, value: Option<&str>) {
    if !line.is_empty() {
        line.push(',');
    }
    if let Some(value) = value {
        line.push_str(value);
    }
}

impl UserRow {
    /// One header-less comma-separated record in the users column order.
    /// Empty fields load as NULL. Returns None when a field itself contains
    /// the delimiter: such a row cannot take the bulk path and the caller
    /// skips it.
    pub fn bulk_record(&self) -> Option<String> {
        let text_fields = [
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            self.gender.as_deref(),
            self.level.as_deref(),
        ];
        if text_fields.iter().flatten().any(|f| f.contains(',')) {
            return None;
        }

        let user_id = self.user_id.to_string();
        let mut line = String::new();
        push_bulk_field(&mut line, Some(&user_id));
        for field in text_fields {
            push_bulk_field(&mut line, field);
        }
        Some(line)
    }
}

impl TimeRow {
    /// One header-less comma-separated record in the time column order.
    pub fn bulk_record(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            self.start_time, self.hour, self.day, self.week, self.month, self.year, self.weekday
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_derivation_matches_known_timestamps() {
        // 2018-11-15T00:30:26.796Z, a Thursday
        let row = TimeRow::from_epoch_ms(1542241826796).unwrap();
        assert_eq!(row.start_time, 1542241826796);
        assert_eq!(row.hour, 0);
        assert_eq!(row.day, 15);
        assert_eq!(row.week, "45");
        assert_eq!(row.month, 11);
        assert_eq!(row.year, 2018);
        assert_eq!(row.weekday, 3);

        // 2018-11-01T20:57:10.796Z
        let row = TimeRow::from_epoch_ms(1541105830796).unwrap();
        assert_eq!(row.hour, 20);
        assert_eq!(row.week, "43");
    }

    #[test]
    fn days_before_first_sunday_are_week_zero() {
        // 2018-01-01 was a Monday
        let row = TimeRow::from_epoch_ms(1514764800000).unwrap();
        assert_eq!(row.week, "00");
        assert_eq!(row.weekday, 0);

        // 2019-01-01 was a Tuesday
        let row = TimeRow::from_epoch_ms(1546300800000).unwrap();
        assert_eq!(row.week, "00");
        assert_eq!(row.weekday, 1);
    }

    #[test]
    fn time_derivation_is_deterministic_and_bounded() {
        for ts in [0, 1541105830796, 1542241826796, 1700000000123] {
            let a = TimeRow::from_epoch_ms(ts).unwrap();
            let b = TimeRow::from_epoch_ms(ts).unwrap();
            assert_eq!(a, b);
            assert!(a.hour <= 23);
            assert!(a.weekday <= 6);
            assert!((1..=12).contains(&a.month));
        }
    }

    #[test]
    fn bulk_records_follow_declared_column_order() {
        let user = UserRow {
            user_id: 39,
            first_name: Some("Walter".to_string()),
            last_name: Some("Frye".to_string()),
            gender: Some("M".to_string()),
            level: None,
        };
        assert_eq!(user.bulk_record().as_deref(), Some("39,Walter,Frye,M,"));

        let time = TimeRow::from_epoch_ms(1542241826796).unwrap();
        assert_eq!(time.bulk_record(), "1542241826796,0,15,45,11,2018,3");
    }

    #[test]
    fn user_row_with_delimiter_in_a_field_has_no_bulk_record() {
        let user = UserRow {
            user_id: 12,
            first_name: Some("Mary, Jr.".to_string()),
            last_name: Some("Frye".to_string()),
            gender: Some("F".to_string()),
            level: Some("paid".to_string()),
        };
        assert_eq!(user.bulk_record(), None);
    }
}

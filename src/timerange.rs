use crate::error::{Error, Result};
use crate::ir::{display, SeriesPoint};
use crate::operator::Operator;
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, Timelike};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::trace;

/// Granularity of time buckets on a date x axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timerange {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Timerange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timerange::Hour => "hour",
            Timerange::Day => "day",
            Timerange::Week => "week",
            Timerange::Month => "month",
            Timerange::Year => "year",
        }
    }

    /// Plural unit name used for date arithmetic (`days`, `weeks`...).
    pub fn units(&self) -> &'static str {
        match self {
            Timerange::Hour => "hours",
            Timerange::Day => "days",
            Timerange::Week => "weeks",
            Timerange::Month => "months",
            Timerange::Year => "years",
        }
    }

    pub fn from_units(units: &str) -> Result<Self> {
        match units {
            "hours" => Ok(Timerange::Hour),
            "days" => Ok(Timerange::Day),
            "weeks" => Ok(Timerange::Week),
            "months" => Ok(Timerange::Month),
            "years" => Ok(Timerange::Year),
            other => Err(Error::UnsupportedUnit(other.to_string())),
        }
    }

    /// strftime pattern of a bucket key.
    pub fn bucket_format(&self) -> &'static str {
        format_for_units(self.units())
    }
}

impl FromStr for Timerange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hour" => Ok(Timerange::Hour),
            "day" => Ok(Timerange::Day),
            "week" => Ok(Timerange::Week),
            "month" => Ok(Timerange::Month),
            "year" => Ok(Timerange::Year),
            other => Err(Error::UnsupportedTimerange(other.to_string())),
        }
    }
}

impl fmt::Display for Timerange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Date parsing and formatting
// =============================================================================

/// Shape of a raw date value: date-time when it has a colon, year-month
/// when it has exactly one dash, plain date otherwise.
pub fn date_format_for(raw: &str) -> &'static str {
    if raw.contains(':') {
        "%Y-%m-%d %H:%M:%S"
    } else if raw.matches('-').count() == 1 {
        "%Y-%m"
    } else {
        "%Y-%m-%d"
    }
}

/// Bucket key format for a plural unit name. Unknown units get the
/// hour format.
pub fn format_for_units(units: &str) -> &'static str {
    match units {
        "days" => "%Y-%m-%d",
        "weeks" => "%Y-%W",
        "months" => "%Y-%m",
        "years" => "%Y",
        _ => "%Y-%m-%d %H:%M",
    }
}

fn invalid(raw: &str) -> Error {
    Error::InvalidDate(raw.to_string())
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

fn year_month(raw: &str) -> Result<(i32, u32)> {
    let (year, rest) = raw.split_once('-').ok_or_else(|| invalid(raw))?;
    let year = year.trim().parse::<i32>().map_err(|_| invalid(raw))?;
    let second = rest.trim().parse::<u32>().map_err(|_| invalid(raw))?;
    Ok((year, second))
}

fn first_of_month(raw: &str) -> Result<NaiveDateTime> {
    let (year, month) = year_month(raw)?;
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(midnight)
        .ok_or_else(|| invalid(raw))
}

fn first_of_year(raw: &str) -> Result<NaiveDateTime> {
    let year = raw.trim().parse::<i32>().map_err(|_| invalid(raw))?;
    NaiveDate::from_ymd_opt(year, 1, 1)
        .map(midnight)
        .ok_or_else(|| invalid(raw))
}

/// Sunday closing week `week` of `year`, with weeks numbered like `%W`
/// (week 1 starts on the first Monday, days before it are week 0).
fn sunday_of_week(year: i32, week: u32) -> Option<NaiveDate> {
    if week > 53 {
        return None;
    }
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let first_weekday = jan1.weekday().num_days_from_monday() as i64;
    let offset = if week == 0 {
        6 - first_weekday
    } else {
        (7 - first_weekday) % 7 + 7 * (week as i64 - 1) + 6
    };
    jan1.checked_add_signed(Duration::days(offset))
}

/// Parse a raw x value as found in records.
pub fn parse_raw_date(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    match date_format_for(raw) {
        "%Y-%m-%d %H:%M:%S" => NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M"))
            .map_err(|_| invalid(raw)),
        "%Y-%m" => first_of_month(raw),
        _ if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) => first_of_year(raw),
        _ => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(midnight)
            .map_err(|_| invalid(raw)),
    }
}

/// Parse a bucket key produced by [`format_bucket`].
pub fn parse_bucket(key: &str, timerange: Timerange) -> Result<NaiveDateTime> {
    match timerange {
        Timerange::Hour => {
            let head = key.get(..16).unwrap_or(key);
            NaiveDateTime::parse_from_str(head, "%Y-%m-%d %H:%M").map_err(|_| invalid(key))
        }
        Timerange::Day => {
            let head = key.get(..10).unwrap_or(key);
            NaiveDate::parse_from_str(head, "%Y-%m-%d")
                .map(midnight)
                .map_err(|_| invalid(key))
        }
        Timerange::Week => {
            let (year, week) = year_month(key)?;
            sunday_of_week(year, week)
                .map(midnight)
                .ok_or_else(|| invalid(key))
        }
        Timerange::Month => first_of_month(key),
        Timerange::Year => first_of_year(key),
    }
}

pub fn format_bucket(date: &NaiveDateTime, timerange: Timerange) -> String {
    // Hour keys always read HH:00
    let start = match timerange {
        Timerange::Hour => date.with_minute(0).unwrap_or(*date),
        _ => *date,
    };
    start.format(timerange.bucket_format()).to_string()
}

/// Re-key a raw date value to its bucket.
pub fn convert_date(raw: &Json, timerange: Timerange) -> Result<String> {
    let text = match raw {
        Json::String(s) => s.as_str(),
        other => return Err(Error::InvalidDate(display(other))),
    };
    // Keys that are already buckets of this timerange stay as they are
    if let Ok(date) = parse_bucket(text, timerange) {
        if format_bucket(&date, timerange) == text {
            return Ok(text.to_string());
        }
    }
    Ok(format_bucket(&parse_raw_date(text)?, timerange))
}

fn add_units(date: NaiveDateTime, interval: u32, timerange: Timerange) -> Option<NaiveDateTime> {
    match timerange {
        Timerange::Hour => date.checked_add_signed(Duration::hours(interval as i64)),
        Timerange::Day => date.checked_add_signed(Duration::days(interval as i64)),
        Timerange::Week => date.checked_add_signed(Duration::weeks(interval as i64)),
        Timerange::Month => date.checked_add_months(Months::new(interval)),
        Timerange::Year => date.checked_add_months(Months::new(interval.saturating_mul(12))),
    }
}

/// Add `interval` of a plural unit (`days`, `weeks`, `months`, `years`,
/// `hours`). Month arithmetic clamps the day to the end of the month.
pub fn add_time_unit(date: NaiveDateTime, interval: u32, units: &str) -> Result<NaiveDateTime> {
    let timerange = Timerange::from_units(units)?;
    add_units(date, interval, timerange).ok_or_else(|| Error::InvalidDate(format!("{} + {} {}", date, interval, units)))
}

// =============================================================================
// Gap detection
// =============================================================================

fn missing_between(
    earlier: &str,
    later: &str,
    timerange: Timerange,
    interval: u32,
) -> Result<Vec<String>> {
    let start = parse_bucket(earlier, timerange)?;
    let end = parse_bucket(later, timerange)?;
    let step = |d: NaiveDateTime| {
        add_units(d, interval, timerange).ok_or_else(|| invalid(&format_bucket(&d, timerange)))
    };

    let mut missing = Vec::new();
    let mut next = step(start)?;
    while next < end {
        missing.push(format_bucket(&next, timerange));
        next = step(next)?;
    }
    Ok(missing)
}

fn check_interval(interval: u32) -> Result<()> {
    if interval == 0 {
        return Err(Error::Validation("interval must be a positive integer".to_string()));
    }
    Ok(())
}

/// Bucket keys absent between consecutive entries of `dates`.
///
/// A single key is returned unchanged.
pub fn missing_consecutive_dates(dates: &[String], timerange: Timerange, interval: u32) -> Result<Vec<String>> {
    check_interval(interval)?;
    if dates.len() == 1 {
        return Ok(dates.to_vec());
    }
    let mut sorted = dates.to_vec();
    sorted.sort();

    let mut missing = Vec::new();
    for pair in sorted.windows(2) {
        missing.extend(missing_between(&pair[0], &pair[1], timerange, interval)?);
    }
    Ok(missing)
}

fn month_difference(from: &NaiveDateTime, to: &NaiveDateTime) -> i64 {
    let mut months = (to.year() as i64 - from.year() as i64) * 12 + to.month() as i64 - from.month() as i64;
    let rest_from = (from.day(), from.time());
    let rest_to = (to.day(), to.time());
    if months > 0 && rest_to < rest_from {
        months -= 1;
    } else if months < 0 && rest_to > rest_from {
        months += 1;
    }
    months
}

/// Whether every adjacent pair of keys is exactly one unit apart.
pub fn check_dates_consecutive(dates: &[String], units: &str) -> Result<bool> {
    match dates.len() {
        0 => return Ok(false),
        1 => return Ok(true),
        _ => {}
    }
    let timerange = Timerange::from_units(units)?;

    for pair in dates.windows(2) {
        let a = parse_bucket(&pair[0], timerange)?;
        let b = parse_bucket(&pair[1], timerange)?;
        let elapsed = b - a;
        let one_apart = match timerange {
            Timerange::Hour => (elapsed.num_seconds() as f64 / 3600.0).abs() == 1.0,
            Timerange::Day => elapsed.num_days().abs() == 1,
            Timerange::Week => elapsed.num_days().div_euclid(7).abs() == 1,
            Timerange::Month => month_difference(&a, &b).abs() == 1,
            Timerange::Year => (month_difference(&a, &b) / 12).abs() == 1,
        };
        if !one_apart {
            return Ok(false);
        }
    }
    Ok(true)
}

// =============================================================================
// Series re-bucketing
// =============================================================================

/// Re-key every point to its bucket and merge points that share
/// `(bucket, type, stacked)`, re-applying the first point's operator.
pub fn combine(points: Vec<SeriesPoint>, timerange: Timerange) -> Result<Vec<SeriesPoint>> {
    let mut merged: Vec<(SeriesPoint, Vec<f64>)> = Vec::new();
    let mut index: HashMap<(String, String, Option<String>), usize> = HashMap::new();

    for point in points {
        let bucket = convert_date(&point.x, timerange)?;
        let key = (bucket.clone(), display(&point.series), point.stacked.clone());
        match index.get(&key) {
            Some(&i) => merged[i].1.push(point.value),
            None => {
                index.insert(key, merged.len());
                let value = point.value;
                merged.push((
                    SeriesPoint {
                        x: Json::String(bucket),
                        ..point
                    },
                    vec![value],
                ));
            }
        }
    }

    merged
        .into_iter()
        .map(|(first, values)| {
            let operator = first.operator.unwrap_or(Operator::Sum).for_merge();
            Ok(SeriesPoint {
                value: operator.reduce(&values)?,
                ..first
            })
        })
        .collect()
}

/// Insert zero-valued placeholders for the buckets missing inside each
/// `(type, stacked)` series. Each series is emitted in ascending x order.
///
/// The number of placeholders grows with the date span, not the input size.
pub fn fill_gaps(points: Vec<SeriesPoint>, timerange: Timerange, interval: u32) -> Result<Vec<SeriesPoint>> {
    check_interval(interval)?;

    let mut series: Vec<Vec<SeriesPoint>> = Vec::new();
    let mut index: HashMap<(String, Option<String>), usize> = HashMap::new();
    for point in points {
        let key = (display(&point.series), point.stacked.clone());
        match index.get(&key) {
            Some(&i) => series[i].push(point),
            None => {
                index.insert(key, series.len());
                series.push(vec![point]);
            }
        }
    }

    let mut filled = Vec::new();
    for mut group in series {
        group.sort_by_key(|p| display(&p.x));
        let mut inserted = 0;
        let last = group.len() - 1;
        for (i, point) in group.iter().enumerate() {
            filled.push(point.clone());
            if i == last {
                break;
            }
            let next = &group[i + 1];
            for key in missing_between(&display(&point.x), &display(&next.x), timerange, interval)? {
                filled.push(SeriesPoint::placeholder(key, point));
                inserted += 1;
            }
        }
        trace!(series = %display(&group[0].series), points = group.len(), inserted, "filled time gaps");
    }
    Ok(filled)
}

/// Re-bucket then gap-fill.
pub fn process_timerange_data(points: Vec<SeriesPoint>, timerange: Timerange, interval: u32) -> Result<Vec<SeriesPoint>> {
    let combined = combine(points, timerange)?;
    fill_gaps(combined, timerange, interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(x: &str, value: f64, series: &str, operator: Operator) -> SeriesPoint {
        SeriesPoint {
            x: json!(x),
            value,
            series: json!(series),
            operator: Some(operator),
            stacked: None,
        }
    }

    fn xs(points: &[SeriesPoint]) -> Vec<String> {
        points.iter().map(|p| display(&p.x)).collect()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_timerange() {
        assert_eq!("week".parse::<Timerange>().unwrap(), Timerange::Week);
        let err = "decade".parse::<Timerange>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported timerange: decade");
        let err = Timerange::from_units("decades").unwrap_err();
        assert_eq!(err.to_string(), "Unsupported units: decades");
    }

    #[test]
    fn test_date_format_for() {
        assert_eq!(date_format_for("2024-01-01 10:00:00"), "%Y-%m-%d %H:%M:%S");
        assert_eq!(date_format_for("2024-01"), "%Y-%m");
        assert_eq!(date_format_for("2024-01-01"), "%Y-%m-%d");
    }

    #[test]
    fn test_format_for_units() {
        assert_eq!(format_for_units("days"), "%Y-%m-%d");
        assert_eq!(format_for_units("weeks"), "%Y-%W");
        assert_eq!(format_for_units("months"), "%Y-%m");
        assert_eq!(format_for_units("years"), "%Y");
        assert_eq!(format_for_units("hours"), "%Y-%m-%d %H:%M");
        assert_eq!(Timerange::Day.bucket_format(), "%Y-%m-%d");
    }

    #[test]
    fn test_convert_date() {
        let raw = json!("2024-03-15 13:45:12");
        assert_eq!(convert_date(&raw, Timerange::Hour).unwrap(), "2024-03-15 13:00");
        assert_eq!(convert_date(&raw, Timerange::Day).unwrap(), "2024-03-15");
        assert_eq!(convert_date(&raw, Timerange::Week).unwrap(), "2024-11");
        assert_eq!(convert_date(&raw, Timerange::Month).unwrap(), "2024-03");
        assert_eq!(convert_date(&raw, Timerange::Year).unwrap(), "2024");
        assert_eq!(convert_date(&json!("2024-03"), Timerange::Day).unwrap(), "2024-03-01");
        assert_eq!(convert_date(&json!("2024-03-15 13:45"), Timerange::Hour).unwrap(), "2024-03-15 13:00");
    }

    #[test]
    fn test_convert_date_rejects_garbage() {
        assert!(matches!(convert_date(&json!("yesterday"), Timerange::Day), Err(Error::InvalidDate(_))));
        assert!(matches!(convert_date(&json!(false), Timerange::Day), Err(Error::InvalidDate(_))));
    }

    #[test]
    fn test_week_numbers_follow_monday_weeks() {
        // 2023-01-01 is a Sunday: it belongs to week 0
        assert_eq!(convert_date(&json!("2023-01-01"), Timerange::Week).unwrap(), "2023-00");
        assert_eq!(convert_date(&json!("2023-01-02"), Timerange::Week).unwrap(), "2023-01");
        // 2024-01-01 is a Monday
        assert_eq!(convert_date(&json!("2024-01-01"), Timerange::Week).unwrap(), "2024-01");
        assert_eq!(convert_date(&json!("2024-12-31"), Timerange::Week).unwrap(), "2024-53");
    }

    #[test]
    fn test_week_keys_anchor_on_sunday() {
        let sunday = parse_bucket("2024-01", Timerange::Week).unwrap();
        assert_eq!(sunday.date(), NaiveDate::from_ymd_opt(2024, 1, 7).unwrap());
        let sunday = parse_bucket("2023-00", Timerange::Week).unwrap();
        assert_eq!(sunday.date(), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        for key in ["2023-00", "2023-01", "2024-01", "2024-52", "2025-00"] {
            let date = parse_bucket(key, Timerange::Week).unwrap();
            assert_eq!(format_bucket(&date, Timerange::Week), key);
        }
    }

    #[test]
    fn test_missing_consecutive_dates() {
        let dates = strings(&["2024-01-01", "2024-01-04"]);
        assert_eq!(
            missing_consecutive_dates(&dates, Timerange::Day, 1).unwrap(),
            strings(&["2024-01-02", "2024-01-03"])
        );
        let dates = strings(&["2024-01", "2024-05"]);
        assert_eq!(
            missing_consecutive_dates(&dates, Timerange::Month, 2).unwrap(),
            strings(&["2024-03"])
        );
        let dates = strings(&["2024-01-01 22:00", "2024-01-02 01:00"]);
        assert_eq!(
            missing_consecutive_dates(&dates, Timerange::Hour, 1).unwrap(),
            strings(&["2024-01-01 23:00", "2024-01-02 00:00"])
        );
        // 2025 starts on a Wednesday, so its first days form week 00
        let dates = strings(&["2024-50", "2025-01"]);
        assert_eq!(
            missing_consecutive_dates(&dates, Timerange::Week, 1).unwrap(),
            strings(&["2024-51", "2024-52", "2025-00"])
        );
        let dates = strings(&["2020", "2023"]);
        assert_eq!(
            missing_consecutive_dates(&dates, Timerange::Year, 1).unwrap(),
            strings(&["2021", "2022"])
        );
    }

    #[test]
    fn test_missing_consecutive_dates_single_key() {
        let dates = strings(&["2024-01-01"]);
        assert_eq!(missing_consecutive_dates(&dates, Timerange::Day, 1).unwrap(), dates);
    }

    #[test]
    fn test_missing_consecutive_dates_sorts_input() {
        let dates = strings(&["2024-01-03", "2024-01-01"]);
        assert_eq!(
            missing_consecutive_dates(&dates, Timerange::Day, 1).unwrap(),
            strings(&["2024-01-02"])
        );
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let dates = strings(&["2024-01-01", "2024-01-04"]);
        assert!(matches!(
            missing_consecutive_dates(&dates, Timerange::Day, 0),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_add_time_unit_clamps_month_end() {
        let jan31 = parse_raw_date("2024-01-31").unwrap();
        let feb = add_time_unit(jan31, 1, "months").unwrap();
        assert_eq!(feb.date(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        let err = add_time_unit(jan31, 1, "fortnights").unwrap_err();
        assert_eq!(err.to_string(), "Unsupported units: fortnights");
    }

    #[test]
    fn test_check_dates_consecutive() {
        assert!(!check_dates_consecutive(&[], "days").unwrap());
        assert!(check_dates_consecutive(&strings(&["2024-01-01"]), "days").unwrap());
        assert!(check_dates_consecutive(&strings(&["2024-01-01", "2024-01-02", "2024-01-03"]), "days").unwrap());
        assert!(!check_dates_consecutive(&strings(&["2024-01-01", "2024-01-03"]), "days").unwrap());
        assert!(check_dates_consecutive(&strings(&["2024-11", "2024-12", "2025-01"]), "months").unwrap());
        assert!(check_dates_consecutive(&strings(&["2024-01", "2024-02"]), "weeks").unwrap());
        assert!(check_dates_consecutive(&strings(&["2023", "2024"]), "years").unwrap());
        assert!(check_dates_consecutive(&strings(&["2024-01-01 10:00", "2024-01-01 11:00"]), "hours").unwrap());
        assert!(matches!(
            check_dates_consecutive(&strings(&["2024", "2025"]), "decades"),
            Err(Error::UnsupportedUnit(_))
        ));
    }

    #[test]
    fn test_combine_merges_buckets() {
        let points = vec![
            point("2024-01-05", 2.0, "Sales", Operator::Count),
            point("2024-01-20", 3.0, "Sales", Operator::Count),
            point("2024-02-01", 1.0, "Sales", Operator::Count),
            point("2024-01-07", 4.0, "Returns", Operator::Max),
            point("2024-01-09", 9.0, "Returns", Operator::Max),
        ];
        let combined = combine(points, Timerange::Month).unwrap();
        assert_eq!(combined.len(), 3);
        assert_eq!(xs(&combined), strings(&["2024-01", "2024-02", "2024-01"]));
        // Counts merge additively, other operators are re-applied
        assert_eq!(combined[0].value, 5.0);
        assert_eq!(combined[0].operator, Some(Operator::Count));
        assert_eq!(combined[2].value, 9.0);
    }

    #[test]
    fn test_combine_keeps_stacked_series_apart() {
        let mut a = point("2024-01-05", 2.0, "Sales", Operator::Sum);
        a.stacked = Some("north".into());
        let mut b = point("2024-01-06", 3.0, "Sales", Operator::Sum);
        b.stacked = Some("south".into());
        let combined = combine(vec![a, b], Timerange::Month).unwrap();
        assert_eq!(combined.len(), 2);
    }

    #[test]
    fn test_recombining_is_a_noop() {
        let points = vec![
            point("2024-01-05 10:12:00", 2.5, "A", Operator::Sum),
            point("2024-01-05 10:40:00", 1.5, "A", Operator::Sum),
            point("2024-03-09 08:00:00", 7.0, "A", Operator::Sum),
        ];
        for timerange in [
            Timerange::Hour,
            Timerange::Day,
            Timerange::Week,
            Timerange::Month,
            Timerange::Year,
        ] {
            let once = combine(points.clone(), timerange).unwrap();
            let twice = combine(once.clone(), timerange).unwrap();
            assert_eq!(once, twice, "{}", timerange);
        }
    }

    #[test]
    fn test_week_keys_survive_recombining() {
        let once = combine(vec![point("2024-03-15", 1.0, "A", Operator::Sum)], Timerange::Week).unwrap();
        assert_eq!(xs(&once), strings(&["2024-11"]));
        let twice = combine(once, Timerange::Week).unwrap();
        assert_eq!(xs(&twice), strings(&["2024-11"]));

        assert_eq!(convert_date(&json!("2024-11"), Timerange::Week).unwrap(), "2024-11");
        assert_eq!(convert_date(&json!("2025-00"), Timerange::Week).unwrap(), "2025-00");
        // Not a week key: read as a month
        assert_eq!(convert_date(&json!("2024-11"), Timerange::Day).unwrap(), "2024-11-01");
    }

    #[test]
    fn test_fill_gaps() {
        let points = vec![
            point("2024-01-03", 3.0, "A", Operator::Sum),
            point("2024-01-01", 1.0, "A", Operator::Sum),
            point("2024-01-02", 5.0, "B", Operator::Sum),
        ];
        let filled = fill_gaps(points, Timerange::Day, 1).unwrap();
        assert_eq!(xs(&filled), strings(&["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-02"]));

        let gap = &filled[1];
        assert_eq!(gap.value, 0.0);
        assert_eq!(gap.series, json!("A"));
        assert_eq!(gap.operator, None);
    }

    #[test]
    fn test_fill_gaps_is_idempotent() {
        let points = vec![
            point("2024-01", 3.0, "A", Operator::Sum),
            point("2024-04", 1.0, "A", Operator::Sum),
        ];
        let once = fill_gaps(points, Timerange::Month, 1).unwrap();
        assert_eq!(once.len(), 4);
        let twice = fill_gaps(once.clone(), Timerange::Month, 1).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_process_timerange_data() {
        let points = vec![
            point("2024-01-01", 10.0, "Consum", Operator::Sum),
            point("2024-01-01", 5.0, "Consum", Operator::Sum),
            point("2024-01-04", 30.0, "Consum", Operator::Sum),
        ];
        let processed = process_timerange_data(points, Timerange::Day, 1).unwrap();
        assert_eq!(
            xs(&processed),
            strings(&["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04"])
        );
        assert_eq!(processed[0].value, 15.0);
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar-year chunking of detection windows.
//!
//! Clustering queries run one chunk at a time so a single query never spans
//! the user's whole history.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

/// One calendar-year slice of a detection window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeChunk {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// First instant of a year.
pub fn beginning_of_year(year: i32) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(year, 1, 1)?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

/// Last representable instant of a year.
pub fn end_of_year(year: i32) -> Option<DateTime<Utc>> {
    Some(beginning_of_year(year.checked_add(1)?)? - Duration::nanoseconds(1))
}

/// Split `[start, end]` into one chunk per calendar year it touches.
///
/// The first chunk starts at `start`, later chunks at their year boundary.
/// Chunks end at the end of their year, except that with two or more chunks
/// the last one ends at `end`. A range inside a single year (including an
/// empty or inverted one) therefore yields one chunk running to the end of
/// that year.
pub fn year_chunks(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<TimeChunk> {
    let years: Vec<i32> = if end.year() < start.year() {
        vec![start.year()]
    } else {
        (start.year()..=end.year()).collect()
    };

    let mut chunks: Vec<TimeChunk> = years
        .iter()
        .enumerate()
        .filter_map(|(index, &year)| {
            let chunk_start = if index == 0 {
                start
            } else {
                beginning_of_year(year)?
            };
            Some(TimeChunk {
                start: chunk_start,
                end: end_of_year(year)?,
            })
        })
        .collect();

    if chunks.len() > 1 {
        if let Some(last) = chunks.last_mut() {
            last.end = end;
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_end_of_year_is_last_nanosecond() {
        let end = end_of_year(2023).unwrap();
        assert_eq!(end + Duration::nanoseconds(1), beginning_of_year(2024).unwrap());
    }

    #[test]
    fn test_single_year_extends_to_year_end() {
        let chunks = year_chunks(ts(2024, 3, 1, 8), ts(2024, 3, 2, 8));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start, ts(2024, 3, 1, 8));
        assert_eq!(chunks[0].end, end_of_year(2024).unwrap());
    }

    #[test]
    fn test_multi_year_last_chunk_ends_at_input_end() {
        let chunks = year_chunks(ts(2022, 11, 5, 0), ts(2024, 2, 1, 12));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].start, ts(2022, 11, 5, 0));
        assert_eq!(chunks[0].end, end_of_year(2022).unwrap());
        assert_eq!(chunks[1].start, beginning_of_year(2023).unwrap());
        assert_eq!(chunks[1].end, end_of_year(2023).unwrap());
        assert_eq!(chunks[2].start, beginning_of_year(2024).unwrap());
        assert_eq!(chunks[2].end, ts(2024, 2, 1, 12));
    }

    #[test]
    fn test_inverted_range_yields_start_year() {
        let chunks = year_chunks(ts(2024, 6, 1, 0), ts(2021, 1, 1, 0));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start, ts(2024, 6, 1, 0));
        assert_eq!(chunks[0].end, end_of_year(2024).unwrap());
    }

    #[test]
    fn test_zero_length_range() {
        let instant = ts(2020, 12, 31, 23);
        let chunks = year_chunks(instant, instant);
        assert_eq!(chunks, vec![TimeChunk { start: instant, end: end_of_year(2020).unwrap() }]);
    }
}

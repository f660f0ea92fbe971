// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Year chunking of detection ranges.

use chrono::{Datelike, Duration, Timelike};
use visit_tracker::services::time_chunker::{beginning_of_year, end_of_year, year_chunks};

mod common;
use common::utc;

#[test]
fn test_multi_year_chunks_align_to_year_boundaries() {
    let start = utc(2021, 8, 14, 10, 30);
    let end = utc(2024, 2, 3, 18, 0);

    let chunks = year_chunks(start, end);
    assert_eq!(chunks.len(), 4);

    assert_eq!(chunks[0].start, start);
    for (i, chunk) in chunks.iter().enumerate() {
        let year = 2021 + i as i32;
        if i > 0 {
            assert_eq!(chunk.start, beginning_of_year(year).unwrap());
        }
        if i + 1 < chunks.len() {
            assert_eq!(chunk.end, end_of_year(year).unwrap());
            assert_ne!(chunk.end, end);
        }
    }
    assert_eq!(chunks[3].end, end);
}

#[test]
fn test_consecutive_chunks_are_contiguous() {
    let chunks = year_chunks(utc(2019, 3, 1, 0, 0), utc(2022, 6, 1, 0, 0));
    for pair in chunks.windows(2) {
        assert_eq!(pair[1].start - pair[0].end, Duration::nanoseconds(1));
    }
}

#[test]
fn test_single_year_range_ends_at_year_end() {
    let start = utc(2023, 4, 1, 8, 0);
    let end = utc(2023, 4, 1, 17, 0);

    let chunks = year_chunks(start, end);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].start, start);

    let last = chunks[0].end;
    assert_eq!((last.year(), last.month(), last.day()), (2023, 12, 31));
    assert_eq!((last.hour(), last.minute(), last.second()), (23, 59, 59));
    assert_eq!(last.nanosecond(), 999_999_999);
}

#[test]
fn test_zero_length_and_inverted_ranges() {
    let instant = utc(2022, 7, 4, 12, 0);
    let chunks = year_chunks(instant, instant);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].end, end_of_year(2022).unwrap());

    let chunks = year_chunks(utc(2024, 5, 1, 0, 0), utc(2021, 5, 1, 0, 0));
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].start, utc(2024, 5, 1, 0, 0));
    assert_eq!(chunks[0].end, end_of_year(2024).unwrap());
}

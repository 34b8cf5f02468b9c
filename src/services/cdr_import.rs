// src/services/cdr_import.rs
//! Backfill of call history from the PBX's CSV call detail records.
//!
//! Columns used (0-based): 1 source, 2 destination, 9 start, 11 end,
//! 12 duration, 14 disposition, 16 unique id.

use crate::error::MonitorError;
use crate::models::{CallOutcome, HistoryCall};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, warn};

pub const CDR_MIN_COLUMNS: usize = 17;
const CDR_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const COL_SOURCE: usize = 1;
const COL_DESTINATION: usize = 2;
const COL_START: usize = 9;
const COL_END: usize = 11;
const COL_DURATION: usize = 12;
const COL_DISPOSITION: usize = 14;
const COL_UNIQUE_ID: usize = 16;

/// Reads a CDR export. A missing file yields `Ok(None)`.
pub fn load_cdr_file(
    path: &Path,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Option<Vec<HistoryCall>>, MonitorError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "CDR file not found, skipping import");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    parse_cdr(file, cutoff, now).map(Some)
}

/// Parses CDR rows, skipping short or malformed rows and rows that ended
/// before `cutoff`. Output keeps file order.
///
/// `state` is the disposition classified into the answered / no-answer /
/// error / completed vocabulary shared with live calls, while `end_reason`
/// keeps the disposition text exactly as written (`NO ANSWER`, `FAILED`).
pub fn parse_cdr<R: Read>(
    reader: R,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Vec<HistoryCall>, MonitorError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut loaded = Vec::new();
    for (line, record) in csv_reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                warn!(line = line + 1, error = %e, "Skipping malformed CDR row");
                continue;
            }
        };
        if record.len() < CDR_MIN_COLUMNS {
            continue;
        }

        let column = |idx: usize| record.get(idx).unwrap_or("").trim();

        let (Some(start), Some(end)) = (
            parse_cdr_timestamp(column(COL_START), now),
            parse_cdr_timestamp(column(COL_END), now),
        ) else {
            continue;
        };
        if end < cutoff {
            continue;
        }

        let disposition = column(COL_DISPOSITION).to_string();
        loaded.push(HistoryCall {
            id: column(COL_UNIQUE_ID).to_string(),
            from: column(COL_SOURCE).to_string(),
            to: column(COL_DESTINATION).to_string(),
            state: CallOutcome::classify(&disposition),
            end_reason: disposition,
            start,
            end,
            duration_sec: column(COL_DURATION).parse().unwrap_or(0),
        });
    }

    Ok(loaded)
}

/// Parses a `YYYY-MM-DD HH:MM:SS` CDR timestamp.
///
/// Exporters write either local time or UTC without saying which, so the
/// value is read both ways and the reading closer to `now` is kept. This is
/// a guess: for old records both readings can be equally plausible.
pub fn parse_cdr_timestamp(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), CDR_TIME_FORMAT).ok()?;
    let as_utc = Utc.from_utc_datetime(&naive);
    let as_local = Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc));

    Some(match as_local {
        Some(as_local) => closer_to(now, as_local, as_utc),
        None => as_utc,
    })
}

/// Picks whichever reading is nearer to `now`; ties go to the local one.
pub fn closer_to(
    now: DateTime<Utc>,
    as_local: DateTime<Utc>,
    as_utc: DateTime<Utc>,
) -> DateTime<Utc> {
    let local_delta = (now - as_local).num_milliseconds().abs();
    let utc_delta = (now - as_utc).num_milliseconds().abs();
    if utc_delta < local_delta {
        as_utc
    } else {
        as_local
    }
}

//! Calendar helpers built on [`hifitime`].
//!
//! Frame timestamps arrive in three shapes: a ready [`Epoch`], a number of days since
//! a product base date, or only a product file name carrying the date
//! (`..._h_YYYYMMDD_...` or `..._qd_YYYYMMDD_...`). The helpers below turn each of them
//! into an [`Epoch`] on the UTC scale.
use std::str::FromStr;
use std::sync::LazyLock;

use hifitime::{Duration, Epoch};
use regex::Regex;

use crate::{constants::SECONDS_PER_DAY, eddy_errors::EddyError};

static SOURCE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Za-z])(?:qd|h)_(\d{4})(\d{2})(\d{2})(?:[_.]|$)")
        .expect("source date regex")
});

/// Build a UTC epoch at midnight, rejecting impossible calendar dates.
pub fn midnight_utc(year: i32, month: u8, day: u8) -> Result<Epoch, EddyError> {
    Epoch::maybe_from_gregorian_utc(year, month, day, 0, 0, 0, 0)
        .map_err(|e| EddyError::InvalidTimestamp(format!("{year:04}-{month:02}-{day:02}: {e}")))
}

/// Extract the acquisition date encoded in a gridded product name.
///
/// Arguments
/// -----------------
/// * `name`: the product name, e.g. `dt_global_allsat_msla_h_20140106_20140704.nc`.
///
/// Return
/// ----------
/// * The date at midnight UTC, or [`EddyError::InvalidTimestamp`] when no `h_`/`qd_`
///   marker followed by an eight digit date is present.
pub fn parse_source_date(name: &str) -> Result<Epoch, EddyError> {
    let caps = SOURCE_DATE
        .captures(name)
        .ok_or_else(|| EddyError::InvalidTimestamp(name.to_string()))?;

    let field = |k: usize| caps.get(k).map(|m| m.as_str()).unwrap_or_default();
    let year = i32::from_str(field(1)).map_err(|_| EddyError::InvalidTimestamp(name.into()))?;
    let month = u8::from_str(field(2)).map_err(|_| EddyError::InvalidTimestamp(name.into()))?;
    let day = u8::from_str(field(3)).map_err(|_| EddyError::InvalidTimestamp(name.into()))?;

    midnight_utc(year, month, day)
}

/// Parse a calendar date given as `YYYY-MM-DD` or `YYYYMMDD`.
pub fn parse_date(date: &str) -> Result<Epoch, EddyError> {
    let digits: String = date.chars().filter(|c| c.is_ascii_digit()).collect();
    let well_formed = digits.len() == 8
        && date
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-');
    if !well_formed {
        return Err(EddyError::InvalidTimestamp(date.to_string()));
    }

    let year = i32::from_str(&digits[0..4]).map_err(|_| EddyError::InvalidTimestamp(date.into()))?;
    let month = u8::from_str(&digits[4..6]).map_err(|_| EddyError::InvalidTimestamp(date.into()))?;
    let day = u8::from_str(&digits[6..8]).map_err(|_| EddyError::InvalidTimestamp(date.into()))?;
    midnight_utc(year, month, day)
}

/// Epoch located `days` after `base`; `days` must be finite.
pub fn epoch_from_days(base: Epoch, days: f64) -> Result<Epoch, EddyError> {
    if !days.is_finite() {
        return Err(EddyError::InvalidTimestamp(format!("{days} days after {base}")));
    }
    Ok(base + Duration::from_seconds(days * SECONDS_PER_DAY))
}

/// Signed number of days from `from` to `to`.
#[inline]
pub fn days_between(from: Epoch, to: Epoch) -> f64 {
    (to - from).to_seconds() / SECONDS_PER_DAY
}

/// `YYYY-MM-DD` rendering of the UTC calendar date.
pub fn date_string(epoch: Epoch) -> String {
    let (y, m, d, _, _, _, _) = epoch.to_gregorian_utc();
    format!("{y:04}-{m:02}-{d:02}")
}

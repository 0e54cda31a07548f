//! # chrono fuzzy time
//!
//! [chrono-fuzzy-time] is a library which parses loosely formatted,
//! human-written date/time strings into [chrono] types.
//!
//! [chrono-fuzzy-time]: https://docs.rs/chrono-fuzzy-time/
//! [chrono]: https://docs.rs/chrono/
//!
//! ## Usage
//!
//! Put this in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! chrono-fuzzy-time = "0.1"
//! ```
//!
//! ## Timestamp Format
//!
//! There is no fixed grammar: the input is scanned token by token and
//! each token is classified in context. Fields the input does not supply
//! are taken from a default instant (today at midnight unless the caller
//! provides one).
//!
//! Examples of inputs that parse, assuming today is 2003-09-25:
//! ```rust,ignore
//!     parse("Thu Sep 25 10:36:28 BRST 2003") == "2003-09-25T10:36:28"  (tzname "BRST")
//!     parse("1997-07-16T19:20:30.45+01:00")  == "1997-07-16T19:20:30.450000+01:00"
//!     parse("19991231T235959.5")             == "1999-12-31T23:59:59.500000"
//!     parse("10/09/1998")                    == "1998-10-09T00:00:00"
//!     parse("Sep 25")                        == "2003-09-25T00:00:00"
//!     parse("10h36m28s")                     == "2003-09-25T10:36:28"
//!     parse("12 am")                         == "2003-09-25T00:00:00"
//!     parse("Jan of 99")                     == "1999-01-25T00:00:00"
//! ```
//!
//! Ambiguous all-numeric dates are steered by two hints:
//! * `dayfirst` reads `"10/09/2003"` as the 10th of September;
//! * `yearfirst` reads `"10/09/03"` as 2010-09-03.
//!
//! Two-digit years are placed in the century that puts them within fifty
//! years of today, so `"Jan of 99"` is 1999 until the year 2049.
//!
//! In fuzzy mode tokens that cannot be classified are skipped instead of
//! failing the parse, which copes with surrounding prose such as
//! `"meeting on Sep 25 at 10:36"`.
//!
//! ## Time zones
//!
//! A trailing zone is recognized as an uppercase abbreviation
//! (`"BRST"`), a numeric offset (`"+0100"`, `"-03:00"`), or both
//! (`"-0300 (BRST)"`). Abbreviations are resolved through the
//! `tz_offsets` option; unknown ones are carried in the result by name
//! only. POSIX TZ strings such as `"EST5EDT,M3.2.0/2,M11.1.0/2"` are
//! parsed by [`parse_tz`] and can serve as mapping targets.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use chrono_fuzzy_time::parse;
//!
//! let dt = parse("Thu, 25 Sep 2003 10:49:41 -0300").expect("parses");
//! assert_eq!(
//!     dt.naive_local(),
//!     NaiveDate::from_ymd_opt(2003, 9, 25)
//!         .unwrap()
//!         .and_hms_opt(10, 49, 41)
//!         .unwrap()
//! );
//! let fixed = dt.fixed().expect("has an offset");
//! assert_eq!(fixed.offset().local_minus_utc(), -3 * 3600);
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use once_cell::sync::Lazy;

mod error;
mod fields;
mod info;
mod lexer;
mod tz;
mod tzrule;

pub use crate::error::Error;
pub use crate::fields::DateFields;
pub use crate::info::{ParserInfo, Vocabulary};
pub use crate::lexer::{tokenize, Token, TokenKind};
pub use crate::tz::{
    CalendarAdjust, ChronoResolver, RelativeAdjust, TzInfo, TzMapValue, TzOffsets, TzResolver,
};
pub use crate::tzrule::{parse_tz, TzRule, TzTransition};

#[cfg(test)]
mod tests;

/// The result of a parse: a wall-clock time, carrying an offset when a
/// time zone was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedDateTime {
    /// The input named no zone, or `ignoretz` was set.
    Naive(NaiveDateTime),
    /// A zone was resolved and its offset fixed at this instant.
    Fixed(DateTime<FixedOffset>),
}

impl ParsedDateTime {
    /// The wall-clock reading, dropping any offset.
    pub fn naive_local(&self) -> NaiveDateTime {
        match self {
            ParsedDateTime::Naive(dt) => *dt,
            ParsedDateTime::Fixed(dt) => dt.naive_local(),
        }
    }

    /// The zoned instant, when a zone was resolved.
    pub fn fixed(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            ParsedDateTime::Naive(_) => None,
            ParsedDateTime::Fixed(dt) => Some(*dt),
        }
    }
}

/// Options steering [`parse_with`].
///
/// ```rust
/// use chrono_fuzzy_time::{parse_with, ParseOptions};
///
/// let opts = ParseOptions::new().dayfirst(true);
/// let dt = parse_with("10/09/1998", &opts).expect("parses");
/// assert_eq!(dt.naive_local().to_string(), "1998-09-10 00:00:00");
/// ```
#[derive(Default)]
pub struct ParseOptions {
    /// Instant supplying the fields the input omits; today at midnight
    /// when unset.
    pub default: Option<NaiveDateTime>,
    /// Override the vocabulary's day-first hint.
    pub dayfirst: Option<bool>,
    /// Override the vocabulary's year-first hint.
    pub yearfirst: Option<bool>,
    /// Skip unrecognized tokens instead of failing.
    pub fuzzy: bool,
    /// Drop any timezone information found in the input.
    pub ignoretz: bool,
    /// Mapping from timezone abbreviations to zones.
    pub tz_offsets: TzOffsets,
    /// Custom vocabulary and hints.
    pub info: Option<ParserInfo>,
    /// Timezone resolver; the chrono-backed one when unset.
    pub resolver: Option<Box<dyn TzResolver>>,
    /// Weekday calendar arithmetic; plain stepping when unset.
    pub adjust: Option<Box<dyn RelativeAdjust>>,
}

impl ParseOptions {
    pub fn new() -> ParseOptions {
        ParseOptions::default()
    }

    /// Supply the instant whose fields fill anything the input omits.
    pub fn default_instant(mut self, instant: NaiveDateTime) -> ParseOptions {
        self.default = Some(instant);
        self
    }

    pub fn dayfirst(mut self, dayfirst: bool) -> ParseOptions {
        self.dayfirst = Some(dayfirst);
        self
    }

    pub fn yearfirst(mut self, yearfirst: bool) -> ParseOptions {
        self.yearfirst = Some(yearfirst);
        self
    }

    pub fn fuzzy(mut self, fuzzy: bool) -> ParseOptions {
        self.fuzzy = fuzzy;
        self
    }

    pub fn ignoretz(mut self, ignoretz: bool) -> ParseOptions {
        self.ignoretz = ignoretz;
        self
    }

    pub fn tz_offsets(mut self, tz_offsets: TzOffsets) -> ParseOptions {
        self.tz_offsets = tz_offsets;
        self
    }

    pub fn info(mut self, info: ParserInfo) -> ParseOptions {
        self.info = Some(info);
        self
    }
}

/// Parse a timestamp with default options.
pub fn parse(timestr: &str) -> Result<ParsedDateTime, Error> {
    parse_with(timestr, &ParseOptions::default())
}

/// Parse a timestamp: extract fields, merge them into the default
/// instant, and resolve the time zone.
pub fn parse_with(timestr: &str, opts: &ParseOptions) -> Result<ParsedDateTime, Error> {
    let fields = parse_fields(timestr, opts)?;

    let default = opts.default.unwrap_or_else(naive_today);
    let mut merged = merge_fields(&fields, default)?;

    if fields.day.is_none() {
        if let Some(weekday) = fields.weekday {
            merged = match &opts.adjust {
                Some(adjust) => adjust.nearest_weekday(merged, weekday),
                None => CalendarAdjust.nearest_weekday(merged, weekday),
            };
        }
    }

    if opts.ignoretz {
        return Ok(ParsedDateTime::Naive(merged));
    }
    let resolver: &dyn TzResolver = match &opts.resolver {
        Some(resolver) => resolver.as_ref(),
        None => &ChronoResolver,
    };
    match tz::resolve_zone(&fields, &opts.tz_offsets, resolver)? {
        Some(zone) => Ok(ParsedDateTime::Fixed(zone.resolve(merged)?)),
        None => Ok(ParsedDateTime::Naive(merged)),
    }
}

/// Extract the raw fields of a timestamp without merging or timezone
/// resolution.
pub fn parse_fields(timestr: &str, opts: &ParseOptions) -> Result<DateFields, Error> {
    let shared;
    let info = match &opts.info {
        Some(info) => info,
        None => {
            shared = default_info();
            shared.as_ref()
        }
    };
    let dayfirst = opts.dayfirst.unwrap_or(info.dayfirst);
    let yearfirst = opts.yearfirst.unwrap_or(info.yearfirst);
    fields::scan_fields(timestr, info, dayfirst, yearfirst, opts.fuzzy)
}

fn merge_fields(fields: &DateFields, default: NaiveDateTime) -> Result<NaiveDateTime, Error> {
    let year = fields.year.unwrap_or(default.year());
    let month = fields.month.unwrap_or(default.month());
    let day = fields.day.unwrap_or(default.day());
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        Error::Format(format!("{year:04}-{month:02}-{day:02} is not a real date"))
    })?;

    let hour = fields.hour.unwrap_or(default.hour());
    let minute = fields.minute.unwrap_or(default.minute());
    let second = fields.second.unwrap_or(default.second());
    let micro = fields.microsecond.unwrap_or(default.nanosecond() / 1000);
    let time = NaiveTime::from_hms_micro_opt(hour, minute, second, micro).ok_or_else(|| {
        Error::Format(format!("{hour:02}:{minute:02}:{second:02}.{micro:06} is not a real time"))
    })?;

    Ok(date.and_time(time))
}

/// Today at midnight in the local zone.
fn naive_today() -> NaiveDateTime {
    Local::now().date_naive().and_time(NaiveTime::MIN)
}

static DEFAULT_INFO: Lazy<Mutex<Option<(NaiveDate, Arc<ParserInfo>)>>> =
    Lazy::new(|| Mutex::new(None));

/// The shared default vocabulary. Rebuilt when the local date changes so
/// that the captured year stays fresh in long-running processes.
fn default_info() -> Arc<ParserInfo> {
    let today = Local::now().date_naive();
    let mut slot = DEFAULT_INFO
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    match slot.as_ref() {
        Some((built, info)) if *built == today => Arc::clone(info),
        _ => {
            let info = Arc::new(ParserInfo::new(false, false));
            *slot = Some((today, Arc::clone(&info)));
            info
        }
    }
}

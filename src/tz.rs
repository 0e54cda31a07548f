//! The collaborators consulted after field extraction: time zone
//! resolution and weekday calendar arithmetic.
//!
//! The parser itself never touches a zone database; everything it needs
//! from the platform comes through [`TzResolver`], and the bundled
//! [`ChronoResolver`] covers UTC, the local zone, fixed offsets and POSIX
//! TZ rules.

use std::collections::HashMap;
use std::env;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Local, LocalResult, NaiveDateTime, TimeZone,
    Weekday,
};

use crate::error::Error;
use crate::fields::DateFields;
use crate::tzrule::{parse_tz, TzRule};

/// A resolved time zone, ready to be attached to a wall-clock time.
#[derive(Debug, Clone, PartialEq)]
pub enum TzInfo {
    /// Coordinated Universal Time.
    Utc,
    /// The platform's local zone.
    Local,
    /// A fixed offset in seconds east of UTC, optionally named.
    Fixed { name: Option<String>, offset: i32 },
    /// A zone following a POSIX TZ rule, with seasonal offsets.
    Rule(TzRule),
}

impl TzInfo {
    /// Attach this zone to a local wall-clock time.
    ///
    /// An ambiguous local time (the repeated hour of a DST fold) resolves
    /// to its earlier reading; a nonexistent one is an error.
    pub fn resolve(&self, local: NaiveDateTime) -> Result<DateTime<FixedOffset>, Error> {
        match self {
            TzInfo::Utc => attach(0, local),
            TzInfo::Local => match Local.from_local_datetime(&local) {
                LocalResult::Single(dt) => Ok(dt.fixed_offset()),
                LocalResult::Ambiguous(first, _) => Ok(first.fixed_offset()),
                LocalResult::None => Err(Error::AmbiguousTimezone(format!(
                    "`{local}` does not exist in the local zone"
                ))),
            },
            TzInfo::Fixed { offset, .. } => attach(*offset, local),
            TzInfo::Rule(rule) => attach(rule.utc_offset_at(local), local),
        }
    }
}

fn attach(offset_seconds: i32, local: NaiveDateTime) -> Result<DateTime<FixedOffset>, Error> {
    let offset = FixedOffset::east_opt(offset_seconds)
        .ok_or_else(|| Error::TzMapping(format!("offset {offset_seconds}s is out of range")))?;
    offset
        .from_local_datetime(&local)
        .single()
        .ok_or_else(|| Error::AmbiguousTimezone(format!("`{local}` at offset {offset_seconds}s")))
}

/// Produces time zones for the façade.
///
/// The provided methods cover everything the parser itself can express;
/// implementations backed by a zone database override [`get_tz`] (with an
/// LRU cache of their choosing) and [`local_zone_names`].
///
/// [`get_tz`]: TzResolver::get_tz
/// [`local_zone_names`]: TzResolver::local_zone_names
pub trait TzResolver {
    /// UTC itself.
    fn tz_utc(&self) -> TzInfo {
        TzInfo::Utc
    }

    /// The platform's local zone.
    fn tz_local(&self) -> TzInfo {
        TzInfo::Local
    }

    /// A fixed-offset zone, optionally named.
    fn tz_offset(&self, name: Option<&str>, seconds: i32) -> TzInfo {
        TzInfo::Fixed {
            name: name.map(str::to_string),
            offset: seconds,
        }
    }

    /// A zone described by a POSIX TZ string.
    fn tz_string(&self, tzstr: &str) -> Result<TzInfo, Error> {
        parse_tz(tzstr).map(TzInfo::Rule)
    }

    /// A zone by IANA name, when the resolver has a zone database.
    fn get_tz(&self, name: &str) -> Option<TzInfo>;

    /// Abbreviations that name the platform's local zone.
    fn local_zone_names(&self) -> Vec<String>;
}

/// The bundled resolver: chrono's `Utc`, `Local` and `FixedOffset` plus
/// POSIX TZ rules. It carries no zone database.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChronoResolver;

impl TzResolver for ChronoResolver {
    fn get_tz(&self, _name: &str) -> Option<TzInfo> {
        None
    }

    /// A POSIX-style `TZ` environment value names the local zone and its
    /// DST variant; anything else yields no names.
    fn local_zone_names(&self) -> Vec<String> {
        let Some(rule) = env::var("TZ").ok().and_then(|tz| parse_tz(&tz).ok()) else {
            return Vec::new();
        };
        let mut names = vec![rule.std_abbr];
        if let Some(dst) = rule.dst_abbr {
            names.push(dst);
        }
        names.retain(|name| !name.is_empty());
        names
    }
}

/// Calendar arithmetic consumed by the façade.
pub trait RelativeAdjust {
    /// The next occurrence of `weekday` on or after `instant`, keeping
    /// the time of day.
    fn nearest_weekday(&self, instant: NaiveDateTime, weekday: Weekday) -> NaiveDateTime;
}

/// Weekday stepping on the proleptic Gregorian calendar.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalendarAdjust;

impl RelativeAdjust for CalendarAdjust {
    fn nearest_weekday(&self, instant: NaiveDateTime, weekday: Weekday) -> NaiveDateTime {
        let current = i64::from(instant.weekday().num_days_from_monday());
        let target = i64::from(weekday.num_days_from_monday());
        instant + Duration::days((target - current).rem_euclid(7))
    }
}

/// One entry of a `tz_offsets` mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum TzMapValue {
    /// A fixed offset in seconds east of UTC.
    Offset(i32),
    /// A POSIX TZ string, parsed on use.
    TzString(String),
    /// An already-resolved zone.
    Zone(TzInfo),
}

/// How the façade maps timezone names found in the input to zones.
pub enum TzOffsets {
    /// No mapping; only the platform heuristics apply.
    None,
    /// Look the parsed name up in a map.
    Map(HashMap<String, TzMapValue>),
    /// Ask a callable, passing the parsed name and offset.
    Func(Box<dyn Fn(Option<&str>, Option<i32>) -> Option<TzMapValue>>),
}

impl Default for TzOffsets {
    fn default() -> TzOffsets {
        TzOffsets::None
    }
}

impl std::fmt::Debug for TzOffsets {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TzOffsets::None => f.write_str("TzOffsets::None"),
            TzOffsets::Map(map) => f.debug_tuple("TzOffsets::Map").field(map).finish(),
            TzOffsets::Func(_) => f.write_str("TzOffsets::Func(..)"),
        }
    }
}

/// Pick the zone for a parse result: the caller's mapping first, then the
/// platform's local zone names, then the parsed offset itself.
pub(crate) fn resolve_zone(
    fields: &DateFields,
    tz_offsets: &TzOffsets,
    resolver: &dyn TzResolver,
) -> Result<Option<TzInfo>, Error> {
    let name = fields.tzname.as_deref();

    let mapped = match tz_offsets {
        TzOffsets::Func(func) => Some(func(name, fields.tzoffset).ok_or_else(|| {
            Error::TzMapping(format!("no mapping for `{}`", name.unwrap_or("<none>")))
        })?),
        TzOffsets::Map(map) => name.and_then(|n| map.get(n)).cloned(),
        TzOffsets::None => None,
    };
    if let Some(value) = mapped {
        let tz = match value {
            TzMapValue::Zone(tz) => tz,
            TzMapValue::TzString(tzstr) => resolver.tz_string(&tzstr)?,
            TzMapValue::Offset(seconds) => resolver.tz_offset(name, seconds),
        };
        return Ok(Some(tz));
    }

    if let Some(n) = name {
        if resolver.local_zone_names().iter().any(|local| local == n) {
            return Ok(Some(resolver.tz_local()));
        }
    }

    match fields.tzoffset {
        Some(0) => Ok(Some(resolver.tz_utc())),
        Some(offset) => Ok(Some(resolver.tz_offset(name, offset))),
        None => Ok(None),
    }
}

//! The vocabulary consulted by the assembly engine: month and weekday
//! names, h/m/s unit words, AM/PM markers, UTC zone names, filler words,
//! and the two-digit-year heuristics.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Local, Weekday};
use maplit::{hashmap, hashset};

/// The word tables used by [`ParserInfo`].
///
/// All keys are lowercase; lookups lowercase the query, so the tables are
/// case-insensitive. Replace or extend the fields of
/// [`Vocabulary::default`] to teach the parser a different language or
/// extra time zone abbreviations.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    /// Filler tokens with no semantic content in dates.
    pub jump: HashSet<String>,
    /// Weekday name to index, `0` = Monday.
    pub weekdays: HashMap<String, u32>,
    /// Month name to month number, `1` = January.
    pub months: HashMap<String, u32>,
    /// Unit word to position in the hour/minute/second cascade.
    pub hms: HashMap<String, usize>,
    /// Meridian word, `0` = AM, `1` = PM.
    pub ampm: HashMap<String, u32>,
    /// Names that denote UTC itself.
    pub utc_zones: HashSet<String>,
    /// Words binding a month name to a following year, as in `"Jan of 99"`.
    pub pertain: HashSet<String>,
    /// Fixed timezone abbreviation to offset in seconds east of UTC.
    pub tz_offsets: HashMap<String, i32>,
}

impl Default for Vocabulary {
    fn default() -> Vocabulary {
        // "m" absorbs the tail of "a.m."/"p.m.", "t" the ISO 8601 separator
        Vocabulary {
            jump: hashset! {
                " ".into(), ".".into(), ",".into(), ";".into(), "-".into(),
                "/".into(), "'".into(), "at".into(), "on".into(), "and".into(),
                "ad".into(), "m".into(), "t".into(), "of".into(), "st".into(),
                "nd".into(), "rd".into(), "th".into(),
            },
            weekdays: hashmap! {
                "mon".into() => 0, "monday".into() => 0,
                "tue".into() => 1, "tuesday".into() => 1,
                "wed".into() => 2, "wednesday".into() => 2,
                "thu".into() => 3, "thursday".into() => 3,
                "fri".into() => 4, "friday".into() => 4,
                "sat".into() => 5, "saturday".into() => 5,
                "sun".into() => 6, "sunday".into() => 6,
            },
            months: hashmap! {
                "jan".into() => 1, "january".into() => 1,
                "feb".into() => 2, "february".into() => 2,
                "mar".into() => 3, "march".into() => 3,
                "apr".into() => 4, "april".into() => 4,
                "may".into() => 5,
                "jun".into() => 6, "june".into() => 6,
                "jul".into() => 7, "july".into() => 7,
                "aug".into() => 8, "august".into() => 8,
                "sep".into() => 9, "september".into() => 9,
                "oct".into() => 10, "october".into() => 10,
                "nov".into() => 11, "november".into() => 11,
                "dec".into() => 12, "december".into() => 12,
            },
            hms: hashmap! {
                "h".into() => 0, "hour".into() => 0, "hours".into() => 0,
                "m".into() => 1, "minute".into() => 1, "minutes".into() => 1,
                "s".into() => 2, "second".into() => 2, "seconds".into() => 2,
            },
            ampm: hashmap! {
                "am".into() => 0, "a".into() => 0,
                "pm".into() => 1, "p".into() => 1,
            },
            utc_zones: hashset! { "utc".into(), "gmt".into(), "z".into() },
            pertain: hashset! { "of".into() },
            tz_offsets: HashMap::new(),
        }
    }
}

/// Immutable parse configuration: the word tables, the
/// `dayfirst`/`yearfirst` ambiguity hints, and the current year captured
/// at construction for two-digit-year expansion.
///
/// A `ParserInfo` is read-only once built and may be shared freely between
/// concurrent parse calls.
#[derive(Debug, Clone)]
pub struct ParserInfo {
    vocab: Vocabulary,
    /// Prefer day-first interpretation of ambiguous numeric dates.
    pub dayfirst: bool,
    /// Prefer year-first interpretation of ambiguous numeric dates.
    pub yearfirst: bool,
    year: i32,
    century: i32,
}

impl ParserInfo {
    /// Build a `ParserInfo` with the default vocabulary.
    pub fn new(dayfirst: bool, yearfirst: bool) -> ParserInfo {
        ParserInfo::with_vocabulary(Vocabulary::default(), dayfirst, yearfirst)
    }

    /// Build a `ParserInfo` with a custom vocabulary.
    pub fn with_vocabulary(vocab: Vocabulary, dayfirst: bool, yearfirst: bool) -> ParserInfo {
        let year = Local::now().year();
        ParserInfo {
            vocab,
            dayfirst,
            yearfirst,
            year,
            century: year / 100 * 100,
        }
    }

    /// The year captured when this `ParserInfo` was built.
    pub fn current_year(&self) -> i32 {
        self.year
    }

    pub(crate) fn jump(&self, name: &str) -> bool {
        self.vocab.jump.contains(&name.to_lowercase())
    }

    /// Weekday for `name`, requiring at least three characters so that
    /// short prefixes never match.
    pub(crate) fn weekday(&self, name: &str) -> Option<Weekday> {
        if name.chars().count() < 3 {
            return None;
        }
        self.vocab
            .weekdays
            .get(&name.to_lowercase())
            .map(|&i| weekday_from_index(i))
    }

    /// Month number (1-based) for `name`, requiring at least three
    /// characters so that e.g. `"ma"` never matches "May".
    pub(crate) fn month(&self, name: &str) -> Option<u32> {
        if name.chars().count() < 3 {
            return None;
        }
        self.vocab.months.get(&name.to_lowercase()).copied()
    }

    pub(crate) fn hms(&self, name: &str) -> Option<usize> {
        self.vocab.hms.get(&name.to_lowercase()).copied()
    }

    pub(crate) fn ampm(&self, name: &str) -> Option<u32> {
        self.vocab.ampm.get(&name.to_lowercase()).copied()
    }

    pub(crate) fn pertain(&self, name: &str) -> bool {
        self.vocab.pertain.contains(&name.to_lowercase())
    }

    pub(crate) fn utc_zone(&self, name: &str) -> bool {
        self.vocab.utc_zones.contains(&name.to_lowercase())
    }

    /// Offset in seconds for a timezone abbreviation, when known.
    pub(crate) fn tz_offset(&self, name: &str) -> Option<i32> {
        if self.utc_zone(name) {
            return Some(0);
        }
        self.vocab.tz_offsets.get(&name.to_lowercase()).copied()
    }

    /// Expand a two-digit year: place it in the current century, then
    /// slide by a century when that lands 50 or more years away.
    pub fn convert_year(&self, year: i32) -> i32 {
        if year >= 100 {
            return year;
        }
        let mut year = year + self.century;
        if (year - self.year).abs() >= 50 {
            if year < self.year {
                year += 100;
            } else {
                year -= 100;
            }
        }
        year
    }
}

pub(crate) fn weekday_from_index(i: u32) -> Weekday {
    match i {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

//! POSIX TZ strings: `"EST5EDT,M3.2.0/2,M11.1.0/2"` and the older
//! comma-separated numeric table form.
//!
//! Offsets follow the POSIX sign convention on the way in (positive means
//! west of UTC) and are stored in seconds east of UTC, so `"EST5"` parses
//! to `-18000`.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use crate::error::Error;
use crate::info::weekday_from_index;
use crate::lexer::{ascii_digits, tokenize, Token};

/// When a DST rule names no transition time, the switch happens at 02:00.
const DEFAULT_TRANSITION_TIME: i32 = 2 * 3600;

/// One end of a DST window. Exactly one of the day-selection forms is
/// populated: `yday`, `jyday`, `(month, week, weekday)`, or
/// `(month, day)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TzTransition {
    /// Month of the transition, 1-based.
    pub month: Option<u32>,
    /// Week of the month, 1-based; `-1` means the last such weekday.
    pub week: Option<i32>,
    /// Weekday of the transition, `0` = Monday.
    pub weekday: Option<u32>,
    /// Day of the year, 1-based, counting February 29.
    pub yday: Option<u32>,
    /// Day of the year, 1-based, never counting February 29.
    pub jyday: Option<u32>,
    /// Explicit day of the month.
    pub day: Option<u32>,
    /// Seconds after local midnight at which the transition happens.
    pub time: Option<i32>,
}

impl TzTransition {
    /// The date this transition falls on in `year`, when the rule is
    /// well-formed for that year.
    pub fn date_in_year(&self, year: i32) -> Option<NaiveDate> {
        if let Some(n) = self.jyday {
            let leap = NaiveDate::from_ymd_opt(year, 2, 29).is_some();
            let n = if leap && n >= 60 { n + 1 } else { n };
            NaiveDate::from_yo_opt(year, n)
        } else if let Some(n) = self.yday {
            NaiveDate::from_yo_opt(year, n)
        } else if let (Some(month), Some(week), Some(weekday)) =
            (self.month, self.week, self.weekday)
        {
            let weekday = weekday_from_index(weekday);
            if week == -1 {
                NaiveDate::from_weekday_of_month_opt(year, month, weekday, 5)
                    .or_else(|| NaiveDate::from_weekday_of_month_opt(year, month, weekday, 4))
            } else {
                u8::try_from(week)
                    .ok()
                    .and_then(|w| NaiveDate::from_weekday_of_month_opt(year, month, weekday, w))
            }
        } else if let (Some(month), Some(day)) = (self.month, self.day) {
            NaiveDate::from_ymd_opt(year, month, day)
        } else {
            None
        }
    }

    fn local_datetime(&self, year: i32) -> Option<NaiveDateTime> {
        let seconds = self.time.unwrap_or(DEFAULT_TRANSITION_TIME);
        self.date_in_year(year)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt + Duration::seconds(i64::from(seconds)))
    }
}

/// A zone description parsed from a POSIX TZ string: standard
/// abbreviation and offset, and optionally a DST abbreviation, offset and
/// transition window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TzRule {
    pub std_abbr: String,
    /// Standard offset in seconds east of UTC.
    pub std_offset: i32,
    pub dst_abbr: Option<String>,
    /// DST offset in seconds east of UTC; defaults to one hour ahead of
    /// standard when the string does not say.
    pub dst_offset: Option<i32>,
    pub start: TzTransition,
    pub end: TzTransition,
}

impl TzRule {
    /// The offset in seconds east of UTC in effect at the local wall
    /// clock time `local`.
    ///
    /// Windows with `end` before `start` wrap around the new year
    /// (southern hemisphere DST).
    pub fn utc_offset_at(&self, local: NaiveDateTime) -> i32 {
        if self.dst_abbr.is_none() {
            return self.std_offset;
        }
        let dst_offset = self.dst_offset.unwrap_or(self.std_offset + 3600);
        let year = local.year();
        let (start, end) = match (
            self.start.local_datetime(year),
            self.end.local_datetime(year),
        ) {
            (Some(start), Some(end)) => (start, end),
            _ => return self.std_offset,
        };
        let dst_active = if start <= end {
            local >= start && local < end
        } else {
            local >= start || local < end
        };
        if dst_active {
            dst_offset
        } else {
            self.std_offset
        }
    }

    /// The abbreviation in effect at the local wall clock time `local`.
    pub fn abbr_at(&self, local: NaiveDateTime) -> &str {
        match &self.dst_abbr {
            Some(dst) if Some(self.utc_offset_at(local)) == self.dst_offset => dst,
            _ => &self.std_abbr,
        }
    }
}

/// Parse a POSIX TZ string, or the legacy 8/9-field numeric table form.
pub fn parse_tz(tzstr: &str) -> Result<TzRule, Error> {
    let mut l = tokenize(tzstr);
    let len_l = l.len();
    let mut res = TzRule::default();
    let mut i = 0;

    // one or two abbreviation/offset pairs, e.g. "BRST+3[BRDT[+2]]"
    while i < len_l {
        let mut j = i;
        while j < len_l
            && !l[j]
                .text
                .chars()
                .any(|c| c.is_ascii_digit() || matches!(c, ':' | ',' | '-' | '+'))
        {
            j += 1;
        }
        if j == i {
            break;
        }
        let abbr: String = l[i..j].iter().map(|t| t.text.as_str()).collect();
        let is_dst = !res.std_abbr.is_empty();
        if is_dst {
            res.dst_abbr = Some(abbr);
        } else {
            res.std_abbr = abbr;
        }
        i = j;

        let has_offset = i < len_l
            && (l[i].text == "+"
                || l[i].text == "-"
                || l[i].text.starts_with(|c: char| c.is_ascii_digit()));
        if has_offset {
            // POSIX: a positive offset lies west of UTC
            let sign: i32 = match l[i].text.as_str() {
                "+" => {
                    i += 1;
                    -1
                }
                "-" => {
                    i += 1;
                    1
                }
                _ => -1,
            };
            let text = token_text(&l, i)?.to_string();
            let width = text.len();
            let offset = if ascii_digits(&text, 4) {
                // 0300
                parse_num::<i32>(&text[..2])? * 3600 + parse_num::<i32>(&text[2..])? * 60
            } else if i + 1 < len_l && l[i + 1].text == ":" {
                // 03:00
                let hours: i32 = parse_num(&text)?;
                let minutes = int_at(&l, i + 2)?;
                i += 2;
                hours * 3600 + minutes * 60
            } else if width <= 2 {
                // [0]3
                parse_num::<i32>(&text)? * 3600
            } else {
                return Err(Error::Format(format!("`{text}` is not a zone offset")));
            };
            i += 1;
            if is_dst {
                res.dst_offset = Some(offset * sign);
            } else {
                res.std_offset = offset * sign;
            }
        }
        if res.dst_abbr.is_some() {
            break;
        }
    }

    if i < len_l {
        for token in &mut l[i..] {
            if token.text == ";" {
                token.text = ",".to_string();
            }
        }
        if l[i].text != "," {
            return Err(Error::Format(format!(
                "expected `,` after zone names in `{tzstr}`"
            )));
        }
        i += 1;
    }

    if i < len_l {
        let comma_count = l.iter().filter(|t| t.text == ",").count();
        if (8..=9).contains(&comma_count) && digits_and_commas(&l[i..]) {
            parse_table_rules(&l, &mut i, &mut res)?;
        } else if comma_count == 2 && posix_rule_shaped(&l[i..]) {
            parse_posix_rules(&l, &mut i, &mut res)?;
        }
    }

    if res.dst_abbr.is_some() && res.dst_offset.is_none() {
        res.dst_offset = Some(res.std_offset + 3600);
    }
    Ok(res)
}

fn digits_and_commas(tokens: &[Token]) -> bool {
    tokens
        .iter()
        .all(|t| t.text == "," || t.text.chars().all(|c| c.is_ascii_digit()))
}

fn posix_rule_shaped(tokens: &[Token]) -> bool {
    tokens.iter().filter(|t| t.text == "/").count() <= 2
        && tokens.iter().all(|t| {
            matches!(t.text.as_str(), "," | "/" | "J" | "M" | "." | "-" | ":")
                || t.text.chars().all(|c| c.is_ascii_digit())
        })
}

/// `"GMT0BST,3,0,30,3600,10,0,26,7200[,3600]"`: month, week (0 meaning an
/// explicit day), weekday, and transition seconds for each end, with an
/// optional alternate DST offset.
fn parse_table_rules(l: &[Token], i: &mut usize, res: &mut TzRule) -> Result<(), Error> {
    let len_l = l.len();
    for which in 0..2 {
        let mut x = TzTransition::default();
        x.month = Some(int_at(l, *i)? as u32);
        *i += 2;
        let week = if l[*i].text == "-" {
            let value = -int_at(l, *i + 1)?;
            *i += 1;
            value
        } else {
            int_at(l, *i)?
        };
        *i += 2;
        if week != 0 {
            x.week = Some(week);
            x.weekday = Some((int_at(l, *i)? - 1).rem_euclid(7) as u32);
        } else {
            x.day = Some(int_at(l, *i)? as u32);
        }
        *i += 2;
        x.time = Some(int_at(l, *i)?);
        *i += 2;
        if which == 0 {
            res.start = x;
        } else {
            res.end = x;
        }
    }
    if *i < len_l {
        let sign: i32 = match l[*i].text.as_str() {
            "+" => {
                *i += 1;
                1
            }
            "-" => {
                *i += 1;
                -1
            }
            _ => 1,
        };
        res.dst_offset = Some((res.std_offset + int_at(l, *i)?) * sign);
    }
    Ok(())
}

/// `"M3.2.0/2,M11.1.0/2"` and the `J<n>`/`<n>` day-of-year forms, each
/// with an optional `/time` suffix.
fn parse_posix_rules(l: &[Token], i: &mut usize, res: &mut TzRule) -> Result<(), Error> {
    let len_l = l.len();
    for which in 0..2 {
        let mut x = TzTransition::default();
        match token_text(l, *i)? {
            "J" => {
                // day of a non-leap year, 1-based
                *i += 1;
                x.jyday = Some(int_at(l, *i)? as u32);
            }
            "M" => {
                *i += 1;
                x.month = Some(int_at(l, *i)? as u32);
                *i += 1;
                expect_rule_sep(l, *i)?;
                *i += 1;
                let mut week = int_at(l, *i)?;
                if week == 5 {
                    week = -1;
                }
                x.week = Some(week);
                *i += 1;
                expect_rule_sep(l, *i)?;
                *i += 1;
                x.weekday = Some((int_at(l, *i)? - 1).rem_euclid(7) as u32);
            }
            _ => {
                // day of the year, zero-based
                x.yday = Some(int_at(l, *i)? as u32 + 1);
            }
        }
        *i += 1;

        if *i < len_l && l[*i].text == "/" {
            *i += 1;
            let text = token_text(l, *i)?.to_string();
            let width = text.len();
            if ascii_digits(&text, 4) {
                x.time = Some(parse_num::<i32>(&text[..2])? * 3600 + parse_num::<i32>(&text[2..])? * 60);
            } else if *i + 1 < len_l && l[*i + 1].text == ":" {
                let mut time = parse_num::<i32>(&text)? * 3600 + int_at(l, *i + 2)? * 60;
                *i += 2;
                if *i + 1 < len_l && l[*i + 1].text == ":" {
                    *i += 2;
                    time += int_at(l, *i)?;
                }
                x.time = Some(time);
            } else if width <= 2 {
                x.time = Some(parse_num::<i32>(&text)? * 3600);
            } else {
                return Err(Error::Format(format!("`{text}` is not a transition time")));
            }
            *i += 1;
        }

        if *i < len_l && l[*i].text != "," {
            return Err(Error::Format(format!(
                "unexpected `{}` in transition rule",
                l[*i].text
            )));
        }
        *i += 1;

        if which == 0 {
            res.start = x;
        } else {
            res.end = x;
        }
    }
    if *i < len_l {
        return Err(Error::Format("trailing tokens after transition rules".to_string()));
    }
    Ok(())
}

fn expect_rule_sep(l: &[Token], i: usize) -> Result<(), Error> {
    match token_text(l, i)? {
        "-" | "." => Ok(()),
        other => Err(Error::Format(format!(
            "expected `.` or `-` in transition rule, found `{other}`"
        ))),
    }
}

fn token_text(l: &[Token], i: usize) -> Result<&str, Error> {
    l.get(i)
        .map(|t| t.text.as_str())
        .ok_or_else(|| Error::Format("zone description ended unexpectedly".to_string()))
}

fn int_at(l: &[Token], i: usize) -> Result<i32, Error> {
    let text = token_text(l, i)?;
    text.parse()
        .map_err(|_| Error::Format(format!("`{text}` is not a whole number")))
}

fn parse_num<T: std::str::FromStr>(text: &str) -> Result<T, Error> {
    text.parse()
        .map_err(|_| Error::Format(format!("`{text}` is not a number")))
}

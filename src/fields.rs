//! The assembly engine: walks the token stream, classifies each token in
//! context, and accumulates the date/time fields it finds.
//!
//! Numeric date components are collected into an ordered candidate list
//! and only assigned to year/month/day roles once the whole string has
//! been consumed, so that `"10/09/1998"` can be steered by the
//! `dayfirst`/`yearfirst` hints.

use chrono::Weekday;

use crate::error::Error;
use crate::info::ParserInfo;
use crate::lexer::{ascii_digits, tokenize, Token, TokenKind};

/// The fields recovered from a timestamp string, each optional.
///
/// `weekday` is only meaningful when `day` is absent; the caller decides
/// how to combine the fields with a default instant. `tzoffset` is in
/// seconds east of UTC.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateFields {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub weekday: Option<Weekday>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub second: Option<u32>,
    pub microsecond: Option<u32>,
    pub tzname: Option<String>,
    pub tzoffset: Option<i32>,
}

impl DateFields {
    /// Post-pass normalization: expand a two-digit year and canonicalize
    /// the UTC spellings.
    ///
    /// Returns `false` when the fields contradict each other; the current
    /// rules never do.
    pub fn validate(&mut self, info: &ParserInfo) -> bool {
        if let Some(year) = self.year {
            self.year = Some(info.convert_year(year));
        }
        let is_z = self.tzname.as_deref() == Some("Z");
        if (self.tzoffset == Some(0) && self.tzname.is_none()) || is_z {
            self.tzname = Some("UTC".to_string());
            self.tzoffset = Some(0);
        } else if self.tzoffset != Some(0) {
            if let Some(name) = &self.tzname {
                if info.utc_zone(name) {
                    self.tzoffset = Some(0);
                }
            }
        }
        true
    }
}

/// Run the engine over `timestr` and resolve the date-component
/// candidates into fields.
pub(crate) fn scan_fields(
    timestr: &str,
    info: &ParserInfo,
    dayfirst: bool,
    yearfirst: bool,
    fuzzy: bool,
) -> Result<DateFields, Error> {
    let mut scanner = FieldScanner {
        info,
        tokens: tokenize(timestr),
        i: 0,
        res: DateFields::default(),
        ymd: Vec::new(),
        mstridx: None,
        fuzzy,
    };
    scanner.run()?;

    let FieldScanner { mut res, ymd, mstridx, .. } = scanner;
    resolve_ymd(&mut res, ymd, mstridx, dayfirst, yearfirst)?;
    if !res.validate(info) {
        return Err(Error::Format(format!("contradictory fields in `{timestr}`")));
    }
    Ok(res)
}

struct FieldScanner<'a> {
    info: &'a ParserInfo,
    tokens: Vec<Token>,
    i: usize,
    res: DateFields,
    /// Numeric date components in order of appearance, roles unassigned.
    ymd: Vec<i32>,
    /// Position in `ymd` of the component that came from a month name.
    mstridx: Option<usize>,
    fuzzy: bool,
}

impl FieldScanner<'_> {
    fn run(&mut self) -> Result<(), Error> {
        while self.i < self.tokens.len() {
            let token = &self.tokens[self.i];
            let text = token.text.clone();

            if let Some(value) = token.number_value() {
                self.i += 1;
                self.number(value, &text)?;
            } else if token.kind == TokenKind::Word {
                if let Some(weekday) = self.info.weekday(&text) {
                    self.res.weekday = Some(weekday);
                    self.i += 1;
                } else if let Some(month) = self.info.month(&text) {
                    self.month_name(month)?;
                } else if let Some(meridian) = self.info.ampm(&text) {
                    self.meridian_word(meridian)?;
                } else if self.tz_name_candidate(&text) {
                    self.tz_name(text);
                } else {
                    self.jump_or_fail(&text)?;
                }
            } else if self.res.hour.is_some() && (text == "+" || text == "-") {
                self.tz_digits(&text)?;
            } else {
                self.jump_or_fail(&text)?;
            }
        }
        Ok(())
    }

    fn jump_or_fail(&mut self, text: &str) -> Result<(), Error> {
        if self.info.jump(text) || self.fuzzy {
            self.i += 1;
            Ok(())
        } else {
            Err(Error::Format(format!("unrecognized token `{text}`")))
        }
    }

    /// Classify one NUMBER token. `self.i` already points past it.
    fn number(&mut self, value: f64, text: &str) -> Result<(), Error> {
        let width = text.len();

        if self.ymd.len() == 3
            && (width == 2 || width == 4)
            && self.text_at(self.i) != Some(":")
        {
            // a bare HH or HHMM glued onto a complete date
            self.res.hour = Some(parse_num(&text[..2])?);
            if width == 4 {
                self.res.minute = Some(parse_num(&text[2..4])?);
            }
        } else if width == 6 || (width > 6 && text.find('.') == Some(6)) {
            if self.ymd.is_empty() && !text.contains('.') {
                // YYMMDD
                let yy: i32 = parse_num(&text[..2])?;
                self.ymd.push(self.info.convert_year(yy));
                self.ymd.push(parse_num(&text[2..4])?);
                self.ymd.push(parse_num(&text[4..])?);
            } else {
                // HHMMSS, possibly with a fractional second
                self.res.hour = Some(parse_num(&text[..2])?);
                self.res.minute = Some(parse_num(&text[2..4])?);
                let seconds: f64 = parse_num(&text[4..])?;
                self.res.second = Some(seconds as u32);
                if seconds.fract() != 0.0 {
                    self.res.microsecond = Some(micros(seconds.fract()));
                }
            }
        } else if width == 8 {
            // YYYYMMDD
            self.ymd.push(parse_num(&text[..4])?);
            self.ymd.push(parse_num(&text[4..6])?);
            self.ymd.push(parse_num(&text[6..])?);
        } else if self.hms_unit_ahead() {
            self.hms_cascade(value)?;
        } else if self.i + 1 < self.tokens.len() && self.text_at(self.i) == Some(":") {
            // HH:MM, optionally :SS with a fraction
            self.res.hour = Some(value as u32);
            self.i += 1;
            let minutes = self.number_at(self.i)?;
            self.res.minute = Some(minutes as u32);
            if minutes.fract() != 0.0 {
                self.res.second = Some((60.0 * minutes.fract()) as u32);
            }
            self.i += 1;
            if self.text_at(self.i) == Some(":") {
                let seconds = self.number_at(self.i + 1)?;
                self.res.second = Some(seconds as u32);
                if seconds.fract() != 0.0 {
                    self.res.microsecond = Some(micros(seconds.fract()));
                }
                self.i += 2;
            }
        } else if matches!(self.text_at(self.i), Some("-") | Some("/") | Some(".")) {
            self.date_separator(value)?;
        } else if self.i >= self.tokens.len() || self.jump_at(self.i) {
            if let Some(meridian) = self.ampm_at(self.i + 1) {
                // "12 am"
                self.meridian_hour(value, meridian);
                self.i += 1;
            } else {
                // a year, month or day awaiting role assignment
                self.ymd.push(value as i32);
            }
            self.i += 1;
        } else if let Some(meridian) = self.ampm_at(self.i) {
            // "12am"
            self.meridian_hour(value, meridian);
            self.i += 1;
        } else if !self.fuzzy {
            return Err(Error::Format(format!("unexpected number `{text}`")));
        } else {
            self.i += 1;
        }
        Ok(())
    }

    /// `"01-01[-01]"` and `"01-Jan[-01]"`: one, two or three components
    /// joined by an identical separator.
    fn date_separator(&mut self, value: f64) -> Result<(), Error> {
        let sep = self.tokens[self.i].text.clone();
        self.ymd.push(value as i32);
        self.i += 1;

        if self.i < self.tokens.len() && !self.jump_at(self.i) {
            let text = self.tokens[self.i].text.clone();
            if let Ok(n) = text.parse::<i32>() {
                self.ymd.push(n);
            } else if let Some(month) = self.info.month(&text) {
                self.ymd.push(month as i32);
                self.note_month_position()?;
            } else {
                return Err(Error::Format(format!("`{text}` is not a date component")));
            }
            self.i += 1;

            if self.text_at(self.i) == Some(sep.as_str()) {
                self.i += 1;
                let text = self.token_text(self.i)?.to_string();
                if let Some(month) = self.info.month(&text) {
                    self.ymd.push(month as i32);
                    self.note_month_position()?;
                } else {
                    self.ymd.push(text.parse::<i32>().map_err(|_| {
                        Error::Format(format!("`{text}` is not a date component"))
                    })?);
                }
                self.i += 1;
            }
        }
        Ok(())
    }

    fn hms_unit_ahead(&self) -> bool {
        if self.hms_at(self.i).is_some() {
            return true;
        }
        self.i + 1 < self.tokens.len()
            && self.tokens[self.i].kind == TokenKind::Space
            && self.hms_at(self.i + 1).is_some()
    }

    /// `"10h36m28.5s"` and friends: numbers chained through unit words,
    /// with fractions spilling into the next smaller unit.
    fn hms_cascade(&mut self, first: f64) -> Result<(), Error> {
        if self.tokens[self.i].kind == TokenKind::Space {
            self.i += 1;
        }
        let mut idx = self
            .hms_at(self.i)
            .ok_or_else(|| Error::Format("expected an h/m/s unit".to_string()))?;
        let mut value = first;

        loop {
            let frac = value.fract();
            match idx {
                0 => {
                    self.res.hour = Some(value as u32);
                    if frac != 0.0 {
                        self.res.minute = Some((60.0 * frac) as u32);
                    }
                }
                1 => {
                    self.res.minute = Some(value as u32);
                    if frac != 0.0 {
                        self.res.second = Some((60.0 * frac) as u32);
                    }
                }
                _ => {
                    self.res.second = Some(value as u32);
                    if frac != 0.0 {
                        self.res.microsecond = Some(micros(frac));
                    }
                }
            }
            self.i += 1;
            if self.i >= self.tokens.len() || idx == 2 {
                break;
            }
            // "12h00": a number with no unit of its own takes the next slot
            match self.tokens[self.i].number_value() {
                None => break,
                Some(v) => {
                    value = v;
                    self.i += 1;
                    idx += 1;
                    if let Some(explicit) = self.hms_at(self.i) {
                        idx = explicit;
                    }
                }
            }
        }
        Ok(())
    }

    fn meridian_hour(&mut self, value: f64, meridian: u32) {
        let mut hour = value as u32;
        if meridian == 1 && hour < 12 {
            hour += 12;
        } else if meridian == 0 && hour == 12 {
            hour = 0;
        }
        self.res.hour = Some(hour);
        let frac = value.fract();
        if frac != 0.0 {
            self.res.minute = Some((60.0 * frac) as u32);
        }
    }

    /// A month name, optionally followed by `-`/`/`-joined components or
    /// by a pertain clause (`"Jan of 99"`).
    fn month_name(&mut self, month: u32) -> Result<(), Error> {
        self.ymd.push(month as i32);
        self.note_month_position()?;
        self.i += 1;

        if self.i >= self.tokens.len() {
            return Ok(());
        }
        let text = self.tokens[self.i].text.clone();
        if text == "-" || text == "/" {
            let sep = text;
            self.i += 1;
            self.ymd.push(self.int_at(self.i)?);
            self.i += 1;
            if self.text_at(self.i) == Some(sep.as_str()) {
                self.i += 1;
                self.ymd.push(self.int_at(self.i)?);
                self.i += 1;
            }
        } else if self.i + 3 < self.tokens.len()
            && self.tokens[self.i].kind == TokenKind::Space
            && self.tokens[self.i + 2].kind == TokenKind::Space
            && self.info.pertain(&self.tokens[self.i + 1].text)
        {
            // "Jan of 99": the trailing number is unambiguously a year.
            // A non-number there was a wrong guess; the clause is
            // consumed either way.
            if let Ok(year) = self.tokens[self.i + 3].text.parse::<i32>() {
                self.ymd.push(self.info.convert_year(year));
            }
            self.i += 4;
        }
        Ok(())
    }

    /// A lone meridian word adjusting an already-parsed hour.
    fn meridian_word(&mut self, meridian: u32) -> Result<(), Error> {
        match self.res.hour {
            Some(hour) => {
                if meridian == 1 && hour < 12 {
                    self.res.hour = Some(hour + 12);
                } else if meridian == 0 && hour == 12 {
                    self.res.hour = Some(0);
                }
                self.i += 1;
                Ok(())
            }
            None if self.fuzzy => {
                self.i += 1;
                Ok(())
            }
            None => Err(Error::Format("am/pm without an hour".to_string())),
        }
    }

    fn tz_name_candidate(&self, text: &str) -> bool {
        self.res.hour.is_some()
            && self.res.tzname.is_none()
            && self.res.tzoffset.is_none()
            && text.len() <= 5
            && text.chars().all(|c| c.is_ascii_uppercase())
    }

    fn tz_name(&mut self, name: String) {
        self.res.tzoffset = self.info.tz_offset(&name);
        let is_utc_name = self.info.utc_zone(&name);
        self.res.tzname = Some(name);
        self.i += 1;

        // "GMT+3" does not mean three hours past GMT; it means this time
        // plus three hours is GMT. The sign is flipped in place so the
        // numeric-offset rule reads it correctly.
        if self.i < self.tokens.len() {
            let flipped = match self.tokens[self.i].text.as_str() {
                "+" => Some("-"),
                "-" => Some("+"),
                _ => None,
            };
            if let Some(sign) = flipped {
                self.tokens[self.i].text = sign.to_string();
                self.res.tzoffset = None;
                if is_utc_name {
                    // the real zone is the one expressed by the offset
                    self.res.tzname = None;
                }
            }
        }
    }

    /// `+HH[:MM]` / `-HHMM` after a time of day.
    fn tz_digits(&mut self, sign_text: &str) -> Result<(), Error> {
        let sign: i32 = if sign_text == "+" { 1 } else { -1 };
        self.i += 1;
        let text = self.token_text(self.i)?.to_string();
        let width = text.len();

        let offset = if ascii_digits(&text, 4) {
            // -0300
            parse_num::<i32>(&text[..2])? * 3600 + parse_num::<i32>(&text[2..])? * 60
        } else if self.i + 1 < self.tokens.len() && self.tokens[self.i + 1].text == ":" {
            // -03:00
            let hours: i32 = parse_num(&text)?;
            let minutes = self.int_at(self.i + 2)?;
            self.i += 2;
            hours * 3600 + minutes * 60
        } else if width <= 2 {
            // -[0]3
            parse_num::<i32>(&text)? * 3600
        } else {
            return Err(Error::Format(format!("`{text}` is not a timezone offset")));
        };
        self.i += 1;
        self.res.tzoffset = Some(offset * sign);

        // "-0300 (BRST)"
        if self.i + 3 < self.tokens.len()
            && self.jump_at(self.i)
            && self.tokens[self.i + 1].text == "("
            && self.tokens[self.i + 3].text == ")"
        {
            let name = &self.tokens[self.i + 2].text;
            if (3..=5).contains(&name.len()) && name.chars().all(|c| c.is_ascii_uppercase()) {
                self.res.tzname = Some(name.clone());
                self.i += 4;
            }
        }
        Ok(())
    }

    fn note_month_position(&mut self) -> Result<(), Error> {
        if self.mstridx.is_some() {
            return Err(Error::Format("month name appears twice".to_string()));
        }
        self.mstridx = Some(self.ymd.len() - 1);
        Ok(())
    }

    fn token_text(&self, i: usize) -> Result<&str, Error> {
        self.tokens
            .get(i)
            .map(|t| t.text.as_str())
            .ok_or_else(|| Error::Format("timestamp ended unexpectedly".to_string()))
    }

    fn text_at(&self, i: usize) -> Option<&str> {
        self.tokens.get(i).map(|t| t.text.as_str())
    }

    fn number_at(&self, i: usize) -> Result<f64, Error> {
        self.tokens
            .get(i)
            .and_then(Token::number_value)
            .ok_or_else(|| Error::Format("expected a number".to_string()))
    }

    fn int_at(&self, i: usize) -> Result<i32, Error> {
        let text = self.token_text(i)?;
        text.parse()
            .map_err(|_| Error::Format(format!("`{text}` is not a whole number")))
    }

    fn jump_at(&self, i: usize) -> bool {
        self.tokens.get(i).is_some_and(|t| self.info.jump(&t.text))
    }

    fn ampm_at(&self, i: usize) -> Option<u32> {
        self.tokens.get(i).and_then(|t| self.info.ampm(&t.text))
    }

    fn hms_at(&self, i: usize) -> Option<usize> {
        self.tokens.get(i).and_then(|t| self.info.hms(&t.text))
    }
}

fn parse_num<T: std::str::FromStr>(text: &str) -> Result<T, Error> {
    text.parse()
        .map_err(|_| Error::Format(format!("`{text}` is not a number")))
}

fn micros(frac: f64) -> u32 {
    (frac * 1_000_000.0).round() as u32
}

/// Assign year/month/day roles to the collected components, steered by
/// the position of a month name and the `dayfirst`/`yearfirst` hints.
fn resolve_ymd(
    res: &mut DateFields,
    mut ymd: Vec<i32>,
    mstridx: Option<usize>,
    dayfirst: bool,
    yearfirst: bool,
) -> Result<(), Error> {
    let len = ymd.len();
    if len > 3 {
        return Err(Error::Format(format!("{len} date components")));
    }

    if len == 1 || (mstridx.is_some() && len == 2) {
        if let Some(idx) = mstridx {
            res.month = Some(ymd.remove(idx) as u32);
        }
        if len > 1 || mstridx.is_none() {
            if ymd[0] > 31 {
                res.year = Some(ymd[0]);
            } else {
                res.day = Some(ymd[0] as u32);
            }
        }
    } else if len == 2 {
        if ymd[0] > 31 {
            // 99-01
            res.year = Some(ymd[0]);
            res.month = Some(ymd[1] as u32);
        } else if ymd[1] > 31 {
            // 01-99
            res.month = Some(ymd[0] as u32);
            res.year = Some(ymd[1]);
        } else if dayfirst && ymd[1] <= 12 {
            // 13-01
            res.day = Some(ymd[0] as u32);
            res.month = Some(ymd[1] as u32);
        } else {
            // 01-13
            res.month = Some(ymd[0] as u32);
            res.day = Some(ymd[1] as u32);
        }
    } else if len == 3 {
        match mstridx {
            Some(0) => assign(res, ymd[2], ymd[0], ymd[1]),
            Some(1) => {
                if ymd[0] > 31 || (yearfirst && ymd[2] <= 31) {
                    // 99-Jan-01
                    assign(res, ymd[0], ymd[1], ymd[2]);
                } else {
                    // 01-Jan-99: two-digit years are usually hand-written
                    // day-first
                    assign(res, ymd[2], ymd[1], ymd[0]);
                }
            }
            Some(_) => {
                if ymd[1] > 31 {
                    // 01-99-Jan
                    assign(res, ymd[1], ymd[2], ymd[0]);
                } else {
                    // 99-01-Jan
                    assign(res, ymd[0], ymd[2], ymd[1]);
                }
            }
            None => {
                if ymd[0] > 31 || (yearfirst && ymd[1] <= 12 && ymd[2] <= 31) {
                    // 99-01-01
                    assign(res, ymd[0], ymd[1], ymd[2]);
                } else if ymd[0] > 12 || (dayfirst && ymd[1] <= 12) {
                    // 13-01-01
                    assign(res, ymd[2], ymd[1], ymd[0]);
                } else {
                    // 01-13-01
                    assign(res, ymd[2], ymd[0], ymd[1]);
                }
            }
        }
    }
    Ok(())
}

fn assign(res: &mut DateFields, year: i32, month: i32, day: i32) {
    res.year = Some(year);
    res.month = Some(month as u32);
    res.day = Some(day as u32);
}

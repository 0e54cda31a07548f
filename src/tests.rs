use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;

use super::{
    parse_fields, parse_with, DateFields, Error, ParseOptions, ParsedDateTime, ParserInfo,
    TzInfo, TzMapValue, TzOffsets, TzResolver,
};

fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, mi, s)
        .unwrap()
}

/// The reference instant used as the parse default throughout: a
/// Thursday.
fn base() -> NaiveDateTime {
    dt(2003, 9, 25, 0, 0, 0)
}

fn fields_of(timestr: &str) -> DateFields {
    parse_fields(timestr, &ParseOptions::default()).unwrap()
}

fn parse_at_base(timestr: &str) -> ParsedDateTime {
    parse_with(timestr, &ParseOptions::new().default_instant(base())).unwrap()
}

/*
 * Field extraction
 */

/// Test the asctime-with-zone shape.
#[test]
fn asctime_with_zone_name() {
    let res = fields_of("Thu Sep 25 10:36:28 BRST 2003");
    assert_eq!(res.year, Some(2003));
    assert_eq!(res.month, Some(9));
    assert_eq!(res.day, Some(25));
    assert_eq!(res.weekday, Some(Weekday::Thu));
    assert_eq!(res.hour, Some(10));
    assert_eq!(res.minute, Some(36));
    assert_eq!(res.second, Some(28));
    assert_eq!(res.tzname.as_deref(), Some("BRST"));
    assert_eq!(res.tzoffset, None);
}

/// Test ISO 8601 with a fractional second and a colon offset.
#[test]
fn iso_8601_with_fraction_and_offset() {
    let res = fields_of("1997-07-16T19:20:30.45+01:00");
    assert_eq!(res.year, Some(1997));
    assert_eq!(res.month, Some(7));
    assert_eq!(res.day, Some(16));
    assert_eq!(res.hour, Some(19));
    assert_eq!(res.minute, Some(20));
    assert_eq!(res.second, Some(30));
    assert_eq!(res.microsecond, Some(450_000));
    assert_eq!(res.tzoffset, Some(3600));
}

/// Test that the dayfirst hint steers an all-numeric date.
#[test]
fn dayfirst_steers_ambiguous_dates() {
    let dayfirst = parse_with(
        "10/09/1998",
        &ParseOptions::new().default_instant(base()).dayfirst(true),
    )
    .unwrap();
    assert_eq!(dayfirst.naive_local(), dt(1998, 9, 10, 0, 0, 0));

    let monthfirst = parse_at_base("10/09/1998");
    assert_eq!(monthfirst.naive_local(), dt(1998, 10, 9, 0, 0, 0));
}

/// Test the compact ISO form with a fractional second.
#[test]
fn compact_iso_with_fraction() {
    let res = fields_of("19991231T235959.5");
    assert_eq!(res.year, Some(1999));
    assert_eq!(res.month, Some(12));
    assert_eq!(res.day, Some(31));
    assert_eq!(res.hour, Some(23));
    assert_eq!(res.minute, Some(59));
    assert_eq!(res.second, Some(59));
    assert_eq!(res.microsecond, Some(500_000));
}

/// Test the two-digit compact date and a time glued onto a full date.
#[test]
fn compact_dates_and_glued_times() {
    let res = fields_of("991231");
    assert_eq!(res.year, Some(1999));
    assert_eq!(res.month, Some(12));
    assert_eq!(res.day, Some(31));

    let res = fields_of("19990101T23");
    assert_eq!(res.hour, Some(23));
    assert_eq!(res.minute, None);

    let res = fields_of("19990101T2359");
    assert_eq!(res.hour, Some(23));
    assert_eq!(res.minute, Some(59));
}

/// Test that a pertain word binds a month name to a year.
#[test]
fn pertain_binds_month_to_year() {
    let res = fields_of("Jan of 99");
    assert_eq!(res.month, Some(1));
    assert_eq!(res.year, Some(1999));
    assert_eq!(res.day, None);
}

/// Test that a fractional hour spills into the minutes, also with a
/// meridian.
#[test]
fn fractional_hours_carry_into_minutes() {
    let res = fields_of("3.14 pm");
    assert_eq!(res.hour, Some(15));
    assert_eq!(res.minute, Some(8));

    let res = fields_of("3.14pm");
    assert_eq!(res.hour, Some(15));
    assert_eq!(res.minute, Some(8));
}

/// Test meridian handling around noon and midnight.
#[test]
fn meridian_noon_and_midnight() {
    assert_eq!(fields_of("12 am").hour, Some(0));
    assert_eq!(fields_of("12 pm").hour, Some(12));
    assert_eq!(fields_of("12am").hour, Some(0));
    assert_eq!(fields_of("1 pm").hour, Some(13));
    assert_eq!(fields_of("10:36 pm").hour, Some(22));
    // an hour already on the 24-hour clock is left alone
    assert_eq!(fields_of("15:00 pm").hour, Some(15));
}

/// Test the h/m/s unit cascade, including fraction spill.
#[test]
fn hms_unit_cascade() {
    let res = fields_of("10h36m28.5s");
    assert_eq!(res.hour, Some(10));
    assert_eq!(res.minute, Some(36));
    assert_eq!(res.second, Some(28));
    assert_eq!(res.microsecond, Some(500_000));

    let res = fields_of("12h00");
    assert_eq!(res.hour, Some(12));
    assert_eq!(res.minute, Some(0));

    let res = fields_of("1h 2m");
    assert_eq!(res.hour, Some(1));
    assert_eq!(res.minute, Some(2));

    let res = fields_of("0.5h");
    assert_eq!(res.hour, Some(0));
    assert_eq!(res.minute, Some(30));

    let res = fields_of("10 hours 36 minutes");
    assert_eq!(res.hour, Some(10));
    assert_eq!(res.minute, Some(36));
}

/// Test the zone-name-then-offset convention: `"GMT+3"` places the zone
/// three hours west of GMT.
#[test]
fn zone_name_flips_a_following_sign() {
    let res = fields_of("10:20 GMT+3");
    assert_eq!(res.tzname, None);
    assert_eq!(res.tzoffset, Some(-10_800));

    // a non-UTC name survives, but its offset is still flipped
    let res = fields_of("10:20 BRST+3");
    assert_eq!(res.tzname.as_deref(), Some("BRST"));
    assert_eq!(res.tzoffset, Some(-10_800));
}

/// Test numeric offsets in all three widths, and the parenthesized name.
#[test]
fn numeric_zone_offsets() {
    assert_eq!(fields_of("10:20 +0300").tzoffset, Some(10_800));
    assert_eq!(fields_of("10:20 -03:00").tzoffset, Some(-10_800));
    assert_eq!(fields_of("10:20 +3").tzoffset, Some(10_800));

    let res = fields_of("10:36:28 -0300 (BRST)");
    assert_eq!(res.tzoffset, Some(-10_800));
    assert_eq!(res.tzname.as_deref(), Some("BRST"));
}

/// Test that UTC spellings normalize, including a bare `Z`.
#[test]
fn utc_spellings_normalize() {
    let res = fields_of("10:36 Z");
    assert_eq!(res.tzname.as_deref(), Some("UTC"));
    assert_eq!(res.tzoffset, Some(0));

    let res = fields_of("10:36 GMT");
    assert_eq!(res.tzname.as_deref(), Some("GMT"));
    assert_eq!(res.tzoffset, Some(0));
}

/// Test month-name dates joined by separators.
#[test]
fn month_names_with_separators() {
    let res = fields_of("Sep-25-2003");
    assert_eq!(res.year, Some(2003));
    assert_eq!(res.month, Some(9));
    assert_eq!(res.day, Some(25));

    let res = fields_of("01-Jan-99");
    assert_eq!(res.year, Some(1999));
    assert_eq!(res.month, Some(1));
    assert_eq!(res.day, Some(1));

    let res = fields_of("99-Jan-01");
    assert_eq!(res.year, Some(1999));
    assert_eq!(res.month, Some(1));
    assert_eq!(res.day, Some(1));
}

/// Test that yearfirst promotes a leading two-digit component.
#[test]
fn yearfirst_promotes_leading_component() {
    let opts = ParseOptions::new().default_instant(base()).yearfirst(true);
    let res = parse_with("10/09/03", &opts).unwrap();
    assert_eq!(res.naive_local(), dt(2010, 9, 3, 0, 0, 0));

    let res = parse_at_base("10/09/03");
    assert_eq!(res.naive_local(), dt(2003, 10, 9, 0, 0, 0));
}

/// Test fuzzy mode skipping prose around the date.
#[test]
fn fuzzy_skips_prose() {
    let opts = ParseOptions::new().default_instant(base()).fuzzy(true);
    let res = parse_with("The meeting is on Sep 25 at 10:36", &opts).unwrap();
    assert_eq!(res.naive_local(), dt(2003, 9, 25, 10, 36, 0));

    assert!(parse_with(
        "The meeting is on Sep 25 at 10:36",
        &ParseOptions::new().default_instant(base()),
    )
    .is_err());
}

/*
 * Merging and timezone resolution
 */

/// Test that fields absent from the input come from the default instant.
#[test]
fn missing_fields_come_from_the_default() {
    let default = NaiveDate::from_ymd_opt(2003, 9, 25)
        .unwrap()
        .and_hms_micro_opt(14, 30, 15, 500_000)
        .unwrap();
    let opts = ParseOptions::new().default_instant(default);

    let res = parse_with("10:36", &opts).unwrap();
    assert_eq!(
        res.naive_local(),
        NaiveDate::from_ymd_opt(2003, 9, 25)
            .unwrap()
            .and_hms_micro_opt(10, 36, 15, 500_000)
            .unwrap()
    );

    let res = parse_with("Oct 7", &opts).unwrap();
    assert_eq!(
        res.naive_local(),
        NaiveDate::from_ymd_opt(2003, 10, 7)
            .unwrap()
            .and_hms_micro_opt(14, 30, 15, 500_000)
            .unwrap()
    );
}

/// Test that an empty input yields the default instant untouched.
#[test]
fn empty_input_is_the_default() {
    assert_eq!(parse_at_base("").naive_local(), base());
}

/// Test the weekday adjustment when no day was given.
#[test]
fn weekday_without_day_moves_forward() {
    // the base instant is a Thursday
    assert_eq!(parse_at_base("Friday").naive_local(), dt(2003, 9, 26, 0, 0, 0));
    assert_eq!(parse_at_base("Thursday").naive_local(), base());
    assert_eq!(
        parse_at_base("Monday 10:36").naive_local(),
        dt(2003, 9, 29, 10, 36, 0)
    );

    // an explicit day wins over the weekday
    assert_eq!(
        parse_at_base("Friday Sep 10").naive_local(),
        dt(2003, 9, 10, 0, 0, 0)
    );
}

/// Test that ignoretz drops the offset.
#[test]
fn ignoretz_drops_the_offset() {
    let opts = ParseOptions::new().default_instant(base()).ignoretz(true);
    let res = parse_with("1997-07-16T19:20:30+01:00", &opts).unwrap();
    assert_eq!(res, ParsedDateTime::Naive(dt(1997, 7, 16, 19, 20, 30)));
}

/// Test that a parsed offset becomes a fixed-offset zone.
#[test]
fn parsed_offset_becomes_fixed_zone() {
    let res = parse_at_base("1997-07-16T19:20:30+01:00");
    let fixed = res.fixed().unwrap();
    assert_eq!(fixed.offset().local_minus_utc(), 3600);
    assert_eq!(fixed.naive_local(), dt(1997, 7, 16, 19, 20, 30));
}

/// Test that a zero offset resolves to UTC.
#[test]
fn zero_offset_resolves_to_utc() {
    let res = parse_at_base("1997-07-16T19:20:30Z");
    let fixed = res.fixed().unwrap();
    assert_eq!(fixed.offset().local_minus_utc(), 0);
}

/// Test mapping zone abbreviations through `tz_offsets`.
#[test]
fn tz_offsets_map_resolves_names() {
    let mut map = HashMap::new();
    map.insert("BRST".to_string(), TzMapValue::Offset(-10_800));
    map.insert(
        "EST".to_string(),
        TzMapValue::TzString("EST5EDT,M3.2.0/2,M11.1.0/2".to_string()),
    );
    map.insert("UT".to_string(), TzMapValue::Zone(TzInfo::Utc));

    let opts = ParseOptions::new()
        .default_instant(base())
        .tz_offsets(TzOffsets::Map(map));

    let res = parse_with("Thu Sep 25 10:36:28 BRST 2003", &opts).unwrap();
    assert_eq!(res.fixed().unwrap().offset().local_minus_utc(), -10_800);

    // January is outside the DST window of the mapped rule
    let res = parse_with("Jan 15 2003 10:00 EST", &opts).unwrap();
    assert_eq!(res.fixed().unwrap().offset().local_minus_utc(), -18_000);
    // July is inside it
    let res = parse_with("Jul 15 2003 10:00 EST", &opts).unwrap();
    assert_eq!(res.fixed().unwrap().offset().local_minus_utc(), -14_400);

    let res = parse_with("10:00 UT", &opts).unwrap();
    assert_eq!(res.fixed().unwrap().offset().local_minus_utc(), 0);
}

/// Test the callable form of `tz_offsets`.
#[test]
fn tz_offsets_callable_is_consulted() {
    let opts = ParseOptions::new()
        .default_instant(base())
        .tz_offsets(TzOffsets::Func(Box::new(
            |name: Option<&str>, offset: Option<i32>| {
                assert_eq!(name, Some("BRST"));
                assert_eq!(offset, None);
                Some(TzMapValue::Offset(-10_800))
            },
        )));
    let res = parse_with("10:36 BRST", &opts).unwrap();
    assert_eq!(res.fixed().unwrap().offset().local_minus_utc(), -10_800);

    let refusing = ParseOptions::new()
        .default_instant(base())
        .tz_offsets(TzOffsets::Func(Box::new(
            |_: Option<&str>, _: Option<i32>| None,
        )));
    match parse_with("10:36 BRST", &refusing) {
        Err(Error::TzMapping(_)) => {}
        other => panic!("expected a mapping error, got {other:?}"),
    }
}

/// Test that a resolver's local zone names pull in the local zone.
#[test]
fn local_zone_names_resolve_to_local() {
    struct BrazilianResolver;
    impl TzResolver for BrazilianResolver {
        fn get_tz(&self, _name: &str) -> Option<TzInfo> {
            None
        }
        fn local_zone_names(&self) -> Vec<String> {
            vec!["BRT".to_string(), "BRST".to_string()]
        }
    }
    let opts = ParseOptions {
        default: Some(base()),
        resolver: Some(Box::new(BrazilianResolver)),
        ..ParseOptions::default()
    };
    let res = parse_with("10:36 BRST", &opts).unwrap();
    assert!(res.fixed().is_some());
}

/// Test that an unknown abbreviation without an offset stays naive.
#[test]
fn unknown_zone_name_stays_naive() {
    let res = parse_at_base("Thu Sep 25 10:36:28 BRST 2003");
    assert_eq!(res, ParsedDateTime::Naive(dt(2003, 9, 25, 10, 36, 28)));
}

/*
 * Negative tests
 */

#[test]
fn unparseable_inputs_are_format_errors() {
    // "aあ" is four bytes wide but only two characters; it must come
    // back as an error, not a slicing panic
    for input in ["quux", "Jan 5 Feb", "1-2-3-4 5", "10:er", "10h+aあ"] {
        match parse_with(input, &ParseOptions::new().default_instant(base())) {
            Err(Error::Format(_)) => {}
            other => panic!("`{input}` should fail to parse, got {other:?}"),
        }
    }
}

#[test]
fn out_of_range_merges_are_rejected() {
    match parse_with("Feb 31 2003", &ParseOptions::new().default_instant(base())) {
        Err(Error::Format(_)) => {}
        other => panic!("expected a merge failure, got {other:?}"),
    }
}

/*
 * Properties
 */

/// Normalization is idempotent: validating twice changes nothing more.
#[quickcheck]
fn validate_twice_equals_once(year: Option<u16>, tzoffset: Option<i32>, named: u8) -> bool {
    let info = ParserInfo::new(false, false);
    let tzname = match named % 4 {
        0 => None,
        1 => Some("Z".to_string()),
        2 => Some("GMT".to_string()),
        _ => Some("BRST".to_string()),
    };
    let mut once = DateFields {
        year: year.map(i32::from),
        tzoffset,
        tzname,
        ..DateFields::default()
    };
    let mut twice = once.clone();
    once.validate(&info);
    twice.validate(&info);
    twice.validate(&info);
    once == twice
}

/// Two-digit years land within fifty years of today.
#[quickcheck]
fn converted_years_land_near_today(y: u8) -> bool {
    let info = ParserInfo::new(false, false);
    let converted = info.convert_year(i32::from(y % 100));
    let now = info.current_year();
    converted >= now - 49 && converted <= now + 50
}

/// Unambiguous ISO 8601 survives a round trip through the parser.
#[quickcheck]
fn iso_8601_round_trips(y: u16, m: u8, d: u8, h: u8, mi: u8, s: u8) -> TestResult {
    let y = i32::from(y % 9000) + 1000;
    let m = u32::from(m % 12) + 1;
    let d = u32::from(d % 31) + 1;
    let date = match NaiveDate::from_ymd_opt(y, m, d) {
        Some(date) => date,
        None => return TestResult::discard(),
    };
    let expected = date
        .and_hms_opt(u32::from(h % 24), u32::from(mi % 60), u32::from(s % 60))
        .unwrap();
    let text = expected.format("%Y-%m-%dT%H:%M:%S").to_string();

    let parsed = parse_with(&text, &ParseOptions::new().default_instant(base())).unwrap();
    TestResult::from_bool(parsed.naive_local() == expected)
}

/// `-`, `/` and `.` are interchangeable date separators.
#[quickcheck]
fn date_separators_are_equivalent(a: u16, b: u8, c: u8) -> bool {
    let a = a % 9000 + 1000;
    let b = b % 12 + 1;
    let c = c % 31 + 1;
    let opts = ParseOptions::default();
    let dash = parse_fields(&format!("{a:04}-{b:02}-{c:02}"), &opts).ok();
    let slash = parse_fields(&format!("{a:04}/{b:02}/{c:02}"), &opts).ok();
    let dot = parse_fields(&format!("{a:04}.{b:02}.{c:02}"), &opts).ok();
    dash == slash && slash == dot
}

/// Anything the strict parser accepts, the fuzzy parser accepts with the
/// same result.
#[quickcheck]
fn fuzzy_is_a_superset(input: String) -> TestResult {
    let strict = match parse_fields(&input, &ParseOptions::default()) {
        Ok(fields) => fields,
        Err(_) => return TestResult::discard(),
    };
    let fuzzy = parse_fields(&input, &ParseOptions::new().fuzzy(true));
    TestResult::from_bool(fuzzy.ok() == Some(strict))
}

/// The dayfirst hint only matters when the first component could be a
/// day and the second a month.
#[quickcheck]
fn dayfirst_only_flips_small_components(a: u8, b: u8, c: u8, three: bool) -> TestResult {
    let a = u32::from(a) % 99 + 1;
    let b = u32::from(b) % 99 + 1;
    let c = u32::from(c) % 99 + 1;
    let input = if three {
        format!("{a}/{b}/{c}")
    } else {
        format!("{a}/{b}")
    };
    let plain = parse_fields(&input, &ParseOptions::default()).ok();
    let dayfirst = parse_fields(
        &input,
        &ParseOptions {
            dayfirst: Some(true),
            ..ParseOptions::default()
        },
    )
    .ok();
    if plain == dayfirst {
        return TestResult::discard();
    }
    TestResult::from_bool(a <= 31 && b <= 12)
}

// Parsing and formatting helpers.
//
// All the "dirty" spreadsheet handling lives here so the rest of the code
// can assume clean, typed values.
use chrono::{Datelike, Duration, NaiveDate};
use num_format::{Locale, ToFormattedString};

// Day-first formats come before ISO so `01/02/2025` is always 1 February.
const DATE_FORMATS: [&str; 7] = [
    "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%d/%m/%y", "%d-%m-%y", "%d.%m.%y",
];

/// Parse a day-first date, ignoring a trailing time of day.
///
/// Returns `None` for blanks and for impossible dates like `31/02/2025`.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let date_part = s.split([' ', 'T']).next().unwrap_or(s);
    DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(date_part, fmt)
            .ok()
            // `%Y` happily takes `25` as year 25; leave that to `%y`.
            .filter(|d| d.year() >= 1900)
    })
}

/// Parse an integer code that may have been exported as a float (`500100.0`).
pub fn parse_code_safe(s: Option<&str>) -> Option<i64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Some(f as i64),
        _ => None,
    }
}

// Serial of 9999-12-31, the last day Excel can represent.
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

/// Convert an Excel serial day number to a date.
///
/// - The epoch is 1899-12-30, which absorbs the 1900 leap-year bug.
/// - The fractional part (time of day) is dropped.
/// - Serials outside `1..=2958465` (before 1900 or after 9999-12-31) and
///   non-finite values give `None`; they come from corrupted cells.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=EXCEL_MAX_SERIAL).contains(&serial) {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::try_days(serial.trunc() as i64)?)
}

/// Trim, collapse internal whitespace runs and upper-case.
pub fn normalize_name(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// `completed / handled * 100`, undefined when nothing was handled.
pub fn completion_rate(completed: usize, handled: usize) -> Option<f64> {
    if handled == 0 {
        return None;
    }
    Some(completed as f64 / handled as f64 * 100.0)
}

/// Whole percentage, rounded half away from zero. Undefined rates are blank.
pub fn format_percent(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{}%", r.round() as i64),
        None => String::new(),
    }
}

/// `dd/mm/yyyy`, the form used for day selectors, the day column and the
/// "Dati aggiornati al" line.
pub fn format_day(d: NaiveDate) -> String {
    d.format("%d/%m/%Y").to_string()
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Italian separators for counts in console output (`9.855 righe`).
    n.to_formatted_string(&Locale::it)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn dates_are_day_first() {
        assert_eq!(parse_date_safe(Some("01/02/2025")), Some(ymd(2025, 2, 1)));
        assert_eq!(parse_date_safe(Some(" 13-12-2024 ")), Some(ymd(2024, 12, 13)));
        assert_eq!(parse_date_safe(Some("05.03.2025")), Some(ymd(2025, 3, 5)));
        assert_eq!(parse_date_safe(Some("05/03/25")), Some(ymd(2025, 3, 5)));
        assert_eq!(parse_date_safe(Some("2025-03-05")), Some(ymd(2025, 3, 5)));
        assert_eq!(
            parse_date_safe(Some("05/03/2025 14:30:00")),
            Some(ymd(2025, 3, 5))
        );
        assert_eq!(
            parse_date_safe(Some("2025-03-05T08:00:00")),
            Some(ymd(2025, 3, 5))
        );
    }

    #[test]
    fn impossible_or_blank_dates_are_none() {
        assert_eq!(parse_date_safe(Some("31/02/2025")), None);
        assert_eq!(parse_date_safe(Some("")), None);
        assert_eq!(parse_date_safe(Some("   ")), None);
        assert_eq!(parse_date_safe(Some("domani")), None);
        assert_eq!(parse_date_safe(None), None);
    }

    #[test]
    fn codes_accept_float_exports() {
        assert_eq!(parse_code_safe(Some("500100")), Some(500100));
        assert_eq!(parse_code_safe(Some("400340.0")), Some(400340));
        assert_eq!(parse_code_safe(Some("4.5")), None);
        assert_eq!(parse_code_safe(Some("abc")), None);
        assert_eq!(parse_code_safe(Some("")), None);
    }

    #[test]
    fn excel_serials() {
        assert_eq!(excel_serial_to_date(45658.0), Some(ymd(2025, 1, 1)));
        assert_eq!(excel_serial_to_date(45658.75), Some(ymd(2025, 1, 1)));
        assert_eq!(excel_serial_to_date(0.0), None);
        assert_eq!(excel_serial_to_date(2_958_465.0), Some(ymd(9999, 12, 31)));
    }

    #[test]
    fn corrupted_excel_serials_are_none() {
        assert_eq!(excel_serial_to_date(1.0e15), None);
        assert_eq!(excel_serial_to_date(2_958_466.0), None);
        assert_eq!(excel_serial_to_date(-3.0), None);
        assert_eq!(excel_serial_to_date(f64::NAN), None);
        assert_eq!(excel_serial_to_date(f64::INFINITY), None);
    }

    #[test]
    fn names_are_normalized() {
        assert_eq!(normalize_name("  mario   rossi "), "MARIO ROSSI");
        assert_eq!(normalize_name("Mario\tRossi"), "MARIO ROSSI");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn rates_and_percentages() {
        assert_eq!(completion_rate(0, 0), None);
        assert_eq!(completion_rate(1, 2), Some(50.0));
        assert_eq!(format_percent(completion_rate(2, 3)), "67%");
        assert_eq!(format_percent(Some(72.5)), "73%");
        assert_eq!(format_percent(Some(0.0)), "0%");
        assert_eq!(format_percent(None), "");
    }

    #[test]
    fn italian_thousands() {
        assert_eq!(format_int(9855usize), "9.855");
        assert_eq!(format_day(ymd(2025, 1, 7)), "07/01/2025");
    }
}

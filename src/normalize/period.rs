// src/normalize/period.rs

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Monthly period codes: `M01` .. `M12`. `M13` (annual average) is rejected
/// by the range check below.
static MONTHLY_PERIOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^M(\d{1,2})$").expect("monthly period regex should be valid"));

/// Extract the month (1..=12) from a monthly period code.
pub fn month_from_period(period: &str) -> Option<u32> {
    let caps = MONTHLY_PERIOD.captures(period.trim())?;
    let month: u32 = caps[1].parse().ok()?;
    (1..=12).contains(&month).then_some(month)
}

/// First calendar day of `(year, month)`.
pub fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Fractional change from `previous` to `current`. `None` when the previous
/// value is zero or the result is not finite.
pub fn percent_change(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    let change = (current - previous) / previous;
    change.is_finite().then_some(change)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monthly_codes_map_to_months() {
        for m in 1..=12u32 {
            let code = format!("M{:02}", m);
            assert_eq!(month_from_period(&code), Some(m), "{}", code);
        }
    }

    #[test]
    fn rejects_non_monthly_codes() {
        for code in ["M13", "M00", "A01", "Q01", "S01", "M", "", "M1a", "01", "M001"] {
            assert_eq!(month_from_period(code), None, "{}", code);
        }
    }

    #[test]
    fn first_of_month_builds_dates() {
        assert_eq!(
            first_of_month(2023, 2),
            NaiveDate::from_ymd_opt(2023, 2, 1)
        );
        assert_eq!(first_of_month(2023, 13), None);
    }

    #[test]
    fn percent_change_handles_zero_base() {
        assert_eq!(percent_change(0.0, 5.0), None);
        assert_eq!(percent_change(0.0, 0.0), None);
        let c = percent_change(100.0, 110.0).unwrap();
        assert!((c - 0.10).abs() < 1e-12);
        let c = percent_change(110.0, 99.0).unwrap();
        assert!((c + 0.10).abs() < 1e-12);
    }
}

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// English month names as they appear in destination folder and file names.
/// Never localized.
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// One pay period, identified by calendar year and month (1-12).
///
/// Ordering is chronological, so a `BTreeSet<MonthKey>` iterates oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Returns `None` when `month` is outside 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// The month immediately before the one containing `date`.
    pub fn preceding(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
        .previous()
    }

    pub fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// The `count` months strictly before the month of `today`, most recent first.
    ///
    /// Callers bound `count` (see `MAX_MONTHS_BACK_LIMIT`).
    pub fn recent(today: NaiveDate, count: u32) -> Vec<Self> {
        std::iter::successors(Some(Self::preceding(today)), |month| Some(month.previous()))
            .take(count as usize)
            .collect()
    }

    /// Parse destination folder names, e.g. `("December", "2025")`.
    ///
    /// The year must be exactly four ASCII digits; the month must be a full
    /// English month name (case-insensitive).
    pub fn from_names(month_name: &str, year: &str) -> Option<Self> {
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year: i32 = year.parse().ok()?;
        let index = MONTH_NAMES
            .iter()
            .position(|name| name.eq_ignore_ascii_case(month_name.trim()))?;
        Self::new(year, index as u32 + 1)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[(self.month - 1) as usize]
    }

    pub fn year_folder_name(&self) -> String {
        format!("{:04}", self.year)
    }

    /// `December_2025_PaySlip.pdf`
    pub fn destination_file_name(&self) -> String {
        format!("{}_{}_PaySlip.pdf", self.month_name(), self.year)
    }

    /// `payslip_1225.pdf` (MMYY)
    pub fn archive_file_name(&self) -> String {
        format!("payslip_{:02}{:02}.pdf", self.month, self.year.rem_euclid(100))
    }

    /// Month specifier expected by the Paybooks API: `01-MM-YYYY`.
    pub fn api_month(&self) -> String {
        format!("01-{:02}-{:04}", self.month, self.year)
    }
}

impl Display for MonthKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} {}", self.month_name(), self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(year: i32, month: u32) -> MonthKey {
        MonthKey::new(year, month).unwrap()
    }

    #[test]
    fn rejects_out_of_range_month() {
        assert!(MonthKey::new(2025, 0).is_none());
        assert!(MonthKey::new(2025, 13).is_none());
    }

    #[test]
    fn naming_for_december_2025() {
        let month = key(2025, 12);
        assert_eq!(month.destination_file_name(), "December_2025_PaySlip.pdf");
        assert_eq!(month.archive_file_name(), "payslip_1225.pdf");
        assert_eq!(month.api_month(), "01-12-2025");
        assert_eq!(month.to_string(), "December 2025");
        assert_eq!(month.year_folder_name(), "2025");
    }

    #[test]
    fn archive_name_pads_single_digit_month_and_year() {
        assert_eq!(key(2009, 3).archive_file_name(), "payslip_0309.pdf");
    }

    #[test]
    fn preceding_wraps_year() {
        let jan = NaiveDate::from_ymd_opt(2026, 1, 21).unwrap();
        assert_eq!(MonthKey::preceding(jan), key(2025, 12));

        let dec = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        assert_eq!(MonthKey::preceding(dec), key(2025, 11));
    }

    #[test]
    fn recent_is_reverse_chronological_and_excludes_current_month() {
        let today = NaiveDate::from_ymd_opt(2025, 2, 10).unwrap();
        let months = MonthKey::recent(today, 3);
        assert_eq!(months, vec![key(2025, 1), key(2024, 12), key(2024, 11)]);
        assert!(MonthKey::recent(today, 0).is_empty());
    }

    #[test]
    fn recent_full_window_spans_a_century() {
        let today = NaiveDate::from_ymd_opt(2025, 12, 15).unwrap();
        let months = MonthKey::recent(today, crate::constants::MAX_MONTHS_BACK_LIMIT);
        assert_eq!(months.len(), 1200);
        assert_eq!(months.first(), Some(&key(2025, 11)));
        assert_eq!(months.last(), Some(&key(1925, 12)));
    }

    #[test]
    fn from_names_accepts_full_english_names() {
        assert_eq!(MonthKey::from_names("December", "2025"), Some(key(2025, 12)));
        assert_eq!(MonthKey::from_names("march", "2024"), Some(key(2024, 3)));
    }

    #[test]
    fn from_names_rejects_bad_folders() {
        assert_eq!(MonthKey::from_names("Dec", "2025"), None);
        assert_eq!(MonthKey::from_names("December", "Archive"), None);
        assert_eq!(MonthKey::from_names("December", "25"), None);
        assert_eq!(MonthKey::from_names("December", "+202"), None);
    }

    #[test]
    fn ordering_is_chronological() {
        assert!(key(2024, 12) < key(2025, 1));
        assert!(key(2025, 2) > key(2025, 1));
    }
}

use chrono::{Datelike, NaiveDate, NaiveTime};

/// Format the bot writes birth dates in.
pub const BIRTH_DATE_FORMAT: &str = "%d.%m.%Y";
/// Format of `notification_settings.time`.
pub const TIME_OF_DAY_FORMAT: &str = "%H:%M";

const MAX_AGE_YEARS: i32 = 150;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BirthDateError {
    #[error("birth date `{0}` is not in DD.MM.YYYY format")]
    Format(String),
    #[error("birth date {0} is in the future")]
    InFuture(NaiveDate),
    #[error("birth date {0} is more than 150 years ago")]
    TooOld(NaiveDate),
}

pub fn parse_birth_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    if let Ok(d) = NaiveDate::parse_from_str(s, BIRTH_DATE_FORMAT) {
        return Some(d);
    }

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }

    None
}

pub fn validate_birth_date(s: &str, today: NaiveDate) -> Result<NaiveDate, BirthDateError> {
    let date = parse_birth_date(s).ok_or_else(|| BirthDateError::Format(s.to_string()))?;

    if date > today {
        return Err(BirthDateError::InFuture(date));
    }

    if today.year() - date.year() > MAX_AGE_YEARS {
        return Err(BirthDateError::TooOld(date));
    }

    Ok(date)
}

/// Parses `HH:MM`, tolerating a single-digit hour.
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), TIME_OF_DAY_FORMAT).ok()
}

/// The day a birthday is celebrated in `year`. Feb 29 maps to Feb 28 outside leap years.
pub fn birthday_in_year(birth_date: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, birth_date.month(), birth_date.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, birth_date.month(), birth_date.day() - 1))
}

pub fn is_birthday_on(birth_date: NaiveDate, date: NaiveDate) -> bool {
    birthday_in_year(birth_date, date.year()) == Some(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_both_birth_date_formats() {
        assert_eq!(parse_birth_date("15.03.1990"), Some(date(1990, 3, 15)));
        assert_eq!(parse_birth_date(" 1990-03-15 "), Some(date(1990, 3, 15)));
        assert_eq!(parse_birth_date("15/03/1990"), None);
        assert_eq!(parse_birth_date("31.02.1990"), None);
    }

    #[test]
    fn validates_birth_date_bounds() {
        let today = date(2024, 6, 1);

        assert_eq!(validate_birth_date("01.06.2024", today), Ok(today));
        assert_eq!(
            validate_birth_date("02.06.2024", today),
            Err(BirthDateError::InFuture(date(2024, 6, 2)))
        );
        assert_eq!(
            validate_birth_date("01.01.1870", today),
            Err(BirthDateError::TooOld(date(1870, 1, 1)))
        );
        assert!(matches!(
            validate_birth_date("yesterday", today),
            Err(BirthDateError::Format(_))
        ));
    }

    #[test]
    fn parses_time_of_day() {
        assert_eq!(parse_time_of_day("09:30"), NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(parse_time_of_day("9:05"), NaiveTime::from_hms_opt(9, 5, 0));
        assert_eq!(parse_time_of_day("24:00"), None);
        assert_eq!(parse_time_of_day("noon"), None);
    }

    #[test]
    fn leap_day_birthdays_move_to_feb_28() {
        let leap = date(2000, 2, 29);

        assert_eq!(birthday_in_year(leap, 2023), Some(date(2023, 2, 28)));
        assert_eq!(birthday_in_year(leap, 2024), Some(date(2024, 2, 29)));
        assert!(is_birthday_on(leap, date(2023, 2, 28)));
        assert!(!is_birthday_on(leap, date(2024, 2, 28)));
    }

    #[test]
    fn matches_month_and_day_only() {
        let birth = date(1990, 3, 15);

        assert!(is_birthday_on(birth, date(2031, 3, 15)));
        assert!(!is_birthday_on(birth, date(2031, 3, 16)));
    }
}

//! # Fecha-hora local
//! src/codec/datetime.rs
//!
//! Fecha y hora sin zona horaria, serializada en formato ISO-8601 local:
//!
//! ```text
//! 2024-03-09T14:05:00
//! 2024-03-09T14:05:00.25
//! ```
//!
//! No hay semántica de zonas horarias: `now()` toma el reloj del sistema en UTC.

use super::error::CodecError;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalDateTime {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    nanos: u32,
}

impl LocalDateTime {
    /// Construye una fecha-hora validando rangos (incluye años bisiestos)
    pub fn new(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Option<Self> {
        Self::with_nanos(year, month, day, hour, minute, second, 0)
    }

    pub fn with_nanos(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        nanos: u32,
    ) -> Option<Self> {
        let valid = (0..=9999).contains(&year)
            && (1..=12).contains(&month)
            && day >= 1
            && day <= days_in_month(year, month)
            && hour < 24
            && minute < 60
            && second < 60
            && nanos < 1_000_000_000;
        valid.then_some(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            nanos,
        })
    }

    /// Fecha-hora actual (UTC, sin offset)
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::from_unix(elapsed.as_secs() as i64, elapsed.subsec_nanos())
    }

    /// Convierte segundos desde epoch a fecha civil
    pub fn from_unix(secs: i64, nanos: u32) -> Self {
        let days = secs.div_euclid(86_400);
        let rem = secs.rem_euclid(86_400) as u32;
        let (year, month, day) = civil_from_days(days);
        Self {
            year: year as i32,
            month,
            day,
            hour: rem / 3600,
            minute: rem % 3600 / 60,
            second: rem % 60,
            nanos,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn second(&self) -> u32 {
        self.second
    }

    pub fn nanos(&self) -> u32 {
        self.nanos
    }
}

impl fmt::Display for LocalDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;
        if self.nanos > 0 {
            let fraction = format!("{:09}", self.nanos);
            write!(f, ".{}", fraction.trim_end_matches('0'))?;
        }
        Ok(())
    }
}

impl FromStr for LocalDateTime {
    type Err = CodecError;

    /// Acepta `YYYY-MM-DDTHH:MM`, `YYYY-MM-DDTHH:MM:SS` y fracción de 1 a 9 dígitos
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CodecError::DateTime(s.to_string());

        let (date, time) = s.split_once('T').ok_or_else(invalid)?;

        let mut date_parts = date.split('-');
        let year = fixed_digits(date_parts.next(), 4).ok_or_else(invalid)?;
        let month = fixed_digits(date_parts.next(), 2).ok_or_else(invalid)?;
        let day = fixed_digits(date_parts.next(), 2).ok_or_else(invalid)?;
        if date_parts.next().is_some() {
            return Err(invalid());
        }

        let (clock, fraction) = match time.split_once('.') {
            Some((clock, fraction)) => (clock, Some(fraction)),
            None => (time, None),
        };

        let mut clock_parts = clock.split(':');
        let hour = fixed_digits(clock_parts.next(), 2).ok_or_else(invalid)?;
        let minute = fixed_digits(clock_parts.next(), 2).ok_or_else(invalid)?;
        let second = match clock_parts.next() {
            Some(sec) => fixed_digits(Some(sec), 2).ok_or_else(invalid)?,
            None if fraction.is_none() => 0,
            None => return Err(invalid()),
        };
        if clock_parts.next().is_some() {
            return Err(invalid());
        }

        let nanos = match fraction {
            Some(digits)
                if !digits.is_empty()
                    && digits.len() <= 9
                    && digits.bytes().all(|b| b.is_ascii_digit()) =>
            {
                let padded = format!("{:0<9}", digits);
                padded.parse::<u32>().map_err(|_| invalid())?
            }
            Some(_) => return Err(invalid()),
            None => 0,
        };

        Self::with_nanos(year as i32, month, day, hour, minute, second, nanos).ok_or_else(invalid)
    }
}

fn fixed_digits(part: Option<&str>, len: usize) -> Option<u32> {
    let part = part?;
    if part.len() != len || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

fn is_leap(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap(year) => 29,
        2 => 28,
        _ => 0,
    }
}

// Algoritmo de días civiles de Howard Hinnant
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400;
    (if month <= 2 { year + 1 } else { year }, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_without_fraction() {
        let dt = LocalDateTime::new(2024, 3, 9, 14, 5, 0).unwrap();
        assert_eq!(dt.to_string(), "2024-03-09T14:05:00");
    }

    #[test]
    fn test_display_trims_fraction() {
        let dt = LocalDateTime::with_nanos(2024, 3, 9, 14, 5, 7, 250_000_000).unwrap();
        assert_eq!(dt.to_string(), "2024-03-09T14:05:07.25");
    }

    #[test]
    fn test_parse_variants() {
        let full: LocalDateTime = "2023-12-31T23:59:59.123456789".parse().unwrap();
        assert_eq!(full.nanos(), 123_456_789);

        let no_seconds: LocalDateTime = "2023-12-31T23:59".parse().unwrap();
        assert_eq!(no_seconds.second(), 0);

        let roundtrip: LocalDateTime = full.to_string().parse().unwrap();
        assert_eq!(roundtrip, full);
    }

    #[test]
    fn test_parse_rejects_invalid() {
        for bad in [
            "2023-02-29T00:00:00",
            "2023-13-01T00:00:00",
            "2023-01-01 00:00:00",
            "2023-01-01T24:00:00",
            "2023-01-01T00:00:00Z",
            "2023-01-01T00:00:00+02:00",
            "23-01-01T00:00:00",
            "2023-01-01T00:00.5",
        ] {
            assert!(bad.parse::<LocalDateTime>().is_err(), "debería fallar: {}", bad);
        }
        assert!("2024-02-29T00:00:00".parse::<LocalDateTime>().is_ok());
    }

    #[test]
    fn test_from_unix() {
        assert_eq!(LocalDateTime::from_unix(0, 0).to_string(), "1970-01-01T00:00:00");
        assert_eq!(
            LocalDateTime::from_unix(1_700_000_000, 0).to_string(),
            "2023-11-14T22:13:20"
        );
        assert_eq!(LocalDateTime::from_unix(-1, 0).to_string(), "1969-12-31T23:59:59");
    }
}

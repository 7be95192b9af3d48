//! EDTF level-0 dates: `YYYY`, `YYYY-MM`, `YYYY-MM-DD`.
//!
//! Publication dates carry an explicit granularity; the update engine only
//! ever replaces a date with a strictly more granular, non-contradicting one.

use std::fmt;

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Granularity {
    Year,
    Month,
    Day,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdtfDate {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl EdtfDate {
    /// Parse a level-0 EDTF string. Calendar validity is checked for full
    /// dates; month-only dates must be in 1..=12.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        let parts: Vec<&str> = s.split('-').collect();
        let err = || format!("invalid EDTF level-0 date: '{s}'");

        match parts.as_slice() {
            [y] if y.len() == 4 => {
                let year = y.parse::<i32>().map_err(|_| err())?;
                Ok(Self { year, month: None, day: None })
            }
            [y, m] if y.len() == 4 && m.len() == 2 => {
                let year = y.parse::<i32>().map_err(|_| err())?;
                let month = m.parse::<u32>().map_err(|_| err())?;
                if !(1..=12).contains(&month) {
                    return Err(err());
                }
                Ok(Self { year, month: Some(month), day: None })
            }
            [y, m, d] if y.len() == 4 && m.len() == 2 && d.len() == 2 => {
                let year = y.parse::<i32>().map_err(|_| err())?;
                let month = m.parse::<u32>().map_err(|_| err())?;
                let day = d.parse::<u32>().map_err(|_| err())?;
                NaiveDate::from_ymd_opt(year, month, day).ok_or_else(err)?;
                Ok(Self { year, month: Some(month), day: Some(day) })
            }
            _ => Err(err()),
        }
    }

    /// Parse after light normalization: bare integers ("2019"), and full
    /// timestamps ("2019-03-01T00:00:00") are truncated to their date part.
    pub fn parse_lenient(s: &str) -> Result<Self, String> {
        let s = s.trim();
        let date_part = s.split('T').next().unwrap_or(s);
        Self::parse(date_part)
    }

    pub fn granularity(&self) -> Granularity {
        match (self.month, self.day) {
            (Some(_), Some(_)) => Granularity::Day,
            (Some(_), None) => Granularity::Month,
            _ => Granularity::Year,
        }
    }
}

impl fmt::Display for EdtfDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.month, self.day) {
            (Some(m), Some(d)) => write!(f, "{:04}-{:02}-{:02}", self.year, m, d),
            (Some(m), None) => write!(f, "{:04}-{:02}", self.year, m),
            _ => write!(f, "{:04}", self.year),
        }
    }
}

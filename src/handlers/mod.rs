pub mod auth;
pub mod availability;
pub mod bookings;
pub mod health;
pub mod notifications;
pub mod providers;
pub mod reviews;
pub mod services;
pub mod users;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::interval::{parse_datetime, parse_range_bound, RangeBound};
use crate::models::Interval;

/// Parses a required datetime field from a request body.
pub(crate) fn datetime_field(name: &str, value: Option<&str>) -> Result<DateTime<Utc>, AppError> {
    let raw = value.ok_or_else(|| AppError::validation(format!("{name} is required")))?;
    parse_datetime(raw)
        .ok_or_else(|| AppError::validation(format!("{name} is not a valid datetime")))
}

/// `startDate` / `endDate` query parameters. Bare dates are accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl RangeQuery {
    /// The requested range, if any. Both bounds must be given together.
    pub fn optional(&self) -> Result<Option<Interval>, AppError> {
        match (&self.start_date, &self.end_date) {
            (None, None) => Ok(None),
            (Some(_), Some(_)) => self.required().map(Some),
            _ => Err(AppError::validation(
                "startDate and endDate must be given together",
            )),
        }
    }

    pub fn required(&self) -> Result<Interval, AppError> {
        let start = self
            .start_date
            .as_deref()
            .ok_or_else(|| AppError::validation("startDate is required"))?;
        let end = self
            .end_date
            .as_deref()
            .ok_or_else(|| AppError::validation("endDate is required"))?;

        let start = parse_range_bound(start, RangeBound::Start)
            .ok_or_else(|| AppError::validation("startDate is not a valid date"))?;
        let end = parse_range_bound(end, RangeBound::End)
            .ok_or_else(|| AppError::validation("endDate is not a valid date"))?;

        Interval::new(start, end)
            .ok_or_else(|| AppError::validation("startDate must be before endDate"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: Option<&str>, end: Option<&str>) -> RangeQuery {
        RangeQuery {
            start_date: start.map(str::to_string),
            end_date: end.map(str::to_string),
        }
    }

    #[test]
    fn test_bare_dates_cover_whole_days() {
        let interval = range(Some("2030-12-15"), Some("2030-12-15")).required().unwrap();
        assert_eq!(interval.start, parse_datetime("2030-12-15T00:00:00Z").unwrap());
        assert_eq!(interval.end, parse_datetime("2030-12-16T00:00:00Z").unwrap());
    }

    #[test]
    fn test_half_given_range_rejected() {
        assert!(range(None, None).optional().unwrap().is_none());
        assert!(matches!(
            range(Some("2030-12-15"), None).optional(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            range(Some("2030-12-15T12:00:00Z"), Some("2030-12-15T08:00:00Z")).required(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_datetime_field() {
        assert!(matches!(datetime_field("startDatetime", None), Err(AppError::Validation(_))));
        assert!(matches!(
            datetime_field("startDatetime", Some("tomorrow")),
            Err(AppError::Validation(_))
        ));
        assert_eq!(
            datetime_field("startDatetime", Some("2030-12-15T08:00")).unwrap(),
            parse_datetime("2030-12-15T08:00:00Z").unwrap()
        );
    }
}

//! Lenient decoding of path, query and body input.
//!
//! Pagination values never fail a request: anything that does not parse
//! falls back to the default. Ids, dates and decimals that do not parse are
//! rejected with 400.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request, rejection::JsonRejection},
    http::request::Parts,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use engine::Page;

use crate::ServerError;

/// JSON body whose rejection is a [`ServerError`].
pub struct Body<T>(pub T);

impl<S, T> FromRequest<S> for Body<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ServerError::Generic(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Query string whose rejection is a [`ServerError`].
pub struct Params<T>(pub T);

impl<S, T> FromRequestParts<S> for Params<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ServerError::Generic(rejection.body_text()))?;
        Ok(Self(value))
    }
}

pub fn id(raw: &str) -> Result<Uuid, ServerError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ServerError::Generic(format!("invalid id: {raw}")))
}

pub fn opt_id(raw: Option<&str>) -> Result<Option<Uuid>, ServerError> {
    raw.filter(|s| !s.trim().is_empty()).map(id).transpose()
}

fn number(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse().ok())
}

pub fn page(limit: Option<&str>, offset: Option<&str>) -> Page {
    Page::new(number(limit), number(offset))
}

pub fn definitions_page(limit: Option<&str>, offset: Option<&str>) -> Page {
    Page::definitions(number(limit), number(offset))
}

/// Raw offset/limit for in-memory slicing; a missing or non-positive limit
/// means no limit.
pub fn slice(limit: Option<&str>, offset: Option<&str>) -> (usize, Option<usize>) {
    let offset = number(offset).filter(|o| *o > 0).map_or(0, |o| o as usize);
    let limit = number(limit).filter(|l| *l > 0).map(|l| l as usize);
    (offset, limit)
}

/// Accepts RFC3339 or a bare `YYYY-MM-DD`. A bare date is the start of
/// that day, or its last nanosecond when `end_of_day` is set.
pub fn instant(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, ServerError> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ServerError::Generic(format!("invalid date: {raw}")))?;
    let time = if end_of_day {
        NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .ok_or_else(|| ServerError::Generic(format!("invalid date: {raw}")))?;
    Ok(day.and_time(time).and_utc())
}

pub fn opt_instant(
    raw: Option<&str>,
    end_of_day: bool,
) -> Result<Option<DateTime<Utc>>, ServerError> {
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| instant(s, end_of_day))
        .transpose()
}

pub fn opt_decimal(raw: Option<&str>) -> Result<Option<Decimal>, ServerError> {
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.trim()
                .parse::<Decimal>()
                .map_err(|_| ServerError::Generic(format!("invalid number: {s}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn bad_pagination_falls_back_to_defaults() {
        assert_eq!(page(Some("abc"), Some("-4")), Page::default());
        assert_eq!(page(Some("5"), Some("10")), Page { limit: 5, offset: 10 });
        assert_eq!(definitions_page(None, None).limit, 50);
    }

    #[test]
    fn slice_keeps_missing_limit_open() {
        assert_eq!(slice(None, None), (0, None));
        assert_eq!(slice(Some("0"), Some("3")), (3, None));
        assert_eq!(slice(Some("2"), Some("x")), (0, Some(2)));
    }

    #[test]
    fn dates_accept_rfc3339_and_plain_days() {
        let day = instant("2024-03-01", false).unwrap();
        assert_eq!(day, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        let end = instant("2024-03-01", true).unwrap();
        assert_eq!(
            end,
            Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap()
                + chrono::Duration::nanoseconds(999_999_999)
        );
        let late = instant("2024-03-01T23:59:59.5Z", false).unwrap();
        assert!(late <= end);
        assert!(instant("2024-03-02", false).unwrap() > end);
        let shifted = instant("2024-03-01T10:00:00+02:00", false).unwrap();
        assert_eq!(shifted, Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());
        assert!(instant("yesterday", false).is_err());
    }

    #[test]
    fn ids_and_decimals_must_parse() {
        assert!(id("nope").is_err());
        assert_eq!(opt_id(Some(" ")).unwrap(), None);
        assert_eq!(opt_decimal(Some("1.50")).unwrap(), Some(Decimal::new(150, 2)));
        assert!(opt_decimal(Some("1,5")).is_err());
    }
}

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request},
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};

use crate::error::{AppError, FieldError};

/// Shape checks run on a request body before any core logic.
pub trait Validate {
    fn validate(&self) -> Vec<FieldError>;
}

/// JSON body that was deserialized and validated. Both failures answer 400.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(vec![FieldError::new("body", rejection.body_text())]))?;

        let errors = value.validate();
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
        Ok(Self(value))
    }
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Parses a `YYYY-MM-DD` calendar date, or the date part of an RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(raw, &format)
        .ok()
        .or_else(|| OffsetDateTime::parse(raw, &Rfc3339).ok().map(|ts| ts.date()))
}

/// Parses an RFC 3339 timestamp, or a calendar date taken as UTC midnight.
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    OffsetDateTime::parse(raw, &Rfc3339).ok().or_else(|| {
        let format = format_description!("[year]-[month]-[day]");
        Date::parse(raw, &format).ok().map(|d| d.midnight().assume_utc())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn email_check() {
        assert!(is_valid_email("a@b.io"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.io"));
    }

    #[test]
    fn dates_accept_plain_and_rfc3339() {
        assert_eq!(parse_date("2024-05-06"), Some(date!(2024 - 05 - 06)));
        assert_eq!(parse_date("2024-05-06T22:10:00Z"), Some(date!(2024 - 05 - 06)));
        assert_eq!(parse_date("06/05/2024"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn timestamps_accept_plain_dates() {
        assert_eq!(parse_timestamp("2024-05-06"), Some(datetime!(2024-05-06 0:00 UTC)));
        assert_eq!(
            parse_timestamp("2024-05-06T08:30:00+02:00"),
            Some(datetime!(2024-05-06 6:30 UTC))
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}

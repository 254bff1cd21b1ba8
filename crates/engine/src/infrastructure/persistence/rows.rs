//! Column codecs shared by the repositories.
//!
//! UUIDs are BLOBs, timestamps are RFC 3339 text with fixed microsecond precision
//! (so text comparison orders them), JSON documents are text.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use playbymail_domain::DomainError;

use crate::infrastructure::ports::RepoError;

pub(crate) fn format_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn format_opt_ts(at: Option<DateTime<Utc>>) -> Option<String> {
    at.map(format_ts)
}

fn column_error(column: &str, error: impl std::fmt::Display) -> RepoError {
    RepoError::serialization(format!("column {}: {}", column, error))
}

pub(crate) fn id<T: From<Uuid>>(row: &SqliteRow, column: &str) -> Result<T, RepoError> {
    row.try_get::<Uuid, _>(column)
        .map(T::from)
        .map_err(|e| column_error(column, e))
}

pub(crate) fn opt_id<T: From<Uuid>>(row: &SqliteRow, column: &str) -> Result<Option<T>, RepoError> {
    row.try_get::<Option<Uuid>, _>(column)
        .map(|value| value.map(T::from))
        .map_err(|e| column_error(column, e))
}

pub(crate) fn text(row: &SqliteRow, column: &str) -> Result<String, RepoError> {
    row.try_get::<String, _>(column)
        .map_err(|e| column_error(column, e))
}

pub(crate) fn opt_text(row: &SqliteRow, column: &str) -> Result<Option<String>, RepoError> {
    row.try_get::<Option<String>, _>(column)
        .map_err(|e| column_error(column, e))
}

pub(crate) fn int(row: &SqliteRow, column: &str) -> Result<i64, RepoError> {
    row.try_get::<i64, _>(column)
        .map_err(|e| column_error(column, e))
}

pub(crate) fn int32(row: &SqliteRow, column: &str) -> Result<i32, RepoError> {
    let value = int(row, column)?;
    i32::try_from(value).map_err(|e| column_error(column, e))
}

pub(crate) fn flag(row: &SqliteRow, column: &str) -> Result<bool, RepoError> {
    Ok(int(row, column)? != 0)
}

pub(crate) fn ts(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, RepoError> {
    parse_ts(column, &text(row, column)?)
}

pub(crate) fn opt_ts(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>, RepoError> {
    opt_text(row, column)?
        .map(|value| parse_ts(column, &value))
        .transpose()
}

fn parse_ts(column: &str, value: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| column_error(column, e))
}

/// Parse an enum stored by its `as_str()` name.
pub(crate) fn parsed<T>(row: &SqliteRow, column: &str) -> Result<T, RepoError>
where
    T: FromStr<Err = DomainError>,
{
    text(row, column)?
        .parse()
        .map_err(|e: DomainError| column_error(column, e))
}

pub(crate) fn opt_parsed<T>(row: &SqliteRow, column: &str) -> Result<Option<T>, RepoError>
where
    T: FromStr<Err = DomainError>,
{
    opt_text(row, column)?
        .map(|value| value.parse().map_err(|e: DomainError| column_error(column, e)))
        .transpose()
}

pub(crate) fn json<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<T, RepoError> {
    serde_json::from_str(&text(row, column)?).map_err(|e| column_error(column, e))
}

pub(crate) fn opt_json<T: DeserializeOwned>(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<T>, RepoError> {
    opt_text(row, column)?
        .map(|value| serde_json::from_str(&value).map_err(|e| column_error(column, e)))
        .transpose()
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String, RepoError> {
    serde_json::to_string(value).map_err(RepoError::serialization)
}

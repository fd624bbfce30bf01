//! Search attempt logging and history queries.
//!
//! Every orchestration run produces exactly one row here, success or
//! failure. Rows are append-only: there is deliberately no update path,
//! so a recorded outcome can never be rewritten.

use crate::error::{Result, StorageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row, Sqlite};
use std::fmt;
use uuid::Uuid;

/// Terminal outcome of a search attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The case was fetched and persisted
    Success,
    /// The attempt failed (see `error_detail` for the kind)
    Failed,
    /// A captcha was surfaced but no code was supplied in this request
    CaptchaRequired,
    /// A wait window (challenge or overall budget) elapsed
    Timeout,
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "Success"),
            Self::Failed => write!(f, "Failed"),
            Self::CaptchaRequired => write!(f, "CaptchaRequired"),
            Self::Timeout => write!(f, "Timeout"),
        }
    }
}

impl AttemptOutcome {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "Success" => Ok(Self::Success),
            "Failed" => Ok(Self::Failed),
            "CaptchaRequired" => Ok(Self::CaptchaRequired),
            "Timeout" => Ok(Self::Timeout),
            other => Err(StorageError::Decode(format!(
                "unknown attempt outcome '{other}'"
            ))),
        }
    }
}

/// One recorded lookup request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchAttempt {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Case type designation as submitted
    pub case_type: String,
    /// Case number as submitted
    pub case_number: String,
    /// Filing year as submitted
    pub year: i32,
    /// When the orchestration run started
    pub submitted_at: DateTime<Utc>,
    /// Terminal outcome
    pub outcome: AttemptOutcome,
    /// Failure kind and message, if the attempt failed
    pub error_detail: Option<String>,
}

/// Filter for history queries; `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Restrict to a case type
    pub case_type: Option<String>,
    /// Restrict to a case number
    pub case_number: Option<String>,
    /// Restrict to a year
    pub year: Option<i32>,
    /// Restrict to an outcome
    pub outcome: Option<AttemptOutcome>,
}

/// Page window for history queries.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    /// Maximum rows returned
    pub limit: u32,
    /// Rows skipped from the newest end
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

/// Append one immutable attempt row.
///
/// Raw strings rather than a validated key: failed validation must
/// still leave a trace of what was asked.
///
/// # Errors
/// Returns `StorageError` if the insert fails.
pub async fn log_attempt(
    pool: &Pool<Sqlite>,
    case_type: &str,
    case_number: &str,
    year: i32,
    submitted_at: DateTime<Utc>,
    outcome: AttemptOutcome,
    error_detail: Option<String>,
) -> Result<SearchAttempt> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO search_attempts (id, case_type, case_number, year, submitted_at, outcome, error_detail)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(case_type)
    .bind(case_number)
    .bind(i64::from(year))
    .bind(submitted_at.to_rfc3339())
    .bind(outcome.to_string())
    .bind(&error_detail)
    .execute(pool)
    .await?;

    tracing::info!(
        attempt_id = %id,
        %outcome,
        "logged search attempt for {case_type} {case_number}/{year}"
    );

    Ok(SearchAttempt {
        id,
        case_type: case_type.to_string(),
        case_number: case_number.to_string(),
        year,
        submitted_at,
        outcome,
        error_detail,
    })
}

/// List attempt history, newest first.
///
/// # Errors
/// Returns `StorageError` if the query fails.
pub async fn list_history(
    pool: &Pool<Sqlite>,
    filter: &HistoryFilter,
    page: Pagination,
) -> Result<Vec<SearchAttempt>> {
    // Columns are NOT NULL, so COALESCE against the bound filter value
    // turns a None filter into a tautology.
    let rows = sqlx::query(
        "SELECT id, case_type, case_number, year, submitted_at, outcome, error_detail
         FROM search_attempts
         WHERE case_type = COALESCE(?, case_type)
           AND case_number = COALESCE(?, case_number)
           AND year = COALESCE(?, year)
           AND outcome = COALESCE(?, outcome)
         ORDER BY submitted_at DESC
         LIMIT ? OFFSET ?",
    )
    .bind(&filter.case_type)
    .bind(&filter.case_number)
    .bind(filter.year.map(i64::from))
    .bind(filter.outcome.map(|o| o.to_string()))
    .bind(i64::from(page.limit))
    .bind(i64::from(page.offset))
    .fetch_all(pool)
    .await?;

    parse_attempts_from_rows(rows)
}

/// Get one attempt by its ID.
///
/// # Errors
/// Returns `StorageError` if the query fails.
pub async fn get_by_id(pool: &Pool<Sqlite>, id: &str) -> Result<Option<SearchAttempt>> {
    let row = sqlx::query(
        "SELECT id, case_type, case_number, year, submitted_at, outcome, error_detail
         FROM search_attempts WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let mut attempts = parse_attempts_from_rows(vec![row])?;
            Ok(attempts.pop())
        }
        None => Ok(None),
    }
}

fn parse_attempts_from_rows(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<SearchAttempt>> {
    rows.into_iter()
        .map(|row| -> Result<SearchAttempt> {
            let outcome_str: String = row.get("outcome");
            let outcome = AttemptOutcome::parse(&outcome_str)?;

            let submitted_at_str: String = row.get("submitted_at");
            let submitted_at = DateTime::parse_from_rfc3339(&submitted_at_str)
                .map_err(|e| StorageError::Decode(format!("bad submitted_at: {e}")))?
                .with_timezone(&Utc);

            let year: i64 = row.get("year");
            #[allow(clippy::cast_possible_truncation)]
            let year = year as i32;

            Ok(SearchAttempt {
                id: row.get("id"),
                case_type: row.get("case_type"),
                case_number: row.get("case_number"),
                year,
                submitted_at,
                outcome,
                error_detail: row.try_get("error_detail").ok().flatten(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_test_db() -> Database {
        let db = Database::new(":memory:", 1).await.expect("create database");
        db.run_migrations().await.expect("run migrations");
        db
    }

    #[tokio::test]
    async fn test_log_attempt() {
        let db = setup_test_db().await;

        let attempt = log_attempt(
            db.pool(),
            "W.P.(C)",
            "1234",
            2023,
            Utc::now(),
            AttemptOutcome::Success,
            None,
        )
        .await
        .expect("log attempt");

        assert_eq!(attempt.case_type, "W.P.(C)");
        assert_eq!(attempt.outcome, AttemptOutcome::Success);

        let fetched = get_by_id(db.pool(), &attempt.id)
            .await
            .expect("get attempt")
            .expect("attempt exists");
        assert_eq!(fetched.case_number, "1234");
        assert_eq!(fetched.year, 2023);
    }

    #[tokio::test]
    async fn test_failed_attempt_keeps_detail() {
        let db = setup_test_db().await;

        let attempt = log_attempt(
            db.pool(),
            "CRL.A.",
            "7",
            2020,
            Utc::now(),
            AttemptOutcome::Failed,
            Some("site_unreachable: navigation retries exhausted".to_string()),
        )
        .await
        .expect("log attempt");

        let fetched = get_by_id(db.pool(), &attempt.id)
            .await
            .expect("get attempt")
            .expect("attempt exists");
        assert_eq!(fetched.outcome, AttemptOutcome::Failed);
        assert!(fetched
            .error_detail
            .expect("detail present")
            .contains("site_unreachable"));
    }

    #[tokio::test]
    async fn test_history_filter_and_pagination() {
        let db = setup_test_db().await;

        for i in 0..5 {
            log_attempt(
                db.pool(),
                "W.P.(C)",
                &format!("{i}"),
                2023,
                Utc::now() + chrono::Duration::seconds(i),
                if i % 2 == 0 {
                    AttemptOutcome::Success
                } else {
                    AttemptOutcome::Failed
                },
                None,
            )
            .await
            .expect("log attempt");
        }
        log_attempt(
            db.pool(),
            "CRL.A.",
            "99",
            2021,
            Utc::now(),
            AttemptOutcome::Timeout,
            None,
        )
        .await
        .expect("log attempt");

        let all = list_history(db.pool(), &HistoryFilter::default(), Pagination::default())
            .await
            .expect("list all");
        assert_eq!(all.len(), 6);

        let successes = list_history(
            db.pool(),
            &HistoryFilter {
                outcome: Some(AttemptOutcome::Success),
                ..HistoryFilter::default()
            },
            Pagination::default(),
        )
        .await
        .expect("list successes");
        assert_eq!(successes.len(), 3);

        let by_type = list_history(
            db.pool(),
            &HistoryFilter {
                case_type: Some("CRL.A.".to_string()),
                ..HistoryFilter::default()
            },
            Pagination::default(),
        )
        .await
        .expect("list by type");
        assert_eq!(by_type.len(), 1);
        assert_eq!(by_type[0].outcome, AttemptOutcome::Timeout);

        let page = list_history(
            db.pool(),
            &HistoryFilter::default(),
            Pagination {
                limit: 2,
                offset: 2,
            },
        )
        .await
        .expect("list page");
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn test_history_newest_first() {
        let db = setup_test_db().await;

        let earlier = Utc::now() - chrono::Duration::hours(1);
        log_attempt(
            db.pool(),
            "W.P.(C)",
            "1",
            2023,
            earlier,
            AttemptOutcome::Success,
            None,
        )
        .await
        .expect("log older");
        log_attempt(
            db.pool(),
            "W.P.(C)",
            "2",
            2023,
            Utc::now(),
            AttemptOutcome::Success,
            None,
        )
        .await
        .expect("log newer");

        let all = list_history(db.pool(), &HistoryFilter::default(), Pagination::default())
            .await
            .expect("list");
        assert_eq!(all[0].case_number, "2");
        assert_eq!(all[1].case_number, "1");
    }
}

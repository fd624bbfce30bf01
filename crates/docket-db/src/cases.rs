//! Case and order persistence.
//!
//! Cases are keyed by the natural key (type, number, year); a re-fetch
//! updates the existing row. Orders belong to a case and are
//! reconciled by their (date, description) identity inside the same
//! transaction as the case write, so a partial failure leaves nothing
//! half-written.

use crate::error::Result;
use chrono::{NaiveDate, Utc};
use docket_core::{CaseRecord, OrderEntry};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row, Sqlite};

const DATE_FMT: &str = "%Y-%m-%d";

/// A case row as stored, with its orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCase {
    /// Row identifier (foreign key target for orders)
    pub id: i64,
    /// Case type designation
    pub case_type: String,
    /// Case number
    pub case_number: String,
    /// Filing year
    pub year: i32,
    /// Display title
    pub title: Option<String>,
    /// Petitioner party name
    pub petitioner: Option<String>,
    /// Respondent party name
    pub respondent: Option<String>,
    /// Filing/registration date
    pub filing_date: Option<NaiveDate>,
    /// Next listed hearing date
    pub next_hearing_date: Option<NaiveDate>,
    /// Case status/stage
    pub status: Option<String>,
    /// Bench/coram information
    pub bench: Option<String>,
    /// Orders, newest first
    pub orders: Vec<StoredOrder>,
}

/// An order row as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredOrder {
    /// Row identifier
    pub id: i64,
    /// Parent case row
    pub case_id: i64,
    /// Date the order was passed
    pub order_date: Option<NaiveDate>,
    /// Order/judgment description
    pub description: String,
    /// PDF location, if listed
    pub pdf_url: Option<String>,
}

/// Insert or update a case by natural key, reconciling its orders.
///
/// The whole write happens in one transaction: the case upsert, new
/// order inserts, and in-place updates of orders whose PDF location
/// changed. Identical orders produce no writes, so fetching the same
/// remote data twice leaves the row count unchanged.
///
/// # Errors
/// `StorageError::Conflict` if a concurrent writer holds the lock past
/// the busy timeout; other `StorageError` variants on query failure.
pub async fn upsert_case(pool: &Pool<Sqlite>, record: &CaseRecord) -> Result<i64> {
    let now = Utc::now().to_rfc3339();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO cases (case_type, case_number, year, title, petitioner, respondent,
                            filing_date, next_hearing_date, status, bench, first_seen_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(case_type, case_number, year) DO UPDATE SET
             title = excluded.title,
             petitioner = excluded.petitioner,
             respondent = excluded.respondent,
             filing_date = excluded.filing_date,
             next_hearing_date = excluded.next_hearing_date,
             status = excluded.status,
             bench = excluded.bench,
             updated_at = excluded.updated_at",
    )
    .bind(record.key.case_type())
    .bind(record.key.case_number())
    .bind(i64::from(record.key.year()))
    .bind(&record.title)
    .bind(&record.petitioner)
    .bind(&record.respondent)
    .bind(record.filing_date.map(|d| d.format(DATE_FMT).to_string()))
    .bind(
        record
            .next_hearing_date
            .map(|d| d.format(DATE_FMT).to_string()),
    )
    .bind(&record.status)
    .bind(&record.bench)
    .bind(&now)
    .bind(&now)
    .execute(tx.as_mut())
    .await?;

    let case_id: i64 = sqlx::query_scalar(
        "SELECT id FROM cases WHERE case_type = ? AND case_number = ? AND year = ?",
    )
    .bind(record.key.case_type())
    .bind(record.key.case_number())
    .bind(i64::from(record.key.year()))
    .fetch_one(tx.as_mut())
    .await?;

    reconcile_orders(&mut tx, case_id, &record.orders, &now).await?;

    tx.commit().await?;

    tracing::info!(case_id, "upserted case {}", record.key);
    Ok(case_id)
}

/// Reconcile the stored orders of a case against a freshly parsed list.
///
/// Identity is the (order_date, description) pair: unknown pairs are
/// inserted, known pairs with a changed PDF location are updated in
/// place, and unchanged pairs are left alone.
async fn reconcile_orders(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    case_id: i64,
    orders: &[OrderEntry],
    now: &str,
) -> Result<()> {
    let existing = sqlx::query(
        "SELECT id, order_date, description, pdf_url FROM orders WHERE case_id = ?",
    )
    .bind(case_id)
    .fetch_all(tx.as_mut())
    .await?;

    let existing: Vec<(i64, Option<NaiveDate>, String, Option<String>)> = existing
        .into_iter()
        .map(|row| {
            let date_str: Option<String> = row.try_get("order_date").ok().flatten();
            (
                row.get("id"),
                date_str.as_deref().and_then(parse_stored_date),
                row.get("description"),
                row.try_get("pdf_url").ok().flatten(),
            )
        })
        .collect();

    for entry in orders {
        let found = existing
            .iter()
            .find(|(_, date, desc, _)| *date == entry.order_date && *desc == entry.description);

        match found {
            Some((id, _, _, pdf_url)) => {
                if *pdf_url != entry.pdf_url {
                    sqlx::query("UPDATE orders SET pdf_url = ? WHERE id = ?")
                        .bind(&entry.pdf_url)
                        .bind(id)
                        .execute(tx.as_mut())
                        .await?;
                }
            }
            None => {
                sqlx::query(
                    "INSERT INTO orders (case_id, order_date, description, pdf_url, created_at)
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(case_id)
                .bind(entry.order_date.map(|d| d.format(DATE_FMT).to_string()))
                .bind(&entry.description)
                .bind(&entry.pdf_url)
                .bind(now)
                .execute(tx.as_mut())
                .await?;
            }
        }
    }

    Ok(())
}

/// Get a case with its orders by row id.
///
/// # Errors
/// Returns `StorageError` if the query fails.
pub async fn get_case(pool: &Pool<Sqlite>, case_id: i64) -> Result<Option<StoredCase>> {
    let row = sqlx::query(
        "SELECT id, case_type, case_number, year, title, petitioner, respondent,
                filing_date, next_hearing_date, status, bench
         FROM cases WHERE id = ?",
    )
    .bind(case_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(hydrate_case(pool, &row).await?)),
        None => Ok(None),
    }
}

/// Get a case with its orders by natural key.
///
/// # Errors
/// Returns `StorageError` if the query fails.
pub async fn get_case_by_key(
    pool: &Pool<Sqlite>,
    case_type: &str,
    case_number: &str,
    year: i32,
) -> Result<Option<StoredCase>> {
    let row = sqlx::query(
        "SELECT id, case_type, case_number, year, title, petitioner, respondent,
                filing_date, next_hearing_date, status, bench
         FROM cases WHERE case_type = ? AND case_number = ? AND year = ?",
    )
    .bind(case_type)
    .bind(case_number)
    .bind(i64::from(year))
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(hydrate_case(pool, &row).await?)),
        None => Ok(None),
    }
}

/// Count the orders stored for a case.
///
/// # Errors
/// Returns `StorageError` if the query fails.
pub async fn count_orders(pool: &Pool<Sqlite>, case_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE case_id = ?")
        .bind(case_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

async fn hydrate_case(pool: &Pool<Sqlite>, row: &sqlx::sqlite::SqliteRow) -> Result<StoredCase> {
    let case_id: i64 = row.get("id");

    let order_rows = sqlx::query(
        "SELECT id, case_id, order_date, description, pdf_url
         FROM orders WHERE case_id = ?
         ORDER BY order_date IS NULL, order_date DESC, id",
    )
    .bind(case_id)
    .fetch_all(pool)
    .await?;

    let orders = order_rows
        .into_iter()
        .map(|r| {
            let date_str: Option<String> = r.try_get("order_date").ok().flatten();
            StoredOrder {
                id: r.get("id"),
                case_id: r.get("case_id"),
                order_date: date_str.as_deref().and_then(parse_stored_date),
                description: r.get("description"),
                pdf_url: r.try_get("pdf_url").ok().flatten(),
            }
        })
        .collect();

    let year: i64 = row.get("year");
    #[allow(clippy::cast_possible_truncation)]
    let year = year as i32;

    let filing_date: Option<String> = row.try_get("filing_date").ok().flatten();
    let next_hearing_date: Option<String> = row.try_get("next_hearing_date").ok().flatten();

    Ok(StoredCase {
        id: case_id,
        case_type: row.get("case_type"),
        case_number: row.get("case_number"),
        year,
        title: row.try_get("title").ok().flatten(),
        petitioner: row.try_get("petitioner").ok().flatten(),
        respondent: row.try_get("respondent").ok().flatten(),
        filing_date: filing_date.as_deref().and_then(parse_stored_date),
        next_hearing_date: next_hearing_date.as_deref().and_then(parse_stored_date),
        status: row.try_get("status").ok().flatten(),
        bench: row.try_get("bench").ok().flatten(),
        orders,
    })
}

fn parse_stored_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FMT).ok()
}

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Row};

use crate::db::Database;
use crate::geo::Coordinate;
use crate::models::PendingSample;

fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

fn row_to_sample(row: &Row) -> Result<PendingSample> {
    let recorded_at: String = row.get("recorded_at")?;
    Ok(PendingSample {
        session_id: row.get("session_id")?,
        coordinate: Coordinate {
            latitude: row.get("latitude")?,
            longitude: row.get("longitude")?,
        },
        recorded_at: parse_datetime(&recorded_at, "recorded_at")?,
    })
}

impl Database {
    pub async fn insert_sample(&self, sample: &PendingSample) -> Result<()> {
        let record = sample.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO pending_samples (session_id, latitude, longitude, recorded_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.session_id,
                    record.coordinate.latitude,
                    record.coordinate.longitude,
                    // Fixed-width fractional seconds so the text column
                    // sorts chronologically.
                    record
                        .recorded_at
                        .to_rfc3339_opts(SecondsFormat::Millis, true),
                ],
            )
            .with_context(|| "failed to insert pending sample")?;
            Ok(())
        })
        .await
    }

    /// All buffered samples for a session, oldest first. Ties on the
    /// recorded timestamp resolve by insertion order.
    pub async fn samples_for_session(&self, session_id: &str) -> Result<Vec<PendingSample>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, latitude, longitude, recorded_at
                 FROM pending_samples
                 WHERE session_id = ?1
                 ORDER BY recorded_at ASC, id ASC",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            let mut samples = Vec::new();
            while let Some(row) = rows.next()? {
                samples.push(row_to_sample(row)?);
            }

            Ok(samples)
        })
        .await
    }

    /// Bulk-delete every sample recorded under `session_id`. Returns the
    /// number of rows removed.
    pub async fn clear_session(&self, session_id: &str) -> Result<usize> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let deleted = conn
                .execute(
                    "DELETE FROM pending_samples WHERE session_id = ?1",
                    params![session_id],
                )
                .with_context(|| "failed to clear pending samples")?;
            Ok(deleted)
        })
        .await
    }
}

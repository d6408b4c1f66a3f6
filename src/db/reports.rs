use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Transaction};
use crate::errors::CostscopeError;
use crate::models::ConsolidatedReport;
use super::store::{render_document, ReportKey, StoredReport};
use super::Database;

fn db_err(context: &str) -> impl Fn(rusqlite::Error) -> CostscopeError + '_ {
    move |e| CostscopeError::Database(format!("{}: {}", context, e))
}

const SELECT_REPORT: &str =
    "SELECT run_id, version, content_hash, report_json, document_json, published_at FROM reports";

fn point_latest(tx: &Transaction<'_>, run_id: &str) -> Result<(), CostscopeError> {
    tx.execute(
        "INSERT INTO latest_report (slot, run_id, updated_at) VALUES (1, ?1, ?2)
         ON CONFLICT(slot) DO UPDATE SET run_id = excluded.run_id, updated_at = excluded.updated_at",
        params![run_id, Utc::now().to_rfc3339()],
    )
    .map_err(db_err("Failed to move latest pointer"))?;
    Ok(())
}

fn read_key(tx: &Transaction<'_>, run_id: &str) -> Result<Option<ReportKey>, CostscopeError> {
    tx.query_row(
        "SELECT run_id, version, content_hash FROM reports WHERE run_id = ?1",
        params![run_id],
        |row| {
            Ok(ReportKey {
                run_id: row.get(0)?,
                version: row.get::<_, i64>(1)? as u64,
                content_hash: row.get(2)?,
            })
        },
    )
    .optional()
    .map_err(db_err("Failed to read report key"))
}

type ReportRow = (String, i64, String, String, String, String);

fn report_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReportRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
}

fn into_stored(row: ReportRow) -> Result<StoredReport, CostscopeError> {
    let (run_id, version, content_hash, report_json, document_json, published_at) = row;
    let report: ConsolidatedReport = serde_json::from_str(&report_json)?;
    let published_at = DateTime::parse_from_rfc3339(&published_at)
        .map_err(|e| CostscopeError::Database(format!("Bad published_at for {}: {}", run_id, e)))?
        .with_timezone(&Utc);
    Ok(StoredReport {
        key: ReportKey { run_id, version: version as u64, content_hash },
        report,
        document_json,
        published_at,
    })
}

impl Database {
    /// Insert the report and repoint "latest" inside one transaction.
    pub fn publish_report(&self, report: &ConsolidatedReport) -> Result<ReportKey, CostscopeError> {
        let (document_json, content_hash) = render_document(report)?;
        let report_json = serde_json::to_string(report)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err("Failed to begin transaction"))?;

        if let Some(existing) = read_key(&tx, &report.run_id)? {
            if existing.content_hash == content_hash {
                point_latest(&tx, &report.run_id)?;
                tx.commit().map_err(db_err("Failed to commit"))?;
                return Ok(existing);
            }
        }

        let version: i64 = tx
            .query_row("SELECT COALESCE(MAX(version), 0) + 1 FROM reports", [], |row| row.get(0))
            .map_err(db_err("Failed to allocate report version"))?;

        tx.execute(
            "INSERT INTO reports (run_id, version, status, content_hash, total_cost, report_json, document_json, published_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(run_id) DO UPDATE SET
                version = excluded.version, status = excluded.status, content_hash = excluded.content_hash,
                total_cost = excluded.total_cost, report_json = excluded.report_json,
                document_json = excluded.document_json, published_at = excluded.published_at",
            params![
                report.run_id,
                version,
                report.status.as_str(),
                content_hash,
                report.total_cost.to_string(),
                report_json,
                document_json,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(db_err("Failed to insert report"))?;
        point_latest(&tx, &report.run_id)?;
        tx.commit().map_err(db_err("Failed to commit"))?;

        Ok(ReportKey {
            run_id: report.run_id.clone(),
            version: version as u64,
            content_hash,
        })
    }

    pub fn set_latest(&self, run_id: &str) -> Result<ReportKey, CostscopeError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err("Failed to begin transaction"))?;
        let key = read_key(&tx, run_id)?.ok_or_else(|| CostscopeError::RunNotFound(run_id.to_string()))?;
        point_latest(&tx, run_id)?;
        tx.commit().map_err(db_err("Failed to commit"))?;
        Ok(key)
    }

    pub fn latest_report(&self) -> Result<Option<StoredReport>, CostscopeError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("{} WHERE run_id = (SELECT run_id FROM latest_report WHERE slot = 1)", SELECT_REPORT),
                [],
                report_row,
            )
            .optional()
            .map_err(db_err("Failed to read latest report"))?;
        row.map(into_stored).transpose()
    }

    pub fn load_report(&self, run_id: &str) -> Result<Option<StoredReport>, CostscopeError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("{} WHERE run_id = ?1", SELECT_REPORT),
                params![run_id],
                report_row,
            )
            .optional()
            .map_err(db_err("Failed to read report"))?;
        row.map(into_stored).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use crate::db::store::tests::{check_store_contract, sample_report};
    use crate::db::store::ReportStore;

    #[test]
    fn test_database_store_contract() {
        let db = Database::in_memory().unwrap();
        check_store_contract(&db);
    }

    #[test]
    fn test_report_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("costscope.db");
        let key = {
            let db = Database::new(&path).unwrap();
            db.publish(&sample_report("run-disk", Decimal::new(12345, 2))).unwrap()
        };

        let db = Database::new(&path).unwrap();
        let latest = db.latest().unwrap().unwrap();
        assert_eq!(latest.key, key);
        assert_eq!(latest.report.total_cost, Decimal::new(12345, 2));
    }

    #[test]
    fn test_total_cost_stored_exactly() {
        let db = Database::in_memory().unwrap();
        db.publish(&sample_report("run-x", Decimal::new(3333, 3))).unwrap();
        let conn = db.lock().unwrap();
        let stored: String = conn
            .query_row("SELECT total_cost FROM reports WHERE run_id = 'run-x'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(stored, "3.333");
    }

    #[test]
    fn test_high_precision_total_reads_back_exactly() {
        let total: Decimal = "1234567890123.4567".parse().unwrap();
        let db = Database::in_memory().unwrap();
        db.publish(&sample_report("run-precise", total)).unwrap();

        let latest = db.latest().unwrap().unwrap();
        assert_eq!(latest.report.total_cost, total);
        assert_eq!(latest.report.by_service["ec2"].amount, total);
        assert_eq!(db.get_report("run-precise").unwrap().unwrap().report.total_cost, total);

        let document: serde_json::Value = serde_json::from_str(&latest.document_json).unwrap();
        assert_eq!(document["summary"]["total_cost"], "1234567890123.4567");
        assert_eq!(document["details"]["costs"]["total"], "1234567890123.4567");
        assert_eq!(latest.document().unwrap().summary.total_cost, total);
    }
}

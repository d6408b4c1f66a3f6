use rusqlite::{params, OptionalExtension};
use crate::errors::CostscopeError;
use crate::pipeline::state::RunState;
use super::Database;

impl Database {
    pub fn upsert_run(&self, state: &RunState) -> Result<(), CostscopeError> {
        let state_json = serde_json::to_string(state)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO runs (id, status, phase, partitions_total, partitions_completed, partitions_failed, error_message, state_json, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status, phase = excluded.phase,
                partitions_total = excluded.partitions_total,
                partitions_completed = excluded.partitions_completed,
                partitions_failed = excluded.partitions_failed,
                error_message = excluded.error_message, state_json = excluded.state_json,
                completed_at = excluded.completed_at",
            params![
                state.run_id,
                state.status.as_str(),
                state.phase.map(|p| p.as_str()),
                state.partitions_total as i64,
                state.partitions_completed as i64,
                state.partitions_failed as i64,
                state.error,
                state_json,
                state.created_at.to_rfc3339(),
                state.finished_at.map(|t| t.to_rfc3339()),
            ],
        )
        .map_err(|e| CostscopeError::Database(format!("Failed to save run: {}", e)))?;
        Ok(())
    }

    pub fn load_run(&self, run_id: &str) -> Result<Option<RunState>, CostscopeError> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row("SELECT state_json FROM runs WHERE id = ?1", params![run_id], |row| row.get(0))
            .optional()
            .map_err(|e| CostscopeError::Database(format!("Query error: {}", e)))?;
        json.map(|j| serde_json::from_str(&j).map_err(CostscopeError::from))
            .transpose()
    }

    pub fn load_runs(&self, limit: usize, offset: usize) -> Result<Vec<RunState>, CostscopeError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT state_json FROM runs ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2"
        ).map_err(|e| CostscopeError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt
            .query_map(params![limit as i64, offset as i64], |row| row.get::<_, String>(0))
            .map_err(|e| CostscopeError::Database(format!("Query error: {}", e)))?;

        let mut results = Vec::new();
        for row in rows {
            let json = row.map_err(|e| CostscopeError::Database(format!("Row error: {}", e)))?;
            results.push(serde_json::from_str(&json)?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::db::store::ReportStore;
    use crate::models::RunStatus;
    use crate::pipeline::phase::RunPhase;
    use crate::pipeline::state::EngineConfig;

    fn state(id: &str, day: u32) -> RunState {
        let request = EngineConfig::default().resolve_request(None, None, None, None);
        let mut state = RunState::new(id, request);
        state.created_at = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();
        state
    }

    #[test]
    fn test_db_save_and_get_run() {
        let db = Database::in_memory().unwrap();
        let run = state("run-1", 1);
        db.save_run(&run).unwrap();
        assert_eq!(db.get_run("run-1").unwrap().unwrap(), run);
    }

    #[test]
    fn test_db_get_nonexistent_run() {
        let db = Database::in_memory().unwrap();
        assert!(db.get_run("nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_db_save_run_updates_in_place() {
        let db = Database::in_memory().unwrap();
        let mut run = state("run-1", 1);
        db.save_run(&run).unwrap();

        run.status = RunStatus::Partial;
        run.phase = Some(RunPhase::Persisting);
        run.partitions_total = 4;
        run.partitions_completed = 4;
        run.partitions_failed = 1;
        run.finished_at = Some(Utc::now());
        db.save_run(&run).unwrap();

        let loaded = db.get_run("run-1").unwrap().unwrap();
        assert_eq!(loaded.status, RunStatus::Partial);
        assert_eq!(loaded.partitions_failed, 1);
        assert_eq!(db.list_runs(10, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_db_list_runs_pagination() {
        let db = Database::in_memory().unwrap();
        for day in 1..=5 {
            db.save_run(&state(&format!("run-{}", day), day)).unwrap();
        }

        let all = db.list_runs(10, 0).unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].run_id, "run-5");

        assert_eq!(db.list_runs(2, 0).unwrap().len(), 2);
        assert_eq!(db.list_runs(2, 2).unwrap().len(), 2);
        let last = db.list_runs(10, 4).unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].run_id, "run-1");
    }
}

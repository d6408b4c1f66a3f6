pub const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS runs (
    id TEXT PRIMARY KEY,
    status TEXT NOT NULL DEFAULT 'pending',
    phase TEXT,
    partitions_total INTEGER NOT NULL DEFAULT 0,
    partitions_completed INTEGER NOT NULL DEFAULT 0,
    partitions_failed INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    state_json TEXT NOT NULL,
    created_at TEXT NOT NULL,
    completed_at TEXT
);

CREATE TABLE IF NOT EXISTS reports (
    run_id TEXT PRIMARY KEY,
    version INTEGER NOT NULL UNIQUE,
    status TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    total_cost TEXT NOT NULL,
    report_json TEXT NOT NULL,
    document_json TEXT NOT NULL,
    published_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS latest_report (
    slot INTEGER PRIMARY KEY CHECK (slot = 1),
    run_id TEXT NOT NULL REFERENCES reports(run_id),
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status);
CREATE INDEX IF NOT EXISTS idx_runs_created ON runs(created_at);
";

use super::*;
use crate::error::StorageError;
use crate::types::RunOutcome;

use chrono::DateTime;
use chrono::Utc;
use rusqlite::Connection;
use rusqlite::ParamsFromIter;
use rusqlite::params;
use rusqlite::params_from_iter;
use rusqlite::types::Value;

fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        CREATE TABLE IF NOT EXISTS runs (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            account TEXT NOT NULL,
            category TEXT NOT NULL,
            outcome TEXT NOT NULL,
            summary TEXT NOT NULL,
            searches INTEGER NOT NULL,
            initial_points INTEGER,
            final_points INTEGER
        );
        CREATE TABLE IF NOT EXISTS search_events (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            account TEXT NOT NULL,
            category TEXT NOT NULL,
            variant TEXT NOT NULL,
            success INTEGER NOT NULL,
            points INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_runs_account ON runs(account);
        CREATE INDEX IF NOT EXISTS idx_search_events_account ON search_events(account);
        "#,
    )?;
    Ok(())
}

fn open_conn(path: &std::path::Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    init_db(&conn)?;
    Ok(conn)
}

fn to_i64(v: Option<u64>) -> Result<Option<i64>> {
    v.map(|n| i64::try_from(n).map_err(|_| StorageError::InvalidValue(format!("points: {n}"))))
        .transpose()
}

fn conv_err(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, msg)),
    )
}

fn parse_ts(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conv_err(idx, format!("invalid timestamp {s}: {e}")))
}

fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunEntry> {
    let ts: String = row.get(0)?;
    let outcome: String = row.get(3)?;
    Ok(RunEntry {
        timestamp: parse_ts(0, &ts)?,
        account: row.get(1)?,
        category: row.get(2)?,
        outcome: RunOutcome::parse(&outcome)
            .ok_or_else(|| conv_err(3, format!("invalid outcome: {outcome}")))?,
        summary: row.get(4)?,
        searches: row.get(5)?,
        initial_points: row.get::<_, Option<i64>>(6)?.map(|n| n.max(0) as u64),
        final_points: row.get::<_, Option<i64>>(7)?.map(|n| n.max(0) as u64),
    })
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<SearchEvent> {
    let ts: String = row.get(0)?;
    Ok(SearchEvent {
        timestamp: parse_ts(0, &ts)?,
        account: row.get(1)?,
        category: row.get(2)?,
        variant: row.get(3)?,
        success: row.get(4)?,
        points: row.get::<_, Option<i64>>(5)?.map(|n| n.max(0) as u64),
    })
}

const RUN_COLUMNS: &str =
    "timestamp, account, category, outcome, summary, searches, initial_points, final_points";
const EVENT_COLUMNS: &str = "timestamp, account, category, variant, success, points";

fn insert_run(conn: &Connection, entry: &RunEntry) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO runs ({RUN_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
        run_params(entry)?,
    )?;
    Ok(())
}

fn insert_event(conn: &Connection, event: &SearchEvent) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO search_events ({EVENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
        event_params(event)?,
    )?;
    Ok(())
}

/// Insert `entry` unless an identical row is already present.
fn import_run(conn: &Connection, entry: &RunEntry) -> Result<usize> {
    let n = conn.execute(
        &format!(
            "INSERT INTO runs ({RUN_COLUMNS}) SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8 \
             WHERE NOT EXISTS (SELECT 1 FROM runs WHERE timestamp = ?1 AND account = ?2 \
             AND category = ?3 AND outcome = ?4 AND summary = ?5 AND searches = ?6 \
             AND initial_points IS ?7 AND final_points IS ?8)"
        ),
        run_params(entry)?,
    )?;
    Ok(n)
}

/// Insert `event` unless an identical row is already present.
fn import_event(conn: &Connection, event: &SearchEvent) -> Result<usize> {
    let n = conn.execute(
        &format!(
            "INSERT INTO search_events ({EVENT_COLUMNS}) SELECT ?1, ?2, ?3, ?4, ?5, ?6 \
             WHERE NOT EXISTS (SELECT 1 FROM search_events WHERE timestamp = ?1 \
             AND account = ?2 AND category = ?3 AND variant = ?4 AND success = ?5 \
             AND points IS ?6)"
        ),
        event_params(event)?,
    )?;
    Ok(n)
}

fn run_params(entry: &RunEntry) -> Result<ParamsFromIter<Vec<Value>>> {
    Ok(params_from_iter(vec![
        Value::from(entry.timestamp.to_rfc3339()),
        Value::from(entry.account.clone()),
        Value::from(entry.category.clone()),
        Value::from(entry.outcome.as_str().to_string()),
        Value::from(entry.summary.clone()),
        Value::from(entry.searches),
        Value::from(to_i64(entry.initial_points)?),
        Value::from(to_i64(entry.final_points)?),
    ]))
}

fn event_params(event: &SearchEvent) -> Result<ParamsFromIter<Vec<Value>>> {
    Ok(params_from_iter(vec![
        Value::from(event.timestamp.to_rfc3339()),
        Value::from(event.account.clone()),
        Value::from(event.category.clone()),
        Value::from(event.variant.clone()),
        Value::from(event.success),
        Value::from(to_i64(event.points)?),
    ]))
}

fn query_history(conn: &Connection, account: Option<&str>) -> Result<History> {
    let filter = if account.is_some() {
        " WHERE account = ?1"
    } else {
        ""
    };
    let mut runs_stmt = conn.prepare(&format!(
        "SELECT {RUN_COLUMNS} FROM runs{filter} ORDER BY seq ASC"
    ))?;
    let mut events_stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM search_events{filter} ORDER BY seq ASC"
    ))?;
    let (runs, searches) = match account {
        Some(a) => (
            runs_stmt
                .query_map(params![a], row_to_run)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
            events_stmt
                .query_map(params![a], row_to_event)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
        ),
        None => (
            runs_stmt
                .query_map([], row_to_run)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
            events_stmt
                .query_map([], row_to_event)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
        ),
    };
    Ok(History { runs, searches })
}

#[derive(Debug, Clone)]
pub struct SqliteHistoryStore {
    path: std::path::PathBuf,
}

impl SqliteHistoryStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn load(&self, account: &str) -> Result<History> {
        let conn = open_conn(&self.path)?;
        query_history(&conn, Some(account))
    }

    fn append_run(&self, entry: &RunEntry) -> Result<()> {
        let conn = open_conn(&self.path)?;
        insert_run(&conn, entry)
    }

    fn append_search(&self, event: &SearchEvent) -> Result<()> {
        let conn = open_conn(&self.path)?;
        insert_event(&conn, event)
    }

    fn latest_run_summary(&self, account: &str) -> Result<Option<RunEntry>> {
        let conn = open_conn(&self.path)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM runs WHERE account = ?1 ORDER BY seq DESC LIMIT 1"
        ))?;
        let mut rows = stmt.query(params![account])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_run(row)?)),
            None => Ok(None),
        }
    }

    fn load_all(&self) -> Result<History> {
        let conn = open_conn(&self.path)?;
        query_history(&conn, None)
    }

    fn import(&self, history: &History) -> Result<usize> {
        let mut conn = open_conn(&self.path)?;
        let tx = conn.transaction()?;
        let mut written = 0;
        for run in &history.runs {
            written += import_run(&tx, run)?;
        }
        for event in &history.searches {
            written += import_event(&tx, event)?;
        }
        tx.commit()?;
        Ok(written)
    }
}

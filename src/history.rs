//! # History Reader
//!
//! Reads one profile's Chromium-style history database. The database is
//! copied first so a running client holding the file open does not block the
//! read; the copy is removed on every exit path.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rusqlite::{Connection, OpenFlags};
use tempfile::TempPath;
use tracing::{debug, info};

use crate::error::ReadError;
use crate::report::{Diagnostic, Reporter, TableColumn};
use crate::timestamp::{TimeZoneMode, webkit_to_datetime};

const HISTORY_QUERY: &str = "SELECT u.url, u.title, u.last_visit_time, u.visit_count, \
     v.visit_time, v.from_visit, v.transition \
     FROM urls u LEFT JOIN visits v ON u.id = v.url \
     ORDER BY u.last_visit_time DESC";

const TEMP_PREFIX: &str = "temp_history_";

const SIDECAR_SUFFIXES: [&str; 3] = ["-wal", "-shm", "-journal"];

/// One row per (url, visit) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitRecord {
    pub url: String,
    pub title: Option<String>,
    pub last_visit_time: Option<i64>,
    pub visit_count: i64,
    pub visit_time: Option<i64>,
    pub from_visit: Option<i64>,
    pub transition: Option<i64>,
    pub last_visit_at: Option<NaiveDateTime>,
    pub visit_at: Option<NaiveDateTime>,
    pub profile_id: String,
    pub source_path: PathBuf,
}

#[derive(Debug)]
struct RawVisit {
    url: String,
    title: Option<String>,
    last_visit_time: Option<i64>,
    visit_count: i64,
    visit_time: Option<i64>,
    from_visit: Option<i64>,
    transition: Option<i64>,
}

/// Settings shared by every profile read in a run.
#[derive(Clone, Copy)]
pub struct ReadOptions<'a> {
    pub temp_dir: &'a Path,
    pub zone: TimeZoneMode,
    pub reporter: &'a dyn Reporter,
}

/// Read, convert and tag all visit records of one profile.
pub fn read_profile_history(
    profile_id: &str,
    history: &Path,
    opts: ReadOptions<'_>,
) -> Result<Vec<VisitRecord>, ReadError> {
    let copy = copy_to_temp(history, opts.temp_dir)?;
    debug!("copied {} to {}", history.display(), copy.path().display());

    // `copy` is dropped, and its files deleted, when this function returns.
    let rows = query_copy(copy.path(), profile_id, opts.reporter)?;
    debug!(
        profile = %profile_id,
        "sample last_visit_time={:?} visit_time={:?}",
        rows.iter().take(5).map(|r| r.last_visit_time).collect::<Vec<_>>(),
        rows.iter().take(5).map(|r| r.visit_time).collect::<Vec<_>>()
    );

    let records = rows
        .into_iter()
        .map(|raw| VisitRecord {
            last_visit_at: webkit_to_datetime(raw.last_visit_time, opts.zone, opts.reporter),
            visit_at: webkit_to_datetime(raw.visit_time, opts.zone, opts.reporter),
            url: raw.url,
            title: raw.title,
            last_visit_time: raw.last_visit_time,
            visit_count: raw.visit_count,
            visit_time: raw.visit_time,
            from_visit: raw.from_visit,
            transition: raw.transition,
            profile_id: profile_id.to_string(),
            source_path: history.to_path_buf(),
        })
        .collect();
    Ok(records)
}

/// Private copy of a history database. Dropping it removes the copy and any
/// journal files SQLite created next to it.
struct TempCopy {
    path: TempPath,
}

impl TempCopy {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempCopy {
    fn drop(&mut self) {
        for suffix in SIDECAR_SUFFIXES {
            let mut sidecar = self.path.as_os_str().to_os_string();
            sidecar.push(suffix);
            let sidecar = PathBuf::from(sidecar);
            if sidecar.exists() {
                if let Err(err) = std::fs::remove_file(&sidecar) {
                    debug!("cannot remove {}: {err}", sidecar.display());
                }
            }
        }
    }
}

fn copy_to_temp(history: &Path, temp_dir: &Path) -> Result<TempCopy, ReadError> {
    let copy_err = |source: std::io::Error| ReadError::Copy {
        path: history.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(temp_dir).map_err(copy_err)?;
    let mut input = File::open(history).map_err(copy_err)?;
    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".db")
        .tempfile_in(temp_dir)
        .map_err(copy_err)?;
    std::io::copy(&mut input, temp.as_file_mut()).map_err(copy_err)?;
    Ok(TempCopy {
        path: temp.into_temp_path(),
    })
}

fn query_copy(
    path: &Path,
    profile_id: &str,
    reporter: &dyn Reporter,
) -> Result<Vec<RawVisit>, ReadError> {
    // Read-write so that closing the connection checkpoints a WAL-mode copy;
    // the copy is private to this read.
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(ReadError::Open)?;

    match query_visits(&conn) {
        Ok(rows) => Ok(rows),
        Err(err) => {
            report_schema(&conn, profile_id, reporter);
            Err(ReadError::Query(err))
        }
    }
}

fn query_visits(conn: &Connection) -> rusqlite::Result<Vec<RawVisit>> {
    let mut stmt = conn.prepare(HISTORY_QUERY)?;
    let rows = stmt.query_map([], |row| {
        Ok(RawVisit {
            url: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
            title: row.get(1)?,
            last_visit_time: row.get(2)?,
            visit_count: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
            visit_time: row.get(4)?,
            from_visit: row.get(5)?,
            transition: row.get(6)?,
        })
    })?;
    rows.collect()
}

/// Diagnostic path taken only after the history query failed: report the
/// columns of every table so the unexpected schema can be inspected.
fn report_schema(conn: &Connection, profile_id: &str, reporter: &dyn Reporter) {
    let tables = match list_tables(conn) {
        Ok(tables) => tables,
        Err(err) => {
            debug!(profile = %profile_id, "cannot list tables: {err}");
            return;
        }
    };
    info!(profile = %profile_id, "tables in history database: {tables:?}");
    for table in tables {
        match table_columns(conn, &table) {
            Ok(columns) => reporter.report(Diagnostic::TableSchema {
                profile_id: profile_id.to_string(),
                table,
                columns,
            }),
            Err(err) => debug!(profile = %profile_id, "cannot read schema of {table}: {err}"),
        }
    }
}

fn list_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect()
}

fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<TableColumn>> {
    let sql = format!("PRAGMA table_info(\"{}\")", table.replace('"', "\"\""));
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok(TableColumn {
            cid: row.get(0)?,
            name: row.get(1)?,
            decl_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            not_null: row.get::<_, i64>(3)? != 0,
            primary_key: row.get::<_, i64>(5)? != 0,
        })
    })?;
    rows.collect()
}

/// Readable name of the core navigation type of a Chromium transition code.
pub fn transition_label(transition: i64) -> &'static str {
    match transition & 0xFF {
        0 => "link",
        1 => "typed",
        2 => "auto_bookmark",
        3 => "auto_subframe",
        4 => "manual_subframe",
        5 => "generated",
        6 => "auto_toplevel",
        7 => "form_submit",
        8 => "reload",
        9 => "keyword",
        10 => "keyword_generated",
        _ => "other",
    }
}

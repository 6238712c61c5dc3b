//! Shared test infrastructure for export pipeline tests.
//!
//! Builds a fake radium profiles folder with Chromium-style history
//! databases and resolves export requests pointing at it.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tempfile::TempDir;

use wxhistory::config;
use wxhistory::export::ExportFormat;
use wxhistory::pipeline::ExportRequest;

// ============================================================================
// Fixtures
// ============================================================================

pub struct Fixture {
    pub root: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(root.path().join("profiles")).expect("profiles dir");
        Self { root }
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.root.path().join("profiles")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.path().join("output")
    }

    pub fn profile_dir(&self, id: &str) -> PathBuf {
        let dir = self.profiles_dir().join(id);
        fs::create_dir_all(&dir).expect("profile dir");
        dir
    }

    /// Profile with a history database holding `urls` urls, each visited
    /// once.
    pub fn add_profile(&self, id: &str, urls: usize) -> PathBuf {
        let path = self.profile_dir(id).join("history");
        create_history_db(&path, id, urls);
        path
    }

    /// Profile whose history file is not a usable history database.
    pub fn add_broken_profile(&self, id: &str) -> PathBuf {
        let path = self.profile_dir(id).join("history");
        let conn = Connection::open(&path).expect("conn");
        conn.execute_batch("CREATE TABLE urls (id INTEGER PRIMARY KEY, url TEXT);")
            .expect("schema");
        path
    }

    pub fn request(&self, format: ExportFormat) -> ExportRequest {
        let loaded = config::load_config(None).expect("config");
        ExportRequest {
            config: loaded.config,
            profiles_dir: self.profiles_dir(),
            output_dir: self.output_dir(),
            temp_dir: self.output_dir(),
            format,
            comment: "test".to_string(),
        }
    }
}

pub fn create_history_db(path: &Path, label: &str, urls: usize) {
    let conn = Connection::open(path).expect("conn");
    conn.execute_batch(
        "CREATE TABLE urls (id INTEGER PRIMARY KEY, url LONGVARCHAR, title LONGVARCHAR, \
             visit_count INTEGER DEFAULT 0 NOT NULL, typed_count INTEGER DEFAULT 0 NOT NULL, \
             last_visit_time INTEGER NOT NULL, hidden INTEGER DEFAULT 0 NOT NULL);
         CREATE TABLE visits (id INTEGER PRIMARY KEY, url INTEGER NOT NULL, \
             visit_time INTEGER NOT NULL, from_visit INTEGER, transition INTEGER DEFAULT 0 NOT NULL);",
    )
    .expect("schema");
    for i in 0..urls {
        let id = i as i64 + 1;
        let time = 13_380_105_538_768_906i64 + id * 1_000_000;
        conn.execute(
            "INSERT INTO urls (id, url, title, visit_count, last_visit_time) VALUES (?1, ?2, ?3, 1, ?4)",
            (id, format!("https://{label}.example/{id}"), format!("{label} {id}"), time),
        )
        .expect("insert url");
        conn.execute(
            "INSERT INTO visits (url, visit_time, from_visit, transition) VALUES (?1, ?2, 0, 1)",
            (id, time),
        )
        .expect("insert visit");
    }
}

// ============================================================================
// Assertions
// ============================================================================

/// Files in `dir` with the given extension; empty when `dir` is missing.
pub fn files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(extension))
        .collect()
}

pub fn temp_copies(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("temp_history_"))
        })
        .collect()
}

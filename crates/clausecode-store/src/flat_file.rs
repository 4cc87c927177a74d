//! Append-only CSV audit log.
//!
//! The log only records writes. It has no ids and cannot be read back through
//! the store; every other capability reports `Unsupported`.

use crate::backend::{AnalysisBackend, BackendKind};
use crate::error::StoreError;
use crate::model::AnalysisDocument;
use async_trait::async_trait;
use chrono::SecondsFormat;
use log::{debug, info};
use parking_lot::Mutex;
use std::fs::{OpenOptions, create_dir_all};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Column names written as the first line of a new log.
pub const FLAT_FILE_HEADERS: [&str; 6] = [
    "Timestamp",
    "Agent",
    "Analysis Type",
    "Page Title",
    "Page URL",
    "Result Text",
];

/// CSV file that receives one line per saved analysis.
#[derive(Debug)]
pub struct FlatFileBackend {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FlatFileBackend {
    /// Open the log, creating it with a header line if it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            create_dir_all(parent)?;
        }
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(csv_line(&FLAT_FILE_HEADERS).as_bytes())?;
                info!("created csv audit log (path={})", path.display());
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                debug!("reusing csv audit log (path={})", path.display());
            }
            Err(err) => return Err(err.into()),
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }
}

#[async_trait]
impl AnalysisBackend for FlatFileBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::FlatFile
    }

    /// Append the six audit columns as a single write.
    async fn insert(&self, document: &AnalysisDocument) -> Result<Option<String>, StoreError> {
        let timestamp = document
            .timestamp
            .to_rfc3339_opts(SecondsFormat::AutoSi, true);
        let mut line = csv_line(&[
            timestamp.as_str(),
            document.agent.as_str(),
            document.analysis_type.as_str(),
            document.page_title.as_str(),
            document.page_url.as_str(),
            document.result_text.as_str(),
        ]);
        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        // Removed underneath us: start over with a header.
        if file.metadata()?.len() == 0 {
            info!("recreating csv audit log (path={})", self.path.display());
            line.insert_str(0, &csv_line(&FLAT_FILE_HEADERS));
        }
        file.write_all(line.as_bytes())?;
        debug!(
            "appended analysis to csv audit log (agent={}, bytes={})",
            document.agent,
            line.len()
        );
        Ok(None)
    }
}

/// Render one CSV record terminated by a newline.
fn csv_line(fields: &[&str]) -> String {
    let mut line = fields
        .iter()
        .map(|field| quote_field(field))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

/// Quote a field only when it contains a delimiter, quote or line break.
fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

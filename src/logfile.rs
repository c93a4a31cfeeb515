//! Deduplicating append-only log file
//!
//! Each logical log file `<file>` has two companions:
//! `<file>.tmp` stages the payload of the current poll and `<file>.last`
//! holds the payload that was appended most recently. A poll whose payload
//! matches `<file>.last` byte for byte appends nothing.
//!
//! `<file>.last` is replaced only after the append to `<file>` succeeded, by
//! renaming the staging file over it. A crash between the two steps leaves
//! `<file>.last` stale, and the next poll appends the same payload again.
//! Only one writer per path is supported.

use crate::error::{ModemError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Written,
    Skipped,
}

/// The file trio backing one logical log destination
#[derive(Debug, Clone)]
pub struct StagedLogFile {
    path: PathBuf,
    staging: PathBuf,
    last: PathBuf,
}

impl StagedLogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            staging: with_suffix(&path, "tmp"),
            last: with_suffix(&path, "last"),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `payload` unless it is identical to the last appended payload
    pub fn append(&self, payload: &str) -> Result<AppendOutcome> {
        fs::write(&self.staging, payload).map_err(|e| ModemError::io(&self.staging, e))?;

        if self.last.exists() {
            let same = same_contents(&self.last, &self.staging)
                .map_err(|e| ModemError::io(&self.last, e))?;
            if same {
                info!("No new log messages, skipping...");
                fs::remove_file(&self.staging).map_err(|e| ModemError::io(&self.staging, e))?;
                return Ok(AppendOutcome::Skipped);
            }
        } else {
            debug!("No {} yet, first write", self.last.display());
        }

        let mut aggregate = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ModemError::io(&self.path, e))?;
        aggregate
            .write_all(payload.as_bytes())
            .and_then(|_| aggregate.sync_data())
            .map_err(|e| ModemError::io(&self.path, e))?;

        fs::rename(&self.staging, &self.last).map_err(|e| ModemError::io(&self.last, e))?;

        info!("Appended {} bytes to {}", payload.len(), self.path.display());
        Ok(AppendOutcome::Written)
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Compare two files chunk by chunk without loading either fully
fn same_contents(a: &Path, b: &Path) -> io::Result<bool> {
    let mut fa = File::open(a)?;
    let mut fb = File::open(b)?;

    if fa.metadata()?.len() != fb.metadata()?.len() {
        return Ok(false);
    }

    let mut buf_a = vec![0u8; CHUNK_SIZE];
    let mut buf_b = vec![0u8; CHUNK_SIZE];
    loop {
        let na = read_chunk(&mut fa, &mut buf_a)?;
        let nb = read_chunk(&mut fb, &mut buf_b)?;
        if na != nb || buf_a[..na] != buf_b[..nb] {
            return Ok(false);
        }
        if na == 0 {
            return Ok(true);
        }
    }
}

fn read_chunk(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn append(path: &Path, payload: &str) -> Result<AppendOutcome> {
        StagedLogFile::new(path).append(payload)
    }

    #[test]
    fn test_identical_payload_is_skipped() {
        let dir = tempdir().unwrap();
        let log = StagedLogFile::new(dir.path().join("modem_logs.txt"));

        assert_eq!(log.append("a\nb\n").unwrap(), AppendOutcome::Written);
        assert_eq!(log.append("a\nb\n").unwrap(), AppendOutcome::Skipped);

        assert_eq!(fs::read_to_string(log.path()).unwrap(), "a\nb\n");
        assert!(!dir.path().join("modem_logs.txt.tmp").exists());
    }

    #[test]
    fn test_different_payloads_are_concatenated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("modem_logs.txt");

        assert_eq!(append(&path, "first\n").unwrap(), AppendOutcome::Written);
        assert_eq!(append(&path, "second\n").unwrap(), AppendOutcome::Written);

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
        assert_eq!(
            fs::read_to_string(dir.path().join("modem_logs.txt.last")).unwrap(),
            "second\n"
        );
        assert!(!dir.path().join("modem_logs.txt.tmp").exists());
    }

    #[test]
    fn test_last_tracks_most_recent_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("modem_logs.txt");

        append(&path, "A").unwrap();
        append(&path, "B").unwrap();
        assert_eq!(append(&path, "A").unwrap(), AppendOutcome::Written);
        assert_eq!(append(&path, "A").unwrap(), AppendOutcome::Skipped);
        assert_eq!(fs::read_to_string(&path).unwrap(), "ABA");
    }

    #[test]
    fn test_stale_staging_file_is_overwritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("modem_logs.txt");
        fs::write(dir.path().join("modem_logs.txt.tmp"), "leftover from a crash").unwrap();

        assert_eq!(append(&path, "fresh").unwrap(), AppendOutcome::Written);
        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh");
        assert_eq!(fs::read_to_string(dir.path().join("modem_logs.txt.last")).unwrap(), "fresh");
    }

    #[test]
    fn test_same_contents_large_files() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let data = "x".repeat(CHUNK_SIZE * 2 + 17);

        fs::write(&a, &data).unwrap();
        fs::write(&b, &data).unwrap();
        assert!(same_contents(&a, &b).unwrap());

        let mut changed = data.clone().into_bytes();
        changed[CHUNK_SIZE + 3] = b'y';
        fs::write(&b, changed).unwrap();
        assert!(!same_contents(&a, &b).unwrap());
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempdir().unwrap();
        let err = append(&dir.path().join("nope").join("modem_logs.txt"), "x").unwrap_err();
        assert!(matches!(err, ModemError::Io { .. }));
    }
}

//! # Merge Log and Grafts
//!
//! Flat-history projects squash every upstream merge into one commit, so git
//! cannot see that the squashed commit already contains the upstream commits.
//! Each squash merge is therefore recorded in `.merged-revisions` at the
//! project root as a line
//!
//! ```text
//! <new-sha> <old-sha> <source-sha>
//! ```
//!
//! which is exactly the format of a git graft entry: commit `new` with parents
//! `old` and `source`. Before the next merge the log is installed as the
//! repository's graft file, so the merge base is computed as if every earlier
//! squash had been a real merge.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::defaults::MERGE_LOG_FILENAME;
use crate::error::{Error, Result};
use crate::git::Git;

/// One provenance triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRecord {
    /// The squash merge commit.
    pub new_commit: String,
    /// HEAD before the merge.
    pub old_commit: String,
    /// The upstream commit that was merged.
    pub source_commit: String,
}

impl MergeRecord {
    /// Parses a single log line. Returns `None` unless the line has exactly
    /// three whitespace-separated fields.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let record = MergeRecord {
            new_commit: fields.next()?.to_string(),
            old_commit: fields.next()?.to_string(),
            source_commit: fields.next()?.to_string(),
        };
        match fields.next() {
            Some(_) => None,
            None => Some(record),
        }
    }
}

impl fmt::Display for MergeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.new_commit, self.old_commit, self.source_commit)
    }
}

/// The `.merged-revisions` file of one flat-history project.
#[derive(Debug, Clone)]
pub struct MergeLog {
    path: PathBuf,
}

impl MergeLog {
    pub fn for_project(project_dir: &Path) -> Self {
        Self {
            path: project_dir.join(MERGE_LOG_FILENAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads every record. A missing file is an empty log; blank lines are
    /// skipped; anything else that is not a triple is an error.
    pub fn records(&self) -> Result<Vec<MergeRecord>> {
        if !self.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                MergeRecord::parse_line(line).ok_or_else(|| Error::MalformedMergeLog {
                    path: self.path.clone(),
                    line: index + 1,
                    content: line.to_string(),
                })
            })
            .collect()
    }

    /// Appends one record, creating the file if needed.
    pub fn append(&self, record: &MergeRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)?;

        // A hand-edited log may lack its final newline.
        let len = file.metadata()?.len();
        if len > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::Start(len - 1))?;
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                file.write_all(b"\n")?;
            }
        }

        writeln!(file, "{}", record)?;
        debug!("Recorded {} in {}", record, self.path.display());
        Ok(())
    }

    /// Installs the recorded merges as the repository's grafts until the
    /// returned guard is dropped.
    pub fn install_grafts(&self, git: &Git) -> Result<GraftGuard> {
        let records = self.records()?;
        let graft_path = git.git_path("info/grafts")?;
        let previous = match fs::read(&graft_path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        if records.is_empty() {
            return Ok(GraftGuard {
                path: graft_path,
                previous,
                installed: false,
            });
        }

        if let Some(parent) = graft_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content: String = records.iter().map(|r| format!("{}\n", r)).collect();
        fs::write(&graft_path, content)?;
        debug!(
            "Installed {} graft(s) at {}",
            records.len(),
            graft_path.display()
        );

        Ok(GraftGuard {
            path: graft_path,
            previous,
            installed: true,
        })
    }
}

/// Restores the graft file that existed before [`MergeLog::install_grafts`].
#[derive(Debug)]
pub struct GraftGuard {
    path: PathBuf,
    previous: Option<Vec<u8>>,
    installed: bool,
}

impl GraftGuard {
    pub fn is_installed(&self) -> bool {
        self.installed
    }
}

impl Drop for GraftGuard {
    fn drop(&mut self) {
        if !self.installed {
            return;
        }
        let result = match &self.previous {
            Some(bytes) => fs::write(&self.path, bytes),
            None => fs::remove_file(&self.path),
        };
        if let Err(e) = result {
            warn!("Failed to clean up {}: {}", self.path.display(), e);
        }
    }
}

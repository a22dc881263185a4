use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use chrono::{SecondsFormat, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("another run holds {path} ({holder})")]
    Busy { path: String, holder: String },
    #[error("run lock io failure on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Exclusive guard for one invocation. The lock file is removed on drop, but only while it
/// still carries this guard's token.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    token: String,
}

static ACQUISITIONS: AtomicU64 = AtomicU64::new(0);

impl RunLock {
    pub fn acquire(path: impl AsRef<Path>, stale_after: Duration) -> Result<Self, LockError> {
        let path = path.as_ref();
        let io_error = |source: std::io::Error| LockError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let token = new_token();
        match create_lock_file(path, &token) {
            Ok(()) => return Ok(Self::held(path, token)),
            Err(error) if error.kind() == ErrorKind::AlreadyExists => {}
            Err(error) => return Err(io_error(error)),
        }

        let Some(stale_holder) = stale_holder(path, stale_after) else {
            return Err(busy(path));
        };

        log::warn!(
            "run_lock_stale path={} stale_after_secs={} holder={} action=break",
            path.display(),
            stale_after.as_secs(),
            stale_holder
        );
        if !break_stale_lock(path, &stale_holder, &token).map_err(io_error)? {
            return Err(busy(path));
        }

        match create_lock_file(path, &token) {
            Ok(()) => Ok(Self::held(path, token)),
            Err(error) if error.kind() == ErrorKind::AlreadyExists => Err(busy(path)),
            Err(error) => Err(io_error(error)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn held(path: &Path, token: String) -> Self {
        log::debug!("run_lock_acquired path={} token={}", path.display(), token);
        Self {
            path: path.to_path_buf(),
            token,
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim() == self.token => {
                if let Err(error) = fs::remove_file(&self.path) {
                    log::warn!(
                        "run_lock_release_failed path={} error={}",
                        self.path.display(),
                        error
                    );
                }
            }
            Ok(content) => log::warn!(
                "run_lock_taken_over path={} holder={} action=keep",
                self.path.display(),
                content.trim()
            ),
            Err(error) => log::warn!(
                "run_lock_release_failed path={} error={}",
                self.path.display(),
                error
            ),
        }
    }
}

fn new_token() -> String {
    format!(
        "pid={} acquired_at={} seq={}",
        std::process::id(),
        Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
        ACQUISITIONS.fetch_add(1, Ordering::Relaxed)
    )
}

fn create_lock_file(path: &Path, token: &str) -> Result<(), std::io::Error> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    writeln!(file, "{}", token)?;
    file.sync_all()
}

/// Contents of the lock file when it is older than `stale_after`.
fn stale_holder(path: &Path, stale_after: Duration) -> Option<String> {
    let modified = fs::metadata(path).and_then(|meta| meta.modified()).ok()?;
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);
    if age < stale_after {
        return None;
    }
    fs::read_to_string(path)
        .ok()
        .map(|content| content.trim().to_string())
}

/// Moves the stale file aside and checks it is the one judged stale. A concurrent breaker
/// that already replaced it gets its fresh lock put back. Returns whether the path is free.
fn break_stale_lock(path: &Path, stale_holder: &str, token: &str) -> Result<bool, std::io::Error> {
    let mut aside = path.as_os_str().to_owned();
    aside.push(format!(".stale-{}", ACQUISITIONS.fetch_add(1, Ordering::Relaxed)));
    aside.push(format!("-{}", std::process::id()));
    let aside = PathBuf::from(aside);

    match fs::rename(path, &aside) {
        Ok(()) => {}
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(true),
        Err(error) => return Err(error),
    }

    let moved = fs::read_to_string(&aside)
        .map(|content| content.trim().to_string())
        .unwrap_or_default();
    if moved == stale_holder {
        fs::remove_file(&aside)?;
        return Ok(true);
    }

    log::warn!(
        "run_lock_break_lost path={} holder={} token={}",
        path.display(),
        moved,
        token
    );
    // hard_link fails if a third run already created the path
    let restored = fs::hard_link(&aside, path);
    fs::remove_file(&aside)?;
    restored.map(|()| false).or_else(|error| {
        if error.kind() == ErrorKind::AlreadyExists {
            Ok(false)
        } else {
            Err(error)
        }
    })
}

fn busy(path: &Path) -> LockError {
    let holder = fs::read_to_string(path)
        .map(|content| content.trim().to_string())
        .unwrap_or_else(|_| "unknown holder".to_string());

    LockError::Busy {
        path: path.display().to_string(),
        holder,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use super::{LockError, RunLock};

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn second_acquire_is_busy_while_first_is_held() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("run.lock");

        let first = RunLock::acquire(&path, HOUR).expect("first acquire should succeed");
        let second = RunLock::acquire(&path, HOUR);
        assert!(matches!(second, Err(LockError::Busy { .. })));

        drop(first);
        assert!(!path.exists());
        let third = RunLock::acquire(&path, HOUR);
        assert!(third.is_ok());
    }

    #[test]
    fn busy_error_reports_holder() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("run.lock");
        fs::write(&path, "pid=4242 acquired_at=earlier\n").expect("seed lock");

        match RunLock::acquire(&path, HOUR) {
            Err(LockError::Busy { holder, .. }) => assert!(holder.contains("pid=4242")),
            other => panic!("expected busy lock, got {:?}", other),
        }
    }

    #[test]
    fn stale_lock_is_broken_once() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("nested").join("run.lock");
        fs::create_dir_all(path.parent().expect("parent")).expect("create dir");
        fs::write(&path, "pid=1 acquired_at=long-ago\n").expect("seed lock");

        let lock = RunLock::acquire(&path, Duration::ZERO).expect("stale lock should be broken");
        let content = fs::read_to_string(lock.path()).expect("lock readable");
        assert!(content.contains(&format!("pid={}", std::process::id())));
    }

    #[test]
    fn broken_lock_survives_release_of_the_overrun_holder() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("run.lock");

        let overrun = RunLock::acquire(&path, HOUR).expect("first acquire should succeed");
        let breaker = RunLock::acquire(&path, Duration::ZERO).expect("stale lock should be broken");
        drop(overrun);
        assert!(path.exists());

        let third = RunLock::acquire(&path, HOUR);
        assert!(matches!(third, Err(LockError::Busy { .. })));

        drop(breaker);
        assert!(!path.exists());
        assert_eq!(fs::read_dir(temp.path()).expect("list dir").count(), 0);
    }

    #[test]
    fn foreign_lock_file_is_left_in_place_on_drop() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("run.lock");

        let lock = RunLock::acquire(&path, HOUR).expect("acquire");
        fs::write(&path, "pid=77 acquired_at=later\n").expect("overwrite lock");
        drop(lock);

        assert_eq!(
            fs::read_to_string(&path).expect("lock kept"),
            "pid=77 acquired_at=later\n"
        );
    }
}

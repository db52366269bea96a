//! Session management for organized temporary file handling.
//!
//! Provides centralized management of capture sessions with:
//! - Unique session directories under a configurable base location
//! - Automatic cleanup unless explicitly preserved
//! - Session metadata tracking

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config;

/// A capture session with organized file management
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session ID
    pub id: String,
    /// Root directory for this session
    pub dir: PathBuf,
    /// Whether to keep files after session ends
    pub keep: bool,
}

impl Session {
    /// Create a new session with a unique ID
    pub fn new() -> Self {
        let id = generate_session_id();
        let dir = PathBuf::from(config::session_base_dir()).join(&id);

        Self {
            id,
            dir,
            keep: false,
        }
    }

    /// Create a session with a specific name/prefix
    pub fn with_name(name: &str) -> Self {
        let timestamp = generate_timestamp_suffix();
        let id = format!("{}_{}", sanitize_name(name), timestamp);
        let dir = PathBuf::from(config::session_base_dir()).join(&id);

        Self {
            id,
            dir,
            keep: false,
        }
    }

    /// Create a session in a specific directory
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let id = dir
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(generate_session_id);

        Self {
            id,
            dir,
            keep: true, // User-specified directories are kept by default
        }
    }

    /// Set whether to keep files after session ends
    pub fn keep(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    /// Initialize the session directory
    pub fn init(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        // Write session metadata
        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let metadata = serde_json::json!({
            "id": self.id,
            "created": chrono::Utc::now().to_rfc3339(),
            "host": host,
        });

        let metadata_path = self.dir.join(".session.json");
        fs::write(metadata_path, serde_json::to_string_pretty(&metadata)?)?;

        Ok(())
    }

    /// Get path for a captured frame
    pub fn frame_path(&self, attempt: usize) -> PathBuf {
        self.dir.join(format!("attempt_{}_frame.png", attempt))
    }

    /// Get path for the service response of an attempt
    pub fn response_path(&self, attempt: usize) -> PathBuf {
        self.dir.join(format!("attempt_{}_response.json", attempt))
    }

    /// List all PNG frames in the session
    pub fn list_frames(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut frames = Vec::new();
        if self.dir.exists() {
            for entry in fs::read_dir(&self.dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension().map(|e| e == "png").unwrap_or(false) {
                    frames.push(path);
                }
            }
        }
        frames.sort();
        Ok(frames)
    }

    /// Clean up the session directory
    pub fn cleanup(&self) -> std::io::Result<()> {
        if self.dir.exists() && !self.keep {
            fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.keep {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }
}

/// Generate a unique session ID
fn generate_session_id() -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let pid = std::process::id();
    format!("session_{}_{}", timestamp, pid)
}

/// Generate a timestamp suffix
fn generate_timestamp_suffix() -> String {
    chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Sanitize a name for use in filenames
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

/// Clean up sessions older than the specified duration
pub fn cleanup_old_sessions(max_age: std::time::Duration) -> std::io::Result<usize> {
    cleanup_old_sessions_in(config::session_base_dir(), max_age)
}

/// Clean up sessions under a specific base directory
pub fn cleanup_old_sessions_in(
    base: impl Into<PathBuf>,
    max_age: std::time::Duration,
) -> std::io::Result<usize> {
    let base = base.into();
    if !base.exists() {
        return Ok(0);
    }

    let now = SystemTime::now();
    let mut cleaned = 0;

    for entry in fs::read_dir(&base)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            if let Ok(metadata) = entry.metadata() {
                if let Ok(modified) = metadata.modified() {
                    if let Ok(age) = now.duration_since(modified) {
                        if age > max_age && fs::remove_dir_all(&path).is_ok() {
                            cleaned += 1;
                        }
                    }
                }
            }
        }
    }

    Ok(cleaned)
}

/// List all existing sessions
pub fn list_sessions() -> std::io::Result<Vec<PathBuf>> {
    list_sessions_in(config::session_base_dir())
}

/// List all sessions under a specific base directory
pub fn list_sessions_in(base: impl Into<PathBuf>) -> std::io::Result<Vec<PathBuf>> {
    let base = base.into();
    if !base.exists() {
        return Ok(Vec::new());
    }

    let mut sessions = Vec::new();
    for entry in fs::read_dir(&base)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            sessions.push(path);
        }
    }
    sessions.sort();
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_new() {
        let session = Session::new();
        assert!(session.id.starts_with("session_"));
        assert!(!session.keep);
    }

    #[test]
    fn test_session_with_name() {
        let session = Session::with_name("front-door cam");
        assert!(session.id.starts_with("front-door_cam_"));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("hello world"), "hello_world");
        assert_eq!(sanitize_name("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_name("dev:video0"), "dev_video0");
    }

    #[test]
    fn test_attempt_paths() {
        let session = Session::new();
        assert!(session.frame_path(1).ends_with("attempt_1_frame.png"));
        assert!(session.response_path(2).ends_with("attempt_2_response.json"));
    }

    #[test]
    fn test_list_frames_returns_only_pngs_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let session = Session::in_dir(tmp.path().join("run"));
        session.init().unwrap();

        fs::write(session.frame_path(2), b"png").unwrap();
        fs::write(session.frame_path(1), b"png").unwrap();
        fs::write(session.response_path(1), b"{}").unwrap();

        let frames = session.list_frames().unwrap();
        assert_eq!(frames, vec![session.frame_path(1), session.frame_path(2)]);
    }

    #[test]
    fn test_list_frames_empty_without_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let session = Session::in_dir(tmp.path().join("never-created"));
        assert!(session.list_frames().unwrap().is_empty());
    }

    #[test]
    fn test_list_sessions_in_base_dir() {
        let tmp = tempfile::tempdir().unwrap();

        let a = Session::in_dir(tmp.path().join("a_run"));
        a.init().unwrap();
        let b = Session::in_dir(tmp.path().join("b_run"));
        b.init().unwrap();
        // Stray files next to the session directories are not sessions
        fs::write(tmp.path().join("notes.txt"), b"x").unwrap();

        let sessions = list_sessions_in(tmp.path()).unwrap();
        assert_eq!(sessions, vec![a.dir.clone(), b.dir.clone()]);
    }

    #[test]
    fn test_list_sessions_in_missing_base_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let sessions = list_sessions_in(tmp.path().join("missing")).unwrap();
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_cleanup_old_sessions_respects_max_age() {
        let tmp = tempfile::tempdir().unwrap();
        let session = Session::in_dir(tmp.path().join("old_run"));
        session.init().unwrap();

        // Far larger than the directory's age: nothing qualifies
        let cleaned =
            cleanup_old_sessions_in(tmp.path(), std::time::Duration::from_secs(3600)).unwrap();
        assert_eq!(cleaned, 0);
        assert!(session.dir.exists());

        // Zero max age: everything qualifies
        std::thread::sleep(std::time::Duration::from_millis(20));
        let cleaned =
            cleanup_old_sessions_in(tmp.path(), std::time::Duration::from_secs(0)).unwrap();
        assert_eq!(cleaned, 1);
        assert!(!session.dir.exists());
    }

    #[test]
    fn test_init_writes_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let session = Session::in_dir(tmp.path().join("run"));
        session.init().unwrap();

        let metadata_path = session.dir.join(".session.json");
        assert!(metadata_path.exists());

        let raw = fs::read_to_string(metadata_path).unwrap();
        let meta: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(meta["id"], "run");
        assert!(meta["created"].is_string());
        assert!(meta["host"].is_string());
    }
}

//! One JSON file per session under `<data-dir>/sessions/`.
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use adventure_game::{NewSession, Session, SessionId, SessionStore, StoreError};

const SESSIONS_DIR: &str = "sessions";
const EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    sessions_dir: PathBuf,
}

impl FileSessionStore {
    /// Open a store rooted at `base_dir`, creating the directory layout:
    ///
    /// ```text
    /// base_dir/
    /// └── sessions/
    ///     ├── <session-id>.json
    ///     └── ...
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let sessions_dir = base_dir.as_ref().join(SESSIONS_DIR);
        fs::create_dir_all(&sessions_dir)?;
        Ok(Self { sessions_dir })
    }

    #[must_use]
    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn session_path(&self, id: &SessionId) -> Result<PathBuf, StoreError> {
        let valid = !id.as_str().is_empty()
            && id
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidId(id.clone()));
        }
        Ok(self
            .sessions_dir
            .join(format!("{}.{EXTENSION}", id.as_str())))
    }

    fn read(&self, path: &Path) -> Result<Session, StoreError> {
        let text = fs::read_to_string(path)?;
        let session: Session = serde_json::from_str(&text)?;
        session.validate().map_err(|reason| StoreError::Corrupt {
            id: session.session_id.clone(),
            reason,
        })?;
        Ok(session)
    }

    fn session_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.sessions_dir)? {
            let path = entry?.path();
            let hidden = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with('.'));
            if !hidden && path.extension().and_then(|ext| ext.to_str()) == Some(EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl SessionStore for FileSessionStore {
    fn create(&self, fields: NewSession) -> Result<Session, StoreError> {
        let session = Session::new(SessionId::generate(), fields);
        self.save(&session)?;
        Ok(session)
    }

    fn load(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        let path = match self.session_path(id) {
            Ok(path) => path,
            Err(StoreError::InvalidId(_)) => return Ok(None),
            Err(err) => return Err(err),
        };
        match self.read(&path) {
            Ok(session) => Ok(Some(session)),
            Err(StoreError::Io(err)) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn save(&self, session: &Session) -> Result<(), StoreError> {
        let path = self.session_path(&session.session_id)?;
        let temp = self
            .sessions_dir
            .join(format!(".{}.{EXTENSION}.tmp", session.session_id));
        fs::write(&temp, serde_json::to_vec_pretty(session)?)?;
        fs::rename(&temp, &path)?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<Session>, StoreError> {
        let mut sessions = Vec::new();
        for path in self.session_files()? {
            match self.read(&path) {
                Ok(session) => sessions.push(session),
                Err(err) => {
                    log::warn!("skipping unreadable session file {}: {err}", path.display());
                }
            }
        }
        Ok(sessions)
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let files = self.session_files()?;
        for path in &files {
            fs::remove_file(path)?;
        }
        log::info!("removed {} session files", files.len());
        Ok(files.len())
    }
}

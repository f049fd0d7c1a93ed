//! JSON-file [`DocumentStore`] backend.
//!
//! All collections are held in memory and written back to a single JSON
//! file after every mutation. Writes go to a sibling temp file which is
//! then renamed over the data file, so a crash never leaves a half-written
//! document set behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::collections::Collections;
use crate::records::{Course, Module, Progress, QuizAttempt, StoredQuiz, User, UserCounter};
use crate::{DocumentStore, Result, StoreError};

/// A store persisted to one JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: Mutex<Collections>,
}

impl FileStore {
    /// Opens the store at `path`.
    ///
    /// A missing file yields an empty store; the file is created on the
    /// first write.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupted` if the file is not a valid document
    /// set, and `StoreError::UnsupportedSchema` if any document was written
    /// by a newer schema version.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let collections = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let collections: Collections = serde_json::from_str(&contents)
                    .map_err(|e| StoreError::corrupted(&path, e.to_string()))?;
                collections.check_versions()?;
                info!(
                    path = %path.display(),
                    users = collections.users.len(),
                    courses = collections.courses.len(),
                    progress = collections.progress.len(),
                    "Loaded data file"
                );
                collections
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No data file yet, starting empty");
                Collections::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            inner: Mutex::new(collections),
        })
    }

    /// Path of the backing data file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `op` to a copy of the collections, persists the copy, and
    /// only then makes it current. A failed write leaves the store unchanged.
    async fn mutate<T>(&self, op: impl FnOnce(&mut Collections) -> Result<T> + Send) -> Result<T> {
        let mut guard = self.inner.lock().await;
        let mut next = guard.clone();
        let out = op(&mut next)?;
        write_atomically(&self.path, &next).await?;
        *guard = next;
        Ok(out)
    }
}

async fn write_atomically(path: &Path, collections: &Collections) -> Result<()> {
    let json = serde_json::to_vec_pretty(collections)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &json).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), bytes = json.len(), "Persisted data file");
    Ok(())
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        Ok(self.inner.lock().await.find_user(username).cloned())
    }

    async fn insert_user(&self, user: User) -> Result<()> {
        self.mutate(|c| c.insert_user(user)).await
    }

    async fn increment_user_counter(&self, username: &str, counter: UserCounter) -> Result<bool> {
        self.mutate(|c| Ok(c.increment_user_counter(username, counter)))
            .await
    }

    async fn add_user_badge(&self, username: &str, badge: &str) -> Result<bool> {
        self.mutate(|c| Ok(c.add_user_badge(username, badge))).await
    }

    async fn find_course(&self, course_id: &str) -> Result<Option<Course>> {
        Ok(self.inner.lock().await.find_course(course_id).cloned())
    }

    async fn courses_for_user(&self, username: &str) -> Result<Vec<Course>> {
        Ok(self.inner.lock().await.courses_for_user(username))
    }

    async fn insert_course(&self, course: Course) -> Result<()> {
        self.mutate(|c| c.insert_course(course)).await
    }

    async fn replace_module(&self, course_id: &str, module: Module) -> Result<bool> {
        self.mutate(|c| Ok(c.replace_module(course_id, module)))
            .await
    }

    async fn set_current_module(&self, course_id: &str, index: usize) -> Result<bool> {
        self.mutate(|c| Ok(c.set_current_module(course_id, index)))
            .await
    }

    async fn mark_course_completed(&self, course_id: &str) -> Result<Option<Course>> {
        self.mutate(|c| Ok(c.mark_course_completed(course_id)))
            .await
    }

    async fn find_progress(&self, username: &str, module_id: &str) -> Result<Option<Progress>> {
        Ok(self
            .inner
            .lock()
            .await
            .find_progress(username, module_id)
            .cloned())
    }

    async fn insert_progress(&self, progress: Progress) -> Result<()> {
        self.mutate(|c| c.insert_progress(progress)).await
    }

    async fn record_attempt(
        &self,
        username: &str,
        module_id: &str,
        attempt: QuizAttempt,
    ) -> Result<bool> {
        self.mutate(|c| Ok(c.record_attempt(username, module_id, attempt)))
            .await
    }

    async fn progress_for_user(&self, username: &str) -> Result<Vec<Progress>> {
        Ok(self.inner.lock().await.progress_for_user(username))
    }

    async fn save_quiz(&self, quiz: StoredQuiz) -> Result<()> {
        self.mutate(|c| {
            c.save_quiz(quiz);
            Ok(())
        })
        .await
    }

    async fn find_quiz(&self, module_id: &str) -> Result<Option<StoredQuiz>> {
        Ok(self.inner.lock().await.find_quiz(module_id).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::CURRENT_SCHEMA_VERSION;

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("data.json")).await.unwrap();
        assert!(store.find_user("ada").await.unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/data.json");

        let course_id = {
            let store = FileStore::open(&path).await.unwrap();
            store.insert_user(User::new("ada")).await.unwrap();
            let course = Course::new("ada", "Rust", "Beginner", None, vec![]);
            let id = course.id.clone();
            store.insert_course(course).await.unwrap();
            store
                .increment_user_counter("ada", UserCounter::Courses)
                .await
                .unwrap();
            id
        };

        let reopened = FileStore::open(&path).await.unwrap();
        let user = reopened.find_user("ada").await.unwrap().unwrap();
        assert_eq!(user.total_courses, 1);
        assert!(reopened.find_course(&course_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let store = FileStore::open(&path).await.unwrap();
        store.insert_user(User::new("ada")).await.unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        assert!(store.insert_user(User::new("ada")).await.is_err());
        let after = std::fs::read_to_string(&path).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_corrupted_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = FileStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupted { .. }));
    }

    #[tokio::test]
    async fn test_newer_schema_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let newer = CURRENT_SCHEMA_VERSION + 1;
        std::fs::write(&path, format!(r#"{{"schemaVersion": {newer}}}"#)).unwrap();

        let err = FileStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedSchema { found, .. } if found == newer));
    }

    #[tokio::test]
    async fn test_legacy_file_without_versions_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(
            &path,
            r#"{
                "users": [
                    {"id": "u1", "username": "ada", "created_at": "2025-03-01T10:00:00+00:00"}
                ]
            }"#,
        )
        .unwrap();

        let store = FileStore::open(&path).await.unwrap();
        let user = store.find_user("ada").await.unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.schema_version, 1);
    }
}

//! In-memory [`DocumentStore`] backend.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::collections::Collections;
use crate::records::{Course, Module, Progress, QuizAttempt, StoredQuiz, User, UserCounter};
use crate::{DocumentStore, Result};

/// A store that lives only as long as the process.
///
/// Used by tests and by `--memory` runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Collections::new()),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        Ok(self.inner.read().await.find_user(username).cloned())
    }

    async fn insert_user(&self, user: User) -> Result<()> {
        self.inner.write().await.insert_user(user)
    }

    async fn increment_user_counter(&self, username: &str, counter: UserCounter) -> Result<bool> {
        Ok(self
            .inner
            .write()
            .await
            .increment_user_counter(username, counter))
    }

    async fn add_user_badge(&self, username: &str, badge: &str) -> Result<bool> {
        Ok(self.inner.write().await.add_user_badge(username, badge))
    }

    async fn find_course(&self, course_id: &str) -> Result<Option<Course>> {
        Ok(self.inner.read().await.find_course(course_id).cloned())
    }

    async fn courses_for_user(&self, username: &str) -> Result<Vec<Course>> {
        Ok(self.inner.read().await.courses_for_user(username))
    }

    async fn insert_course(&self, course: Course) -> Result<()> {
        self.inner.write().await.insert_course(course)
    }

    async fn replace_module(&self, course_id: &str, module: Module) -> Result<bool> {
        Ok(self.inner.write().await.replace_module(course_id, module))
    }

    async fn set_current_module(&self, course_id: &str, index: usize) -> Result<bool> {
        Ok(self.inner.write().await.set_current_module(course_id, index))
    }

    async fn mark_course_completed(&self, course_id: &str) -> Result<Option<Course>> {
        Ok(self.inner.write().await.mark_course_completed(course_id))
    }

    async fn find_progress(&self, username: &str, module_id: &str) -> Result<Option<Progress>> {
        Ok(self
            .inner
            .read()
            .await
            .find_progress(username, module_id)
            .cloned())
    }

    async fn insert_progress(&self, progress: Progress) -> Result<()> {
        self.inner.write().await.insert_progress(progress)
    }

    async fn record_attempt(
        &self,
        username: &str,
        module_id: &str,
        attempt: QuizAttempt,
    ) -> Result<bool> {
        Ok(self
            .inner
            .write()
            .await
            .record_attempt(username, module_id, attempt))
    }

    async fn progress_for_user(&self, username: &str) -> Result<Vec<Progress>> {
        Ok(self.inner.read().await.progress_for_user(username))
    }

    async fn save_quiz(&self, quiz: StoredQuiz) -> Result<()> {
        self.inner.write().await.save_quiz(quiz);
        Ok(())
    }

    async fn find_quiz(&self, module_id: &str) -> Result<Option<StoredQuiz>> {
        Ok(self.inner.read().await.find_quiz(module_id).cloned())
    }
}

//! Mentora Document Store
//!
//! Persistence for users, courses, progress records and stored quizzes.
//!
//! This crate provides the record types, the [`DocumentStore`] trait the
//! services talk to, and two backends: [`MemoryStore`] for tests and
//! ephemeral runs, and [`FileStore`] which keeps every collection in a
//! single JSON file.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

mod collections;
pub mod file;
pub mod memory;
pub mod records;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use records::{
    new_id, Course, Module, Progress, QuizAttempt, StoredQuestion, StoredQuiz, User, UserCounter,
    CURRENT_SCHEMA_VERSION,
};

/// Maximum number of progress records returned for one user.
pub const MAX_LISTED_PROGRESS: usize = 1000;

/// A specialized `Result` type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A document with the same unique key already exists.
    #[error("duplicate {collection} document: {key}")]
    Duplicate {
        /// Collection name.
        collection: &'static str,
        /// The conflicting key.
        key: String,
    },

    /// A stored document was written by a newer schema than this build reads.
    #[error("unsupported schema version {found} in {collection} (this build reads up to {supported})")]
    UnsupportedSchema {
        /// Collection name.
        collection: &'static str,
        /// Version found on disk.
        found: u32,
        /// Highest version this build understands.
        supported: u32,
    },

    /// The data file could not be decoded.
    #[error("corrupted data file '{path}': {message}")]
    Corrupted {
        /// Path to the data file.
        path: PathBuf,
        /// Decoder message.
        message: String,
    },

    /// I/O failure reading or writing the data file.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure.
    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Creates a new `Duplicate` error.
    #[must_use]
    pub fn duplicate(collection: &'static str, key: impl Into<String>) -> Self {
        Self::Duplicate {
            collection,
            key: key.into(),
        }
    }

    /// Creates a new `Corrupted` error.
    #[must_use]
    pub fn corrupted(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Corrupted {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Find/insert/update access to the `users`, `courses`, `progress` and
/// `quizzes` collections.
///
/// Update operations return whether a document *matched*, regardless of
/// whether its value actually changed, so re-applying an update succeeds.
/// Each call is atomic with respect to other calls on the same store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    // ------------------------------------------------------------------------
    // users
    // ------------------------------------------------------------------------

    /// Finds a user by username.
    async fn find_user(&self, username: &str) -> Result<Option<User>>;

    /// Inserts a new user. Fails with [`StoreError::Duplicate`] if the
    /// username is taken.
    async fn insert_user(&self, user: User) -> Result<()>;

    /// Increments one aggregate counter on a user.
    async fn increment_user_counter(&self, username: &str, counter: UserCounter) -> Result<bool>;

    /// Adds a badge to a user, ignoring badges the user already holds.
    async fn add_user_badge(&self, username: &str, badge: &str) -> Result<bool>;

    // ------------------------------------------------------------------------
    // courses
    // ------------------------------------------------------------------------

    /// Finds a course by identifier.
    async fn find_course(&self, course_id: &str) -> Result<Option<Course>>;

    /// Lists a user's courses in creation order.
    async fn courses_for_user(&self, username: &str) -> Result<Vec<Course>>;

    /// Inserts a new course.
    async fn insert_course(&self, course: Course) -> Result<()>;

    /// Replaces the embedded module with the same identifier.
    ///
    /// Matches only if the course exists and contains that module.
    async fn replace_module(&self, course_id: &str, module: Module) -> Result<bool>;

    /// Sets the course's current module pointer.
    async fn set_current_module(&self, course_id: &str, index: usize) -> Result<bool>;

    /// Marks a course completed and returns the updated course.
    async fn mark_course_completed(&self, course_id: &str) -> Result<Option<Course>>;

    // ------------------------------------------------------------------------
    // progress
    // ------------------------------------------------------------------------

    /// Finds the progress record for a (user, module) pair.
    async fn find_progress(&self, username: &str, module_id: &str) -> Result<Option<Progress>>;

    /// Inserts a new progress record.
    async fn insert_progress(&self, progress: Progress) -> Result<()>;

    /// Applies a quiz attempt to an existing progress record.
    async fn record_attempt(
        &self,
        username: &str,
        module_id: &str,
        attempt: QuizAttempt,
    ) -> Result<bool>;

    /// Lists a user's progress records by ascending timestamp, at most
    /// [`MAX_LISTED_PROGRESS`] of them.
    async fn progress_for_user(&self, username: &str) -> Result<Vec<Progress>>;

    // ------------------------------------------------------------------------
    // quizzes
    // ------------------------------------------------------------------------

    /// Stores a quiz, replacing any earlier quiz for the same module.
    async fn save_quiz(&self, quiz: StoredQuiz) -> Result<()>;

    /// Finds the stored quiz for a module.
    async fn find_quiz(&self, module_id: &str) -> Result<Option<StoredQuiz>>;
}

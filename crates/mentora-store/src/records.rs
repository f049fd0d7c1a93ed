//! Persisted document records.
//!
//! Every top-level document carries a `schema_version`. Documents written
//! before versioning existed deserialize as version 1. New fields must be
//! additive and `#[serde(default)]`; unknown fields are ignored on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const fn default_schema_version() -> u32 {
    1
}

const fn default_level() -> u32 {
    1
}

/// Generates a fresh application-assigned identifier.
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// ============================================================================
// User
// ============================================================================

/// A registered learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Document schema version.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Application-assigned identifier.
    pub id: String,
    /// Unique username.
    pub username: String,
    /// When the user first registered.
    pub created_at: DateTime<Utc>,
    /// Number of modules whose quiz the user has passed.
    #[serde(default)]
    pub total_modules_completed: u32,
    /// Consecutive-day streak.
    #[serde(default)]
    pub current_streak: u32,
    /// Number of courses generated for the user.
    #[serde(default)]
    pub total_courses: u32,
    /// Learner level.
    #[serde(default = "default_level")]
    pub level: u32,
    /// Awarded badges, without duplicates.
    #[serde(default)]
    pub badges: Vec<String>,
}

impl User {
    /// Creates a fresh user with zeroed counters.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            id: new_id(),
            username: username.into(),
            created_at: Utc::now(),
            total_modules_completed: 0,
            current_streak: 0,
            total_courses: 0,
            level: 1,
            badges: Vec::new(),
        }
    }

    /// Adds a badge unless the user already holds it.
    ///
    /// Returns `true` if the badge was newly added.
    pub fn award_badge(&mut self, badge: impl Into<String>) -> bool {
        let badge = badge.into();
        if self.badges.contains(&badge) {
            return false;
        }
        self.badges.push(badge);
        true
    }
}

/// Aggregate counters on a [`User`] that can be incremented in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCounter {
    /// `total_modules_completed`
    ModulesCompleted,
    /// `total_courses`
    Courses,
}

impl UserCounter {
    /// Increments the matching counter on `user`.
    pub fn apply(self, user: &mut User) {
        let counter = match self {
            Self::ModulesCompleted => &mut user.total_modules_completed,
            Self::Courses => &mut user.total_courses,
        };
        *counter = counter.saturating_add(1);
    }
}

// ============================================================================
// Course and Module
// ============================================================================

/// One unit of course content, embedded in its [`Course`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Identifier, stable across simplification.
    pub id: String,
    /// Module title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Worked examples.
    pub examples: Vec<String>,
    /// Key takeaway points.
    pub key_points: Vec<String>,
}

impl Module {
    /// Creates a module with a fresh identifier.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        examples: Vec<String>,
        key_points: Vec<String>,
    ) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            content: content.into(),
            examples,
            key_points,
        }
    }
}

/// A generated course owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Document schema version.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Application-assigned identifier.
    pub id: String,
    /// Owning username.
    pub username: String,
    /// Requested topic.
    pub topic: String,
    /// Declared skill level ("Beginner", "Intermediate").
    pub skill_level: String,
    /// Optional learning goal.
    #[serde(default)]
    pub learning_goal: Option<String>,
    /// Ordered modules.
    #[serde(default)]
    pub modules: Vec<Module>,
    /// When the course was generated.
    pub created_at: DateTime<Utc>,
    /// Index of the module the learner is on.
    #[serde(default)]
    pub current_module_index: usize,
    /// Whether the learner finished the course.
    #[serde(default)]
    pub completed: bool,
}

impl Course {
    /// Creates a new, not yet started course.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        topic: impl Into<String>,
        skill_level: impl Into<String>,
        learning_goal: Option<String>,
        modules: Vec<Module>,
    ) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            id: new_id(),
            username: username.into(),
            topic: topic.into(),
            skill_level: skill_level.into(),
            learning_goal,
            modules,
            created_at: Utc::now(),
            current_module_index: 0,
            completed: false,
        }
    }

    /// Looks up an embedded module by identifier.
    #[must_use]
    pub fn module(&self, module_id: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == module_id)
    }

    /// Badge awarded when this course is completed.
    #[must_use]
    pub fn completion_badge(&self) -> String {
        format!("Completed {}", self.topic)
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Quiz performance for one user on one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Document schema version.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Application-assigned identifier.
    pub id: String,
    /// Learner.
    pub username: String,
    /// Course the module belongs to.
    pub course_id: String,
    /// Module the quiz covered.
    pub module_id: String,
    /// Latest quiz score.
    #[serde(default)]
    pub quiz_score: Option<u32>,
    /// Latest quiz total.
    #[serde(default)]
    pub quiz_total: Option<u32>,
    /// Number of submissions so far.
    #[serde(default)]
    pub attempts: u32,
    /// Whether the latest submission passed.
    #[serde(default)]
    pub completed: bool,
    /// Time of the latest submission.
    pub timestamp: DateTime<Utc>,
}

/// The outcome of one quiz submission, applied to a [`Progress`] record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizAttempt {
    /// Questions answered correctly.
    pub score: u32,
    /// Questions in the quiz.
    pub total: u32,
    /// Whether the attempt passed.
    pub passed: bool,
    /// When the attempt was submitted.
    pub at: DateTime<Utc>,
}

impl Progress {
    /// Creates the first progress record for a (user, module) pair.
    #[must_use]
    pub fn first_attempt(
        username: impl Into<String>,
        course_id: impl Into<String>,
        module_id: impl Into<String>,
        attempt: QuizAttempt,
    ) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            id: new_id(),
            username: username.into(),
            course_id: course_id.into(),
            module_id: module_id.into(),
            quiz_score: Some(attempt.score),
            quiz_total: Some(attempt.total),
            attempts: 1,
            completed: attempt.passed,
            timestamp: attempt.at,
        }
    }

    /// Overwrites the latest result and counts one more attempt.
    pub fn record(&mut self, attempt: QuizAttempt) {
        self.quiz_score = Some(attempt.score);
        self.quiz_total = Some(attempt.total);
        self.completed = attempt.passed;
        self.timestamp = attempt.at;
        self.attempts = self.attempts.saturating_add(1);
    }
}

// ============================================================================
// StoredQuiz
// ============================================================================

/// A question as shown to the learner, including its answer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredQuestion {
    /// Question identifier.
    pub id: String,
    /// Question text.
    pub question: String,
    /// Answer options.
    pub options: Vec<String>,
    /// Index of the correct option.
    pub correct_answer: usize,
}

/// The question set most recently generated for a module.
///
/// Only written when quizzes are graded against stored answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredQuiz {
    /// Document schema version.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Course the module belongs to.
    pub course_id: String,
    /// Module the quiz covers (unique key).
    pub module_id: String,
    /// Questions in display order.
    pub questions: Vec<StoredQuestion>,
    /// When the quiz was generated.
    pub created_at: DateTime<Utc>,
}

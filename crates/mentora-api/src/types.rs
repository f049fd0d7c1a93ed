//! Request and response bodies of the HTTP API.
//!
//! Stored records ([`User`], [`Course`], [`Module`], [`Progress`]) are served
//! as-is; the types here cover everything that is not persisted.

use mentora_store::{Course, Progress, StoredQuestion, User};
use serde::{Deserialize, Serialize};

/// Body of `POST /course/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRequest {
    /// Learner requesting the course.
    pub username: String,
    /// Subject to teach.
    pub topic: String,
    /// Declared proficiency, usually "Beginner" or "Intermediate".
    pub skill_level: String,
    /// What the learner wants to achieve.
    #[serde(default)]
    pub learning_goal: Option<String>,
}

/// One multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    /// Question identifier.
    pub id: String,
    /// Question text.
    pub question: String,
    /// Answer options in display order.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub correct_answer: usize,
}

impl From<StoredQuestion> for QuizQuestion {
    fn from(q: StoredQuestion) -> Self {
        Self {
            id: q.id,
            question: q.question,
            options: q.options,
            correct_answer: q.correct_answer,
        }
    }
}

impl From<QuizQuestion> for StoredQuestion {
    fn from(q: QuizQuestion) -> Self {
        Self {
            id: q.id,
            question: q.question,
            options: q.options,
            correct_answer: q.correct_answer,
        }
    }
}

/// A generated quiz for one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    /// Module the quiz covers.
    pub module_id: String,
    /// Questions in display order.
    pub questions: Vec<QuizQuestion>,
}

/// Body of `POST /quiz/submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSubmission {
    /// Learner submitting.
    pub username: String,
    /// Course the module belongs to.
    pub course_id: String,
    /// Module the quiz covered.
    pub module_id: String,
    /// Chosen option index per question. Negative means unanswered.
    pub answers: Vec<i64>,
}

/// Outcome of a quiz submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    /// Correct answers.
    pub score: u32,
    /// Questions counted.
    pub total: u32,
    /// `score / total` as a percentage, 0 when `total` is 0.
    pub percentage: f64,
    /// Whether the percentage reached the pass mark.
    pub passed: bool,
    /// Encouraging message addressed to the learner.
    pub feedback: String,
    /// Correct option per question.
    pub correct_answers: Vec<usize>,
}

/// Body of `POST /tutor/ask`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorMessage {
    /// Learner asking.
    pub username: String,
    /// Course the question is about.
    pub course_id: String,
    /// Module being studied, if any.
    #[serde(default)]
    pub module_id: Option<String>,
    /// The question.
    pub message: String,
    /// Where the learner is: "learning", "quiz", "teaching" or "general".
    #[serde(default)]
    pub context: Option<String>,
}

/// Tutor reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorResponse {
    /// Model answer, verbatim.
    pub response: String,
    /// Locally chosen encouragement line.
    pub encouragement: String,
}

/// Body of `POST /module/simplify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplifyRequest {
    /// Learner asking for a simpler version.
    pub username: String,
    /// Course holding the module.
    pub course_id: String,
    /// Module to rewrite.
    pub module_id: String,
    /// Concepts the learner struggled with.
    #[serde(default)]
    pub difficulty_areas: Option<Vec<String>>,
}

/// Body of `POST /teaching/submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeachingSubmission {
    /// Learner explaining.
    pub username: String,
    /// Course holding the module.
    pub course_id: String,
    /// Module being explained.
    pub module_id: String,
    /// The learner's explanation in their own words.
    pub explanation: String,
}

/// Evaluation of a learner's explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeachingFeedback {
    /// Encouraging feedback text.
    pub feedback: String,
    /// Quality from 1 to 10.
    pub quality_score: u8,
    /// Concrete improvement suggestions.
    pub suggestions: Vec<String>,
    /// Whether the learner may move on.
    pub can_proceed: bool,
}

/// Everything the progress dashboard needs for one learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressOverview {
    /// The learner, or `null` if they never registered.
    pub user: Option<User>,
    /// Progress records by ascending timestamp.
    pub progress: Vec<Progress>,
    /// Courses in creation order.
    pub courses: Vec<Course>,
}

/// Acknowledgement of `PUT /course/{id}/module`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleUpdated {
    /// Always "Module updated".
    pub message: String,
    /// The new current module index.
    pub current_index: usize,
}

/// Plain acknowledgement message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Human readable message.
    pub message: String,
}

// ============================================================================
// Query parameters
// ============================================================================

/// Query of `POST /user/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterParams {
    /// Username to register or fetch.
    pub username: String,
}

/// Query of `POST /quiz/generate`.
#[derive(Debug, Clone, Deserialize)]
pub struct QuizParams {
    /// Course holding the module.
    pub course_id: String,
    /// Module to quiz on.
    pub module_id: String,
}

/// Query of `PUT /course/{id}/module`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleIndexParams {
    /// New current module index.
    pub module_index: i64,
}

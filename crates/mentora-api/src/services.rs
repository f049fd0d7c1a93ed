//! Use cases behind the HTTP routes.
//!
//! [`LearningService`] owns handles to the document store and the chat
//! client. Each operation fetches what it needs, makes at most one model
//! round trip, and writes last, so a failed generation leaves the store
//! untouched.

use std::sync::Arc;

use chrono::Utc;
use mentora_llm::ChatClient;
use mentora_store::{
    Course, DocumentStore, Module, Progress, QuizAttempt, StoreError, StoredQuiz, User,
    UserCounter,
};
use tracing::{error, info, warn};

use crate::config::QuizScoring;
use crate::error::{MentoraError, Result};
use crate::prompts::{self, PromptRequest};
use crate::types::{
    Ack, CourseRequest, ModuleUpdated, ProgressOverview, Quiz, QuizResult, QuizSubmission,
    SimplifyRequest, TeachingFeedback, TeachingSubmission, TutorMessage, TutorResponse,
};

/// Percentage needed to pass a quiz.
pub const PASS_PERCENTAGE: f64 = 60.0;

/// Name used in feedback when the learner is not registered.
const FALLBACK_NAME: &str = "Learner";

const GENERATE_COURSE: &str = "generate course";
const GENERATE_QUIZ: &str = "generate quiz";
const SIMPLIFY_MODULE: &str = "simplify module";
const EVALUATE_EXPLANATION: &str = "evaluate explanation";

/// The learning platform's operations.
#[derive(Clone)]
pub struct LearningService {
    store: Arc<dyn DocumentStore>,
    llm: Arc<dyn ChatClient>,
    scoring: QuizScoring,
}

impl std::fmt::Debug for LearningService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearningService")
            .field("scoring", &self.scoring)
            .finish_non_exhaustive()
    }
}

impl LearningService {
    /// Creates a service over the given store and chat client.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        llm: Arc<dyn ChatClient>,
        scoring: QuizScoring,
    ) -> Self {
        Self {
            store,
            llm,
            scoring,
        }
    }

    // ------------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------------

    /// Returns the user with `username`, creating it first if needed.
    pub async fn register_user(&self, username: &str) -> Result<User> {
        require_text("username", username)?;

        if let Some(user) = self.store.find_user(username).await? {
            return Ok(user);
        }

        let user = User::new(username);
        match self.store.insert_user(user.clone()).await {
            Ok(()) => {
                info!(username = %username, user_id = %user.id, "User registered");
                Ok(user)
            }
            // Lost a race with a concurrent registration of the same name.
            Err(StoreError::Duplicate { .. }) => self.get_user(username).await,
            Err(e) => Err(e.into()),
        }
    }

    /// Fetches a user.
    pub async fn get_user(&self, username: &str) -> Result<User> {
        self.store
            .find_user(username)
            .await?
            .ok_or_else(|| MentoraError::not_found("User", username))
    }

    // ------------------------------------------------------------------------
    // Courses
    // ------------------------------------------------------------------------

    /// Generates a course, stores it and counts it for the user.
    pub async fn generate_course(&self, request: &CourseRequest) -> Result<Course> {
        require_text("username", &request.username)?;
        require_text("topic", &request.topic)?;

        let prompt = prompts::course_generation(request);
        let reply = self.ask(&prompt, GENERATE_COURSE).await?;
        let modules =
            prompts::parse_course(&reply).map_err(|e| generation_failed(GENERATE_COURSE, e))?;

        let course = Course::new(
            &request.username,
            &request.topic,
            &request.skill_level,
            request.learning_goal.clone(),
            modules,
        );
        self.store.insert_course(course.clone()).await?;
        self.store
            .increment_user_counter(&request.username, UserCounter::Courses)
            .await?;

        info!(
            username = %course.username,
            course_id = %course.id,
            modules = course.modules.len(),
            "Course generated"
        );
        Ok(course)
    }

    /// Fetches a course.
    pub async fn get_course(&self, course_id: &str) -> Result<Course> {
        self.store
            .find_course(course_id)
            .await?
            .ok_or_else(|| MentoraError::not_found("Course", course_id))
    }

    /// Moves the course's current module pointer.
    pub async fn set_current_module(&self, course_id: &str, index: i64) -> Result<ModuleUpdated> {
        let course = self.get_course(course_id).await?;
        let module_count = course.modules.len();
        let index = usize::try_from(index)
            .ok()
            .filter(|i| *i < module_count)
            .ok_or_else(|| {
                MentoraError::invalid_request(format!(
                    "module_index {index} is out of range for a course with {module_count} modules"
                ))
            })?;

        if !self.store.set_current_module(course_id, index).await? {
            return Err(MentoraError::not_found("Course", course_id));
        }
        Ok(ModuleUpdated {
            message: "Module updated".to_string(),
            current_index: index,
        })
    }

    /// Marks a course completed and awards its badge. Safe to repeat.
    pub async fn complete_course(&self, course_id: &str) -> Result<Ack> {
        let course = self
            .store
            .mark_course_completed(course_id)
            .await?
            .ok_or_else(|| MentoraError::not_found("Course", course_id))?;

        let badge = course.completion_badge();
        if !self.store.add_user_badge(&course.username, &badge).await? {
            warn!(
                username = %course.username,
                course_id = %course_id,
                "Course owner is not registered, badge not awarded"
            );
        }
        info!(course_id = %course_id, badge = %badge, "Course completed");

        Ok(Ack {
            message: "Course completed! 🎉".to_string(),
        })
    }

    // ------------------------------------------------------------------------
    // Quizzes
    // ------------------------------------------------------------------------

    /// Generates a quiz for a module.
    ///
    /// In [`QuizScoring::Stored`] mode the quiz replaces any earlier one for
    /// the module so submissions can be graded against it.
    pub async fn generate_quiz(&self, course_id: &str, module_id: &str) -> Result<Quiz> {
        let course = self.get_course(course_id).await?;
        let module = require_module(&course, module_id)?;

        let prompt = prompts::quiz_generation(module);
        let reply = self.ask(&prompt, GENERATE_QUIZ).await?;
        let questions =
            prompts::parse_quiz(&reply).map_err(|e| generation_failed(GENERATE_QUIZ, e))?;

        if self.scoring == QuizScoring::Stored {
            self.store
                .save_quiz(StoredQuiz {
                    schema_version: mentora_store::CURRENT_SCHEMA_VERSION,
                    course_id: course_id.to_string(),
                    module_id: module_id.to_string(),
                    questions: questions.iter().cloned().map(Into::into).collect(),
                    created_at: Utc::now(),
                })
                .await?;
        }

        Ok(Quiz {
            module_id: module_id.to_string(),
            questions,
        })
    }

    /// Scores a submission and records the attempt.
    pub async fn submit_quiz(&self, submission: &QuizSubmission) -> Result<QuizResult> {
        let course = self.get_course(&submission.course_id).await?;
        require_module(&course, &submission.module_id)?;

        let grade = match self.scoring {
            QuizScoring::Placeholder => Grade::placeholder(&submission.answers),
            QuizScoring::Stored => {
                let quiz = self
                    .store
                    .find_quiz(&submission.module_id)
                    .await?
                    .filter(|quiz| quiz.course_id == submission.course_id)
                    .ok_or_else(|| MentoraError::not_found("Quiz", &submission.module_id))?;
                Grade::against(&quiz, &submission.answers)
            }
        };

        let percentage = grade.percentage();
        let passed = percentage >= PASS_PERCENTAGE;
        let name = self
            .store
            .find_user(&submission.username)
            .await?
            .map_or_else(|| FALLBACK_NAME.to_string(), |u| u.username);

        let attempt = QuizAttempt {
            score: grade.score,
            total: grade.total,
            passed,
            at: Utc::now(),
        };
        self.record_progress(submission, attempt).await?;
        if passed {
            self.store
                .increment_user_counter(&submission.username, UserCounter::ModulesCompleted)
                .await?;
        }

        info!(
            username = %submission.username,
            module_id = %submission.module_id,
            score = grade.score,
            total = grade.total,
            passed,
            "Quiz submitted"
        );

        Ok(QuizResult {
            score: grade.score,
            total: grade.total,
            percentage,
            passed,
            feedback: quiz_feedback(&name, percentage, passed),
            correct_answers: grade.correct_answers,
        })
    }

    async fn record_progress(
        &self,
        submission: &QuizSubmission,
        attempt: QuizAttempt,
    ) -> Result<()> {
        let (username, module_id) = (&submission.username, &submission.module_id);
        if self
            .store
            .record_attempt(username, module_id, attempt)
            .await?
        {
            return Ok(());
        }

        let progress = Progress::first_attempt(username, &submission.course_id, module_id, attempt);
        match self.store.insert_progress(progress).await {
            Ok(()) => Ok(()),
            // A concurrent first submission created the record.
            Err(StoreError::Duplicate { .. }) => {
                self.store
                    .record_attempt(username, module_id, attempt)
                    .await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    // ------------------------------------------------------------------------
    // Tutor, simplification, teaching
    // ------------------------------------------------------------------------

    /// Answers a learner's question.
    pub async fn ask_tutor(&self, message: &TutorMessage) -> Result<TutorResponse> {
        require_text("username", &message.username)?;
        require_text("message", &message.message)?;

        let course = match &message.module_id {
            Some(_) => self.store.find_course(&message.course_id).await?,
            None => None,
        };
        let module = course
            .as_ref()
            .zip(message.module_id.as_deref())
            .and_then(|(c, id)| c.module(id));

        let prompt = prompts::tutor(
            &message.username,
            &message.course_id,
            &message.message,
            module,
            message.context.as_deref(),
        );
        let response = self.ask(&prompt, "get tutor response").await?;
        let encouragement = prompts::encouragement(&message.username, &mut rand::thread_rng());

        Ok(TutorResponse {
            response,
            encouragement,
        })
    }

    /// Rewrites a module in simpler terms and stores the result in place.
    pub async fn simplify_module(&self, request: &SimplifyRequest) -> Result<Module> {
        let course = self.get_course(&request.course_id).await?;
        let module = require_module(&course, &request.module_id)?;

        let areas = request.difficulty_areas.as_deref().unwrap_or_default();
        let prompt = prompts::simplification(&request.username, module, areas);
        let reply = self.ask(&prompt, SIMPLIFY_MODULE).await?;
        let simplified = prompts::parse_simplified(&reply, &request.module_id)
            .map_err(|e| generation_failed(SIMPLIFY_MODULE, e))?;

        if !self
            .store
            .replace_module(&request.course_id, simplified.clone())
            .await?
        {
            return Err(MentoraError::not_found("Module", &request.module_id));
        }

        info!(course_id = %request.course_id, module_id = %request.module_id, "Module simplified");
        Ok(simplified)
    }

    /// Grades a learner's explanation of a module.
    pub async fn submit_teaching(
        &self,
        submission: &TeachingSubmission,
    ) -> Result<TeachingFeedback> {
        require_text("explanation", &submission.explanation)?;
        let course = self.get_course(&submission.course_id).await?;
        let module = require_module(&course, &submission.module_id)?;

        let prompt =
            prompts::teaching_evaluation(&submission.username, module, &submission.explanation);
        let reply = self.ask(&prompt, EVALUATE_EXPLANATION).await?;
        prompts::parse_teaching(&reply).map_err(|e| generation_failed(EVALUATE_EXPLANATION, e))
    }

    // ------------------------------------------------------------------------
    // Progress
    // ------------------------------------------------------------------------

    /// Collects a learner's profile, progress records and courses.
    pub async fn progress_overview(&self, username: &str) -> Result<ProgressOverview> {
        let (user, progress, courses) = futures::try_join!(
            self.store.find_user(username),
            self.store.progress_for_user(username),
            self.store.courses_for_user(username),
        )?;
        Ok(ProgressOverview {
            user,
            progress,
            courses,
        })
    }

    async fn ask(&self, prompt: &PromptRequest, operation: &'static str) -> Result<String> {
        self.llm
            .send_message(&prompt.session, &prompt.message)
            .await
            .map_err(|e| {
                error!(
                    operation,
                    session = %prompt.session.session_id,
                    kind = %e.kind(),
                    error = %e,
                    "Model call failed"
                );
                MentoraError::generation(operation, e)
            })
    }
}

fn generation_failed(operation: &'static str, cause: prompts::ReplyError) -> MentoraError {
    error!(operation, error = %cause, "Unusable model reply");
    MentoraError::generation(operation, cause)
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MentoraError::invalid_request(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_module<'a>(course: &'a Course, module_id: &str) -> Result<&'a Module> {
    course
        .module(module_id)
        .ok_or_else(|| MentoraError::not_found("Module", module_id))
}

/// Feedback line shown after a quiz.
pub fn quiz_feedback(name: &str, percentage: f64, passed: bool) -> String {
    if passed {
        format!(
            "Excellent work, {name}! You scored {percentage:.0}%. You've shown great understanding. Ready to move forward! 🎉"
        )
    } else {
        format!(
            "It's okay, {name}. You scored {percentage:.0}%. Learning takes time. Let's simplify this concept and try again. You've got this! 💪"
        )
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Grade {
    score: u32,
    total: u32,
    correct_answers: Vec<usize>,
}

impl Grade {
    /// Every non-negative answer counts as correct.
    fn placeholder(answers: &[i64]) -> Self {
        let total = answers.len();
        Self {
            score: saturating_u32(answers.iter().filter(|a| **a >= 0).count()),
            total: saturating_u32(total),
            correct_answers: vec![0; total],
        }
    }

    /// Compares answers position by position with the stored key.
    fn against(quiz: &StoredQuiz, answers: &[i64]) -> Self {
        let correct_answers: Vec<usize> = quiz.questions.iter().map(|q| q.correct_answer).collect();
        let score = correct_answers
            .iter()
            .zip(answers)
            .filter(|(key, given)| usize::try_from(**given).is_ok_and(|g| g == **key))
            .count();
        Self {
            score: saturating_u32(score),
            total: saturating_u32(correct_answers.len()),
            correct_answers,
        }
    }

    fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.score) / f64::from(self.total) * 100.0
        }
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

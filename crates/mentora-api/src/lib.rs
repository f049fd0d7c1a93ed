//! Mentora API
//!
//! HTTP routes, prompt construction, reply parsing and the learning services
//! behind them.

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod prompts;
pub mod services;
pub mod types;

pub use api::{create_router, AppState, ErrorResponse, HealthResponse};
pub use config::{Config, LlmConfig, QuizScoring, StoreConfig, StoreKind, MAX_LLM_RETRIES};
pub use error::{MentoraError, Result};
pub use extract::extract_json_block;
pub use prompts::{parse_reply, PromptRequest, ReplyError};
pub use services::{quiz_feedback, LearningService, PASS_PERCENTAGE};
pub use types::{
    Ack, CourseRequest, ModuleUpdated, ProgressOverview, Quiz, QuizQuestion, QuizResult,
    QuizSubmission, SimplifyRequest, TeachingFeedback, TeachingSubmission, TutorMessage,
    TutorResponse,
};

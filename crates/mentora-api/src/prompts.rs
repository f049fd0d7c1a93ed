//! Prompt construction and reply parsing for each generation use case.
//!
//! Builders are pure: they return a [`PromptRequest`] and never touch the
//! network, so the exact text sent to the model can be asserted in tests.
//! Parsers take the raw reply, run it through [`extract_json_block`], decode
//! it and validate the result. A reply that fails any of these steps is a
//! [`ReplyError`]; nothing is retried.

use mentora_llm::ChatSession;
use mentora_store::{new_id, Module};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::extract::extract_json_block;
use crate::types::{CourseRequest, QuizQuestion, TeachingFeedback};

/// Number of modules requested per course.
pub const COURSE_MODULES: usize = 5;

/// Number of questions requested per quiz.
pub const QUIZ_QUESTIONS: usize = 5;

/// Characters of module content included as tutor context.
pub const TUTOR_EXCERPT_CHARS: usize = 500;

/// Context tag used when the learner does not send one.
pub const DEFAULT_TUTOR_CONTEXT: &str = "general learning";

const ENCOURAGEMENTS: [&str; 4] = [
    "You're doing great, {name}! Keep asking questions! 🌟",
    "Great question, {name}! Curiosity leads to learning! 🚀",
    "I'm here to help, {name}! You're making progress! 💪",
    "Excellent thinking, {name}! Keep it up! ✨",
];

/// A system instruction and user message bound to a session key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    /// Session key and system instruction.
    pub session: ChatSession,
    /// The user turn.
    pub message: String,
}

/// Why a model reply could not be turned into a record.
#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    /// The extracted text is not valid JSON of the expected shape.
    #[error("invalid JSON in model reply: {0}")]
    Decode(#[from] serde_json::Error),

    /// The JSON decoded but its content is unusable.
    #[error("{0}")]
    Invalid(String),
}

/// Extracts and decodes the JSON payload of a reply.
pub fn parse_reply<T: DeserializeOwned>(reply: &str) -> Result<T, ReplyError> {
    Ok(serde_json::from_str(extract_json_block(reply))?)
}

// ============================================================================
// Course generation
// ============================================================================

/// Builds the course generation prompt.
pub fn course_generation(request: &CourseRequest) -> PromptRequest {
    let goal = request
        .learning_goal
        .as_deref()
        .filter(|g| !g.trim().is_empty())
        .unwrap_or("General understanding");

    let system = format!(
        r#"You are an expert educational content creator. Generate a personalized learning course for {username}.

Topic: {topic}
Skill Level: {level}
Learning Goal: {goal}

Create a course with exactly {COURSE_MODULES} progressive modules. Each module should:
1. Have a clear, engaging title
2. Explain the idea simply in 2-3 paragraphs
3. Include 2-3 practical examples
4. List 3-4 key takeaway points

Adapt the content to the skill level and keep the tone encouraging and friendly.
Respond with JSON using this structure:
{{
    "modules": [
        {{
            "title": "Module title",
            "content": "Detailed explanation...",
            "examples": ["Example 1", "Example 2"],
            "key_points": ["Point 1", "Point 2", "Point 3"]
        }}
    ]
}}
"#,
        username = request.username,
        topic = request.topic,
        level = request.skill_level,
    );

    PromptRequest {
        session: ChatSession::new(
            format!("course_gen_{}_{}", request.username, new_id()),
            system,
        ),
        message: format!(
            "Generate a complete {} level course on '{}' with {COURSE_MODULES} modules. Return only valid JSON.",
            request.skill_level, request.topic
        ),
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedCourse {
    modules: Vec<GeneratedModule>,
}

#[derive(Debug, Deserialize)]
struct GeneratedModule {
    title: String,
    content: String,
    examples: Vec<String>,
    key_points: Vec<String>,
}

impl GeneratedModule {
    fn into_module(self, id: String) -> Module {
        Module {
            id,
            title: self.title,
            content: self.content,
            examples: self.examples,
            key_points: self.key_points,
        }
    }
}

/// Parses a course generation reply into modules with fresh identifiers.
pub fn parse_course(reply: &str) -> Result<Vec<Module>, ReplyError> {
    let course: GeneratedCourse = parse_reply(reply)?;
    if course.modules.is_empty() {
        return Err(ReplyError::Invalid("course has no modules".to_string()));
    }
    Ok(course
        .modules
        .into_iter()
        .map(|m| m.into_module(new_id()))
        .collect())
}

// ============================================================================
// Quiz generation
// ============================================================================

/// Builds the quiz generation prompt for a module.
pub fn quiz_generation(module: &Module) -> PromptRequest {
    let system = format!(
        r#"You are a quiz generator. Create {QUIZ_QUESTIONS} multiple-choice questions based on the module content.

Module: {title}
Content: {content}

Questions should test understanding, not memorization. Each question must have 4 options with exactly one correct answer.

Return ONLY valid JSON with this exact structure:
{{
    "questions": [
        {{
            "question": "Question text?",
            "options": ["Option A", "Option B", "Option C", "Option D"],
            "correct_answer": 0
        }}
    ]
}}
"#,
        title = module.title,
        content = module.content,
    );

    PromptRequest {
        session: ChatSession::new(format!("quiz_gen_{}", module.id), system),
        message: format!("Generate {QUIZ_QUESTIONS} quiz questions. Return only valid JSON."),
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedQuiz {
    questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestion {
    question: String,
    options: Vec<String>,
    correct_answer: usize,
}

/// Parses a quiz generation reply into questions with fresh identifiers.
pub fn parse_quiz(reply: &str) -> Result<Vec<QuizQuestion>, ReplyError> {
    let quiz: GeneratedQuiz = parse_reply(reply)?;
    if quiz.questions.is_empty() {
        return Err(ReplyError::Invalid("quiz has no questions".to_string()));
    }

    quiz.questions
        .into_iter()
        .enumerate()
        .map(|(n, q)| {
            if q.options.is_empty() {
                return Err(ReplyError::Invalid(format!(
                    "question {} has no options",
                    n + 1
                )));
            }
            if q.correct_answer >= q.options.len() {
                return Err(ReplyError::Invalid(format!(
                    "question {} marks option {} correct but has {} options",
                    n + 1,
                    q.correct_answer,
                    q.options.len()
                )));
            }
            Ok(QuizQuestion {
                id: new_id(),
                question: q.question,
                options: q.options,
                correct_answer: q.correct_answer,
            })
        })
        .collect()
}

// ============================================================================
// Simplification
// ============================================================================

/// Builds the prompt that rewrites a module in simpler terms.
pub fn simplification(
    username: &str,
    module: &Module,
    difficulty_areas: &[String],
) -> PromptRequest {
    let focus = if difficulty_areas.is_empty() {
        String::new()
    } else {
        let areas: Vec<String> = difficulty_areas.iter().map(|a| format!("- {a}")).collect();
        format!(
            "\nThe learner struggled with these areas, focus on them:\n{}\n",
            areas.join("\n")
        )
    };

    let system = format!(
        r#"You are an expert at simplifying complex topics. Rewrite this module to be even simpler for {username}.

Original Module: {title}
Original Content: {content}
{focus}
Make it:
- Use simpler words
- Add more examples
- Break down concepts step-by-step
- Use analogies and real-world connections

Keep the same title. Return ONLY valid JSON:
{{
    "title": "Same title",
    "content": "Simplified explanation...",
    "examples": ["Example 1", "Example 2", "Example 3"],
    "key_points": ["Point 1", "Point 2", "Point 3"]
}}
"#,
        title = module.title,
        content = module.content,
    );

    PromptRequest {
        session: ChatSession::new(format!("simplify_{}", module.id), system),
        message: "Simplify this module. Return only valid JSON.".to_string(),
    }
}

/// Parses a simplification reply into a module that keeps `module_id`.
pub fn parse_simplified(reply: &str, module_id: &str) -> Result<Module, ReplyError> {
    let module: GeneratedModule = parse_reply(reply)?;
    Ok(module.into_module(module_id.to_string()))
}

// ============================================================================
// Tutor
// ============================================================================

/// Builds the tutor prompt.
///
/// `module` adds an excerpt of the module being studied as context.
pub fn tutor(
    username: &str,
    course_id: &str,
    question: &str,
    module: Option<&Module>,
    context: Option<&str>,
) -> PromptRequest {
    let context = context
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(DEFAULT_TUTOR_CONTEXT);
    let module_info = module
        .map(|m| {
            format!(
                "\nCurrent Module: {}\nContent: {}",
                m.title,
                module_excerpt(&m.content)
            )
        })
        .unwrap_or_default();

    let system = format!(
        r"You are a friendly, encouraging AI tutor helping {username} learn.

Your role:
- Answer questions clearly and simply
- Give hints, not direct answers to quiz questions
- Use encouraging, motivating language
- Keep responses concise (2-3 sentences)
- Adapt to the learner's level

Context: {context}
{module_info}

Always address {username} by name and be supportive!
"
    );

    PromptRequest {
        session: ChatSession::new(format!("tutor_{username}_{course_id}"), system),
        message: question.to_string(),
    }
}

/// The first [`TUTOR_EXCERPT_CHARS`] characters of `content`, followed by `...`.
pub fn module_excerpt(content: &str) -> String {
    let mut excerpt: String = content.chars().take(TUTOR_EXCERPT_CHARS).collect();
    excerpt.push_str("...");
    excerpt
}

/// Picks one of the encouragement lines for `username`.
pub fn encouragement<R: Rng + ?Sized>(username: &str, rng: &mut R) -> String {
    ENCOURAGEMENTS
        .choose(rng)
        .copied()
        .unwrap_or(ENCOURAGEMENTS[0])
        .replace("{name}", username)
}

// ============================================================================
// Teaching evaluation
// ============================================================================

/// Builds the prompt that grades a learner's explanation of a module.
pub fn teaching_evaluation(username: &str, module: &Module, explanation: &str) -> PromptRequest {
    let system = format!(
        r#"You are evaluating {username}'s understanding of: {title}

Original content: {content}
Their explanation: {explanation}

Provide:
1. Encouraging feedback (2-3 sentences)
2. Quality score (1-10)
3. 2-3 specific suggestions for improvement
4. Whether they can proceed (true/false)

Return ONLY valid JSON:
{{
    "feedback": "Great effort, {username}!...",
    "quality_score": 8,
    "suggestions": ["Suggestion 1", "Suggestion 2"],
    "can_proceed": true
}}
"#,
        title = module.title,
        content = module.content,
    );

    PromptRequest {
        session: ChatSession::new(format!("teaching_{}", module.id), system),
        message: "Evaluate this explanation. Return only valid JSON.".to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedFeedback {
    feedback: String,
    quality_score: f64,
    suggestions: Vec<String>,
    can_proceed: bool,
}

/// Parses a teaching evaluation reply, clamping the score into 1..=10.
pub fn parse_teaching(reply: &str) -> Result<TeachingFeedback, ReplyError> {
    let raw: GeneratedFeedback = parse_reply(reply)?;
    Ok(TeachingFeedback {
        feedback: raw.feedback,
        quality_score: clamp_quality(raw.quality_score),
        suggestions: raw.suggestions,
        can_proceed: raw.can_proceed,
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_quality(score: f64) -> u8 {
    score.round().clamp(1.0, 10.0) as u8
}

//! The in-memory collection set shared by both backends.

use serde::{Deserialize, Serialize};

use crate::records::{
    Course, Module, Progress, QuizAttempt, StoredQuiz, User, UserCounter, CURRENT_SCHEMA_VERSION,
};
use crate::{Result, StoreError, MAX_LISTED_PROGRESS};

/// All collections, in the layout written to the data file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Collections {
    #[serde(default = "current_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub progress: Vec<Progress>,
    #[serde(default)]
    pub quizzes: Vec<StoredQuiz>,
}

const fn current_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

impl Collections {
    pub fn new() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            ..Self::default()
        }
    }

    /// Rejects documents written by a newer schema.
    pub fn check_versions(&self) -> Result<()> {
        let versions = [("dataset", self.schema_version)]
            .into_iter()
            .chain(self.users.iter().map(|d| ("users", d.schema_version)))
            .chain(self.courses.iter().map(|d| ("courses", d.schema_version)))
            .chain(self.progress.iter().map(|d| ("progress", d.schema_version)))
            .chain(self.quizzes.iter().map(|d| ("quizzes", d.schema_version)));

        for (collection, found) in versions {
            if found > CURRENT_SCHEMA_VERSION {
                return Err(StoreError::UnsupportedSchema {
                    collection,
                    found,
                    supported: CURRENT_SCHEMA_VERSION,
                });
            }
        }
        Ok(())
    }

    // users

    pub fn find_user(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.username == username)
    }

    fn find_user_mut(&mut self, username: &str) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.username == username)
    }

    pub fn insert_user(&mut self, user: User) -> Result<()> {
        if self.find_user(&user.username).is_some() {
            return Err(StoreError::duplicate("users", user.username));
        }
        self.users.push(user);
        Ok(())
    }

    pub fn increment_user_counter(&mut self, username: &str, counter: UserCounter) -> bool {
        self.find_user_mut(username).map_or(false, |user| {
            counter.apply(user);
            true
        })
    }

    pub fn add_user_badge(&mut self, username: &str, badge: &str) -> bool {
        self.find_user_mut(username).map_or(false, |user| {
            user.award_badge(badge);
            true
        })
    }

    // courses

    pub fn find_course(&self, course_id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == course_id)
    }

    fn find_course_mut(&mut self, course_id: &str) -> Option<&mut Course> {
        self.courses.iter_mut().find(|c| c.id == course_id)
    }

    pub fn courses_for_user(&self, username: &str) -> Vec<Course> {
        self.courses
            .iter()
            .filter(|c| c.username == username)
            .cloned()
            .collect()
    }

    pub fn insert_course(&mut self, course: Course) -> Result<()> {
        if self.find_course(&course.id).is_some() {
            return Err(StoreError::duplicate("courses", course.id));
        }
        self.courses.push(course);
        Ok(())
    }

    pub fn replace_module(&mut self, course_id: &str, module: Module) -> bool {
        let Some(course) = self.find_course_mut(course_id) else {
            return false;
        };
        match course.modules.iter_mut().find(|m| m.id == module.id) {
            Some(slot) => {
                *slot = module;
                true
            }
            None => false,
        }
    }

    pub fn set_current_module(&mut self, course_id: &str, index: usize) -> bool {
        self.find_course_mut(course_id).map_or(false, |course| {
            course.current_module_index = index;
            true
        })
    }

    pub fn mark_course_completed(&mut self, course_id: &str) -> Option<Course> {
        let course = self.find_course_mut(course_id)?;
        course.completed = true;
        Some(course.clone())
    }

    // progress

    pub fn find_progress(&self, username: &str, module_id: &str) -> Option<&Progress> {
        self.progress
            .iter()
            .find(|p| p.username == username && p.module_id == module_id)
    }

    pub fn insert_progress(&mut self, progress: Progress) -> Result<()> {
        if self
            .find_progress(&progress.username, &progress.module_id)
            .is_some()
        {
            return Err(StoreError::duplicate(
                "progress",
                format!("{}/{}", progress.username, progress.module_id),
            ));
        }
        self.progress.push(progress);
        Ok(())
    }

    pub fn record_attempt(
        &mut self,
        username: &str,
        module_id: &str,
        attempt: QuizAttempt,
    ) -> bool {
        self.progress
            .iter_mut()
            .find(|p| p.username == username && p.module_id == module_id)
            .map_or(false, |progress| {
                progress.record(attempt);
                true
            })
    }

    pub fn progress_for_user(&self, username: &str) -> Vec<Progress> {
        let mut records: Vec<Progress> = self
            .progress
            .iter()
            .filter(|p| p.username == username)
            .cloned()
            .collect();
        records.sort_by_key(|p| p.timestamp);
        records.truncate(MAX_LISTED_PROGRESS);
        records
    }

    // quizzes

    pub fn save_quiz(&mut self, quiz: StoredQuiz) {
        let module_id = &quiz.module_id;
        match self.quizzes.iter_mut().find(|q| &q.module_id == module_id) {
            Some(slot) => *slot = quiz,
            None => self.quizzes.push(quiz),
        }
    }

    pub fn find_quiz(&self, module_id: &str) -> Option<&StoredQuiz> {
        self.quizzes.iter().find(|q| q.module_id == module_id)
    }
}

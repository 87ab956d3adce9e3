use async_trait::async_trait;
use quiz_core::model::{CategoryId, Question, QuestionId};
use rand::seq::index;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by question sources.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LoadError {
    /// The category exists nowhere or holds no questions.
    #[error("no questions found for category")]
    NotFound,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("question source unavailable: {0}")]
    Unavailable(String),
}

/// Contract of the question service feeding assessment sessions.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Fetch up to `desired_count` questions for a category, in presentation order.
    ///
    /// Fewer questions are returned when the category holds fewer.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::NotFound` when the category has no questions,
    /// `LoadError::InvalidInput` for a malformed category id or a zero count,
    /// and `LoadError::Unavailable` for any other retrieval failure.
    async fn fetch_questions(
        &self,
        category: &CategoryId,
        desired_count: u32,
    ) -> Result<Vec<Question>, LoadError>;
}

/// A question together with its correct option, as kept by a question bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRecord {
    pub question: Question,
    pub correct_option: usize,
}

impl QuestionRecord {
    #[must_use]
    pub fn new(question: Question, correct_option: usize) -> Self {
        Self {
            question,
            correct_option,
        }
    }
}

/// In-memory question bank for tests, demos and the terminal runner.
///
/// When a category holds more questions than requested, a random subset is
/// drawn and returned in bank order.
#[derive(Clone, Debug)]
pub struct InMemoryQuestionBank {
    categories: Arc<Mutex<HashMap<CategoryId, Vec<QuestionRecord>>>>,
    shuffle: bool,
}

impl Default for InMemoryQuestionBank {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryQuestionBank {
    #[must_use]
    pub fn new() -> Self {
        Self {
            categories: Arc::new(Mutex::new(HashMap::new())),
            shuffle: true,
        }
    }

    /// Disable random sampling; the first `desired_count` questions are returned.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Replace the questions of a category.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Unavailable` if the bank lock is poisoned.
    pub fn insert_category(
        &self,
        category: CategoryId,
        records: Vec<QuestionRecord>,
    ) -> Result<(), LoadError> {
        let mut guard = self
            .categories
            .lock()
            .map_err(|e| LoadError::Unavailable(e.to_string()))?;
        guard.insert(category, records);
        Ok(())
    }

    /// Correct option per question across all categories.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Unavailable` if the bank lock is poisoned.
    pub fn answer_key(&self) -> Result<HashMap<QuestionId, usize>, LoadError> {
        let guard = self
            .categories
            .lock()
            .map_err(|e| LoadError::Unavailable(e.to_string()))?;
        Ok(guard
            .values()
            .flatten()
            .map(|record| (record.question.id().clone(), record.correct_option))
            .collect())
    }

    /// Category ids currently held, sorted.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Unavailable` if the bank lock is poisoned.
    pub fn categories(&self) -> Result<Vec<CategoryId>, LoadError> {
        let guard = self
            .categories
            .lock()
            .map_err(|e| LoadError::Unavailable(e.to_string()))?;
        let mut ids: Vec<_> = guard.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn pick(&self, records: &[QuestionRecord], count: usize) -> Vec<Question> {
        if records.len() <= count || !self.shuffle {
            return records
                .iter()
                .take(count)
                .map(|record| record.question.clone())
                .collect();
        }

        let mut picked = index::sample(&mut rand::rng(), records.len(), count).into_vec();
        picked.sort_unstable();
        picked
            .into_iter()
            .map(|i| records[i].question.clone())
            .collect()
    }
}

#[async_trait]
impl QuestionSource for InMemoryQuestionBank {
    async fn fetch_questions(
        &self,
        category: &CategoryId,
        desired_count: u32,
    ) -> Result<Vec<Question>, LoadError> {
        if !category.is_well_formed() {
            return Err(LoadError::InvalidInput(format!(
                "malformed category id '{category}'"
            )));
        }
        if desired_count == 0 {
            return Err(LoadError::InvalidInput(
                "desired question count must be > 0".into(),
            ));
        }

        let guard = self
            .categories
            .lock()
            .map_err(|e| LoadError::Unavailable(e.to_string()))?;
        let records = match guard.get(category) {
            Some(records) if !records.is_empty() => records,
            _ => return Err(LoadError::NotFound),
        };

        let count = usize::try_from(desired_count).unwrap_or(usize::MAX);
        Ok(self.pick(records, count))
    }
}

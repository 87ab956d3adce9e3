//! JSON question-bank files.
//!
//! ```json
//! { "categories": [ { "id": "rust", "name": "Rust", "questions": [
//!   { "id": "rust-1", "prompt": "...", "options": ["a", "b"], "correct_option": 1 }
//! ] } ] }
//! ```

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use quiz_core::model::{CategoryId, Question, QuestionError, QuestionId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repository::{InMemoryQuestionBank, LoadError, QuestionRecord};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BankFileError {
    #[error("failed to read question bank: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed question bank: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid category id '{raw}'")]
    InvalidCategory { raw: String },

    #[error("duplicate question id '{id}'")]
    DuplicateQuestion { id: String },

    #[error("question '{id}' is invalid: {source}")]
    InvalidQuestion {
        id: String,
        #[source]
        source: QuestionError,
    },

    #[error("question '{id}' marks option {index} correct but has {available} options")]
    CorrectOptionOutOfRange {
        id: String,
        index: usize,
        available: usize,
    },

    #[error(transparent)]
    Bank(#[from] LoadError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankFile {
    pub categories: Vec<CategoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuestionEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionEntry {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: usize,
}

impl BankFile {
    /// Read a bank from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `BankFileError::Io` or `BankFileError::Parse`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, BankFileError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// # Errors
    ///
    /// Returns `BankFileError::Parse` for malformed JSON.
    pub fn from_reader(reader: impl Read) -> Result<Self, BankFileError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// # Errors
    ///
    /// Returns `BankFileError::Parse` if serialization fails.
    pub fn to_writer(&self, writer: impl Write) -> Result<(), BankFileError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Validate every entry and load it into an in-memory bank.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure found.
    pub fn into_bank(self) -> Result<InMemoryQuestionBank, BankFileError> {
        let bank = InMemoryQuestionBank::new();
        let mut seen = HashSet::new();

        for category in self.categories {
            let id: CategoryId = category
                .id
                .parse()
                .map_err(|_| BankFileError::InvalidCategory {
                    raw: category.id.clone(),
                })?;

            let mut records = Vec::with_capacity(category.questions.len());
            for entry in category.questions {
                if !seen.insert(entry.id.clone()) {
                    return Err(BankFileError::DuplicateQuestion { id: entry.id });
                }
                records.push(entry.into_record()?);
            }
            bank.insert_category(id, records)?;
        }

        Ok(bank)
    }

    /// Small built-in bank used by `quiz sample-bank` and the tests.
    #[must_use]
    pub fn sample() -> Self {
        fn q(id: &str, prompt: &str, options: &[&str], correct_option: usize) -> QuestionEntry {
            QuestionEntry {
                id: id.to_owned(),
                prompt: prompt.to_owned(),
                options: options.iter().map(|o| (*o).to_owned()).collect(),
                correct_option,
            }
        }

        Self {
            categories: vec![
                CategoryEntry {
                    id: "rust".into(),
                    name: Some("Rust engineering".into()),
                    questions: vec![
                        q(
                            "rust-1",
                            "Which trait lets a type be moved across threads?",
                            &["Sync", "Send", "Copy", "Unpin"],
                            1,
                        ),
                        q(
                            "rust-2",
                            "What does the `?` operator do on an `Err` value?",
                            &["Panics", "Returns it early", "Ignores it", "Logs it"],
                            1,
                        ),
                        q(
                            "rust-3",
                            "Which smart pointer gives shared ownership across threads?",
                            &["Rc", "Box", "Arc", "Cell"],
                            2,
                        ),
                        q(
                            "rust-4",
                            "Which keyword marks a function as asynchronous?",
                            &["await", "async", "yield", "spawn"],
                            1,
                        ),
                        q(
                            "rust-5",
                            "What is the default integer type for an unsuffixed literal?",
                            &["i64", "u32", "i32", "isize"],
                            2,
                        ),
                    ],
                },
                CategoryEntry {
                    id: "frontend".into(),
                    name: Some("Frontend development".into()),
                    questions: vec![
                        q(
                            "fe-1",
                            "Which HTTP status code means 'Not Found'?",
                            &["200", "301", "404", "500"],
                            2,
                        ),
                        q(
                            "fe-2",
                            "Which CSS property controls text size?",
                            &["font-size", "text-weight", "size", "line-height"],
                            0,
                        ),
                        q(
                            "fe-3",
                            "Which HTML element is used for the largest heading?",
                            &["<head>", "<h6>", "<h1>", "<header>"],
                            2,
                        ),
                    ],
                },
            ],
        }
    }
}

impl QuestionEntry {
    fn into_record(self) -> Result<QuestionRecord, BankFileError> {
        let available = self.options.len();
        let correct_option = self.correct_option;
        let id = self.id;
        let question = Question::new(QuestionId::new(id.clone()), self.prompt, self.options)
            .map_err(|source| BankFileError::InvalidQuestion {
                id: id.clone(),
                source,
            })?;
        if correct_option >= available {
            return Err(BankFileError::CorrectOptionOutOfRange {
                id,
                index: correct_option,
                available,
            });
        }
        Ok(QuestionRecord::new(question, correct_option))
    }
}

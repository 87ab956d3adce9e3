#![forbid(unsafe_code)]

pub mod bank_file;
pub mod repository;

pub use bank_file::BankFile;
pub use repository::{InMemoryQuestionBank, LoadError, QuestionRecord, QuestionSource};

mod answer;
mod ids;
mod question;
mod result;

pub use answer::{ANSWER_SENTINEL, AnswerChoice, AnswerError, SubmittedAnswer};
pub use ids::{CategoryId, MAX_CATEGORY_ID_LEN, ParseIdError, QuestionId, SessionId};
pub use question::{MIN_OPTIONS, Question, QuestionError};
pub use result::{AssessmentResult, QuestionOutcome, ResultError};

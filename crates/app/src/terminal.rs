use std::fmt::Write as _;

use quiz_core::model::{AnswerChoice, AssessmentResult, SessionId};
use services::{AssessmentHooks, SessionEvent};
use tokio::sync::mpsc;

/// One line typed by the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// Zero-based option index.
    Select(usize),
    Next,
    Back,
    Submit,
    Quit,
}

impl Input {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        match line.to_ascii_lowercase().as_str() {
            "n" | "next" => Some(Self::Next),
            "b" | "back" => Some(Self::Back),
            "s" | "submit" => Some(Self::Submit),
            "q" | "quit" => Some(Self::Quit),
            _ => match line.parse::<usize>() {
                Ok(n) if (1..=9).contains(&n) => Some(Self::Select(n - 1)),
                _ => None,
            },
        }
    }
}

pub const HELP: &str = "commands: 1-9 select an option, n next, b back (ignored), s submit, q quit";

/// Prints session events to stdout and forwards the result to the input loop.
pub struct TerminalHooks {
    completed: mpsc::UnboundedSender<AssessmentResult>,
}

impl TerminalHooks {
    pub fn new(completed: mpsc::UnboundedSender<AssessmentResult>) -> Self {
        Self { completed }
    }
}

impl AssessmentHooks for TerminalHooks {
    fn on_event(&self, _session_id: SessionId, event: &SessionEvent) {
        match event {
            SessionEvent::QuestionStarted {
                index,
                total,
                question,
                remaining_ticks,
            } => {
                let mut out = format!(
                    "\nQuestion {} of {} ({remaining_ticks} ticks)\n{}\n",
                    index + 1,
                    total,
                    question.prompt()
                );
                for (i, option) in question.options().iter().enumerate() {
                    let _ = writeln!(out, "  {}. {option}", i + 1);
                }
                if index + 1 == *total {
                    out.push_str("Last question: press s to submit.\n");
                }
                print!("{out}");
            }
            SessionEvent::Tick {
                remaining_ticks, ..
            } if *remaining_ticks <= 5 || remaining_ticks % 10 == 0 => {
                println!("  ... {remaining_ticks} left");
            }
            SessionEvent::Tick { .. } => {}
            SessionEvent::TimedOut { .. } => println!("  Time's up!"),
            SessionEvent::SubmissionStarted { .. } => println!("Submitting answers..."),
            SessionEvent::SubmissionFailed { error } => {
                println!("Submission failed: {error}. Press s to try again.");
            }
            SessionEvent::Completed { .. } => {}
        }
    }

    fn on_complete(&self, _session_id: SessionId, result: &AssessmentResult) {
        let _ = self.completed.send(result.clone());
    }
}

pub fn render_result(result: &AssessmentResult) -> String {
    let mut out = format!(
        "\nScore: {:.2}% ({} of {} correct) - {}\n",
        result.score(),
        result.correct_count(),
        result.total_questions(),
        if result.passed() { "PASSED" } else { "FAILED" }
    );
    for (i, outcome) in result.per_question().iter().enumerate() {
        let answer = match outcome.selected_answer {
            AnswerChoice::Selected(option) => format!("option {}", option + 1),
            AnswerChoice::Unanswered => "no answer".to_owned(),
        };
        let mark = if outcome.is_correct { "correct" } else { "wrong" };
        let _ = writeln!(out, "  {}. {} - {answer}, {mark}", i + 1, outcome.question_id);
    }
    out
}

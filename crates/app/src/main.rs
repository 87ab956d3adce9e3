use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use quiz_core::model::CategoryId;
use services::{AnswerKeyGrader, AssessmentController, SessionError};
use storage::BankFile;
use storage::repository::LoadError;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

mod config;
mod error;
mod telemetry;
mod terminal;

use config::{AppConfig, Overrides};
use error::AppError;
use terminal::{HELP, Input, TerminalHooks, render_result};

#[derive(Parser, Debug)]
#[command(name = "quiz", about = "Timed multiple-choice assessments", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Take a timed assessment for one category
    Run(RunArgs),
    /// Write the built-in question bank as JSON
    SampleBank {
        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Category to draw questions from
    #[arg(long)]
    category: String,
    /// JSON question bank (defaults to the built-in sample)
    #[arg(long)]
    bank: Option<PathBuf>,
    /// Ticks allowed per question
    #[arg(long)]
    budget: Option<u32>,
    /// Number of questions to ask
    #[arg(long)]
    count: Option<u32>,
    /// Length of one tick in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,
    /// Score needed to pass, in percent
    #[arg(long)]
    pass_percent: Option<f64>,
    /// Keep the bank's question order
    #[arg(long)]
    no_shuffle: bool,
}

impl From<&RunArgs> for Overrides {
    fn from(args: &RunArgs) -> Self {
        Self {
            budget: args.budget,
            count: args.count,
            tick_ms: args.tick_ms,
            pass_percent: args.pass_percent,
            bank: args.bank.clone(),
            no_shuffle: args.no_shuffle,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run_cli().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("quiz: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run_cli() -> Result<ExitCode, AppError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run_assessment(args).await,
        Command::SampleBank { out } => {
            write_sample_bank(out)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn write_sample_bank(out: Option<PathBuf>) -> Result<(), AppError> {
    let bank = BankFile::sample();
    match out {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(&path)?);
            bank.to_writer(&mut writer)?;
            writer.flush()?;
            eprintln!("wrote sample bank to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            bank.to_writer(&mut stdout)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

async fn run_assessment(args: RunArgs) -> Result<ExitCode, AppError> {
    let config = AppConfig::load(&Overrides::from(&args))?;
    telemetry::init(&config.log_level)?;

    let file = match &config.bank {
        Some(path) => BankFile::from_path(path)?,
        None => BankFile::sample(),
    };
    let bank = file.into_bank()?.with_shuffle(config.shuffle);
    let grader = AnswerKeyGrader::new(bank.answer_key()?).with_pass_threshold(config.pass_percent);

    let (completed_tx, mut completed) = mpsc::unbounded_channel();
    let mut controller =
        AssessmentController::new(Arc::new(bank), Arc::new(grader), config.assessment)
            .with_hooks(Arc::new(TerminalHooks::new(completed_tx)));

    let category = CategoryId::new(args.category.trim());
    info!(%category, bank = ?config.bank, "starting assessment");
    match controller.open(&category).await {
        Ok(_) => {}
        Err(SessionError::Load(LoadError::NotFound)) => {
            println!("No questions for '{category}'; assessment skipped.");
            return Ok(ExitCode::SUCCESS);
        }
        Err(err) => return Err(err.into()),
    }
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(result) = completed.recv() => {
                print!("{}", render_result(&result));
                return Ok(ExitCode::SUCCESS);
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    controller.close().await;
                    println!("Input closed; assessment abandoned.");
                    return Ok(ExitCode::SUCCESS);
                };
                if let Some(code) = handle_input(&mut controller, &line).await? {
                    return Ok(code);
                }
            }
        }
    }
}

async fn handle_input(
    controller: &mut AssessmentController,
    line: &str,
) -> Result<Option<ExitCode>, AppError> {
    let Some(input) = Input::parse(line) else {
        println!("{HELP}");
        return Ok(None);
    };

    let outcome = match input {
        Input::Select(option) => {
            let snapshot = controller.snapshot().await?;
            controller
                .select_answer(snapshot.question.id(), option)
                .await
                .map(|()| println!("  selected {}", option + 1))
        }
        Input::Next => controller.advance().await.map(|_| ()),
        Input::Back => {
            controller.go_back().await?;
            println!("  Going back is not allowed.");
            Ok(())
        }
        Input::Submit => match controller.submit().await {
            Ok(result) => {
                print!("{}", render_result(&result));
                return Ok(Some(ExitCode::SUCCESS));
            }
            // The hooks already reported the failure.
            Err(SessionError::Grading(_)) => Ok(()),
            Err(err) => Err(err),
        },
        Input::Quit => {
            controller.close().await;
            println!("Assessment closed.");
            return Ok(Some(ExitCode::SUCCESS));
        }
    };

    if let Err(err) = outcome {
        println!("  {err}");
    }
    Ok(None)
}

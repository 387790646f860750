//! Terminal front end: logs in as the configured candidate and drives one
//! attempt from stdin until it is submitted or the user leaves.

mod commands;
mod render;

use std::io::BufRead;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::api::HttpExamApi;
use crate::attempt::{
    AttemptController, AttemptError, Confirmation, SaveOutcome, SessionEvent, SubmitOutcome,
};
use crate::cli::commands::Command;
use crate::core::config::{ConfigError, Settings};
use crate::core::{metrics, shutdown};
use crate::schemas::auth::LoginRequest;

type Input = Arc<Mutex<mpsc::Receiver<String>>>;

/// Reads stdin on a plain thread so a pending read never holds up runtime shutdown.
fn spawn_stdin_reader() -> Input {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Failed to read stdin");
                    break;
                }
            }
        }
    });
    Arc::new(Mutex::new(rx))
}

async fn next_line(input: &Input) -> Option<String> {
    input.lock().await.recv().await
}

struct StdinConfirmation {
    input: Input,
}

#[async_trait]
impl Confirmation for StdinConfirmation {
    async fn confirm(&self, prompt: &str) -> bool {
        println!("{prompt} [y/N]");
        match next_line(&self.input).await {
            Some(answer) => commands::is_affirmative(&answer),
            None => false,
        }
    }
}

pub(crate) async fn run(settings: &Settings) -> anyhow::Result<()> {
    let credentials = settings.credentials();
    let username =
        credentials.username.clone().ok_or(ConfigError::Missing("EXAM_CLIENT_USERNAME"))?;
    let password =
        credentials.password.clone().ok_or(ConfigError::Missing("EXAM_CLIENT_PASSWORD"))?;
    let exam_id = credentials.exam_id.clone().ok_or(ConfigError::Missing("EXAM_ID"))?;

    let api = HttpExamApi::new(settings.api())?;
    let context = api.login(&LoginRequest { username, password }).await?;
    let attempt_api = Arc::new(api.authenticated(&context));

    let (controller, mut events) =
        AttemptController::new(attempt_api, context, exam_id, settings.attempt().clone());
    let input = spawn_stdin_reader();
    let confirmation = StdinConfirmation { input: input.clone() };

    let load = controller.load().await;
    print_events(&mut events);
    load?;
    println!("{}", render::view(&controller.view()));
    println!("Type `help` for commands.");

    let signal = shutdown::shutdown_signal();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            _ = &mut signal => break,
            Some(event) = events.recv() => {
                if let Some(line) = render::event(&event) {
                    println!("{line}");
                }
                if matches!(event, SessionEvent::Navigate(_)) {
                    break;
                }
            }
            line = next_line(&input) => {
                let Some(line) = line else {
                    tracing::info!("Input closed, leaving exam session");
                    break;
                };
                match commands::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        if let Err(err) = execute(&controller, command, &confirmation).await {
                            println!("! {err}");
                        }
                    }
                    Err(err) => println!("! {err}"),
                }
            }
        }
    }

    controller.close();
    print_events(&mut events);
    if let Some(snapshot) = metrics::render() {
        tracing::debug!(metrics = %snapshot, "Client metrics");
    }
    Ok(())
}

async fn execute(
    controller: &Arc<AttemptController>,
    command: Command,
    confirmation: &StdinConfirmation,
) -> Result<(), AttemptError> {
    match command {
        Command::Show => {}
        Command::Grid => {
            println!("{}", render::grid(&controller.question_grid(), controller.current_index()));
            return Ok(());
        }
        Command::SaveAndNext => {
            if controller.save_and_next().await? == SaveOutcome::InFlight {
                println!("Still saving, try again in a moment.");
                return Ok(());
            }
        }
        Command::Previous => {
            controller.previous()?;
        }
        Command::GoTo(index) => controller.go_to(index)?,
        Command::Choose(option_id) => controller.set_choice(&option_id)?,
        Command::Numerical(value) => controller.set_numerical(value)?,
        Command::Clear => controller.clear()?,
        Command::Submit => {
            match controller.submit(confirmation).await? {
                SubmitOutcome::Cancelled => println!("Submission cancelled."),
                SubmitOutcome::AlreadySubmitting => println!("Submission already in progress."),
                SubmitOutcome::AlreadySubmitted => println!("Exam already submitted."),
                SubmitOutcome::Submitted { .. } | SubmitOutcome::NotActive => {}
            }
            return Ok(());
        }
        Command::Help => {
            println!("{}", commands::HELP);
            return Ok(());
        }
        Command::Quit => return Ok(()),
    }

    println!("{}", render::view(&controller.view()));
    Ok(())
}

fn print_events(events: &mut mpsc::UnboundedReceiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        if let Some(line) = render::event(&event) {
            println!("{line}");
        }
    }
}

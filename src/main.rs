use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use eyre::{Result, bail};
use log::info;

mod cli;

use cli::Cli;
use ytqa::config::{Config, ResponseMode};
use ytqa::server::{AppState, serve};
use ytqa::session::{Command, Session};
use ytqa::{answer, transcript};

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytqa.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytqa")
        .join("logs")
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let cli = Cli::parse();

    // Config file first, CLI flags take priority
    let mut config = Config::load().unwrap_or_default();
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if let Some(lang) = cli.lang {
        config.lang = lang;
    }
    if let Some(model) = cli.model {
        config.model = model;
    }
    if cli.stream {
        config.response_mode = ResponseMode::Streaming;
    }

    if cli.verbose {
        let config_path = ytqa::config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
        eprintln!("Model: {} ({:?})", config.model, config.response_mode);
    }

    let client = reqwest::Client::new();

    if cli.serve {
        return serve(AppState { client, config }).await;
    }

    let Some(url) = cli.url else {
        bail!("no URL or video ID provided\n\nUsage: ytqa <URL>\n       ytqa --serve");
    };

    run_chat(&client, &config, &url, cli.verbose).await
}

/// Interactive session: fetch the transcript, then answer questions read
/// from stdin until EOF or /quit.
async fn run_chat(client: &reqwest::Client, config: &Config, url: &str, verbose: bool) -> Result<()> {
    let mut session = Session::new();

    let Some(command) = session.submit_video(url) else {
        match session.error() {
            Some(err) => bail!(
                "{err}\n\nSupported formats:\n  https://www.youtube.com/watch?v=ID\n  https://youtu.be/ID\n  https://www.youtube.com/embed/ID\n  https://www.youtube.com/shorts/ID\n  <11-character video ID>"
            ),
            None => bail!("no URL or video ID provided"),
        }
    };
    execute(client, config, &mut session, command).await;

    let Some(text) = session.transcript() else {
        bail!(session.error().unwrap_or("transcript fetch failed").to_string());
    };

    if verbose {
        eprintln!("Transcript: {} characters", text.len());
    }
    println!("--- Transcript ---");
    println!("{}", preview(text, 500));
    println!("\nAsk a question about the video (/quit to exit).");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let question = line.trim();
        if question == "/quit" {
            break;
        }

        if let Some(command) = session.submit_question(question) {
            execute(client, config, &mut session, command).await;
            if let Some(err) = session.error() {
                eprintln!("{err}");
            } else if config.response_mode == ResponseMode::Buffered {
                if let Some(reply) = session.messages().last() {
                    println!("{}", reply.content);
                }
            }
        }
    }

    Ok(())
}

async fn execute(client: &reqwest::Client, config: &Config, session: &mut Session, command: Command) {
    match command {
        Command::FetchTranscript { generation, video_id } => {
            let result = transcript::fetch_text(client, &video_id, &config.lang).await;
            session.apply_transcript(generation, result);
        }
        Command::GenerateAnswer { generation, messages, transcript } => {
            let result = match config.response_mode {
                ResponseMode::Buffered => {
                    answer::generate(client, &config.model, &messages, &transcript).await
                }
                ResponseMode::Streaming => {
                    let result = answer::generate_streaming(
                        client,
                        &config.model,
                        &messages,
                        &transcript,
                        |chunk| {
                            print!("{chunk}");
                            let _ = io::stdout().flush();
                        },
                    )
                    .await;
                    println!();
                    result
                }
            };
            session.apply_answer(generation, result);
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}…")
}

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "ytqa",
    about = "Ask questions about a YouTube video, answered from its transcript",
    version
)]
pub struct Cli {
    /// YouTube video URL or video ID to chat about (omit with --serve)
    pub url: Option<String>,

    /// Run the HTTP API server instead of an interactive chat
    #[arg(long)]
    pub serve: bool,

    /// Address to bind the API server to
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Preferred caption language
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Chat completion model used to answer questions
    #[arg(short, long)]
    pub model: Option<String>,

    /// Stream answer tokens as they arrive
    #[arg(long)]
    pub stream: bool,

    /// Show session details on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

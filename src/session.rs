use crate::error::ApiError;
use crate::{Message, extract_video_id};

/// What the session is currently waiting on. `error` is an overlay on
/// `Idle`, not a phase of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    FetchingTranscript,
    AwaitingAnswer,
}

/// Work the driver must perform on behalf of the session. At most one
/// command is outstanding at a time; results are fed back through the
/// `apply_*` methods, tagged with the generation that produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FetchTranscript {
        generation: u64,
        video_id: String,
    },
    GenerateAnswer {
        generation: u64,
        messages: Vec<Message>,
        transcript: String,
    },
}

/// In-memory state for one interaction: the active video's transcript and
/// the conversation about it. Pure state machine, no I/O; drivers execute
/// the returned [`Command`]s and report back.
///
/// The generation counter reconciles stale completions: results from an
/// operation started before the most recent video submission are discarded.
#[derive(Debug, Default)]
pub struct Session {
    video_url: String,
    transcript: Option<String>,
    messages: Vec<Message>,
    phase: Phase,
    error: Option<String>,
    generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn video_url(&self) -> &str {
        &self.video_url
    }

    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Submit a video URL. Clears the previous transcript, conversation,
    /// and error before starting. Returns the fetch command, or `None` when
    /// the session is busy, the URL is empty, or the URL does not look like
    /// a YouTube video (in which case `error` is set).
    pub fn submit_video(&mut self, url: &str) -> Option<Command> {
        if self.phase != Phase::Idle || url.trim().is_empty() {
            return None;
        }

        self.video_url = url.trim().to_string();
        self.transcript = None;
        self.messages.clear();
        self.error = None;
        self.generation += 1;

        let Some(video_id) = extract_video_id(url) else {
            self.error = Some("Invalid YouTube URL".to_string());
            return None;
        };

        self.phase = Phase::FetchingTranscript;
        Some(Command::FetchTranscript {
            generation: self.generation,
            video_id,
        })
    }

    /// Record the outcome of a transcript fetch. Results from a superseded
    /// generation are dropped without touching state.
    pub fn apply_transcript(&mut self, generation: u64, result: Result<String, ApiError>) {
        if generation != self.generation {
            return;
        }
        self.phase = Phase::Idle;
        match result {
            Ok(text) => self.transcript = Some(text),
            Err(err) => {
                self.transcript = None;
                self.error = Some(err.to_string());
            }
        }
    }

    /// Submit a question. Only valid while idle with a transcript present.
    /// Appends the user message optimistically and returns the answer
    /// command carrying the history including that message.
    pub fn submit_question(&mut self, question: &str) -> Option<Command> {
        if self.phase != Phase::Idle {
            return None;
        }
        let transcript = self.transcript.clone()?;
        let question = question.trim();
        if question.is_empty() {
            return None;
        }

        self.error = None;
        self.messages.push(Message::user(question));
        self.phase = Phase::AwaitingAnswer;
        Some(Command::GenerateAnswer {
            generation: self.generation,
            messages: self.messages.clone(),
            transcript,
        })
    }

    /// Record the outcome of answer generation. On failure the optimistic
    /// user message stays in the history; only `error` is set.
    pub fn apply_answer(&mut self, generation: u64, result: Result<String, ApiError>) {
        if generation != self.generation {
            return;
        }
        self.phase = Phase::Idle;
        match result {
            Ok(content) => self.messages.push(Message::assistant(content)),
            Err(_) => {
                self.error = Some("Failed to generate an answer. Please try again.".to_string());
            }
        }
    }
}

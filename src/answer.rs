use futures::StreamExt;
use log::debug;

use crate::error::ApiError;
use crate::Message;

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on a given transcript. \
If the answer is not in the transcript, say you cannot find the information.";

/// Build the exact message sequence sent to the completion service:
/// the fixed system instruction, the prior history verbatim, then a final
/// user message embedding the transcript.
pub fn build_prompt(history: &[Message], transcript: &str) -> Vec<Message> {
    let mut prompt = Vec::with_capacity(history.len() + 2);
    prompt.push(Message::system(SYSTEM_PROMPT));
    prompt.extend(history.iter().cloned());
    prompt.push(Message::user(format!(
        "Here is the transcript to reference: {transcript}\n\n\
         Please provide a concise and direct answer based strictly on the transcript."
    )));
    prompt
}

fn api_key() -> Result<String, ApiError> {
    std::env::var("OPENAI_API_KEY").map_err(|_| {
        ApiError::upstream(
            "Failed to generate answer",
            "OPENAI_API_KEY environment variable not set",
        )
    })
}

/// Generate a complete answer in one call.
pub async fn generate(
    client: &reqwest::Client,
    model: &str,
    history: &[Message],
    transcript: &str,
) -> Result<String, ApiError> {
    debug!("Generating answer via {model} ({} history messages)", history.len());

    let body = serde_json::json!({
        "model": model,
        "messages": build_prompt(history, transcript),
    });

    let resp = client
        .post(COMPLETIONS_URL)
        .bearer_auth(api_key()?)
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::upstream(
            "Failed to generate answer",
            format!("completion service returned {status}: {body}"),
        ));
    }

    let json: serde_json::Value = resp.json().await?;
    extract_content(&json)
}

/// Generate an answer as a token stream. `on_chunk` is invoked once per
/// content delta, in arrival order; the accumulated final text is returned
/// and equals what [`generate`] would have produced.
pub async fn generate_streaming(
    client: &reqwest::Client,
    model: &str,
    history: &[Message],
    transcript: &str,
    mut on_chunk: impl FnMut(&str),
) -> Result<String, ApiError> {
    debug!("Streaming answer via {model} ({} history messages)", history.len());

    let body = serde_json::json!({
        "model": model,
        "messages": build_prompt(history, transcript),
        "stream": true,
    });

    let resp = client
        .post(COMPLETIONS_URL)
        .bearer_auth(api_key()?)
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::upstream(
            "Failed to generate answer",
            format!("completion service returned {status}: {body}"),
        ));
    }

    let mut stream = resp.bytes_stream();
    let mut lines = LineBuffer::default();
    let mut answer = String::new();

    'outer: while let Some(chunk) = stream.next().await {
        lines.push(&chunk?);

        while let Some(line) = lines.next_line() {
            match parse_sse_line(&line) {
                Some(SseEvent::Done) => break 'outer,
                Some(SseEvent::Delta(text)) => {
                    answer.push_str(&text);
                    on_chunk(&text);
                }
                None => {}
            }
        }
    }

    if answer.is_empty() {
        return Err(ApiError::upstream(
            "Failed to generate answer",
            "completion stream carried no content",
        ));
    }
    Ok(answer)
}

/// Accumulates raw response bytes and yields complete lines. Network chunks
/// can split a multi-byte character; decoding happens only once a line is
/// terminated, so the partial codepoint waits in the buffer intact.
#[derive(Default)]
struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    fn next_line(&mut self) -> Option<String> {
        let pos = self.bytes.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.bytes.drain(..=pos).collect();
        Some(String::from_utf8_lossy(&line[..pos]).into_owned())
    }
}

enum SseEvent {
    Delta(String),
    Done,
}

fn parse_sse_line(line: &str) -> Option<SseEvent> {
    let data = line.strip_prefix("data:")?.trim();
    if data == "[DONE]" {
        return Some(SseEvent::Done);
    }
    let json: serde_json::Value = serde_json::from_str(data).ok()?;
    json.get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
        .map(|s| SseEvent::Delta(s.to_string()))
}

fn extract_content(json: &serde_json::Value) -> Result<String, ApiError> {
    if let Some(text) = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
    {
        return Ok(text.to_string());
    }
    Err(ApiError::upstream(
        "Failed to generate answer",
        "unexpected completion service response format",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    #[test]
    fn test_build_prompt_ordering() {
        let history = vec![
            Message::user("What color is the sky?"),
            Message::assistant("The sky is blue."),
            Message::user("Is that mentioned twice?"),
        ];
        let prompt = build_prompt(&history, "The sky is blue.");

        assert_eq!(prompt.len(), 5);
        assert_eq!(prompt[0].role, Role::System);
        assert_eq!(prompt[0].content, SYSTEM_PROMPT);
        assert_eq!(prompt[1..4], history[..]);
        assert_eq!(prompt[4].role, Role::User);
        assert!(prompt[4].content.contains("The sky is blue."));
        assert!(prompt[4].content.starts_with("Here is the transcript to reference:"));
    }

    #[test]
    fn test_build_prompt_empty_history() {
        let prompt = build_prompt(&[], "some transcript");
        assert_eq!(prompt.len(), 2);
        assert_eq!(prompt[0].role, Role::System);
        assert!(prompt[1].content.contains("some transcript"));
    }

    #[test]
    fn test_extract_content() {
        let json = serde_json::json!({
            "choices": [
                {"message": {"role": "assistant", "content": "The sky is blue."}}
            ]
        });
        assert_eq!(extract_content(&json).unwrap(), "The sky is blue.");
    }

    #[test]
    fn test_extract_content_no_choices() {
        let json = serde_json::json!({"choices": []});
        assert!(extract_content(&json).is_err());
    }

    #[test]
    fn test_extract_content_malformed() {
        let json = serde_json::json!({"unexpected": true});
        assert!(extract_content(&json).is_err());
    }

    #[test]
    fn test_parse_sse_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        match parse_sse_line(line) {
            Some(SseEvent::Delta(text)) => assert_eq!(text, "Hel"),
            _ => panic!("expected a delta"),
        }
    }

    #[test]
    fn test_parse_sse_done() {
        assert!(matches!(parse_sse_line("data: [DONE]"), Some(SseEvent::Done)));
    }

    #[test]
    fn test_line_buffer_yields_complete_lines() {
        let mut lines = LineBuffer::default();
        lines.push(b"data: one\nda");
        assert_eq!(lines.next_line().as_deref(), Some("data: one"));
        assert!(lines.next_line().is_none());
        lines.push(b"ta: two\n");
        assert_eq!(lines.next_line().as_deref(), Some("data: two"));
    }

    #[test]
    fn test_streaming_chunks_split_mid_codepoint() {
        // Chunk boundaries from the network can land anywhere, including
        // inside a multi-byte character; every split must reassemble to
        // the same text.
        let event = "data: {\"choices\":[{\"delta\":{\"content\":\"café\"}}]}\ndata: [DONE]\n".as_bytes();
        for split in 1..event.len() {
            let mut lines = LineBuffer::default();
            let mut answer = String::new();
            for chunk in [&event[..split], &event[split..]] {
                lines.push(chunk);
                while let Some(line) = lines.next_line() {
                    if let Some(SseEvent::Delta(text)) = parse_sse_line(&line) {
                        answer.push_str(&text);
                    }
                }
            }
            assert_eq!(answer, "café", "split at byte {split}");
        }
    }

    #[test]
    fn test_parse_sse_ignores_noise() {
        assert!(parse_sse_line("").is_none());
        assert!(parse_sse_line(": keepalive").is_none());
        // role-only delta carries no content
        assert!(parse_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#).is_none());
    }
}

// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Newline-delimited JSON chat stream parser.
//!
//! Each line of a streaming `/api/chat` body is one [`ChatChunk`]. Lines can
//! be split across network reads, so bytes are buffered until a newline
//! arrives. A line with `done: true` ends the stream; a line with `error`
//! yields one error and ends it.

use std::fmt::Display;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use mnemo_core::types::FragmentStream;
use mnemo_core::MnemoError;
use tracing::debug;

use crate::types::ChatChunk;

struct LineReader<S> {
    bytes: Pin<Box<S>>,
    buf: Vec<u8>,
    finished: bool,
}

/// Turns a chat response body into a stream of content fragments.
pub fn chat_fragments<S, E>(bytes: S) -> FragmentStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let reader = LineReader {
        bytes: Box::pin(bytes),
        buf: Vec::new(),
        finished: false,
    };

    Box::pin(stream::unfold(reader, |mut reader| async move {
        loop {
            if reader.finished {
                return None;
            }

            let line = match reader.buf.iter().position(|b| *b == b'\n') {
                Some(end) => Some(reader.buf.drain(..=end).collect::<Vec<u8>>()),
                None => match reader.bytes.next().await {
                    Some(Ok(chunk)) => {
                        reader.buf.extend_from_slice(&chunk);
                        None
                    }
                    Some(Err(e)) => {
                        reader.finished = true;
                        return Some((
                            Err(MnemoError::Provider {
                                message: format!("chat stream read failed: {e}"),
                                source: None,
                            }),
                            reader,
                        ));
                    }
                    None => {
                        // Body ended; whatever is buffered is the last line.
                        reader.finished = true;
                        Some(std::mem::take(&mut reader.buf))
                    }
                },
            };

            let Some(line) = line else { continue };
            match parse_line(&line) {
                Ok(None) => continue,
                Ok(Some(chunk)) => {
                    if let Some(error) = chunk.error {
                        reader.finished = true;
                        return Some((
                            Err(MnemoError::Provider {
                                message: error,
                                source: None,
                            }),
                            reader,
                        ));
                    }
                    if chunk.done {
                        debug!("chat stream done");
                        reader.finished = true;
                    }
                    match chunk.message.map(|m| m.content).filter(|c| !c.is_empty()) {
                        Some(content) => return Some((Ok(content), reader)),
                        None => continue,
                    }
                }
                Err(e) => {
                    reader.finished = true;
                    return Some((Err(e), reader));
                }
            }
        }
    }))
}

/// Parses one line. Blank lines yield `None`.
fn parse_line(line: &[u8]) -> Result<Option<ChatChunk>, MnemoError> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    serde_json::from_str::<ChatChunk>(text)
        .map(Some)
        .map_err(|e| MnemoError::Provider {
            message: format!("malformed chat stream line: {e}"),
            source: Some(Box::new(e)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fragments_of(chunks: &[&str]) -> Vec<Result<String, MnemoError>> {
        let owned: Vec<Result<Bytes, std::io::Error>> = chunks
            .iter()
            .map(|c| Ok(Bytes::from(c.to_string())))
            .collect();
        chat_fragments(stream::iter(owned)).collect().await
    }

    fn line(content: &str, done: bool) -> String {
        format!(
            "{}\n",
            serde_json::json!({"message": {"role": "assistant", "content": content}, "done": done})
        )
    }

    #[tokio::test]
    async fn yields_content_per_line() {
        let body = [line("Hel", false), line("lo", false), line("", true)].concat();
        let out = fragments_of(&[body.as_str()]).await;
        let texts: Vec<String> = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn lines_split_across_reads() {
        let body = [line("<think>", false), line("ok", true)].concat();
        let (a, b) = body.split_at(10);
        let (b, c) = b.split_at(7);
        let out = fragments_of(&[a, b, c]).await;
        let texts: Vec<String> = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["<think>", "ok"]);
    }

    #[tokio::test]
    async fn stops_after_done() {
        let body = [line("a", true), line("ignored", false)].concat();
        let out = fragments_of(&[body.as_str()]).await;
        assert_eq!(out.len(), 1);
    }

    #[tokio::test]
    async fn error_line_ends_stream() {
        let body = format!("{}{{\"error\":\"model not found\"}}\n{}", line("a", false), line("b", false));
        let out = fragments_of(&[body.as_str()]).await;
        assert_eq!(out.len(), 2);
        assert!(out[0].is_ok());
        let err = out[1].as_ref().unwrap_err().to_string();
        assert!(err.contains("model not found"));
    }

    #[tokio::test]
    async fn final_line_without_newline() {
        let body = line("tail", false);
        let out = fragments_of(&[body.trim_end()]).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), "tail");
    }

    #[tokio::test]
    async fn garbage_line_is_an_error() {
        let out = fragments_of(&["not json\n"]).await;
        assert_eq!(out.len(), 1);
        assert!(out[0].is_err());
    }

    #[tokio::test]
    async fn read_error_is_surfaced() {
        let items: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from(line("a", false))),
            Err(std::io::Error::other("reset")),
        ];
        let out: Vec<_> = chat_fragments(stream::iter(items)).collect().await;
        assert_eq!(out.len(), 2);
        assert!(out[1].is_err());
    }
}

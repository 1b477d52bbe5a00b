use std::collections::VecDeque;

use tokio_util::sync::CancellationToken;

use crate::core::config::GenParams;
use crate::core::models;
use crate::core::session::{SessionState, StartError};
use crate::core::stream::StreamEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    /// App-generated notices: stop confirmations, network faults,
    /// preflight rejections.
    Notice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Handle for a generation the caller still has to spawn: the prompt that
/// was accepted plus the cancellation token and stream id minted for it.
pub struct PendingGeneration {
    pub prompt: String,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

/// Application state, free of any UI toolkit. The terminal layer renders
/// from it and routes input into it; the generation task talks to it only
/// through [`StreamEvent`]s applied on the UI task.
pub struct App {
    pub messages: VecDeque<Message>,
    pub model: String,
    pub params: GenParams,
    pub session: SessionState,
    pub scroll_offset: u16,
    pub auto_scroll: bool,
    current_response: String,
    malformed_lines: u64,
}

impl App {
    pub fn new(model: String, params: GenParams) -> Self {
        Self {
            messages: VecDeque::new(),
            model,
            params,
            session: SessionState::default(),
            scroll_offset: 0,
            auto_scroll: true,
            current_response: String::new(),
            malformed_lines: 0,
        }
    }

    /// Preflight a send. On success the user message and an empty
    /// assistant message are queued and the session becomes active; on
    /// failure nothing changes and the caller surfaces the error.
    pub fn try_send(
        &mut self,
        prompt: String,
        has_api_key: bool,
    ) -> Result<PendingGeneration, StartError> {
        if !has_api_key {
            return Err(StartError::CredentialMissing);
        }

        let (cancel_token, stream_id) = self.session.begin()?;

        self.messages.push_back(Message {
            role: Role::User,
            content: prompt.clone(),
        });
        self.messages.push_back(Message {
            role: Role::Assistant,
            content: String::new(),
        });
        self.current_response.clear();

        Ok(PendingGeneration {
            prompt,
            cancel_token,
            stream_id,
        })
    }

    /// Apply one event from the generation channel. Events tagged with a
    /// superseded stream id are dropped.
    pub fn apply_event(&mut self, event: StreamEvent, stream_id: u64) {
        if !self.session.accepts(stream_id) {
            tracing::debug!(stream_id, "dropping event from superseded stream");
            return;
        }

        match event {
            StreamEvent::Token(token) => self.append_to_response(&token),
            StreamEvent::Malformed(line) => {
                self.malformed_lines += 1;
                tracing::debug!(%line, "skipped malformed stream line");
            }
            StreamEvent::Done => self.session.finish(stream_id),
            StreamEvent::NetworkError(message) => {
                self.push_notice(format!("Network error: {message}"));
                self.session.finish(stream_id);
            }
        }
    }

    /// Cooperatively stop the active generation. Returns false when
    /// nothing was streaming.
    pub fn request_stop(&mut self) -> bool {
        if self.session.request_stop() {
            self.push_notice("Generation stopped.".to_string());
            true
        } else {
            false
        }
    }

    pub fn push_notice(&mut self, content: String) {
        self.messages.push_back(Message {
            role: Role::Notice,
            content,
        });
    }

    pub fn cycle_model(&mut self) {
        self.model = models::next_model(&self.model).id;
    }

    pub fn malformed_line_count(&self) -> u64 {
        self.malformed_lines
    }

    fn append_to_response(&mut self, token: &str) {
        self.current_response.push_str(token);
        if let Some(last) = self.messages.back_mut() {
            if last.role == Role::Assistant {
                last.content = self.current_response.clone();
            }
        }
    }

    /// Unwrapped line count of the scrollback, matching what the renderer
    /// produces: each message's lines plus one blank spacer.
    pub fn display_line_count(&self) -> usize {
        self.messages
            .iter()
            .map(|msg| {
                if msg.content.is_empty() {
                    1
                } else {
                    msg.content.lines().count() + 1
                }
            })
            .sum()
    }

    pub fn max_scroll_offset(&self, available_height: u16) -> u16 {
        let total_lines = self.display_line_count() as u16;
        total_lines.saturating_sub(available_height)
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.auto_scroll = false;
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16, available_height: u16) {
        let max_offset = self.max_scroll_offset(available_height);
        self.scroll_offset = self.scroll_offset.saturating_add(lines).min(max_offset);
        if self.scroll_offset >= max_offset {
            self.auto_scroll = true;
        }
    }

    /// Pin the viewport to the bottom while auto-scroll is engaged.
    pub fn follow_tail(&mut self, available_height: u16) {
        if self.auto_scroll {
            self.scroll_offset = self.max_scroll_offset(available_height);
        }
    }
}

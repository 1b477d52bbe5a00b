use std::fmt;

use tokio_util::sync::CancellationToken;

/// Why a generation could not start. Checked before any worker is spawned,
/// so a rejected send leaves no state to clean up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    /// A generation is already streaming.
    AlreadyActive,
    /// No API key is configured for the primary provider.
    CredentialMissing,
}

impl fmt::Display for StartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartError::AlreadyActive => {
                write!(f, "a response is already streaming; stop it first")
            }
            StartError::CredentialMissing => {
                write!(f, "no API key configured; run `parley auth` first")
            }
        }
    }
}

impl std::error::Error for StartError {}

/// Guards the one-generation-at-a-time lifecycle.
///
/// `begin` hands out the cancellation token and stream id for a new
/// generation, or refuses while one is active. Stream ids let the consumer
/// ignore events from a generation that was stopped before its task noticed.
#[derive(Default)]
pub struct SessionState {
    active: bool,
    cancel_token: Option<CancellationToken>,
    current_stream_id: u64,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn current_stream_id(&self) -> u64 {
        self.current_stream_id
    }

    /// Start a new generation. Fails without any state change while one is
    /// already active.
    pub fn begin(&mut self) -> Result<(CancellationToken, u64), StartError> {
        if self.active {
            return Err(StartError::AlreadyActive);
        }

        self.active = true;
        self.current_stream_id += 1;
        let token = CancellationToken::new();
        self.cancel_token = Some(token.clone());
        Ok((token, self.current_stream_id))
    }

    /// Cooperatively cancel the active generation and return to idle.
    /// Returns false when nothing was running.
    pub fn request_stop(&mut self) -> bool {
        match self.cancel_token.take() {
            Some(token) => {
                token.cancel();
                self.active = false;
                true
            }
            None => false,
        }
    }

    /// Mark the generation with `stream_id` finished. Completions from a
    /// superseded stream are ignored.
    pub fn finish(&mut self, stream_id: u64) {
        if stream_id == self.current_stream_id {
            self.active = false;
            self.cancel_token = None;
        }
    }

    /// True when events tagged with `stream_id` belong to the generation
    /// this session currently cares about.
    pub fn accepts(&self, stream_id: u64) -> bool {
        stream_id == self.current_stream_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_rejects_while_active() {
        let mut session = SessionState::default();
        let (_token, first_id) = session.begin().expect("first begin succeeds");

        assert_eq!(session.begin(), Err(StartError::AlreadyActive));
        // The rejected attempt must not have touched the stream id.
        assert_eq!(session.current_stream_id(), first_id);
        assert!(session.is_active());
    }

    #[test]
    fn finish_returns_to_idle_and_allows_restart() {
        let mut session = SessionState::default();
        let (_token, id) = session.begin().expect("begin succeeds");
        session.finish(id);

        assert!(!session.is_active());
        let (_token, next_id) = session.begin().expect("restart succeeds");
        assert_eq!(next_id, id + 1);
    }

    #[test]
    fn stale_finish_is_ignored() {
        let mut session = SessionState::default();
        let (_token, first_id) = session.begin().expect("begin succeeds");
        session.request_stop();
        let (_token, second_id) = session.begin().expect("restart succeeds");

        session.finish(first_id);
        assert!(session.is_active(), "stale completion must not end the new stream");
        assert!(session.accepts(second_id));
        assert!(!session.accepts(first_id));
    }

    #[test]
    fn request_stop_cancels_token_and_idles() {
        let mut session = SessionState::default();
        let (token, _id) = session.begin().expect("begin succeeds");

        assert!(session.request_stop());
        assert!(token.is_cancelled());
        assert!(!session.is_active());
        assert!(!session.request_stop(), "second stop is a no-op");
    }
}

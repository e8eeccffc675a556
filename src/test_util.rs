// Test doubles shared by unit tests, integration tests and front-end crates.

use crate::endpoint::PageLocation;
use crate::error::LiveScoreError;
use crate::updater::{FallbackRequest, FormPoster, MatchSocket, PageEnvironment};


pub const SAMPLE_HOST: &str = "cricket.example.org";
pub const SAMPLE_PATH: &str = "/tournament/match/42/live";

pub fn sample_location() -> PageLocation { PageLocation::new(false, SAMPLE_HOST, SAMPLE_PATH) }

pub fn sample_environment() -> PageEnvironment {
    PageEnvironment {
        socket_supported: true,
        has_home_score: true,
        declared_match_id: None,
        location: sample_location(),
    }
}

#[derive(Default, Debug)]
pub struct RecordingSocket {
    pub sent: Vec<String>,
    pub attempts: usize,
    pub fail: bool,
    pub closing: bool,
}

impl RecordingSocket {
    pub fn failing() -> Self { RecordingSocket { fail: true, ..Self::default() } }
    // Socket that the transport already reports as closing.
    pub fn not_ready() -> Self { RecordingSocket { closing: true, ..Self::default() } }
}

impl MatchSocket for RecordingSocket {
    fn send_text(&mut self, text: String) -> Result<(), LiveScoreError> {
        self.attempts += 1;
        if self.fail {
            return Err(LiveScoreError::SocketSend("socket is closing".to_owned()));
        }
        self.sent.push(text);
        Ok(())
    }

    fn is_ready(&self) -> bool { !self.closing }
}

#[derive(Default, Debug)]
pub struct RecordingPoster {
    pub requests: Vec<FallbackRequest>,
}

impl FormPoster for RecordingPoster {
    fn post_form(&mut self, request: FallbackRequest) { self.requests.push(request); }
}

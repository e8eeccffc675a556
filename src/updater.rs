// Live match updater: keeps a match page in sync with the score pushed over a WebSocket and
// relays the score-update form back, falling back to a plain POST when the socket can't be
// used.
//
// The updater does no I/O. Front-ends feed it transport events (`on_open`, `on_message`,
// `on_error`, `on_close`, `reconnect`) and hand it capabilities to act through
// (`ScoreBoard`, `MatchSocket`, `FormPoster`).

use std::time::Duration;

use log::{error, info, warn};

use crate::display::ScoreBoard;
use crate::endpoint::PageLocation;
use crate::error::LiveScoreError;
use crate::event::{FormSubmission, ScoreUpdate};
use crate::form::FormFields;
use crate::internal_error_message;
use crate::match_id::{MatchId, resolve_match_id};
use crate::reconnect::{ReconnectDecision, ReconnectPolicy, ReconnectTracker};


pub trait MatchSocket {
    // Queues one text frame. An error means the frame was not sent.
    fn send_text(&mut self, text: String) -> Result<(), LiveScoreError>;

    // Whether the transport itself considers the socket open. Can lag behind `on_close`.
    fn is_ready(&self) -> bool { true }
}

pub trait FormPoster {
    // Fire and forget: failures are reported by the implementation itself.
    fn post_form(&mut self, request: FallbackRequest);
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FallbackRequest {
    // Absolute URL, for clients that are not a page.
    pub url: String,
    // Path relative to the page origin, for clients that are.
    pub path: String,
    // `application/x-www-form-urlencoded`
    pub body: String,
}

// What the page offers at initialization time.
#[derive(Clone, Debug)]
pub struct PageEnvironment {
    pub socket_supported: bool,
    pub has_home_score: bool,
    pub declared_match_id: Option<String>,
    pub location: PageLocation,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CloseInfo {
    pub was_clean: bool,
    pub code: Option<u16>,
    pub reason: String,
}

impl CloseInfo {
    pub fn clean(reason: impl Into<String>) -> Self {
        CloseInfo { was_clean: true, code: Some(1000), reason: reason.into() }
    }
    pub fn unclean(reason: impl Into<String>) -> Self {
        CloseInfo { was_clean: false, code: None, reason: reason.into() }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConnectionState {
    Connecting,
    Open,
    // Terminal for this updater.
    ClosedClean,
    // Waiting for the reconnect timer, or given up if no reconnect is pending.
    ClosedUnclean,
}

#[must_use]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CloseOutcome {
    // Clean closure. Nothing more will happen.
    Finished,
    // Caller must call `reconnect` once after `delay`.
    Reconnect { attempt: u32, delay: Duration },
    // A reconnect is already scheduled.
    AlreadyPending,
    GaveUp { attempts: u32 },
}

#[must_use]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SubmitOutcome {
    SentOverSocket,
    PostedAfterSendFailure,
    PostedWhileClosed,
}

impl SubmitOutcome {
    pub fn used_fallback(self) -> bool { self != SubmitOutcome::SentOverSocket }
}

pub struct LiveMatchUpdater {
    match_id: MatchId,
    location: PageLocation,
    state: ConnectionState,
    reconnect: ReconnectTracker,
}

impl LiveMatchUpdater {
    // Returns `None` when the page is not a live match page: no socket support, no score
    // display, or no way to tell which match it is. This is not an error.
    pub fn activate(env: PageEnvironment, policy: ReconnectPolicy) -> Option<Self> {
        if !env.socket_supported || !env.has_home_score {
            return None;
        }
        let match_id = resolve_match_id(env.declared_match_id.as_deref(), &env.location.path)?;
        let updater = LiveMatchUpdater {
            match_id,
            location: env.location,
            state: ConnectionState::Connecting,
            reconnect: ReconnectTracker::new(policy),
        };
        info!("Connecting to match {} at {}", updater.match_id, updater.socket_url());
        Some(updater)
    }

    pub fn match_id(&self) -> &MatchId { &self.match_id }
    pub fn location(&self) -> &PageLocation { &self.location }
    pub fn state(&self) -> ConnectionState { self.state }
    pub fn is_open(&self) -> bool { self.state == ConnectionState::Open }
    pub fn reconnect_attempts(&self) -> u32 { self.reconnect.attempts() }

    pub fn socket_url(&self) -> String { self.location.socket_url(&self.match_id) }

    pub fn fallback_request(&self, fields: &FormFields) -> FallbackRequest {
        FallbackRequest {
            url: self.location.fallback_url(),
            path: self.location.fallback_path(),
            body: fields.to_urlencoded(),
        }
    }

    pub fn on_open(&mut self) {
        if self.state != ConnectionState::Connecting {
            warn!("Match socket opened in state {:?}", self.state);
        }
        info!("Match socket for match {} is open", self.match_id);
        self.state = ConnectionState::Open;
        self.reconnect.on_open();
    }

    // Applies one inbound frame. A bad payload is logged and leaves the board untouched.
    // Returns the number of slots written.
    pub fn on_message(&mut self, payload: &str, board: &mut dyn ScoreBoard) -> usize {
        match ScoreUpdate::parse(payload) {
            Ok(update) => apply_score_update(&update, board),
            Err(err) => {
                error!("Error processing match socket message: {}", err);
                0
            }
        }
    }

    pub fn on_error(&mut self, description: &str) {
        warn!("Match socket error: {}", description);
    }

    pub fn on_close(&mut self, close: &CloseInfo) -> CloseOutcome {
        if self.state == ConnectionState::ClosedClean {
            warn!("Match socket close after clean close ignored: {:?}", close);
            return CloseOutcome::Finished;
        }
        if close.was_clean {
            info!("Match socket closed: {}", close.reason);
            self.state = ConnectionState::ClosedClean;
            return CloseOutcome::Finished;
        }
        error!("Match socket closed unexpectedly: {}", close.reason);
        self.state = ConnectionState::ClosedUnclean;
        match self.reconnect.on_unclean_close() {
            ReconnectDecision::After { attempt, delay } => {
                info!("Reconnecting in {:?} (attempt {})", delay, attempt);
                CloseOutcome::Reconnect { attempt, delay }
            }
            ReconnectDecision::AlreadyPending => CloseOutcome::AlreadyPending,
            ReconnectDecision::GiveUp { attempts } => {
                error!("Giving up on match {} after {} reconnect attempts", self.match_id, attempts);
                CloseOutcome::GaveUp { attempts }
            }
        }
    }

    // Called by the reconnect timer. Returns the URL to connect to, or `None` if no reconnect
    // was scheduled.
    pub fn reconnect(&mut self) -> Option<String> {
        if self.state != ConnectionState::ClosedUnclean || !self.reconnect.take_pending() {
            error!("{}", internal_error_message!("unexpected reconnect in state {:?}", self.state));
            return None;
        }
        self.state = ConnectionState::Connecting;
        let url = self.socket_url();
        info!("Reconnecting to {}", url);
        Some(url)
    }

    pub fn submit_form(
        &mut self, fields: &FormFields, socket: &mut dyn MatchSocket, poster: &mut dyn FormPoster,
    ) -> SubmitOutcome {
        if !self.is_open() || !socket.is_ready() {
            poster.post_form(self.fallback_request(fields));
            return SubmitOutcome::PostedWhileClosed;
        }
        let sent = FormSubmission::new(fields).to_json().and_then(|text| socket.send_text(text));
        match sent {
            Ok(()) => SubmitOutcome::SentOverSocket,
            Err(err) => {
                error!("Error sending match socket message: {}", err);
                poster.post_form(self.fallback_request(fields));
                SubmitOutcome::PostedAfterSendFailure
            }
        }
    }
}

// Writes every present field, in `ScoreField` order. Absent fields keep what the board shows.
pub fn apply_score_update(update: &ScoreUpdate, board: &mut dyn ScoreBoard) -> usize {
    let mut written = 0;
    for (field, text) in update.iter_present() {
        board.set_text(field, &text);
        written += 1;
    }
    written
}

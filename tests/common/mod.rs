// Rust-upgrade (https://github.com/rust-lang/rust/issues/46379):
//   remove `#[allow(dead_code)]` before public functions.

use live_score::reconnect::ReconnectPolicy;
use live_score::test_util::{RecordingPoster, RecordingSocket, sample_environment};
use live_score::{
    CloseInfo, CloseOutcome, FormFields, LiveMatchUpdater, PageEnvironment, ScoreBoardState,
    ScoreField, SubmitOutcome,
};


// A match page with its live updater and recording doubles for every capability.
pub struct LivePage {
    pub updater: LiveMatchUpdater,
    pub board: ScoreBoardState,
    pub socket: RecordingSocket,
    pub poster: RecordingPoster,
}

impl LivePage {
    #[allow(dead_code)]
    pub fn new() -> Self { Self::with_environment(sample_environment(), ReconnectPolicy::default()) }

    #[allow(dead_code)]
    pub fn with_environment(env: PageEnvironment, policy: ReconnectPolicy) -> Self {
        LivePage {
            updater: LiveMatchUpdater::activate(env, policy).expect("page should activate"),
            board: ScoreBoardState::new(),
            socket: RecordingSocket::default(),
            poster: RecordingPoster::default(),
        }
    }

    #[allow(dead_code)]
    pub fn open(mut self) -> Self {
        self.updater.on_open();
        self
    }

    #[allow(dead_code)]
    pub fn receive(&mut self, payload: &str) -> usize {
        self.updater.on_message(payload, &mut self.board)
    }

    #[allow(dead_code)]
    pub fn submit(&mut self, form: &str) -> SubmitOutcome {
        let fields = FormFields::parse_urlencoded(form);
        self.updater.submit_form(&fields, &mut self.socket, &mut self.poster)
    }

    #[allow(dead_code)]
    pub fn drop_connection(&mut self, reason: &str) -> CloseOutcome {
        self.updater.on_close(&CloseInfo::unclean(reason))
    }

    #[allow(dead_code)]
    pub fn text(&self, field: ScoreField) -> Option<&str> { self.board.get(field) }

    // Sets every slot to a known value, the way the server-rendered page starts out.
    #[allow(dead_code)]
    pub fn prefill(&mut self) {
        self.receive(
            r#"{"home_score": 100, "away_score": 90, "current_batsman": "Kohli",
                "current_bowler": "Starc", "balls_remaining": 30, "innings": "1st"}"#,
        );
    }
}

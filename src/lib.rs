#![forbid(unsafe_code)]
#![cfg_attr(feature = "strict", deny(warnings))]

pub mod display;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod form;
pub mod match_id;
pub mod reconnect;
pub mod test_util;
pub mod updater;
pub mod util;

pub use display::{ScoreBoard, ScoreBoardState, ScoreField};
pub use endpoint::PageLocation;
pub use error::LiveScoreError;
pub use event::{FormSubmission, ScoreUpdate};
pub use form::FormFields;
pub use match_id::MatchId;
pub use reconnect::{Backoff, ReconnectPolicy};
pub use updater::{
    CloseInfo, CloseOutcome, ConnectionState, FallbackRequest, FormPoster, LiveMatchUpdater,
    MatchSocket, PageEnvironment, SubmitOutcome,
};

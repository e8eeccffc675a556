use enum_map::{Enum, EnumMap};
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};


// Display slots of a live match page. Declaration order is the order in which fields of a
// score update are applied.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Enum, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ScoreField {
    HomeScore,
    AwayScore,
    CurrentBatsman,
    CurrentBowler,
    BallsRemaining,
    Innings,
}

impl ScoreField {
    // Id of the page element showing this field.
    pub fn element_id(self) -> &'static str { self.into() }

    // Key of this field in an inbound score update.
    pub fn wire_key(self) -> &'static str {
        match self {
            ScoreField::HomeScore => "home_score",
            ScoreField::AwayScore => "away_score",
            ScoreField::CurrentBatsman => "current_batsman",
            ScoreField::CurrentBowler => "current_bowler",
            ScoreField::BallsRemaining => "balls_remaining",
            ScoreField::Innings => "innings",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreField::HomeScore => "Home",
            ScoreField::AwayScore => "Away",
            ScoreField::CurrentBatsman => "Batsman",
            ScoreField::CurrentBowler => "Bowler",
            ScoreField::BallsRemaining => "Balls left",
            ScoreField::Innings => "Innings",
        }
    }
}

// Whatever shows the score to the user: DOM elements in the browser, a terminal panel in the
// console client, a plain map in tests.
pub trait ScoreBoard {
    fn set_text(&mut self, field: ScoreField, text: &str);
}

// In-memory score board. `None` means the slot was never written.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct ScoreBoardState {
    slots: EnumMap<ScoreField, Option<String>>,
    revision: u64,
}

impl ScoreBoardState {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, field: ScoreField) -> Option<&str> { self.slots[field].as_deref() }

    // Increases on every write. Lets renderers skip repaints when nothing changed.
    pub fn revision(&self) -> u64 { self.revision }

    pub fn iter(&self) -> impl Iterator<Item = (ScoreField, Option<&str>)> + '_ {
        ScoreField::iter().map(|field| (field, self.get(field)))
    }
}

impl ScoreBoard for ScoreBoardState {
    fn set_text(&mut self, field: ScoreField, text: &str) {
        self.slots[field] = Some(text.to_owned());
        self.revision += 1;
    }
}

use std::io::{self, Write};

use crossterm::style::{StyledContent, Stylize};
use crossterm::{execute, style};
use live_score::{ConnectionState, ScoreBoardState, ScoreField};


const NO_VALUE: &str = "–";

fn styled_value(field: ScoreField, text: Option<&str>) -> StyledContent<String> {
    let text = text.filter(|t| !t.is_empty()).unwrap_or(NO_VALUE).to_owned();
    match field {
        ScoreField::HomeScore | ScoreField::AwayScore => text.bold(),
        _ => text.white(),
    }
}

fn styled_state(state: ConnectionState) -> StyledContent<&'static str> {
    match state {
        ConnectionState::Connecting => "connecting".yellow(),
        ConnectionState::Open => "live".green(),
        ConnectionState::ClosedClean => "closed".dark_grey(),
        ConnectionState::ClosedUnclean => "offline".red(),
    }
}

// Plain-text version of the board, one `Label: value` pair per slot.
pub fn render_plain(board: &ScoreBoardState) -> String {
    board
        .iter()
        .map(|(field, text)| {
            let text = text.filter(|t| !t.is_empty()).unwrap_or(NO_VALUE);
            format!("{}: {}", field.label(), text)
        })
        .collect::<Vec<_>>()
        .join("  |  ")
}

pub fn print_board(
    stdout: &mut io::Stdout, board: &ScoreBoardState, state: ConnectionState,
) -> io::Result<()> {
    execute!(stdout, style::Print(format!("[{}] ", styled_state(state))))?;
    for (i, (field, text)) in board.iter().enumerate() {
        if i > 0 {
            execute!(stdout, style::Print("  |  ".dark_grey()))?;
        }
        execute!(
            stdout,
            style::Print(format!("{}: ", field.label()).dark_grey()),
            style::Print(styled_value(field, text)),
        )?;
    }
    writeln!(stdout)?;
    stdout.flush()
}

//! Translates typed lines into world commands for the current screen.

use num_craze_core::{Command, Digit, Operator, Screen};

/// A character that is neither a digit, an operator nor `=`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct UnknownSymbol(pub(crate) char);

/// Parses one line of player input.
///
/// On the playing screen a line may chain several presses, e.g. `6+4x4+7=`.
pub(crate) fn parse_line(line: &str, screen: Screen) -> Result<Vec<Command>, UnknownSymbol> {
    let line = line.trim();
    if line.eq_ignore_ascii_case("quit") {
        return Ok(vec![Command::Dispose]);
    }

    match screen {
        Screen::Instructions => Ok(vec![Command::StartGame]),
        Screen::Leaderboard => Ok(match line.to_ascii_lowercase().as_str() {
            "new" | "n" => vec![Command::NewPlayer],
            _ => vec![Command::PlayAgain],
        }),
        Screen::Playing | Screen::LevelComplete => parse_presses(line),
        Screen::Exited => Ok(Vec::new()),
    }
}

fn parse_presses(line: &str) -> Result<Vec<Command>, UnknownSymbol> {
    match line.to_ascii_lowercase().as_str() {
        "clear" | "c" => return Ok(vec![Command::ClearExpression]),
        "give up" | "giveup" | "g" => return Ok(vec![Command::GiveUp]),
        "submit" => return Ok(vec![Command::Submit]),
        _ => {}
    }

    let mut commands = Vec::new();
    for symbol in line.chars().filter(|symbol| !symbol.is_whitespace()) {
        let command = if let Some(digit) = symbol
            .to_digit(10)
            .and_then(|value| u8::try_from(value).ok())
            .and_then(Digit::new)
        {
            Command::PressDigit { digit }
        } else if let Some(operator) = Operator::from_symbol(symbol) {
            Command::PressOperator { operator }
        } else if symbol == '=' {
            Command::Submit
        } else {
            return Err(UnknownSymbol(symbol));
        };
        commands.push(command);
    }
    Ok(commands)
}

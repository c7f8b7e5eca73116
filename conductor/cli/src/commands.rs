//! Input line parsing

use zelf_conductor::Location;

/// What one line of input asks for
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Send a message
    Say(String),
    /// Abort the answer in progress
    Cancel,
    /// Start a fresh conversation
    Clear,
    /// Set (or with `None`, forget) the location sent with each turn
    Location(Option<Location>),
    /// Print the command list
    Help,
    /// Leave
    Quit,
    /// Blank line
    Empty,
    /// A slash command we could not parse
    Invalid(String),
}

/// Help text for `/help`
pub const HELP: &str = "\
/cancel            stop the current answer (or press Ctrl-C)
/clear             start a new conversation
/location LAT LON  send this location with each message
/location off      stop sending a location
/quit              exit";

impl Command {
    /// Parse one line of input
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Say(line.to_string());
        };

        let mut words = rest.split_whitespace();
        match words.next().unwrap_or_default() {
            "quit" | "exit" => Self::Quit,
            "cancel" => Self::Cancel,
            "clear" => Self::Clear,
            "help" => Self::Help,
            "location" => match (words.next(), words.next()) {
                (Some("off"), None) => Self::Location(None),
                (Some(lat), Some(lon)) => match (lat.parse(), lon.parse()) {
                    (Ok(lat), Ok(lon)) => Self::Location(Some(Location::new(lat, lon))),
                    _ => Self::Invalid(format!("not a coordinate pair: {lat} {lon}")),
                },
                _ => Self::Invalid("usage: /location LAT LON | /location off".to_string()),
            },
            other => Self::Invalid(format!("unknown command: /{other}")),
        }
    }
}

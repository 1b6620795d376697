/// A slash command recognised in any conversation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start` or `/trade`.
    Start,
    /// `/quicktrade`, optionally followed by the trade itself.
    QuickTrade(Option<String>),
    /// `/positions` or `/portfolio`.
    Positions,
    Moon,
    /// `/cancel` or `/end`.
    Cancel,
    Help,
    Unknown(String),
}

impl Command {
    /// Returns `None` for plain text.
    ///
    /// Telegram may suffix a command with the bot's name (`/start@lemon_bot`);
    /// the suffix is ignored.
    pub fn parse(text: &str) -> Option<Command> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }
        let (head, rest) = match text.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (text, ""),
        };
        let name = head
            .trim_start_matches('/')
            .split('@')
            .next()
            .unwrap_or_default()
            .to_lowercase();

        Some(match name.as_str() {
            "start" | "trade" => Command::Start,
            "quicktrade" => Command::QuickTrade((!rest.is_empty()).then(|| rest.to_string())),
            "positions" | "portfolio" => Command::Positions,
            "moon" => Command::Moon,
            "cancel" | "end" => Command::Cancel,
            "help" => Command::Help,
            _ => Command::Unknown(head.to_string()),
        })
    }
}

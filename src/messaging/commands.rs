//! Inbound chat and signal text parsed into orders

/// What a player asked the agent to do
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    ReturnToBase,
    FollowMe,
    /// Stay put; seconds if given, otherwise the default hold time
    Hold(Option<f32>),
    GoLoot,
    Unknown,
}

impl ChatCommand {
    /// Parse free text; matching is case-insensitive and keyword based
    pub fn parse(text: &str) -> Self {
        let lower = text.trim().to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric() && c != '.' && c != '-')
            .filter(|w| !w.is_empty())
            .collect();
        let has = |w: &str| words.contains(&w);

        if has("return") || has("home") || has("ship") || has("base") {
            return ChatCommand::ReturnToBase;
        }
        if has("follow") || (has("come") && has("here")) {
            return ChatCommand::FollowMe;
        }
        if has("hold") || has("wait") || has("stay") {
            let seconds = words.iter().find_map(|w| w.parse::<f32>().ok());
            return ChatCommand::Hold(seconds);
        }
        if has("loot") || has("scrap") || has("search") {
            return ChatCommand::GoLoot;
        }
        ChatCommand::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_return() {
        assert_eq!(ChatCommand::parse("Return to the ship!"), ChatCommand::ReturnToBase);
        assert_eq!(ChatCommand::parse("go home"), ChatCommand::ReturnToBase);
    }

    #[test]
    fn test_parse_follow() {
        assert_eq!(ChatCommand::parse("follow me"), ChatCommand::FollowMe);
        assert_eq!(ChatCommand::parse("come here"), ChatCommand::FollowMe);
    }

    #[test]
    fn test_parse_hold_with_duration() {
        assert_eq!(ChatCommand::parse("hold 12"), ChatCommand::Hold(Some(12.0)));
        assert_eq!(ChatCommand::parse("wait here"), ChatCommand::Hold(None));
        assert_eq!(ChatCommand::parse("wait -3"), ChatCommand::Hold(Some(-3.0)));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(ChatCommand::parse("nice weather"), ChatCommand::Unknown);
        assert_eq!(ChatCommand::parse(""), ChatCommand::Unknown);
    }
}

/// One line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Say(String),
    Scan(String),
    Suggestions,
    Transcript,
    Quit,
    Help,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Say(line.to_string());
        };
        let (name, argument) = match rest.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, argument.trim()),
            None => (rest, ""),
        };

        match name {
            "scan" if !argument.is_empty() => Command::Scan(argument.to_string()),
            "suggest" | "suggestions" => Command::Suggestions,
            "log" | "transcript" => Command::Transcript,
            "quit" | "exit" => Command::Quit,
            "help" => Command::Help,
            other => Command::Unknown(other.to_string()),
        }
    }
}

pub const HELP: &str = "\
Type a question and press enter.
  /scan <image>   analyze a crop photo
  /suggest        show quick questions
  /log            print the whole conversation
  /quit           leave";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_said() {
        assert_eq!(
            Command::parse("  How should I water my crops?  "),
            Command::Say("How should I water my crops?".into())
        );
    }

    #[test]
    fn empty_line_is_said_as_empty() {
        assert_eq!(Command::parse("   "), Command::Say(String::new()));
    }

    #[test]
    fn scan_takes_reference() {
        assert_eq!(
            Command::parse("/scan  field/tomato.jpg "),
            Command::Scan("field/tomato.jpg".into())
        );
    }

    #[test]
    fn scan_without_reference_is_unknown() {
        assert_eq!(Command::parse("/scan"), Command::Unknown("scan".into()));
    }

    #[test]
    fn aliases() {
        assert_eq!(Command::parse("/exit"), Command::Quit);
        assert_eq!(Command::parse("/suggestions"), Command::Suggestions);
        assert_eq!(Command::parse("/transcript"), Command::Transcript);
        assert_eq!(Command::parse("/help"), Command::Help);
        assert_eq!(Command::parse("/dance"), Command::Unknown("dance".into()));
    }
}

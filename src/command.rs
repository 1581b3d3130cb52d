use std::str::FromStr;

use crate::tuple::Tuple;

/// A line of input to the interactive tool
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Insert(Tuple),
    Select(String),
    Stats,
    Exit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (cmd, rest) = match s.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (s, ""),
        };
        match cmd.to_ascii_uppercase().as_str() {
            "" => Err("No command".to_string()),
            "INSERT" => {
                if rest.is_empty() {
                    return Err("No tuple".to_string());
                }
                Ok(Command::Insert(Tuple::new(rest)))
            }
            "SELECT" => {
                if rest.is_empty() {
                    return Err("No pattern".to_string());
                }
                Ok(Command::Select(rest.to_string()))
            }
            "STATS" if rest.is_empty() => Ok(Command::Stats),
            "EXIT" if rest.is_empty() => Ok(Command::Exit),
            "STATS" | "EXIT" => Err(format!("Unexpected argument after {}", cmd)),
            _ => Err(format!("Unknown command: {}", cmd)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(
            "INSERT a,1,x".parse::<Command>(),
            Ok(Command::Insert(Tuple::from("a,1,x")))
        );
        assert_eq!(
            "select  a,?,? ".parse::<Command>(),
            Ok(Command::Select("a,?,?".to_string()))
        );
        assert_eq!("STATS".parse::<Command>(), Ok(Command::Stats));
        assert_eq!("exit".parse::<Command>(), Ok(Command::Exit));
    }

    #[test]
    fn rejects_bad_input() {
        assert!("".parse::<Command>().is_err());
        assert!("INSERT".parse::<Command>().is_err());
        assert!("SELECT   ".parse::<Command>().is_err());
        assert!("STATS now".parse::<Command>().is_err());
        assert!("DELETE a".parse::<Command>().is_err());
    }
}

//! Slash-command argument parsing for build requests.
//!
//! Grammar: `JOB [--NAME=value ...]`, whitespace separated. There is no
//! quoting or escaping, so values cannot contain whitespace. The first `=`
//! splits name from value; later `=` characters stay in the value. Tokens of
//! any other shape are ignored.

use std::collections::BTreeMap;

use thiserror::Error;

const PARAM_PREFIX: &str = "--";
const HELP_KEYWORD: &str = "help";

/// Case normalisation applied to parameter names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamNameCase {
    #[default]
    Uppercase,
    Preserve,
}

impl ParamNameCase {
    pub fn from_uppercase_flag(uppercase: bool) -> Self {
        if uppercase {
            Self::Uppercase
        } else {
            Self::Preserve
        }
    }

    fn apply(self, name: &str) -> String {
        match self {
            Self::Uppercase => name.to_uppercase(),
            Self::Preserve => name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("missing job name")]
    MissingJobName,
}

/// Job name plus parameters extracted from a build command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub job_name: String,
    pub params: BTreeMap<String, String>,
}

/// Returns true for empty arguments or a leading literal `help`.
pub fn is_help_request(text: &str) -> bool {
    match text.split_whitespace().next() {
        None => true,
        Some(first) => first == HELP_KEYWORD,
    }
}

pub fn parse_build_command(
    text: &str,
    name_case: ParamNameCase,
) -> Result<ParsedCommand, CommandParseError> {
    let mut tokens = text.split_whitespace();
    let job_name = tokens
        .next()
        .ok_or(CommandParseError::MissingJobName)?
        .to_string();

    let mut params = BTreeMap::new();
    for token in tokens {
        if let Some((name, value)) = parse_param_token(token) {
            params.insert(name_case.apply(name), value.to_string());
        }
    }

    Ok(ParsedCommand { job_name, params })
}

fn parse_param_token(token: &str) -> Option<(&str, &str)> {
    let body = token.strip_prefix(PARAM_PREFIX)?;
    let (name, value) = body.split_once('=')?;
    if name.is_empty() {
        return None;
    }
    Some((name, value))
}

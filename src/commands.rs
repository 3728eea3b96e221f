//! Shell commands, their aliases, and line parsing

use color_eyre::{eyre::eyre, Result};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub usage: &'static str,
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "get",
    aliases: &["g", "read"],
    usage: "get <endpoint> [--no-cache] [--ttl N]",
    description: "Fetch an endpoint (served from cache while fresh)",
  },
  Command {
    name: "post",
    aliases: &["p", "create"],
    usage: "post <endpoint> [json]",
    description: "Create a resource",
  },
  Command {
    name: "put",
    aliases: &["u", "update"],
    usage: "put <endpoint> [json]",
    description: "Replace a resource",
  },
  Command {
    name: "delete",
    aliases: &["d", "del", "rm"],
    usage: "delete <endpoint>",
    description: "Delete a resource",
  },
  Command {
    name: "clear",
    aliases: &["c", "flush"],
    usage: "clear [endpoint]",
    description: "Drop cached reads for an endpoint, or all of them",
  },
  Command {
    name: "help",
    aliases: &["h", "?"],
    usage: "help",
    description: "List commands",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    usage: "quit",
    description: "Leave the shell",
  },
];

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
  Get {
    endpoint: String,
    cache: bool,
    ttl_secs: Option<u64>,
  },
  Post { endpoint: String, body: Option<Value> },
  Put { endpoint: String, body: Option<Value> },
  Delete { endpoint: String },
  Clear { endpoint: Option<String> },
  Help,
  Quit,
}

/// Commands a mistyped `word` most likely meant, best first.
///
/// Ranked by the longest shared prefix with the name or any alias; a name
/// that merely contains the word ranks last.
fn suggest(word: &str) -> Vec<&'static str> {
  let word = word.to_lowercase();

  let mut ranked: Vec<(usize, &'static str)> = COMMANDS
    .iter()
    .filter_map(|cmd| {
      let prefix = std::iter::once(cmd.name)
        .chain(cmd.aliases.iter().copied())
        .map(|candidate| shared_prefix(candidate, &word))
        .max()
        .unwrap_or(0);
      let score = if prefix == 0 && word.len() > 1 && cmd.name.contains(&word) {
        1
      } else {
        prefix * 2
      };
      (score > 0).then_some((score, cmd.name))
    })
    .collect();

  ranked.sort_by(|a, b| b.0.cmp(&a.0));
  ranked.into_iter().map(|(_, name)| name).collect()
}

fn shared_prefix(a: &str, b: &str) -> usize {
  a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

/// Resolve a command word to its canonical name. Only exact names and
/// aliases resolve; anything looser is reported with suggestions.
fn resolve(word: &str) -> Result<&'static str> {
  let word_lower = word.to_lowercase();
  if let Some(cmd) = COMMANDS
    .iter()
    .find(|c| c.name == word_lower || c.aliases.contains(&word_lower.as_str()))
  {
    return Ok(cmd.name);
  }

  let hints = suggest(word);
  if hints.is_empty() {
    Err(eyre!("Unknown command '{}'. Type 'help' for a list.", word))
  } else {
    Err(eyre!(
      "Unknown command '{}'. Did you mean: {}?",
      word,
      hints.join(", ")
    ))
  }
}

/// Parse one shell line. Returns `Ok(None)` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>> {
  let line = line.trim();
  if line.is_empty() {
    return Ok(None);
  }

  let (word, rest) = split_word(line);
  let name = resolve(word)?;

  let command = match name {
    "get" => {
      let (endpoint, mut flags) = split_word(rest);
      let endpoint = require_endpoint(endpoint)?;
      let mut cache = true;
      let mut ttl_secs = None;

      while !flags.is_empty() {
        let (flag, remaining) = split_word(flags);
        flags = remaining;
        match flag {
          "--no-cache" => cache = false,
          "--ttl" => {
            let (value, remaining) = split_word(flags);
            flags = remaining;
            let secs = value
              .parse::<u64>()
              .map_err(|_| eyre!("--ttl expects seconds, got '{}'", value))?;
            ttl_secs = Some(secs);
          }
          other => return Err(eyre!("Unexpected argument '{}'", other)),
        }
      }

      ShellCommand::Get {
        endpoint,
        cache,
        ttl_secs,
      }
    }
    "post" | "put" => {
      let (endpoint, body) = split_word(rest);
      let endpoint = require_endpoint(endpoint)?;
      let body = parse_body(body)?;
      if name == "post" {
        ShellCommand::Post { endpoint, body }
      } else {
        ShellCommand::Put { endpoint, body }
      }
    }
    "delete" => ShellCommand::Delete {
      endpoint: require_endpoint(rest)?,
    },
    "clear" => ShellCommand::Clear {
      endpoint: (!rest.is_empty()).then(|| rest.to_string()),
    },
    "help" => ShellCommand::Help,
    _ => ShellCommand::Quit,
  };

  Ok(Some(command))
}

/// Render the help listing.
pub fn help_text() -> String {
  COMMANDS
    .iter()
    .map(|c| format!("  {:<30} {}", c.usage, c.description))
    .collect::<Vec<_>>()
    .join("\n")
}

fn split_word(input: &str) -> (&str, &str) {
  let input = input.trim();
  match input.split_once(char::is_whitespace) {
    Some((word, rest)) => (word, rest.trim()),
    None => (input, ""),
  }
}

fn require_endpoint(endpoint: &str) -> Result<String> {
  let endpoint = endpoint.trim();
  if endpoint.is_empty() {
    return Err(eyre!("Missing endpoint, e.g. /jobs"));
  }
  if !endpoint.starts_with('/') {
    return Err(eyre!("Endpoint must start with '/': {}", endpoint));
  }
  Ok(endpoint.to_string())
}

/// Parse an optional JSON body.
pub fn parse_body(raw: &str) -> Result<Option<Value>> {
  let raw = raw.trim();
  if raw.is_empty() {
    return Ok(None);
  }
  serde_json::from_str(raw)
    .map(Some)
    .map_err(|e| eyre!("Invalid JSON body: {}", e))
}

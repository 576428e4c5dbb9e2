// Console commands for driving the moderation service from stdin.
//
// Each line is one command; arguments are whitespace separated and the last
// argument of `say`, `mute` and `delete` swallows the rest of the line.
//
//   say <room> <user> <text...>
//   mute <room> <user>[=<display>] <moderator> <minutes|forever> <reason...>
//   unmute <room> <user>
//   muted <room>          active <room>          purge
//   delete <room> <message> <moderator> <reason...>
//   deleted <room>        reset <user>
//
// The display name stored with a mute defaults to the user id when no
// `=<display>` suffix is given.

use anyhow::{anyhow, bail, Context, Result};
use chat_moderation::{Clock, ModerationService};
use serde_json::{json, Value};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Say {
        room: String,
        user: String,
        text: String,
    },
    Mute {
        room: String,
        user: String,
        display_name: String,
        moderator: String,
        minutes: Option<u32>,
        reason: String,
    },
    Unmute {
        room: String,
        user: String,
    },
    Muted {
        room: String,
    },
    Active {
        room: String,
    },
    Purge,
    Delete {
        room: String,
        message: String,
        moderator: String,
        reason: String,
    },
    Deleted {
        room: String,
    },
    Reset {
        user: String,
    },
}

/// Split off `n` leading words and return them plus the untouched remainder.
fn split_words(line: &str, n: usize) -> (Vec<&str>, &str) {
    let mut words = Vec::with_capacity(n);
    let mut rest = line.trim_start();

    while words.len() < n {
        if rest.is_empty() {
            break;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        words.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }

    (words, rest)
}

fn take(words: &[&str], index: usize, name: &str) -> Result<String> {
    words
        .get(index)
        .map(|w| w.to_string())
        .ok_or_else(|| anyhow!("missing <{}>", name))
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let (head, rest) = split_words(line, 1);
        let verb = head.first().copied().unwrap_or_default();

        let command = match verb {
            "say" => {
                let (w, text) = split_words(rest, 2);
                Command::Say {
                    room: take(&w, 0, "room")?,
                    user: take(&w, 1, "user")?,
                    text: text.to_string(),
                }
            }
            "mute" => {
                let (w, reason) = split_words(rest, 4);
                let duration = take(&w, 3, "minutes|forever")?;
                let minutes = match duration.as_str() {
                    "forever" | "-" => None,
                    n => Some(
                        n.parse::<u32>()
                            .with_context(|| format!("invalid duration {:?}", n))?,
                    ),
                };
                let target = take(&w, 1, "user")?;
                let (user, display_name) = match target.split_once('=') {
                    Some((user, name)) if !user.is_empty() && !name.is_empty() => {
                        (user.to_string(), name.to_string())
                    }
                    Some(_) => bail!("invalid user {:?}", target),
                    None => (target.clone(), target),
                };
                Command::Mute {
                    room: take(&w, 0, "room")?,
                    user,
                    display_name,
                    moderator: take(&w, 2, "moderator")?,
                    minutes,
                    reason: reason.to_string(),
                }
            }
            "unmute" => {
                let (w, _) = split_words(rest, 2);
                Command::Unmute {
                    room: take(&w, 0, "room")?,
                    user: take(&w, 1, "user")?,
                }
            }
            "muted" | "active" | "deleted" => {
                let (w, _) = split_words(rest, 1);
                let room = take(&w, 0, "room")?;
                match verb {
                    "muted" => Command::Muted { room },
                    "active" => Command::Active { room },
                    _ => Command::Deleted { room },
                }
            }
            "purge" => Command::Purge,
            "delete" => {
                let (w, reason) = split_words(rest, 3);
                Command::Delete {
                    room: take(&w, 0, "room")?,
                    message: take(&w, 1, "message")?,
                    moderator: take(&w, 2, "moderator")?,
                    reason: reason.to_string(),
                }
            }
            "reset" => {
                let (w, _) = split_words(rest, 1);
                Command::Reset {
                    user: take(&w, 0, "user")?,
                }
            }
            "" => bail!("empty command"),
            other => bail!("unknown command {:?}", other),
        };

        Ok(command)
    }
}

/// Execute a command and describe the outcome as JSON.
pub fn execute<C: Clock>(service: &ModerationService<C>, command: Command) -> Result<Value> {
    let value = match command {
        Command::Say { room, user, text } => {
            serde_json::to_value(service.moderate_message(&user, &room, &text))?
        }
        Command::Mute {
            room,
            user,
            display_name: name,
            moderator,
            minutes,
            reason,
        } => {
            let record = service.mute_user(&user, &name, &moderator, &reason, &room, minutes);
            serde_json::to_value(record)?
        }
        Command::Unmute { room, user } => json!({ "unmuted": service.unmute_user(&user, &room) }),
        Command::Muted { room } => serde_json::to_value(service.get_muted_users(&room))?,
        Command::Active { room } => serde_json::to_value(service.get_active_muted_users(&room))?,
        Command::Purge => json!({ "purged": service.purge_expired_mutes() }),
        Command::Delete {
            room,
            message,
            moderator,
            reason,
        } => json!({ "deleted": service.delete_message(&message, &moderator, &reason, &room) }),
        Command::Deleted { room } => serde_json::to_value(service.get_deleted_messages(&room))?,
        Command::Reset { user } => json!({ "cleared": service.clear_spam_window(&user) }),
    };

    Ok(value)
}

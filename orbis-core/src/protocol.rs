//! The wire protocol spoken between game clients and the server.
//!
//! Frames starting with [`COMMAND_MARKER`] are UTF-8 commands for the server.
//! Anything else is chat-style traffic that is relayed to the other players
//! byte for byte, whatever its encoding.
//!
//! A command looks like `!keyword:payload`. The payload is a list of fields
//! separated by [`FIELD_SEPARATOR`], where each field is either `key:value` or a
//! bare positional value. There is no escaping, so values can never contain
//! one of the separators.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const COMMAND_MARKER: char = '!';
pub const FIELD_SEPARATOR: char = '~';
pub const KEY_VALUE_SEPARATOR: char = ':';
pub const CREDENTIAL_SEPARATOR: char = '/';
pub const COORD_SEPARATOR: char = ',';

/// Tokens the server sends back to clients.
pub mod reply {
    pub const SERVER_NOT_FULL: &str = "OK";
    pub const SERVER_FULL: &str = "FULL";

    pub const LOGIN_ACCEPTED: &str = "usracpt";
    pub const LOGIN_DECLINED: &str = "usrdec";
    pub const LOGIN_ALREADY_ON: &str = "usralon";
    pub const LOGIN_FAILED: &str = "usrerr";

    pub const SIGNUP_ACCEPTED: &str = "signacpt";
    pub const SIGNUP_TAKEN: &str = "signtaken";
    pub const SIGNUP_DECLINED: &str = "signdec";
    pub const SIGNUP_FAILED: &str = "signerr";

    pub const CHUNK_FAILED: &str = "chunkerr";

    pub const CHUNK_PREFIX: &str = "retchunk";
    pub const SHOTS_PREFIX: &str = "shoot:";
    pub const PLAYER_COUNT_PREFIX: &str = "players:";
    pub const PLAYER_LEFT_PREFIX: &str = "usrl:";
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("command {0:?} has no payload")]
    MissingPayload(CommandKind),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid number in {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("expected <username>/<password>")]
    MissingCredentials,

    #[error("command is not valid UTF-8")]
    InvalidUtf8,
}

/// One inbound frame, split by its first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Relayed verbatim to every other connection
    Broadcast(&'a [u8]),
    /// Command body, without the leading marker
    Command(&'a str),
}

impl<'a> Frame<'a> {
    /// Only commands have to be text; a command that is not UTF-8 is an error.
    pub fn classify(raw: &'a [u8]) -> Result<Self, ProtocolError> {
        match raw.strip_prefix(&[COMMAND_MARKER as u8]) {
            Some(body) => std::str::from_utf8(body)
                .map(Frame::Command)
                .map_err(|_| ProtocolError::InvalidUtf8),
            None => Ok(Frame::Broadcast(raw)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Join,
    Shoot,
    LoadChunk,
    Login,
    Signup,
}

impl CommandKind {
    /// Keywords are matched by literal prefix, in this order.
    const KEYWORDS: [(&'static str, CommandKind); 6] = [
        ("use", CommandKind::Join),
        ("shoot", CommandKind::Shoot),
        ("loadchunk", CommandKind::LoadChunk),
        ("login", CommandKind::Login),
        // older clients send `logt...`
        ("logt", CommandKind::Login),
        ("signup", CommandKind::Signup),
    ];

    pub fn from_body(body: &str) -> Option<Self> {
        Self::KEYWORDS
            .iter()
            .find(|(keyword, _)| body.starts_with(keyword))
            .map(|(_, kind)| *kind)
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            CommandKind::Join => "use",
            CommandKind::Shoot => "shoot",
            CommandKind::LoadChunk => "loadchunk",
            CommandKind::Login => "login",
            CommandKind::Signup => "signup",
        }
    }
}

/// Tokenized command payload.
#[derive(Debug, Default, Clone)]
pub struct Fields<'a> {
    /// Every non-empty field in wire order
    raw: Vec<&'a str>,
    /// `key:value` fields; the first occurrence of a key wins
    pairs: BTreeMap<&'a str, &'a str>,
}

impl<'a> Fields<'a> {
    pub fn parse(payload: &'a str) -> Self {
        let mut fields = Fields::default();
        // keys are trimmed, values are kept exactly as sent
        for field in payload.split(FIELD_SEPARATOR).filter(|f| !f.trim().is_empty()) {
            fields.raw.push(field);
            if let Some((key, value)) = field.split_once(KEY_VALUE_SEPARATOR) {
                fields.pairs.entry(key.trim()).or_insert(value);
            }
        }
        fields
    }

    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.pairs.get(key).copied()
    }

    pub fn require(&self, key: &'static str) -> Result<&'a str, ProtocolError> {
        self.get(key)
            .filter(|v| !v.is_empty())
            .ok_or(ProtocolError::MissingField(key))
    }

    pub fn number<T: FromStr>(&self, key: &'static str) -> Result<T, ProtocolError> {
        let value = self.require(key)?;
        value.trim().parse().map_err(|_| ProtocolError::InvalidNumber {
            field: key,
            value: value.to_string(),
        })
    }

    /// First field exactly as it was sent.
    pub fn first(&self) -> Option<&'a str> {
        self.raw.first().copied()
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    fn from_fields(fields: &Fields<'_>) -> Result<Self, ProtocolError> {
        let (username, password) = fields
            .first()
            .and_then(|f| f.split_once(CREDENTIAL_SEPARATOR))
            .ok_or(ProtocolError::MissingCredentials)?;

        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(ProtocolError::MissingCredentials);
        }

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShotRequest {
    pub kind: String,
    pub owner: String,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub vx: f64,
    pub vy: f64,
}

impl ShotRequest {
    fn from_fields(fields: &Fields<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            kind: fields.require("shot")?.to_string(),
            owner: fields.require("user")?.to_string(),
            x: finite(fields, "xcor")?,
            y: finite(fields, "ycor")?,
            rotation: finite(fields, "rotat")?,
            vx: finite(fields, "xvshot")?,
            vy: finite(fields, "yvshot")?,
        })
    }
}

fn finite(fields: &Fields<'_>, key: &'static str) -> Result<f64, ProtocolError> {
    let v: f64 = fields.number(key)?;
    if !v.is_finite() {
        return Err(ProtocolError::InvalidNumber {
            field: key,
            value: v.to_string(),
        });
    }
    Ok(v)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Join { name: String },
    Shoot(ShotRequest),
    LoadChunk { cx: i32, cy: i32 },
    Login(Credentials),
    Signup(Credentials),
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Join { .. } => CommandKind::Join,
            Command::Shoot(_) => CommandKind::Shoot,
            Command::LoadChunk { .. } => CommandKind::LoadChunk,
            Command::Login(_) => CommandKind::Login,
            Command::Signup(_) => CommandKind::Signup,
        }
    }
}

/// Decode a command body (the frame minus its marker).
///
/// Returns `Ok(None)` for bodies that match no keyword; those are dropped
/// without a reply. Malformed payloads of known commands come back as errors
/// so the caller can ignore them.
pub fn parse_command(body: &str) -> Result<Option<Command>, ProtocolError> {
    let Some(kind) = CommandKind::from_body(body) else {
        return Ok(None);
    };

    let payload = body
        .split_once(KEY_VALUE_SEPARATOR)
        .map(|(_, payload)| payload)
        .ok_or(ProtocolError::MissingPayload(kind))?;

    let fields = Fields::parse(payload);
    let cmd = match kind {
        // the display name is taken as a whole, it is never tokenized
        CommandKind::Join => Command::Join {
            name: payload.trim().trim_end_matches(FIELD_SEPARATOR).trim().to_string(),
        },
        CommandKind::Shoot => Command::Shoot(ShotRequest::from_fields(&fields)?),
        CommandKind::LoadChunk => {
            let (cx, cy) = parse_coords(fields.first().ok_or(ProtocolError::MissingField("coords"))?)?;
            Command::LoadChunk { cx, cy }
        }
        CommandKind::Login => Command::Login(Credentials::from_fields(&fields)?),
        CommandKind::Signup => Command::Signup(Credentials::from_fields(&fields)?),
    };

    Ok(Some(cmd))
}

fn parse_coords(s: &str) -> Result<(i32, i32), ProtocolError> {
    let (x, y) = s
        .split_once(COORD_SEPARATOR)
        .ok_or(ProtocolError::MissingField("coords"))?;
    let parse = |field: &'static str, v: &str| {
        v.trim().parse::<i32>().map_err(|_| ProtocolError::InvalidNumber {
            field,
            value: v.to_string(),
        })
    };
    Ok((parse("cx", x)?, parse("cy", y)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_splits_on_marker() {
        assert_eq!(Frame::classify(b"hello"), Ok(Frame::Broadcast(b"hello")));
        assert_eq!(Frame::classify(b"!use:Alice"), Ok(Frame::Command("use:Alice")));
        assert_eq!(Frame::classify(b""), Ok(Frame::Broadcast(b"")));
    }

    #[test]
    fn only_commands_must_be_utf8() {
        assert_eq!(Frame::classify(b"caf\xe9"), Ok(Frame::Broadcast(b"caf\xe9")));
        assert_eq!(Frame::classify(b"!use:caf\xe9"), Err(ProtocolError::InvalidUtf8));
    }

    #[test]
    fn keywords_match_by_prefix() {
        assert_eq!(CommandKind::from_body("use:Bob"), Some(CommandKind::Join));
        assert_eq!(CommandKind::from_body("loadchunk:1,2"), Some(CommandKind::LoadChunk));
        assert_eq!(CommandKind::from_body("logtry:a/b"), Some(CommandKind::Login));
        assert_eq!(CommandKind::from_body("login:a/b"), Some(CommandKind::Login));
        assert_eq!(CommandKind::from_body("dance:now"), None);
    }

    #[test]
    fn fields_split_pairs_and_positionals() {
        let f = Fields::parse("~shot:blaster~~user:Alice~3,4~user:Mallory~");
        assert_eq!(f.len(), 4);
        assert_eq!(f.first(), Some("shot:blaster"));
        assert_eq!(f.get("shot"), Some("blaster"));
        assert_eq!(f.get("user"), Some("Alice"));
        assert_eq!(f.get("missing"), None);
        assert_eq!(f.require("missing"), Err(ProtocolError::MissingField("missing")));
    }

    #[test]
    fn value_keeps_later_colons() {
        let f = Fields::parse("note:a:b");
        assert_eq!(f.get("note"), Some("a:b"));
    }

    #[test]
    fn values_are_not_trimmed() {
        let f = Fields::parse("~ user: Alice ~ xcor: 12 ~");
        assert_eq!(f.get("user"), Some(" Alice "));
        assert_eq!(f.number::<f64>("xcor"), Ok(12.0));

        let Some(Command::Login(c)) = parse_command("login:alice/pw ~").unwrap() else {
            panic!("expected login");
        };
        assert_eq!(c.password, "pw ");
    }

    #[test]
    fn join_takes_whole_payload() {
        let cmd = parse_command("use:Alice").unwrap().unwrap();
        assert_eq!(cmd, Command::Join { name: "Alice".into() });

        let cmd = parse_command("use:").unwrap().unwrap();
        assert_eq!(cmd, Command::Join { name: String::new() });
    }

    #[test]
    fn shoot_reads_every_field() {
        let body = "shoot:~shot:blaster~user:Alice~xcor:100~ycor:-20.5~rotat:90~xvshot:3~yvshot:-4~";
        let Some(Command::Shoot(req)) = parse_command(body).unwrap() else {
            panic!("expected shoot");
        };
        assert_eq!(req.kind, "blaster");
        assert_eq!(req.owner, "Alice");
        assert_eq!(req.x, 100.0);
        assert_eq!(req.y, -20.5);
        assert_eq!(req.rotation, 90.0);
        assert_eq!(req.vx, 3.0);
        assert_eq!(req.vy, -4.0);
    }

    #[test]
    fn shoot_with_missing_field_fails_closed() {
        let body = "shoot:~shot:blaster~user:Alice~xcor:100~";
        assert_eq!(parse_command(body), Err(ProtocolError::MissingField("ycor")));

        let body = "shoot:~shot:blaster~user:A~xcor:x~ycor:1~rotat:1~xvshot:1~yvshot:1~";
        assert!(matches!(
            parse_command(body),
            Err(ProtocolError::InvalidNumber { field: "xcor", .. })
        ));
    }

    #[test]
    fn loadchunk_coords() {
        assert_eq!(
            parse_command("loadchunk:3,4~").unwrap(),
            Some(Command::LoadChunk { cx: 3, cy: 4 })
        );
        assert_eq!(
            parse_command("loadchunk:-1, 7").unwrap(),
            Some(Command::LoadChunk { cx: -1, cy: 7 })
        );
        assert!(parse_command("loadchunk:3").is_err());
        assert!(parse_command("loadchunk:a,b").is_err());
        assert_eq!(
            parse_command("loadchunk"),
            Err(ProtocolError::MissingPayload(CommandKind::LoadChunk))
        );
    }

    #[test]
    fn credentials_split_on_first_slash() {
        let Some(Command::Login(c)) = parse_command("login:alice/se/cret~").unwrap() else {
            panic!("expected login");
        };
        assert_eq!(c.username, "alice");
        assert_eq!(c.password, "se/cret");

        assert_eq!(parse_command("signup:alice~"), Err(ProtocolError::MissingCredentials));
        assert_eq!(parse_command("signup:/pw~"), Err(ProtocolError::MissingCredentials));
        assert_eq!(parse_command("login:alice/~"), Err(ProtocolError::MissingCredentials));
    }

    #[test]
    fn credentials_debug_hides_password() {
        let c = Credentials {
            username: "alice".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{c:?}").contains("hunter2"));
    }

    #[test]
    fn unknown_commands_are_not_errors() {
        assert_eq!(parse_command("teleport:0,0"), Ok(None));
        assert_eq!(parse_command(""), Ok(None));
    }
}

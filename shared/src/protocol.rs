//! ASCII command vocabulary and reply format
//!
//! Requests are single lines of space-separated tokens:
//! ```text
//! /<station> <device> <command> [param ...]
//! ```
//! Replies always take the shape:
//! ```text
//! @<device_number> 0 OK <status> -- <payload>
//! ```

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while interpreting protocol tokens
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Unknown command: {0:?}")]
    UnknownCommand(String),

    #[error("Unknown field: {0:?}")]
    UnknownField(String),

    #[error("Unknown move mode: {0:?}")]
    UnknownMode(String),

    #[error("Unknown device status: {0:?}")]
    UnknownStatus(String),

    #[error("Malformed reply: {0:?}")]
    MalformedReply(String),
}

/// Status token reported in every reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceStatus {
    #[default]
    Idle,
    Busy,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Idle => "IDLE",
            DeviceStatus::Busy => "BUSY",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IDLE" => Ok(DeviceStatus::Idle),
            "BUSY" => Ok(DeviceStatus::Busy),
            other => Err(ProtocolError::UnknownStatus(other.to_string())),
        }
    }
}

/// The fixed set of commands the controller answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    Identify,
    Status,
    Get,
    Home,
    Move,
}

impl CommandName {
    pub const ALL: [CommandName; 5] = [
        CommandName::Identify,
        CommandName::Status,
        CommandName::Get,
        CommandName::Home,
        CommandName::Move,
    ];

    /// Wire token for this command
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandName::Identify => "identify",
            CommandName::Status => "status",
            CommandName::Get => "get",
            CommandName::Home => "home",
            CommandName::Move => "move",
        }
    }

    /// Number of positional parameters the command takes
    pub fn arity(&self) -> usize {
        match self {
            CommandName::Identify | CommandName::Status | CommandName::Home => 0,
            CommandName::Get => 1,
            CommandName::Move => 2,
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandName {
    type Err = ProtocolError;

    /// Exact, case-sensitive lookup
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownCommand(s.to_string()))
    }
}

/// Fields readable through `get`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Position,
    Status,
    DeviceId,
}

impl FromStr for Field {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pos" => Ok(Field::Position),
            "status" => Ok(Field::Status),
            "device.id" => Ok(Field::DeviceId),
            other => Err(ProtocolError::UnknownField(other.to_string())),
        }
    }
}

/// Addressing mode for `move`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMode {
    Absolute,
    Relative,
}

impl FromStr for MoveMode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abs" => Ok(MoveMode::Absolute),
            "rel" => Ok(MoveMode::Relative),
            other => Err(ProtocolError::UnknownMode(other.to_string())),
        }
    }
}

/// A request line split into its protocol fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// First token with the leading `/` removed
    pub station_address: String,
    pub device_index: String,
    pub command: String,
    pub parameters: Vec<String>,
}

impl ParsedCommand {
    /// Minimum number of tokens for a request that names a command
    pub const MIN_TOKENS: usize = 3;

    /// Split a raw request line.
    ///
    /// Returns `None` when the line has fewer than [`Self::MIN_TOKENS`] tokens.
    pub fn parse(line: &str) -> Option<Self> {
        let tokens = tokenize(line);
        if tokens.len() < Self::MIN_TOKENS {
            return None;
        }

        let mut tokens = tokens.into_iter();
        let station_address = tokens.next()?.trim_start_matches('/').to_string();
        let device_index = tokens.next()?.to_string();
        let command = tokens.next()?.to_string();
        let parameters = tokens.map(str::to_string).collect();

        Some(Self {
            station_address,
            device_index,
            command,
            parameters,
        })
    }

    /// Resolve the command token against the supported command set
    pub fn command_name(&self) -> Result<CommandName, ProtocolError> {
        self.command.parse()
    }
}

/// Strip trailing CR/LF and split on single spaces.
///
/// Consecutive spaces produce empty tokens; an empty line is one empty token.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.trim_end_matches(['\r', '\n']).split(' ').collect()
}

/// A single controller reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub device_number: u32,
    pub status: DeviceStatus,
    pub payload: i64,
}

impl Reply {
    pub fn new(device_number: u32, status: DeviceStatus, payload: i64) -> Self {
        Self {
            device_number,
            status,
            payload,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@{} 0 OK {} -- {}",
            self.device_number, self.status, self.payload
        )
    }
}

impl FromStr for Reply {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ProtocolError::MalformedReply(s.to_string());

        let tokens = tokenize(s);
        let [address, flag, ok, status, separator, payload] = tokens.as_slice() else {
            return Err(malformed());
        };
        if *flag != "0" || *ok != "OK" || *separator != "--" {
            return Err(malformed());
        }

        let device_number = address
            .strip_prefix('@')
            .and_then(|n| n.parse().ok())
            .ok_or_else(malformed)?;
        let status = status.parse()?;
        let payload = payload.parse().map_err(|_| malformed())?;

        Ok(Reply::new(device_number, status, payload))
    }
}

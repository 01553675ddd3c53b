//! Query-string command protocol.
//!
//! Only the request line is inspected; headers and body never carry commands.
//! Values support exactly two escapes: `%20` and `+` both decode to a space.
//! Every other percent sequence is kept literally.

use heapless::String;
use log::debug;

use crate::{
    state::{MESSAGE_CHARS, MessageText},
    text_policy::copy_truncated,
};

/// Scratch capacity for one decoded query value. Longer values are cut to fit.
pub const QUERY_VALUE_BYTES: usize = 256;

pub type QueryValue = String<QUERY_VALUE_BYTES>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ActuatorCommand {
    On,
    Off,
}

impl ActuatorCommand {
    pub fn from_value(value: &str) -> Option<Self> {
        match value {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            _ => None,
        }
    }

    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ModeCommand {
    Distance,
    Temperature,
    Clear,
    Custom,
}

impl ModeCommand {
    pub fn from_value(value: &str) -> Option<Self> {
        match value {
            "distance" => Some(Self::Distance),
            "temperature" => Some(Self::Temperature),
            "clear" => Some(Self::Clear),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// Commands recognised in one request. Built fresh per request.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParsedCommand {
    pub actuator: Option<ActuatorCommand>,
    pub mode: Option<ModeCommand>,
    /// Non-empty message, already capped at [`MESSAGE_CHARS`] characters.
    pub message: Option<MessageText>,
}

impl ParsedCommand {
    pub fn parse(raw_request: &str) -> Self {
        let line = request_line(raw_request);

        let actuator = param(line, "led").and_then(|value| {
            let command = ActuatorCommand::from_value(&value);
            if command.is_none() {
                debug!("command: ignoring led={}", value.as_str());
            }
            command
        });

        let mode = param(line, "mode").and_then(|value| {
            let command = ModeCommand::from_value(&value);
            if command.is_none() {
                debug!("command: ignoring mode={}", value.as_str());
            }
            command
        });

        let message = param(line, "msg")
            .filter(|value| !value.is_empty())
            .map(|value| {
                let mut text = MessageText::new();
                copy_truncated(&value, MESSAGE_CHARS, &mut text);
                text
            });

        Self {
            actuator,
            mode,
            message,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actuator.is_none() && self.mode.is_none() && self.message.is_none()
    }
}

/// First line of the raw request, without the line terminator.
pub fn request_line(raw_request: &str) -> &str {
    let line = raw_request.split('\n').next().unwrap_or("");
    line.strip_suffix('\r').unwrap_or(line)
}

/// Query portion of a request line: after the first `?`, up to the first whitespace.
pub fn query_string(line: &str) -> Option<&str> {
    let (_, rest) = line.split_once('?')?;
    rest.split(char::is_whitespace).next()
}

/// Raw (undecoded) value of the first `key=value` pair named `key`.
pub fn raw_param<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    query_string(line)?
        .split('&')
        .find_map(|pair| match pair.split_once('=') {
            Some((name, value)) if name == key => Some(value),
            _ => None,
        })
}

/// Decoded and trimmed value of `key`, or `None` when absent.
///
/// Values that decode past [`QUERY_VALUE_BYTES`] keep their leading part.
pub fn param(line: &str, key: &str) -> Option<QueryValue> {
    let raw = raw_param(line, key)?;
    let mut decoded = QueryValue::new();
    if !decode_value(raw, &mut decoded) {
        debug!("command: {} value cut to {} bytes", key, decoded.len());
    }

    let trimmed = decoded.trim();
    if trimmed.len() == decoded.len() {
        return Some(decoded);
    }
    let mut out = QueryValue::new();
    copy_truncated(trimmed, QUERY_VALUE_BYTES, &mut out);
    Some(out)
}

/// Applies the two supported escapes, stopping once `out` is full.
///
/// Returns `false` when `raw` did not fit and `out` holds only a prefix.
pub fn decode_value<const N: usize>(raw: &str, out: &mut String<N>) -> bool {
    out.clear();
    let mut rest = raw;
    while let Some(ch) = rest.chars().next() {
        let (decoded, tail) = match rest.strip_prefix("%20") {
            Some(tail) => (' ', tail),
            None => (if ch == '+' { ' ' } else { ch }, &rest[ch.len_utf8()..]),
        };
        if out.push(decoded).is_err() {
            return false;
        }
        rest = tail;
    }
    true
}

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod buffer;
pub use buffer::{ChannelId, SignalBuffer, SignalError};

// ============================================================================
// DATA TYPES
// ============================================================================

/// Data types for type-checked port connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum DataType {
    /// Signed integers
    Int,
    /// Floating point values
    Float,
    /// Booleans
    Bool,
    /// String/text data
    Text,
    /// Valueless events (presence is the information)
    Pulse,
    /// Accepts any data type
    Any,
}

impl DataType {
    /// Whether a producer of `self` may feed a consumer of `sink`.
    pub fn compatible_with(self, sink: DataType) -> bool {
        self == sink || self == DataType::Any || sink == DataType::Any
    }
}

// ============================================================================
// PORT DEFINITIONS
// ============================================================================

/// Port direction - whether a port receives or emits data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum PortDirection {
    Input,
    Output,
}

/// A typed port on a component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PortDesc {
    /// Unique identifier within the component
    pub id: String,
    /// Type of data this port carries
    pub data_type: DataType,
    /// Whether this port receives (Input) or emits (Output) data
    pub direction: PortDirection,
}

impl PortDesc {
    pub fn input(id: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: id.into(),
            data_type,
            direction: PortDirection::Input,
        }
    }

    pub fn output(id: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: id.into(),
            data_type,
            direction: PortDirection::Output,
        }
    }

    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Output
    }
}

// ============================================================================
// TOKENS
// ============================================================================

/// The value carried by a present signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", content = "data")]
pub enum Token {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    /// Empty event, used for triggers
    Pulse,
}

impl Token {
    pub fn data_type(&self) -> DataType {
        match self {
            Token::Int(_) => DataType::Int,
            Token::Float(_) => DataType::Float,
            Token::Bool(_) => DataType::Bool,
            Token::Text(_) => DataType::Text,
            Token::Pulse => DataType::Pulse,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Token::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integers widen to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Token::Float(v) => Some(*v),
            Token::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Token::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Token::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(v) => write!(f, "{}", v),
            Token::Float(v) => write!(f, "{}", v),
            Token::Bool(v) => write!(f, "{}", v),
            Token::Text(v) => write!(f, "{:?}", v),
            Token::Pulse => write!(f, "pulse"),
        }
    }
}

impl From<i64> for Token {
    fn from(v: i64) -> Self {
        Token::Int(v)
    }
}

impl From<i32> for Token {
    fn from(v: i32) -> Self {
        Token::Int(v.into())
    }
}

impl From<f64> for Token {
    fn from(v: f64) -> Self {
        Token::Float(v)
    }
}

impl From<bool> for Token {
    fn from(v: bool) -> Self {
        Token::Bool(v)
    }
}

impl From<&str> for Token {
    fn from(v: &str) -> Self {
        Token::Text(v.to_string())
    }
}

impl From<String> for Token {
    fn from(v: String) -> Self {
        Token::Text(v)
    }
}

// ============================================================================
// SIGNAL STATE
// ============================================================================

/// State of a channel within one instant.
///
/// A state only ever moves from `Unknown` to one of the known variants
/// between two resets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "state", content = "token")]
pub enum SignalState {
    /// Not yet determined in this instant
    #[default]
    Unknown,
    /// Known to carry no value in this instant
    Absent,
    /// Known to carry a value in this instant
    Present(Token),
}

impl SignalState {
    pub fn is_known(&self) -> bool {
        !matches!(self, SignalState::Unknown)
    }

    pub fn is_present(&self) -> bool {
        matches!(self, SignalState::Present(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, SignalState::Absent)
    }

    /// The carried token, if present.
    pub fn token(&self) -> Option<&Token> {
        match self {
            SignalState::Present(token) => Some(token),
            _ => None,
        }
    }
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalState::Unknown => write!(f, "unknown"),
            SignalState::Absent => write!(f, "absent"),
            SignalState::Present(token) => write!(f, "present({})", token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_compatibility() {
        assert!(DataType::Int.compatible_with(DataType::Int));
        assert!(DataType::Int.compatible_with(DataType::Any));
        assert!(DataType::Any.compatible_with(DataType::Text));
        assert!(!DataType::Int.compatible_with(DataType::Float));
        assert!(!DataType::Pulse.compatible_with(DataType::Bool));
    }

    #[test]
    fn test_token_data_type() {
        assert_eq!(Token::from(3).data_type(), DataType::Int);
        assert_eq!(Token::from("hi").data_type(), DataType::Text);
        assert_eq!(Token::Pulse.data_type(), DataType::Pulse);
    }

    #[test]
    fn test_int_widens_to_float() {
        assert_eq!(Token::Int(4).as_float(), Some(4.0));
        assert_eq!(Token::Text("4".into()).as_float(), None);
    }

    #[test]
    fn test_state_serialization_is_tagged() {
        let json = serde_json::to_value(SignalState::Present(Token::Int(5))).unwrap();
        assert_eq!(json["state"], "Present");
        assert_eq!(json["token"]["type"], "Int");
        assert_eq!(json["token"]["data"], 5);

        let json = serde_json::to_value(SignalState::Absent).unwrap();
        assert_eq!(json["state"], "Absent");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SignalState::Unknown.to_string(), "unknown");
        assert_eq!(SignalState::Present(Token::Int(10)).to_string(), "present(10)");
    }
}

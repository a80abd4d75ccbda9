use glam::Vec2;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 27990;
pub const DEFAULT_TICK_RATE: u32 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("encoding failed: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("malformed message: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Eight-way steering plus "not moving".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    None,
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
}

impl MoveDirection {
    /// Unit movement vector; diagonals are normalized so diagonal travel is
    /// no faster than cardinal travel.
    pub fn vector(self) -> Vec2 {
        let diagonal = std::f32::consts::FRAC_1_SQRT_2;
        match self {
            MoveDirection::None => Vec2::ZERO,
            MoveDirection::Up => Vec2::new(0.0, 1.0),
            MoveDirection::UpRight => Vec2::new(diagonal, diagonal),
            MoveDirection::Right => Vec2::new(1.0, 0.0),
            MoveDirection::DownRight => Vec2::new(diagonal, -diagonal),
            MoveDirection::Down => Vec2::new(0.0, -1.0),
            MoveDirection::DownLeft => Vec2::new(-diagonal, -diagonal),
            MoveDirection::Left => Vec2::new(-1.0, 0.0),
            MoveDirection::UpLeft => Vec2::new(-diagonal, diagonal),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveInput {
    pub direction: MoveDirection,
    pub dash: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackInput {
    pub target_pos: [f32; 2],
    pub fire_held: bool,
    pub fire_down: bool,
}

/// One player's input for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    pub frame: u32,
    pub player_number: u8,
    #[serde(rename = "move", default, skip_serializing_if = "Option::is_none")]
    pub movement: Option<MoveInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack: Option<AttackInput>,
    #[serde(default)]
    pub change_weapon: bool,
}

impl ClientMessage {
    pub fn empty(frame: u32, player_number: u8) -> Self {
        Self {
            frame,
            player_number,
            movement: None,
            attack: None,
            change_weapon: false,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(self).map_err(ProtocolError::Encode)
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

/// Authoritative broadcast: the resolved input set the server applied at
/// `frame`. This is how clients learn what actually happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    pub frame: u32,
    pub inputs: Vec<ClientMessage>,
}

impl ServerMessage {
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(self).map_err(ProtocolError::Encode)
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

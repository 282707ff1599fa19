use serde::{Deserialize, Serialize};

use crate::model::GameState;

/// Opaque connection/player identifier. Real players are assigned one by
/// the transport adapter; bot opponents get a synthetic `"bot_" + uuid`
/// value that never has a connection behind it.
pub type PlayerId = String;

/// Payload of an outbound `MatchFound` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchFoundInfo {
    pub opponent: String,
    /// 1 = left, 2 = right.
    pub side: u8,
    pub is_bot: bool,
}

/// The closed set of tagged messages this server exchanges with a client.
/// Inbound variants are sent by the client; outbound variants are sent by
/// the server. Encoded with `bincode` over the transport adapter in
/// `server::network`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    // Inbound (client -> server)
    JoinMatchmaking,
    StartBotMatch,
    SendPaddleInput { target_y: f32 },
    RequestStartGame,
    KeepAlive,

    // Outbound (server -> client)
    MatchFound(MatchFoundInfo),
    WaitingForOpponent,
    AlreadyInGame,
    GameStarted,
    GameUpdate(GameState),
    OpponentPaddleInput { target_y: f32 },
    OpponentDisconnected(GameState),
    Pong { utc_timestamp: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GameState;

    #[test]
    fn packet_round_trips_through_bincode() {
        let packets = vec![
            Packet::JoinMatchmaking,
            Packet::SendPaddleInput { target_y: 123.0 },
            Packet::MatchFound(MatchFoundInfo {
                opponent: "bot_abc".into(),
                side: 1,
                is_bot: true,
            }),
            Packet::GameUpdate(GameState::new()),
            Packet::Pong { utc_timestamp: 1_700_000_000 },
        ];
        for packet in packets {
            let bytes = bincode::serialize(&packet).unwrap();
            let decoded: Packet = bincode::deserialize(&bytes).unwrap();
            assert_eq!(packet, decoded);
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::constants::{FIELD_H, LEFT_PADDLE_X, PADDLE_H, RIGHT_PADDLE_X};

/// Which half of the table a paddle (or a session participant) occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// 1-based side number as used in `MatchFound` and `winner`.
    pub fn number(self) -> u8 {
        match self {
            Side::Left => 1,
            Side::Right => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Paddle {
    pub y: f32,
    pub target_y: f32,
}

impl Paddle {
    pub fn centered() -> Self {
        let y = (FIELD_H - PADDLE_H) / 2.0;
        Paddle { y, target_y: y }
    }

    pub fn x(side: Side) -> f32 {
        match side {
            Side::Left => LEFT_PADDLE_X,
            Side::Right => RIGHT_PADDLE_X,
        }
    }
}

/// The full authoritative state of one session's round. Serializes directly
/// into the `GameUpdate` payload; field names match the wire contract
/// (`ball`, `leftPaddle`/`rightPaddle` become `left_paddle`/`right_paddle`
/// since the wire codec is positional `bincode`, not JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub ball: Ball,
    pub left_paddle: Paddle,
    pub right_paddle: Paddle,
    pub left_score: u32,
    pub right_score: u32,
    pub game_over: bool,
    /// 0 = no winner yet, 1 = left, 2 = right.
    pub winner: u8,
    pub left_ready: bool,
    pub right_ready: bool,
    pub sequence_number: u64,
}

impl GameState {
    /// A fresh round: paddles centered, ball parked at center (callers reset
    /// it with a drawn angle via `engine::reset_ball` before the first
    /// tick), nobody ready yet.
    pub fn new() -> Self {
        GameState {
            ball: Ball {
                x: crate::constants::FIELD_W / 2.0,
                y: crate::constants::FIELD_H / 2.0,
                vx: 0.0,
                vy: 0.0,
            },
            left_paddle: Paddle::centered(),
            right_paddle: Paddle::centered(),
            left_score: 0,
            right_score: 0,
            game_over: false,
            winner: 0,
            left_ready: false,
            right_ready: false,
            sequence_number: 0,
        }
    }

    pub fn players_ready(&self) -> bool {
        self.left_ready && self.right_ready
    }

    pub fn paddle(&self, side: Side) -> &Paddle {
        match side {
            Side::Left => &self.left_paddle,
            Side::Right => &self.right_paddle,
        }
    }

    pub fn paddle_mut(&mut self, side: Side) -> &mut Paddle {
        match side {
            Side::Left => &mut self.left_paddle,
            Side::Right => &mut self.right_paddle,
        }
    }

    pub fn score_mut(&mut self, side: Side) -> &mut u32 {
        match side {
            Side::Left => &mut self.left_score,
            Side::Right => &mut self.right_score,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_state_round_trips_through_bincode() {
        let mut state = GameState::new();
        state.ball.vx = 3.5;
        state.sequence_number = 42;
        state.left_score = 2;
        state.winner = 0;

        let bytes = bincode::serialize(&state).unwrap();
        let decoded: GameState = bincode::deserialize(&bytes).unwrap();
        assert_eq!(state, decoded);
    }

    #[test]
    fn players_ready_requires_both_flags() {
        let mut state = GameState::new();
        assert!(!state.players_ready());
        state.left_ready = true;
        assert!(!state.players_ready());
        state.right_ready = true;
        assert!(state.players_ready());
    }

    #[test]
    fn side_other_is_involutive() {
        assert_eq!(Side::Left.other(), Side::Right);
        assert_eq!(Side::Right.other(), Side::Left);
        assert_eq!(Side::Left.number(), 1);
        assert_eq!(Side::Right.number(), 2);
    }
}

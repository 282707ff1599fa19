//! Wire protocol and domain model shared between the Pong server's
//! components.
//!
//! This crate has no knowledge of sockets, scheduling, or storage. It owns
//! three things:
//!
//! - the field constants and authoritative data model (`GameState`, `Ball`,
//!   `Paddle`),
//! - the closed set of tagged messages exchanged with a client (`Packet`),
//! - the pure geometry the engine steps against (`moveToward`,
//!   `swept_paddle_hit`), so it can be unit-tested in isolation from any
//!   tick loop.
//!
//! Everything here derives `Serialize`/`Deserialize` so it can cross the
//! wire with `bincode` unchanged.

pub mod collision;
pub mod constants;
pub mod model;
pub mod protocol;

pub use collision::{move_toward, swept_paddle_hit, SweptHit};
pub use constants::*;
pub use model::{Ball, GameState, Paddle, Side};
pub use protocol::{MatchFoundInfo, Packet, PlayerId};

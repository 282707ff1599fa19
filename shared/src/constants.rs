//! Field geometry and tuning constants. Units are pixels, or
//! pixels-per-frame-at-60Hz for velocities, matching the field the original
//! client renders against.

/// Paddle height.
pub const PADDLE_H: f32 = 100.0;
/// Paddle width.
pub const PADDLE_W: f32 = 16.0;
/// Play field width.
pub const FIELD_W: f32 = 800.0;
/// Play field height.
pub const FIELD_H: f32 = 600.0;
/// Ball edge length (the ball is treated as a square for collision).
pub const BALL: f32 = 16.0;
/// Paddle convergence speed, in field units per 1/60s frame.
pub const PADDLE_SPEED: f32 = 6.0;
/// Bot paddle speed is a fraction of a real paddle's speed.
pub const BOT_SPEED_FACTOR: f32 = 0.85;
/// Ball speed immediately after a reset.
pub const BALL_SPEED: f32 = 6.0;
/// First side to reach this score wins.
pub const WIN_SCORE: u32 = 5;
/// Expansion applied to a paddle's hit rect before a swept collision test.
pub const COLLISION_BUFFER: f32 = 4.0;
/// Upper bound on ball speed components; the engine clamps to this rather
/// than letting repeated glancing hits accelerate the ball without limit.
pub const MAX_BALL_SPEED: f32 = 24.0;

/// Left paddle's fixed horizontal position.
pub const LEFT_PADDLE_X: f32 = 0.0;
/// Right paddle's fixed horizontal position.
pub const RIGHT_PADDLE_X: f32 = FIELD_W - PADDLE_W;

/// Scheduler base tick period (~30Hz).
pub const BASE_TICK_MS: u64 = 33;
/// Fixed physics step; the scheduler never scales this to wall-clock drift.
pub const DELTA_TIME: f32 = 0.033;
/// Minimum spacing between motion-only broadcasts for one session.
pub const CLIENT_SYNC_MS: u64 = 100;
/// Paddle input latest-wins TTL.
pub const INPUT_TTL_MS: u64 = 5_000;

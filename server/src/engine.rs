//! The authoritative physics engine: a pure function that advances one
//! session's [`GameState`] by a fixed `Δt`. No locks, no I/O, no randomness
//! beyond the RNG the caller injects for [`reset_ball`] — this is what
//! makes a tick reproducible in tests.
//!
//! Callers: [`crate::scheduler`] calls [`step`] once per session per tick
//! and [`update_bot_target`] first for bot sessions; nothing else touches
//! this module.

use rand::Rng;
use shared::collision::{move_toward, swept_paddle_hit, Rect};
use shared::{
    Ball, GameState, Side, BALL, BALL_SPEED, BOT_SPEED_FACTOR, COLLISION_BUFFER, FIELD_H, FIELD_W,
    MAX_BALL_SPEED, PADDLE_H, PADDLE_SPEED, PADDLE_W, WIN_SCORE,
};
use std::f32::consts::PI;

/// Advance `state` by `dt` seconds. A no-op if the round is over or either
/// player has not yet pressed ready. `rng` feeds [`reset_ball`] only; the
/// rest of the step is deterministic in its inputs.
pub fn step<R: Rng + ?Sized>(state: &mut GameState, dt: f32, rng: &mut R) {
    if state.game_over || !state.players_ready() {
        return;
    }

    converge_paddles(state, dt);

    let prev = (state.ball.x, state.ball.y);
    integrate_ball(&mut state.ball, dt);
    reflect_off_walls(&mut state.ball);
    resolve_paddle_collision(state, prev);

    if sanitize_or_abort(state) {
        state.sequence_number += 1;
        return;
    }

    apply_scoring(state, rng);
    state.sequence_number += 1;
}

fn converge_paddles(state: &mut GameState, dt: f32) {
    let delta = PADDLE_SPEED * dt * 60.0;
    for side in [Side::Left, Side::Right] {
        let paddle = state.paddle_mut(side);
        paddle.y = move_toward(paddle.y, paddle.target_y, delta).clamp(0.0, FIELD_H - PADDLE_H);
    }
}

fn integrate_ball(ball: &mut Ball, dt: f32) {
    ball.x += ball.vx * dt * 60.0;
    ball.y += ball.vy * dt * 60.0;
}

fn reflect_off_walls(ball: &mut Ball) {
    if ball.y <= 0.0 || ball.y >= FIELD_H - BALL {
        ball.vy = -ball.vy;
        ball.y = ball.y.clamp(0.0, FIELD_H - BALL);
    }
}

/// The paddle's hit rect for this tick's swept test. The buffer only
/// widens the X axis (the axis the ball travels along, where a fast ball
/// could otherwise tunnel through between frames); the Y axis uses the
/// paddle's real extent so a ball that merely grazes past above or below
/// is not counted as a hit.
fn expanded_paddle_rect(side: Side, paddle_y: f32) -> Rect {
    let x = shared::Paddle::x(side);
    Rect {
        x: x - COLLISION_BUFFER / 2.0,
        y: paddle_y,
        w: PADDLE_W + COLLISION_BUFFER,
        h: PADDLE_H,
    }
}

fn resolve_paddle_collision(state: &mut GameState, prev: (f32, f32)) {
    let curr = (state.ball.x, state.ball.y);

    // Tie-break: only test the side the ball is moving toward.
    if state.ball.vx <= 0.0 {
        let rect = expanded_paddle_rect(Side::Left, state.left_paddle.y);
        let near_face_x = shared::Paddle::x(Side::Left) + PADDLE_W + COLLISION_BUFFER / 2.0;
        let hit = swept_paddle_hit(prev, curr, BALL, rect, near_face_x, false);
        if hit.hit {
            apply_hit_response(state, Side::Left);
            return;
        }
    }
    if state.ball.vx >= 0.0 {
        let rect = expanded_paddle_rect(Side::Right, state.right_paddle.y);
        let near_face_x = shared::Paddle::x(Side::Right) - COLLISION_BUFFER / 2.0;
        let hit = swept_paddle_hit(prev, curr, BALL, rect, near_face_x, true);
        if hit.hit {
            apply_hit_response(state, Side::Right);
        }
    }
}

fn apply_hit_response(state: &mut GameState, side: Side) {
    let paddle_y = state.paddle(side).y;
    let paddle_x = shared::Paddle::x(side);
    let ball = &mut state.ball;

    let speed = (ball.vx * ball.vx + ball.vy * ball.vy).sqrt();
    let r = (paddle_y + PADDLE_H / 2.0) - (ball.y + BALL / 2.0);
    let n = (r / (PADDLE_H / 2.0)).clamp(-1.0, 1.0);
    let theta = n * 0.8;

    let magnitude_x = (speed * theta.cos()).abs();
    ball.vx = match side {
        Side::Left => magnitude_x,
        Side::Right => -magnitude_x,
    };
    ball.vy = -speed * theta.sin();
    ball.vx = ball.vx.clamp(-MAX_BALL_SPEED, MAX_BALL_SPEED);
    ball.vy = ball.vy.clamp(-MAX_BALL_SPEED, MAX_BALL_SPEED);

    ball.x = match side {
        Side::Left => paddle_x + PADDLE_W + 0.1,
        Side::Right => paddle_x - BALL - 0.1,
    };
}

fn apply_scoring<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R) {
    if state.ball.x < 0.0 {
        state.right_score += 1;
        reset_ball(&mut state.ball, -1.0, rng);
    } else if state.ball.x > FIELD_W {
        state.left_score += 1;
        reset_ball(&mut state.ball, 1.0, rng);
    } else {
        return;
    }

    if state.left_score >= WIN_SCORE || state.right_score >= WIN_SCORE {
        state.game_over = true;
        state.winner = if state.left_score > state.right_score { 1 } else { 2 };
    }
}

/// Reposition the ball at center and serve it toward `dir` (`-1.0` or
/// `1.0`) at a random angle in `[-pi/8, pi/8]`.
pub fn reset_ball<R: Rng + ?Sized>(ball: &mut Ball, dir: f32, rng: &mut R) {
    ball.x = FIELD_W / 2.0;
    ball.y = FIELD_H / 2.0;
    let angle: f32 = rng.gen_range(-PI / 8.0..=PI / 8.0);
    ball.vx = BALL_SPEED * dir * angle.cos();
    ball.vy = BALL_SPEED * angle.sin();
}

/// Predictive bot aim: project where the ball will cross the right
/// paddle's plane if it's heading that way, otherwise just chase its
/// current height. Only ever advances `right_paddle.target_y`; the next
/// [`step`] call converges `right_paddle.y` toward it like any other
/// paddle.
pub fn update_bot_target(state: &mut GameState) {
    let ball = state.ball;
    let right_x = shared::Paddle::x(Side::Right);

    let y_pred = if ball.vx > 0.0 {
        let t = (right_x - ball.x) / ball.vx.abs();
        (ball.y + ball.vy * t).clamp(0.0, FIELD_H - BALL)
    } else {
        ball.y
    };

    let aim = (y_pred - PADDLE_H / 2.0 + BALL / 2.0).clamp(0.0, FIELD_H - PADDLE_H);
    let right = &mut state.right_paddle;
    right.target_y = move_toward(right.y, aim, PADDLE_SPEED * BOT_SPEED_FACTOR);
}

/// Clamp NaN/out-of-range ball state that would otherwise violate the
/// engine's invariants. Returns `true` if the violation was severe enough
/// to force `gameOver` (never for merely out-of-range values, which are
/// silently clamped and logged at debug).
fn sanitize_or_abort(state: &mut GameState) -> bool {
    let ball = &mut state.ball;
    if ball.x.is_nan() || ball.y.is_nan() || ball.vx.is_nan() || ball.vy.is_nan() {
        log::error!("engine: NaN ball state detected, forcing game over");
        state.game_over = true;
        state.winner = 0;
        return true;
    }
    if ball.vx.abs() > MAX_BALL_SPEED || ball.vy.abs() > MAX_BALL_SPEED {
        log::debug!("engine: clamping ball velocity exceeding MAX_BALL_SPEED");
        ball.vx = ball.vx.clamp(-MAX_BALL_SPEED, MAX_BALL_SPEED);
        ball.vy = ball.vy.clamp(-MAX_BALL_SPEED, MAX_BALL_SPEED);
    }
    false
}

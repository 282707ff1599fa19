//! Timing smoke tests for the hot paths that run once per session per
//! tick: physics (`engine::step`), the swept collision test it calls
//! internally, and `bincode` (de)serialization of the wire protocol. No
//! criterion harness — plain `#[test]` functions with `Instant`, the same
//! style as the teacher's own benchmark suite.
//!
//! These assert generous upper bounds, not tight regressions: the goal is
//! to catch an accidental O(n^2) or an unbounded allocation, not to pin an
//! exact nanosecond figure that would vary across CI hardware.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;

use server::engine;
use shared::collision::{swept_paddle_hit, Rect};
use shared::{Ball, GameState, Packet, BALL};

/// A single session's physics step must be cheap enough that a server
/// juggling hundreds of concurrent sessions per tick doesn't fall behind
/// the scheduler's busy cadence (33ms per tick).
#[test]
fn engine_step_throughput() {
    let mut state = GameState::new();
    state.left_ready = true;
    state.right_ready = true;
    state.ball = Ball { x: 400.0, y: 300.0, vx: 6.0, vy: 3.0 };
    let mut rng = StdRng::seed_from_u64(1);

    let iterations = 100_000;
    let start = Instant::now();
    for _ in 0..iterations {
        engine::step(&mut state, 1.0 / 30.0, &mut rng);
        if state.game_over {
            state.game_over = false;
            state.left_score = 0;
            state.right_score = 0;
        }
    }
    let duration = start.elapsed();

    println!(
        "engine::step: {iterations} iterations in {duration:?} ({:.2} ns/iter)",
        duration.as_nanos() as f64 / iterations as f64
    );
    assert!(duration.as_millis() < 500, "physics step got far slower than a single tick budget");
}

/// `update_bot_target` runs once per bot session per tick alongside
/// `step`; it should be a few float ops, not a hidden allocation.
#[test]
fn bot_target_update_throughput() {
    let mut state = GameState::new();
    state.ball = Ball { x: 200.0, y: 150.0, vx: 6.0, vy: -3.0 };

    let iterations = 200_000;
    let start = Instant::now();
    for _ in 0..iterations {
        engine::update_bot_target(&mut state);
    }
    let duration = start.elapsed();

    println!(
        "update_bot_target: {iterations} iterations in {duration:?} ({:.2} ns/iter)",
        duration.as_nanos() as f64 / iterations as f64
    );
    assert!(duration.as_millis() < 200);
}

/// The swept paddle-hit test runs up to twice per ball per tick (once per
/// candidate side); it's pure arithmetic and should be effectively free.
#[test]
fn swept_collision_check_throughput() {
    let rect = Rect { x: -2.0, y: 250.0, w: 20.0, h: 100.0 };
    let iterations = 1_000_000;
    let start = Instant::now();

    for i in 0..iterations {
        let y = 280.0 + (i % 40) as f32;
        let _ = swept_paddle_hit((30.0, y), (10.0, y), BALL, rect, 16.0, false);
    }

    let duration = start.elapsed();
    println!(
        "swept_paddle_hit: {iterations} iterations in {duration:?} ({:.2} ns/iter)",
        duration.as_nanos() as f64 / iterations as f64
    );
    assert!(duration.as_millis() < 300);
}

/// Every `GameUpdate` broadcast serializes a full `GameState`; this must
/// stay cheap since it happens up to twice per session per tick.
#[test]
fn game_state_serialization_throughput() {
    let packet = Packet::GameUpdate(GameState::new());
    let iterations = 50_000;

    let start = Instant::now();
    let mut total_bytes = 0usize;
    for _ in 0..iterations {
        let bytes = bincode::serialize(&packet).unwrap();
        total_bytes += bytes.len();
    }
    let serialize_duration = start.elapsed();

    let bytes = bincode::serialize(&packet).unwrap();
    let start = Instant::now();
    for _ in 0..iterations {
        let _: Packet = bincode::deserialize(&bytes).unwrap();
    }
    let deserialize_duration = start.elapsed();

    println!(
        "GameUpdate: serialize {iterations} in {serialize_duration:?}, deserialize in {deserialize_duration:?}, avg {} bytes/frame",
        total_bytes / iterations
    );
    assert!(serialize_duration.as_millis() < 500);
    assert!(deserialize_duration.as_millis() < 500);
}

/// A full match queue's worth of pending players, paired off, shouldn't
/// take longer than a few scheduler ticks even at a few hundred waiting.
#[test]
fn pair_pop_scales_linearly_with_queue_depth() {
    use server::match_queue::{InMemoryMatchQueue, MatchQueueClient};

    let queue = InMemoryMatchQueue::default();
    let players = 2_000;
    let rt = tokio::runtime::Runtime::new().unwrap();

    let start = Instant::now();
    rt.block_on(async {
        for i in 0..players {
            queue.enqueue(&format!("player-{i}")).await.unwrap();
        }
        let mut pairs = 0;
        while queue.pair_pop().await.unwrap().is_some() {
            pairs += 1;
        }
        assert_eq!(pairs, players / 2);
    });
    let duration = start.elapsed();

    println!("pair_pop: drained {players} players in {duration:?}");
    assert!(duration.as_millis() < 1000);
}

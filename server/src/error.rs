//! Error enums at each component boundary. The engine itself never returns
//! an error — it is a pure function over `GameState` and logs anomalies
//! rather than failing its caller — so there is no `EngineError` type here,
//! only the policy documented on [`crate::engine::step`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("a session already exists for player {0}")]
    SessionAlreadyExists(String),
    #[error("no session found for {0}")]
    SessionNotFound(String),
}

#[derive(Debug, Error)]
pub enum MatchQueueError {
    #[error("coordination store error: {0}")]
    Coordination(#[from] redis::RedisError),
    #[error("pair-pop script returned an unexpected shape")]
    NotAtomic,
}

#[derive(Debug, Error)]
pub enum HubError {
    #[error(transparent)]
    SessionStore(#[from] SessionStoreError),
    #[error(transparent)]
    MatchQueue(#[from] MatchQueueError),
    #[error("broadcast to {0} failed")]
    Broadcast(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("tick panicked while stepping session {0}")]
    TickPanicked(String),
}

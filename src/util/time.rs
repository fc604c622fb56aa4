//! Time utilities for match simulation

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Default tick rate
pub const SIMULATION_TPS: u32 = 30; // 30 ticks per second

/// Fade-out duration when the match scene comes up (seconds)
pub const STARTUP_FADE_SECS: f32 = 0.5;
/// Wait between round setup and live play (seconds)
pub const ROUND_START_DELAY_SECS: f32 = 2.0;
/// Wait between a round end and the next round's setup (seconds)
pub const NEXT_ROUND_DELAY_SECS: f32 = 3.0;
/// Wait between the deciding round end and the end-game screen (seconds)
pub const END_GAME_DELAY_SECS: f32 = 1.0;
/// Time the end-game screen stays up before the match completes (seconds)
pub const END_GAME_TIME_SECS: f32 = 10.0;

/// Delta time for one tick at the given rate (in seconds)
pub fn tick_delta(tick_rate: u32) -> f32 {
    1.0 / tick_rate.max(1) as f32
}

/// Tick interval for the given rate
pub fn tick_duration(tick_rate: u32) -> Duration {
    Duration::from_micros(1_000_000 / tick_rate.max(1) as u64)
}

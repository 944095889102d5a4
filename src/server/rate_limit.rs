use std::sync::Mutex;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

/// One process-wide counter over fixed one-minute windows.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    state: Mutex<Window>,
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

impl RateLimiter {
    pub fn per_minute(limit: u32) -> Self {
        Self::with_window(limit, WINDOW)
    }

    pub fn with_window(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new(Window {
                started: Instant::now(),
                count: 0,
            }),
        }
    }

    /// Count one request; false when the current window is already full.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&self, now: Instant) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if now.duration_since(state.started) >= self.window {
            state.started = now;
            state.count = 0;
        }
        if state.count >= self.limit {
            return false;
        }
        state.count += 1;
        true
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

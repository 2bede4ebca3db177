use std::time::{Duration, Instant};

/// Frame timing plus the pausable animation clock. While paused, the scene
/// keeps rendering with a frozen `total_seconds`.
pub struct Time {
    delta: Duration,
    total_seconds: f64,
    paused: bool,
    last_update: Instant,
}

impl Time {
    pub fn new() -> Time {
        Time {
            delta: Duration::from_secs(0),
            total_seconds: 0.0,
            paused: false,
            last_update: Instant::now(),
        }
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn total_seconds(&self) -> f32 {
        self.total_seconds as f32
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn update(&mut self) {
        let delta_time = self.last_update.elapsed();
        self.last_update = Instant::now();

        self.delta = delta_time;
        if !self.paused {
            self.total_seconds += delta_time.as_secs_f64();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pausing_freezes_the_animation_clock() {
        let mut time = Time::new();
        time.update();

        time.toggle_pause();
        time.update();
        let frozen = time.total_seconds();
        time.update();
        assert_eq!(time.total_seconds(), frozen);

        time.toggle_pause();
        std::thread::sleep(Duration::from_millis(2));
        time.update();
        assert!(time.total_seconds() > frozen);
    }
}

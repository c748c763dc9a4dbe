//! Per-user spacing of `create` requests.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Admits one attempt per user per window.
///
/// Rejected attempts do not restart the window.
pub struct Cooldown {
    window: Duration,
    admitted: Mutex<HashMap<String, Instant>>,
}

impl Cooldown {
    /// A zero window admits everything.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            admitted: Mutex::new(HashMap::new()),
        }
    }

    /// Record an attempt by `user_id`, or return how long until the next
    /// attempt would be admitted.
    pub fn try_admit(&self, user_id: &str) -> Result<(), Duration> {
        if self.window.is_zero() {
            return Ok(());
        }

        let now = Instant::now();
        let mut admitted = self.admitted.lock();
        admitted.retain(|_, at| now.duration_since(*at) < self.window);

        if let Some(at) = admitted.get(user_id) {
            return Err(self.window - now.duration_since(*at));
        }
        admitted.insert(user_id.to_string(), now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_window_never_limits() {
        let cooldown = Cooldown::new(Duration::ZERO);
        for _ in 0..3 {
            assert!(cooldown.try_admit("42").is_ok());
        }
    }

    #[test]
    fn test_second_attempt_inside_window_is_refused() {
        let cooldown = Cooldown::new(Duration::from_secs(10));
        assert!(cooldown.try_admit("42").is_ok());

        let left = cooldown.try_admit("42").unwrap_err();
        assert!(left > Duration::from_secs(9) && left <= Duration::from_secs(10));
        assert!(cooldown.try_admit("43").is_ok(), "users are limited separately");
    }

    #[test]
    fn test_window_expires() {
        let cooldown = Cooldown::new(Duration::from_millis(30));
        assert!(cooldown.try_admit("42").is_ok());
        std::thread::sleep(Duration::from_millis(60));
        assert!(cooldown.try_admit("42").is_ok());
        assert_eq!(cooldown.admitted.lock().len(), 1);
    }
}

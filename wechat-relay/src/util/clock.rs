//! Wall-clock helpers.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix time in whole seconds.
///
/// A clock set before the epoch yields 0 rather than an error.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_now_is_after_2023() {
        assert!(unix_now() > 1_672_531_200);
    }
}

// src/priority.rs
//! Gotify priority (0–10, but any integer is accepted) → ntfy priority (1–5).

/// Lowest ntfy priority ("min").
pub const NTFY_MIN_PRIORITY: u8 = 1;
/// Highest ntfy priority ("max").
pub const NTFY_MAX_PRIORITY: u8 = 5;

/// Rescale a Gotify priority onto the ntfy scale.
///
/// `round(p / 2.5) + 1`, clamped to `[1, 5]`. Rounding is half away from zero,
/// so 0→1, 5→3, 6→3, 8→4, 10→5. Out-of-range input is clamped, never rejected.
pub fn map_priority(gotify: i64) -> u8 {
    let scaled = (gotify as f64 / 2.5).round() as i64;
    scaled
        .saturating_add(1)
        .clamp(i64::from(NTFY_MIN_PRIORITY), i64::from(NTFY_MAX_PRIORITY)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_map_to_min_and_max() {
        assert_eq!(map_priority(0), 1);
        assert_eq!(map_priority(10), 5);
    }

    #[test]
    fn gotify_scale_stays_in_range_and_is_monotonic() {
        let mut prev = 0u8;
        for g in 0..=10 {
            let p = map_priority(g);
            assert!((1..=5).contains(&p), "g={g} -> {p}");
            assert!(p >= prev, "not monotonic at g={g}");
            prev = p;
        }
    }

    #[test]
    fn known_points() {
        // 6 / 2.5 = 2.4 -> 2, +1
        assert_eq!(map_priority(6), 3);
        assert_eq!(map_priority(4), 3);
        assert_eq!(map_priority(3), 2);
        assert_eq!(map_priority(8), 4);
    }

    #[test]
    fn unbounded_input_is_clamped() {
        assert_eq!(map_priority(-7), 1);
        assert_eq!(map_priority(i64::MIN), 1);
        assert_eq!(map_priority(42), 5);
        assert_eq!(map_priority(i64::MAX), 5);
    }
}

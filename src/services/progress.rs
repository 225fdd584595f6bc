use log::info;

use crate::domain::clock::format_ts;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eta {
    pub percent: f64,
    pub remaining_secs: i64,
    pub finish_at: i64,
}

/// Estimates when a forward scan will be done from how much of the data
/// interval it has covered since the run (or the last mode switch) began.
pub struct ScanProgress {
    started_at: i64,
}

impl ScanProgress {
    pub fn new(now: i64) -> Self {
        Self { started_at: now }
    }

    pub fn restart(&mut self, now: i64) {
        self.started_at = now;
    }

    /// With no `end` the target is "now", which itself keeps moving; the
    /// first estimate is used once as the new target.
    pub fn estimate(&self, now: i64, forward_start: i64, next_start: i64, end: Option<i64>) -> Option<Eta> {
        let lapsed = (now - self.started_at) as f64;
        let covered = (next_start - forward_start) as f64;
        if lapsed <= 0.0 || covered <= 0.0 {
            return None;
        }

        let fraction = |fetch_end: f64| covered / (fetch_end - forward_start as f64);
        let finish = |fraction: f64| self.started_at as f64 + lapsed / fraction;

        let mut done = fraction(end.unwrap_or(now) as f64);
        if done <= 0.0 || !done.is_finite() {
            return None;
        }
        let mut finish_at = finish(done);
        if end.is_none() {
            done = fraction(finish_at);
            if done <= 0.0 || !done.is_finite() {
                return None;
            }
            finish_at = finish(done);
        }

        let finish_at = finish_at.round() as i64;
        Some(Eta {
            percent: (done * 100.0).min(100.0),
            remaining_secs: (finish_at - now).max(0),
            finish_at,
        })
    }

    pub fn log(&self, now: i64, forward_start: i64, next_start: i64, end: Option<i64>) {
        if let Some(eta) = self.estimate(now, forward_start, next_start, end) {
            info!(
                "  → Progress: {:.1}% covered, ~{} left (done around {})",
                eta.percent,
                format_duration(eta.remaining_secs),
                format_ts(eta.finish_at)
            );
        }
    }
}

fn format_duration(secs: i64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{hours}h{minutes:02}m")
    } else {
        format!("{minutes}m{:02}s", secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halfway_with_fixed_end() {
        let progress = ScanProgress::new(1_000);
        let eta = progress.estimate(1_100, 0, 5_000, Some(10_000)).unwrap();

        assert_eq!(eta.percent, 50.0);
        assert_eq!(eta.finish_at, 1_200);
        assert_eq!(eta.remaining_secs, 100);
    }

    #[test]
    fn test_open_end_chases_moving_target() {
        let progress = ScanProgress::new(10_000);
        // Covered 5000 of the 10000 seconds up to now in 100 seconds.
        let eta = progress.estimate(10_100, 100, 5_100, None).unwrap();

        // First pass finishes at 10_200, which then becomes the target.
        assert_eq!(eta.finish_at, 10_202);
        assert!(eta.percent < 50.0);
    }

    #[test]
    fn test_no_estimate_without_progress() {
        let progress = ScanProgress::new(1_000);
        assert_eq!(progress.estimate(1_000, 0, 5_000, Some(10_000)), None);
        assert_eq!(progress.estimate(1_100, 5_000, 5_000, Some(10_000)), None);
    }

    #[test]
    fn test_overshoot_reports_nothing_left() {
        let progress = ScanProgress::new(1_000);
        let eta = progress.estimate(1_100, 0, 12_000, Some(10_000)).unwrap();
        assert_eq!(eta.remaining_secs, 0);
        assert_eq!(eta.percent, 100.0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(3_725), "1h02m");
        assert_eq!(format_duration(125), "2m05s");
    }
}

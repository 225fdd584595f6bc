use std::collections::BTreeSet;
use std::fmt;

use crate::config::settings::IngestSettings;

#[derive(Debug, Clone)]
pub struct CursorSettings {
    pub page_size: usize,
    pub gap_threshold: i64,
    pub backward_jump: i64,
    pub quiet_pages_before_reverse: u32,
}

impl From<&IngestSettings> for CursorSettings {
    fn from(settings: &IngestSettings) -> Self {
        Self {
            page_size: settings.page_size,
            gap_threshold: settings.gap_threshold_secs,
            backward_jump: settings.backward_jump_secs,
            quiet_pages_before_reverse: settings.quiet_pages_before_reverse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Forward,
    /// Walking back from `origin` one jump per page until
    /// `quiet_pages` consecutive pages add nothing new.
    Backward { origin: i64, quiet_pages: u32 },
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Backward { .. } => write!(f, "backward catch-up"),
        }
    }
}

/// A hole in coverage between two consecutive observed start times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    pub before: i64,
    pub after: i64,
}

impl Gap {
    pub fn seconds(&self) -> i64 {
        self.after - self.before
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardStep {
    pub next_start: i64,
    pub gap: Option<Gap>,
    pub forced: bool,
}

/// Picks the next `since` value after a page fetched at `fetch_start`.
///
/// Normally the latest observed start time. If the sorted start times
/// (with `fetch_start` itself as the first value) contain a jump larger
/// than `gap_threshold`, the page stops at the value before the first such
/// jump so the next request re-covers it. A result that does not move past
/// `fetch_start` is pushed forward by `gap_threshold`.
pub fn next_forward_start(fetch_start: i64, started: &[i64], gap_threshold: i64) -> ForwardStep {
    let mut observed: BTreeSet<i64> = started
        .iter()
        .copied()
        .filter(|ts| *ts > fetch_start)
        .collect();
    observed.insert(fetch_start);

    let gap = observed
        .iter()
        .zip(observed.iter().skip(1))
        .find(|(before, after)| **after - **before > gap_threshold)
        .map(|(before, after)| Gap {
            before: *before,
            after: *after,
        });

    let mut next_start = match gap {
        Some(gap) => gap.before,
        None => observed.last().copied().unwrap_or(fetch_start),
    };
    let forced = next_start <= fetch_start;
    if forced {
        next_start = fetch_start + gap_threshold;
    }

    ForwardStep {
        next_start,
        gap,
        forced,
    }
}

/// Start point when no explicit start is given: shortly before the newest
/// stored match, or the lookback horizon if the store is empty or stale.
pub fn resume_point(max_started: Option<i64>, now: i64, settings: &IngestSettings) -> i64 {
    let horizon = now - settings.default_lookback_secs;
    match max_started {
        Some(latest) if latest > horizon => latest - settings.resume_overlap_secs,
        _ => horizon,
    }
}

/// What one page tells the cursor.
#[derive(Debug, Clone, Copy)]
pub struct PageObservation<'a> {
    pub received: usize,
    pub started: &'a [i64],
    pub new_matches: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Exhausted,
    PassedEnd,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted => write!(f, "short page, caught up with the live stream"),
            Self::PassedEnd => write!(f, "passed the requested end time"),
        }
    }
}

/// Result of feeding one page to the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    pub previous_start: i64,
    pub next_start: i64,
    pub gap: Option<Gap>,
    pub forced: bool,
    pub resumed_forward_at: Option<i64>,
    pub stop: Option<StopReason>,
}

pub struct IngestionCursor {
    settings: CursorSettings,
    fetch_start: i64,
    last_known_good_start: i64,
    end: Option<i64>,
    mode: ScanMode,
    forward_origin: Option<i64>,
}

impl IngestionCursor {
    pub fn forward(start: i64, end: Option<i64>, settings: CursorSettings) -> Self {
        Self {
            settings,
            fetch_start: start,
            last_known_good_start: start,
            end,
            mode: ScanMode::Forward,
            forward_origin: Some(start),
        }
    }

    pub fn catching_up(start: i64, settings: CursorSettings) -> Self {
        Self {
            settings,
            fetch_start: start,
            last_known_good_start: start,
            end: None,
            mode: ScanMode::Backward {
                origin: start,
                quiet_pages: 0,
            },
            forward_origin: None,
        }
    }

    /// Backward catch-up is only worth it for open-ended runs that start
    /// more than one jump behind `now`.
    pub fn for_window(start: i64, end: Option<i64>, now: i64, settings: CursorSettings) -> Self {
        if end.is_none() && now - start > settings.backward_jump {
            Self::catching_up(start, settings)
        } else {
            Self::forward(start, end, settings)
        }
    }

    pub fn fetch_start(&self) -> i64 {
        self.fetch_start
    }

    /// The `since` of the last page consumed; a next start at or before it
    /// counts as no progress.
    pub fn last_known_good_start(&self) -> i64 {
        self.last_known_good_start
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    pub fn end(&self) -> Option<i64> {
        self.end
    }

    /// Where forward scanning began; `None` while catching up.
    pub fn forward_origin(&self) -> Option<i64> {
        self.forward_origin
    }

    pub fn page_size(&self) -> usize {
        self.settings.page_size
    }

    pub fn advance(&mut self, page: PageObservation<'_>) -> Advance {
        self.last_known_good_start = self.fetch_start;
        let previous_start = self.last_known_good_start;
        let mut advance = Advance {
            previous_start,
            next_start: previous_start,
            gap: None,
            forced: false,
            resumed_forward_at: None,
            stop: None,
        };

        match self.mode {
            ScanMode::Forward => {
                let step = next_forward_start(self.last_known_good_start, page.started, self.settings.gap_threshold);
                advance.next_start = step.next_start;
                advance.gap = step.gap;
                advance.forced = step.forced;
            }
            ScanMode::Backward {
                origin,
                quiet_pages,
            } => {
                let quiet_pages = if page.new_matches == 0 {
                    quiet_pages + 1
                } else {
                    0
                };
                if quiet_pages >= self.settings.quiet_pages_before_reverse {
                    let resume = origin + 1;
                    self.mode = ScanMode::Forward;
                    self.forward_origin = Some(resume);
                    advance.next_start = resume;
                    advance.resumed_forward_at = Some(resume);
                } else {
                    self.mode = ScanMode::Backward {
                        origin,
                        quiet_pages,
                    };
                    advance.next_start = previous_start - self.settings.backward_jump;
                }
            }
        }

        advance.stop = self.stop_reason(page.received, advance.next_start);
        self.fetch_start = advance.next_start;
        advance
    }

    fn stop_reason(&self, received: usize, next_start: i64) -> Option<StopReason> {
        if received < self.settings.page_size {
            Some(StopReason::Exhausted)
        } else if self.end.is_some_and(|end| next_start > end) {
            Some(StopReason::PassedEnd)
        } else {
            None
        }
    }
}

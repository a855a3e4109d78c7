//! Tuning probe bitmap and sampling-window selection.

/// Pass/fail results of one tuning cycle.
///
/// The tuning command is issued twice per physical tap, so the bitmap is
/// `2 * tap_num` bits long: offsets `i` and `i + tap_num` probe the same tap
/// in two independent trials. Rebuilt from scratch for every tuning cycle.
#[derive(Debug, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TapBitmap {
    bits: u32,
    tap_num: u8,
}

impl TapBitmap {
    /// Empty (all-fail) bitmap for a controller reporting `tap_num` taps.
    pub fn new(tap_num: u8) -> Self {
        assert!(tap_num > 0 && tap_num <= 16);
        Self { bits: 0, tap_num }
    }

    /// Record the outcome of probe `index` in `[0, 2 * tap_num)`.
    pub fn record(&mut self, index: u32, pass: bool) {
        assert!(index < self.probe_count());
        if pass {
            self.bits |= 1 << index;
        } else {
            self.bits &= !(1 << index);
        }
    }

    pub fn get(&self, index: u32) -> bool {
        self.bits & (1 << index) != 0
    }

    fn clear(&mut self, index: u32) {
        self.bits &= !(1 << index);
    }

    /// Total probe count, `2 * tap_num`.
    pub fn probe_count(&self) -> u32 {
        u32::from(self.tap_num) * 2
    }

    /// True when every probe failed.
    pub fn all_failed(&self) -> bool {
        self.bits == 0
    }

    pub fn tap_num(&self) -> u8 {
        self.tap_num
    }
}

/// A run of consecutive passing probes. Transient; only the selected tap
/// survives the tuning cycle.
#[derive(Debug, Copy, Clone, Default)]
pub(crate) struct TapWindow {
    pub start: u32,
    pub end: u32,
    pub count: u32,
}

/// Shortest run of confirmed-good taps considered stable.
pub(crate) const MIN_TAP_RUN: u32 = 3;

/// Merge the two trials: a tap counts as good only if both probes passed.
/// A disagreeing pair is cleared on both sides, never retried.
pub(crate) fn merge_probe_pairs(taps: &mut TapBitmap) {
    let tap_num = u32::from(taps.tap_num());
    for i in 0..taps.probe_count() {
        let pair = if i < tap_num { i + tap_num } else { i - tap_num };
        if !taps.get(i) {
            taps.clear(pair);
        }
    }
}

/// Find the longest consecutive run of passing probes across the full doubled
/// bitmap (so windows wrapping the physical tap range are still seen). Ties
/// keep the earliest run.
pub(crate) fn longest_run(taps: &TapBitmap) -> TapWindow {
    let mut best = TapWindow::default();
    let mut ntap = 0;

    for i in 0..taps.probe_count() {
        if taps.get(i) {
            ntap += 1;
        } else {
            if ntap > best.count {
                best = TapWindow {
                    start: i - ntap,
                    end: i - 1,
                    count: ntap,
                };
            }
            ntap = 0;
        }
    }

    // Trailing run.
    if ntap > best.count {
        let count = taps.probe_count();
        best = TapWindow {
            start: count - ntap,
            end: count - 1,
            count: ntap,
        };
    }

    best
}

/// Tap programmed for an accepted window: its center, folded back into the
/// physical tap range.
pub(crate) fn center_tap(window: &TapWindow, tap_num: u8) -> u8 {
    ((window.start + window.end) / 2 % u32::from(tap_num)) as u8
}

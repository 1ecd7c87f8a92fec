//! Temporal debounce state machine (C7): turns noisy per-tick frequency
//! estimates into a stable published pitch, resolving octave and
//! subharmonic ambiguity.
//!
//! Grounded line-for-line on `lingot-core.c`'s `lingot_core_frequencies_related`
//! and `lingot_core_frequency_locker`; the C function's `static` locals
//! become the fields of `FrequencyLocker` below.

const TOLERANCE: f64 = 5e-2;
const MAX_DIVISOR: i32 = 4;
const NHITS_TO_LOCK: u32 = 4;
const NHITS_TO_UNLOCK: u32 = 5;
const NHITS_TO_RELOCK: u32 = 6;
const NHITS_TO_RELOCK_UP: u32 = 8;

/// `related(f1, f2, min_frequency)`: tries divisors on the smaller of the
/// two frequencies; returns the multipliers that map each input back to
/// their shared implied fundamental if one is found within `TOLERANCE`.
fn frequencies_related(freq1: f64, freq2: f64, min_frequency: f64) -> Option<(f64, f64)> {
    if freq1 == 0.0 || freq2 == 0.0 {
        return None;
    }

    let (small, big, small_is_freq1) = if freq2 < freq1 { (freq2, freq1, false) } else { (freq1, freq2, true) };

    for divisor in 1..=MAX_DIVISOR {
        if min_frequency * divisor as f64 > small {
            break;
        }
        let frac = big * divisor as f64 / small;
        let rounded = frac.round();
        if (frac - rounded).abs() < TOLERANCE {
            return Some(if small_is_freq1 {
                (1.0 / divisor as f64, 1.0 / rounded)
            } else {
                (1.0 / rounded, 1.0 / divisor as f64)
            });
        }
    }
    None
}

/// Debounces raw per-tick frequency estimates into a stable published
/// pitch. One instance lives for the lifetime of a running `Core`.
#[derive(Debug, Clone)]
pub struct FrequencyLocker {
    locked: bool,
    current_f: f64,
    hits: u32,
    rehits: u32,
    rehits_up: u32,
    prev_mul: f64,
    prev_mul2: f64,
}

impl Default for FrequencyLocker {
    fn default() -> Self {
        FrequencyLocker {
            locked: false,
            current_f: 0.0,
            hits: 0,
            rehits: 0,
            rehits_up: 0,
            prev_mul: 0.0,
            prev_mul2: 0.0,
        }
    }
}

impl FrequencyLocker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// The locker's own running estimate of the fundamental, including
    /// while still unlocked. Per spec.md's design notes, the candidate
    /// selector should be biased toward this value (not just the last
    /// *published* frequency) to keep continuity across the lock/unlock
    /// boundary.
    pub fn current_frequency(&self) -> f64 {
        self.current_f
    }

    /// Feeds one tick's raw frequency estimate (0.0 = no pitch this tick)
    /// and returns the published fundamental (0.0 = still unlocked/no
    /// pitch).
    pub fn update(&mut self, freq: f64, min_frequency: f64) -> f64 {
        let related = frequencies_related(freq, self.current_f, min_frequency);
        let (mut multiplier, mut multiplier2) = related.unwrap_or((0.0, 0.0));
        let mut consistent = related.is_some();

        let result = if !self.locked {
            if freq > 0.0 && self.current_f == 0.0 {
                consistent = true;
                multiplier = 1.0;
                multiplier2 = 1.0;
            }

            if consistent && multiplier == 1.0 && multiplier2 == 1.0 {
                self.current_f = freq * multiplier;
                self.hits += 1;
                if self.hits >= NHITS_TO_LOCK {
                    self.locked = true;
                    self.hits = 0;
                }
            } else {
                self.hits = 0;
                self.current_f = 0.0;
            }
            0.0
        } else {
            let mut fail = false;
            let mut result = 0.0;

            if consistent {
                if (multiplier2 - 1.0).abs() < 1e-5 {
                    result = freq * multiplier;
                    self.current_f = result;
                    self.rehits = 0;

                    if (multiplier - 1.0).abs() > 1e-5 {
                        if (multiplier - self.prev_mul).abs() < 1e-5 {
                            self.rehits_up += 1;
                            if self.rehits_up >= NHITS_TO_RELOCK_UP {
                                result = freq;
                                self.current_f = result;
                                self.rehits_up = 0;
                                fail = false;
                            }
                        } else {
                            self.rehits_up = 0;
                        }
                    } else {
                        self.rehits_up = 0;
                    }
                } else {
                    self.rehits_up = 0;
                    if (multiplier2 - 0.5).abs() < 1e-5 {
                        self.hits = self.hits.saturating_sub(1);
                    }
                    fail = true;
                    if freq * multiplier >= min_frequency
                        && (multiplier2 - self.prev_mul2).abs() < 1e-5
                    {
                        self.rehits += 1;
                        if self.rehits >= NHITS_TO_RELOCK {
                            result = freq * multiplier;
                            self.current_f = result;
                            self.rehits = 0;
                            fail = false;
                        }
                    }
                }
            } else {
                fail = true;
            }

            if fail {
                result = self.current_f;
                self.hits += 1;
                if self.hits >= NHITS_TO_UNLOCK {
                    self.current_f = 0.0;
                    self.locked = false;
                    self.hits = 0;
                    result = 0.0;
                }
            } else {
                self.hits = 0;
            }

            result
        };

        self.prev_mul = multiplier;
        self.prev_mul2 = multiplier2;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locks_after_four_consistent_hits() {
        let mut locker = FrequencyLocker::new();
        let mut last = 0.0;
        for _ in 0..4 {
            last = locker.update(440.0, 20.0);
        }
        // Still unlocked on the 4th call: it's the hit that flips `locked`,
        // but the unlocked branch always publishes 0.0 (spec.md §4.7,
        // "Output: 0 (until locked)").
        assert!(locker.is_locked());
        assert_eq!(last, 0.0);
        assert_eq!(locker.update(440.0, 20.0), 440.0);
    }

    #[test]
    fn idempotence_holds_the_same_frequency(){
        let mut locker = FrequencyLocker::new();
        for _ in 0..4 {
            locker.update(220.0, 20.0);
        }
        for _ in 0..20 {
            assert_eq!(locker.update(220.0, 20.0), 220.0);
        }
    }

    #[test]
    fn unlocks_after_five_misses() {
        let mut locker = FrequencyLocker::new();
        for _ in 0..4 {
            locker.update(330.0, 20.0);
        }
        assert!(locker.is_locked());
        for _ in 0..5 {
            locker.update(0.0, 20.0);
        }
        assert!(!locker.is_locked());
    }

    #[test]
    fn silence_never_locks() {
        let mut locker = FrequencyLocker::new();
        let mut result = 0.0;
        for _ in 0..20 {
            result = locker.update(0.0, 20.0);
        }
        assert_eq!(result, 0.0);
        assert!(!locker.is_locked());
    }

    #[test]
    fn relocks_up_an_octave_when_persistently_doubled() {
        let mut locker = FrequencyLocker::new();
        for _ in 0..4 {
            locker.update(220.0, 20.0);
        }
        assert!(locker.is_locked());
        // The first hit only seeds `prev_mul`; the run of consistent
        // multipliers starts counting from the second, so relock-up fires
        // one call past `NHITS_TO_RELOCK_UP`.
        let mut last = 0.0;
        for _ in 0..=NHITS_TO_RELOCK_UP {
            last = locker.update(440.0, 20.0);
        }
        assert_eq!(last, 440.0);
    }

    #[test]
    fn frequencies_related_rejects_zero_inputs() {
        assert_eq!(frequencies_related(0.0, 220.0, 20.0), None);
        assert_eq!(frequencies_related(220.0, 0.0, 20.0), None);
    }

    #[test]
    fn frequencies_related_detects_second_harmonic() {
        let (m1, m2) = frequencies_related(440.0, 220.0, 20.0).unwrap();
        assert!((m1 - 1.0).abs() < 1e-6);
        assert!((m2 - 0.5).abs() < 1e-6);
    }
}

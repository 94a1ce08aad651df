use serde::{Deserialize, Serialize};

use kanade_chart::{Note, NoteKind};

use crate::state::PlayState;

/// Timing accuracy brackets, from tightest to loosest.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Marvelous,
    Perfect,
    Ok,
    Bad,
    Miss,
}

impl Tier {
    /// Ascending window order.
    pub const ALL: [Tier; 5] = [
        Tier::Marvelous,
        Tier::Perfect,
        Tier::Ok,
        Tier::Bad,
        Tier::Miss,
    ];

    pub fn is_miss(self) -> bool {
        self == Tier::Miss
    }

    /// Text shown on the playfield.
    pub fn text(self) -> &'static str {
        match self {
            Tier::Marvelous => "Marvelous!!",
            Tier::Perfect => "Perfect!",
            Tier::Ok => "OK",
            Tier::Bad => "Bad",
            Tier::Miss => "Miss",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierWindow {
    /// Half-width of the window in milliseconds. `|delta|` must be strictly below it.
    pub window: f64,
    /// Accuracy value recorded in the ledger.
    pub score: i32,
}

impl TierWindow {
    pub const fn new(window: f64, score: i32) -> Self {
        Self { window, score }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitWindows {
    pub marvelous: TierWindow,
    pub perfect: TierWindow,
    pub ok: TierWindow,
    pub bad: TierWindow,
    pub miss: TierWindow,
}

impl Default for HitWindows {
    fn default() -> Self {
        Self {
            marvelous: TierWindow::new(20.0, 100),
            perfect: TierWindow::new(40.0, 100),
            ok: TierWindow::new(60.0, 50),
            bad: TierWindow::new(80.0, 0),
            miss: TierWindow::new(100.0, -20),
        }
    }
}

impl HitWindows {
    pub fn get(&self, tier: Tier) -> TierWindow {
        match tier {
            Tier::Marvelous => self.marvelous,
            Tier::Perfect => self.perfect,
            Tier::Ok => self.ok,
            Tier::Bad => self.bad,
            Tier::Miss => self.miss,
        }
    }

    pub fn miss_window(&self) -> f64 {
        self.miss.window
    }

    /// First tier whose window exceeds `|delta|`, `None` if even the miss window doesn't.
    pub fn classify(&self, delta: f64) -> Option<Tier> {
        let error = delta.abs();
        Tier::ALL
            .into_iter()
            .find(|tier| error < self.get(*tier).window)
    }

    /// Windows have to be positive and strictly increasing from marvelous to miss.
    pub fn is_valid(&self) -> bool {
        let windows = Tier::ALL.map(|tier| self.get(tier).window);
        windows[0] > 0.0
            && windows.iter().all(|window| window.is_finite())
            && windows.windows(2).all(|pair| pair[0] < pair[1])
    }
}

/// Outcome recorded in the ledger for one note.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Judgment {
    pub tier: Tier,
    pub score: i32,
    /// `note time - input time + judge offset`. Positive is early.
    /// `None` for notes resolved without an input.
    pub offset: Option<f64>,
}

/// Per-lane judgment rules. Stateless, everything it changes lives in [`PlayState`].
#[derive(Clone, Debug)]
pub struct Judge {
    windows: HitWindows,
    /// Added to every raw delta to compensate for input latency.
    judge_offset: f64,
}

impl Judge {
    pub fn new(windows: HitWindows, judge_offset: f64) -> Self {
        Self {
            windows,
            judge_offset,
        }
    }

    pub fn windows(&self) -> &HitWindows {
        &self.windows
    }

    pub fn judge_offset(&self) -> f64 {
        self.judge_offset
    }

    pub fn classify(&self, delta: f64) -> Option<Tier> {
        self.windows.classify(delta)
    }

    pub(crate) fn judgment(&self, tier: Tier, offset: Option<f64>) -> Judgment {
        Judgment {
            tier,
            score: self.windows.get(tier).score,
            offset,
        }
    }

    fn delta(&self, note: &Note, now: f64) -> f64 {
        note.time - now + self.judge_offset
    }

    /// Key press in `lane` at play time `now`.
    ///
    /// Presses outside every window are ignored and the note stays pending. Tails are
    /// never resolved here. A missed head also forfeits its tail.
    pub fn on_key_down(
        &self,
        lanes: &[Vec<Note>],
        state: &mut PlayState,
        lane: usize,
        now: f64,
    ) -> Option<Tier> {
        let note = pending_note(lanes, state, lane)?;
        if note.kind == NoteKind::LongTail {
            return None;
        }

        let delta = self.delta(note, now);
        let tier = self.classify(delta)?;

        state.record(lane, self.judgment(tier, Some(delta)));
        state.pulse_judgment();

        if tier.is_miss() {
            if let Some(tail) = pending_note(lanes, state, lane) {
                if tail.kind == NoteKind::LongTail {
                    state.record(lane, self.judgment(Tier::Miss, None));
                }
            }
        }

        Some(tier)
    }

    /// Key release in `lane` at play time `now`.
    ///
    /// Only resolves a pending tail, but then always records something: a release far
    /// outside the windows is a miss. Releases don't trigger the judgment pulse.
    pub fn on_key_up(
        &self,
        lanes: &[Vec<Note>],
        state: &mut PlayState,
        lane: usize,
        now: f64,
    ) -> Option<Tier> {
        let note = pending_note(lanes, state, lane)?;
        if note.kind != NoteKind::LongTail {
            return None;
        }

        let delta = self.delta(note, now);
        let tier = self.classify(delta).unwrap_or(Tier::Miss);

        state.record(lane, self.judgment(tier, Some(delta)));

        Some(tier)
    }

    /// Misses the pending note of `lane` once it is past the miss window.
    /// Called once per lane per frame.
    pub fn on_timeout(
        &self,
        lanes: &[Vec<Note>],
        state: &mut PlayState,
        lane: usize,
        now: f64,
    ) -> Option<Tier> {
        let note = pending_note(lanes, state, lane)?;
        if note.time >= now - self.windows.miss_window() {
            return None;
        }

        log::trace!(
            "Lane {} note at {:.1}ms timed out at {:.1}ms",
            lane,
            note.time,
            now
        );
        state.record(lane, self.judgment(Tier::Miss, None));

        Some(Tier::Miss)
    }
}

/// Next unjudged note of `lane`, `None` when the lane is exhausted or doesn't exist.
pub(crate) fn pending_note<'a>(
    lanes: &'a [Vec<Note>],
    state: &PlayState,
    lane: usize,
) -> Option<&'a Note> {
    lanes.get(lane)?.get(state.ledger().next_index(lane))
}

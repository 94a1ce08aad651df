use crate::judge::{Judgment, Tier};

/// Per-lane record of judged notes. Append-only: the length of a lane's record is the
/// index of the next unjudged note in that lane.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ledger {
    lanes: Vec<Vec<Judgment>>,
}

impl Ledger {
    pub fn new(key_count: usize) -> Self {
        Self {
            lanes: vec![Vec::new(); key_count],
        }
    }

    pub fn key_count(&self) -> usize {
        self.lanes.len()
    }

    /// Judgments of `lane` in note order. Empty for unknown lanes.
    pub fn lane(&self, lane: usize) -> &[Judgment] {
        self.lanes.get(lane).map_or(&[], Vec::as_slice)
    }

    /// Index of the next unjudged note in `lane`.
    pub fn next_index(&self, lane: usize) -> usize {
        self.lane(lane).len()
    }

    pub fn judged_count(&self) -> usize {
        self.lanes.iter().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Judgment> {
        self.lanes.iter().flatten()
    }

    /// Sum of recorded scores over the best possible sum, `None` before the first judgment.
    pub fn accuracy(&self) -> Option<f64> {
        let judged = self.judged_count();
        if judged == 0 {
            return None;
        }

        let total: i64 = self.iter().map(|judgment| judgment.score as i64).sum();
        Some(total as f64 / (judged as f64 * 100.0))
    }

    pub fn tier_counts(&self) -> TierCounts {
        let mut counts = TierCounts::default();
        for judgment in self.iter() {
            counts.0[judgment.tier.index()] += 1;
        }
        counts
    }

    fn push(&mut self, lane: usize, judgment: Judgment) {
        self.lanes[lane].push(judgment);
    }
}

/// Number of judgments per tier.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TierCounts([u32; Tier::ALL.len()]);

impl TierCounts {
    pub fn get(&self, tier: Tier) -> u32 {
        self.0[tier.index()]
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Combo {
    current: u32,
    max: u32,
}

impl Combo {
    pub fn current(&self) -> u32 {
        self.current
    }

    /// Highest combo reached this session.
    pub fn max(&self) -> u32 {
        self.max
    }

    fn increment(&mut self) {
        self.current += 1;
        self.max = self.max.max(self.current);
    }

    fn reset(&mut self) {
        self.current = 0;
    }
}

/// Animation triggers for the playfield UI. Cleared when taken.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Feedback {
    /// Combo went up.
    pub combo_pulse: bool,
    /// A judgment from player input or autoplay should be shown.
    pub judgment_pulse: bool,
}

/// Everything a play session mutates. Created fresh for every play.
#[derive(Clone, Debug, Default)]
pub struct PlayState {
    ledger: Ledger,
    combo: Combo,
    last_judgment: Option<Tier>,
    feedback: Feedback,
}

impl PlayState {
    pub fn new(key_count: usize) -> Self {
        Self {
            ledger: Ledger::new(key_count),
            ..Default::default()
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn combo(&self) -> Combo {
        self.combo
    }

    pub fn last_judgment(&self) -> Option<Tier> {
        self.last_judgment
    }

    pub fn feedback(&self) -> Feedback {
        self.feedback
    }

    pub fn take_feedback(&mut self) -> Feedback {
        std::mem::take(&mut self.feedback)
    }

    /// Appends `judgment` to `lane` and applies the combo rule.
    pub(crate) fn record(&mut self, lane: usize, judgment: Judgment) {
        self.ledger.push(lane, judgment);
        self.last_judgment = Some(judgment.tier);

        if judgment.tier.is_miss() {
            self.combo.reset();
        } else {
            self.combo.increment();
            self.feedback.combo_pulse = true;
        }
    }

    pub(crate) fn pulse_judgment(&mut self) {
        self.feedback.judgment_pulse = true;
    }
}

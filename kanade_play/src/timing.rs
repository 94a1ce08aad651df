use kanade_chart::TimingPoint;

/// Monotonic cursor over the timing points of a chart.
#[derive(Clone, Debug, Default)]
pub struct TimingSectionTracker {
    current_section: usize,
}

impl TimingSectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.current_section = 0;
    }

    pub fn current_section(&self) -> usize {
        self.current_section
    }

    /// Moves forward past every timing point that starts before `time`. Never moves back.
    pub fn advance(&mut self, timing_points: &[TimingPoint], time: f64) {
        while self.current_section + 1 < timing_points.len()
            && timing_points[self.current_section + 1].time < time
        {
            self.current_section += 1;
        }
    }

    /// Position inside the current beat as a fraction in `[0, 1]`.
    /// Stays at 0 before the current timing point starts.
    pub fn beat_phase(&self, timing_points: &[TimingPoint], time: f64) -> Option<f64> {
        let timing_point = timing_points.get(self.current_section)?;
        let ms_per_beat = timing_point.ms_per_beat();

        let phase = (time - timing_point.time) % ms_per_beat / ms_per_beat;
        Some(phase.clamp(0.0, 1.0))
    }
}

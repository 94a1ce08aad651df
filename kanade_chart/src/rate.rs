use thiserror::Error;

use crate::{Chart, Note, ScrollSpeedPoint, Timeline, TimingPoint};

#[derive(Debug, Error, PartialEq)]
#[error("Playback rate must be a positive finite number, got {0}")]
pub struct InvalidRate(pub f64);

impl Timeline {
    /// Builds a copy of this timeline played back `rate` times faster.
    ///
    /// Times are divided by `rate` and BPMs multiplied by it. Scroll speed multipliers only
    /// move in time, their values are kept.
    pub fn scaled(&self, rate: f64) -> Timeline {
        let lanes = self
            .lanes
            .iter()
            .map(|lane| {
                lane.iter()
                    .map(|note| Note::new(note.time / rate, note.kind))
                    .collect()
            })
            .collect();

        let timing_points = self
            .timing_points
            .iter()
            .map(|point| TimingPoint {
                time: point.time / rate,
                bpm: point.bpm * rate,
                signature: point.signature.clone(),
            })
            .collect();

        let scroll_speed_points = self
            .scroll_speed_points
            .iter()
            .map(|point| ScrollSpeedPoint {
                time: point.time / rate,
                speed_multiplier: point.speed_multiplier,
            })
            .collect();

        Timeline {
            lanes,
            timing_points,
            scroll_speed_points,
        }
    }
}

impl Chart {
    /// Replaces the working timeline with the original scaled by `rate`.
    ///
    /// Always derived from the original, so successive calls never compound.
    pub fn apply_rate(&mut self, rate: f64) -> Result<(), InvalidRate> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(InvalidRate(rate));
        }

        self.working = self.original.scaled(rate);
        self.rate = rate;

        log::debug!(
            "Applied rate {} to chart, {} notes, {} timing points",
            rate,
            self.working.note_count(),
            self.working.timing_points.len()
        );

        Ok(())
    }
}

use std::time::Instant;

use thiserror::Error;

use kanade_chart::{Chart, InvalidRate};

use crate::{
    config::PlayConfig,
    judge::{Judge, Tier},
    state::{Feedback, PlayState},
    timing::TimingSectionTracker,
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Chart has no timing points")]
    NoTimingPoints,

    #[error(transparent)]
    InvalidRate(#[from] InvalidRate),
}

/// Monotonic time in milliseconds.
pub trait TimeSource {
    fn now_ms(&self) -> f64;
}

/// Milliseconds since the clock was created.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionStatus {
    Playing,
    Ended,
}

/// One play of a chart.
///
/// Every method taking `now` expects the monotonic time of a [`TimeSource`] and converts it
/// to play time, which is zero at the chart's time origin.
#[derive(Debug)]
pub struct Session {
    chart: Chart,
    config: PlayConfig,
    judge: Judge,
    state: PlayState,
    tracker: TimingSectionTracker,
    play_start: f64,
    status: SessionStatus,
}

impl Session {
    /// Scales `chart` by `rate` and starts playing after the configured lead-in.
    pub fn start(
        mut chart: Chart,
        rate: f64,
        config: PlayConfig,
        now: f64,
    ) -> Result<Self, SessionError> {
        if chart.original().timing_points.is_empty() {
            return Err(SessionError::NoTimingPoints);
        }

        chart.apply_rate(rate)?;

        let judge = Judge::new(config.hit_windows.clone(), config.judge_offset);
        let state = PlayState::new(chart.key_count());
        let play_start = now + config.play_delay + config.universal_offset;

        log::info!(
            "Starting session at rate {}, {}K, autoplay {}",
            rate,
            chart.key_count(),
            config.autoplay
        );

        Ok(Self {
            chart,
            config,
            judge,
            state,
            tracker: TimingSectionTracker::new(),
            play_start,
            status: SessionStatus::Playing,
        })
    }

    /// Plays the same chart again from the beginning, possibly at another rate.
    pub fn restart(&mut self, rate: f64, now: f64) -> Result<(), SessionError> {
        self.chart.apply_rate(rate)?;
        self.state = PlayState::new(self.chart.key_count());
        self.tracker.reset();
        self.play_start = now + self.config.play_delay + self.config.universal_offset;
        self.status = SessionStatus::Playing;

        log::info!("Restarting session at rate {}", rate);

        Ok(())
    }

    pub fn play_time(&self, now: f64) -> f64 {
        now - self.play_start
    }

    /// Per-frame update: advances the timing cursor, then times out or autoplays every lane.
    pub fn tick(&mut self, now: f64) -> SessionStatus {
        if self.status == SessionStatus::Ended {
            return self.status;
        }

        let time = self.play_time(now);
        self.tracker.advance(self.chart.timing_points(), time);

        for lane in 0..self.chart.key_count() {
            let tier = if self.config.autoplay {
                self.judge
                    .autoplay(self.chart.lanes(), &mut self.state, lane, time)
            } else {
                self.judge
                    .on_timeout(self.chart.lanes(), &mut self.state, lane, time)
            };

            if let Some(tier) = tier {
                log::debug!("Lane {} {:?} at {:.1}ms", lane, tier, time);
            }
        }

        let finished = match self.chart.timeline().last_note_time() {
            Some(last_note_time) => last_note_time < time - self.config.end_delay,
            None => true,
        };
        if finished {
            self.status = SessionStatus::Ended;
            log::info!(
                "Session ended, max combo {}, {} notes judged",
                self.state.combo().max(),
                self.state.ledger().judged_count()
            );
        }

        self.status
    }

    pub fn key_down(&mut self, lane: usize, now: f64) -> Option<Tier> {
        if !self.accepts_input() {
            return None;
        }

        let time = self.play_time(now);
        let tier = self
            .judge
            .on_key_down(self.chart.lanes(), &mut self.state, lane, time)?;
        log::debug!("Lane {} pressed {:?} at {:.1}ms", lane, tier, time);

        Some(tier)
    }

    pub fn key_up(&mut self, lane: usize, now: f64) -> Option<Tier> {
        if !self.accepts_input() {
            return None;
        }

        let time = self.play_time(now);
        let tier = self
            .judge
            .on_key_up(self.chart.lanes(), &mut self.state, lane, time)?;
        log::debug!("Lane {} released {:?} at {:.1}ms", lane, tier, time);

        Some(tier)
    }

    /// Ends the session without waiting for the last note.
    pub fn stop(&mut self) {
        self.status = SessionStatus::Ended;
    }

    pub fn beat_phase(&self, now: f64) -> Option<f64> {
        self.tracker
            .beat_phase(self.chart.timing_points(), self.play_time(now))
    }

    fn accepts_input(&self) -> bool {
        !self.config.autoplay && self.status == SessionStatus::Playing
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn config(&self) -> &PlayConfig {
        &self.config
    }

    pub fn state(&self) -> &PlayState {
        &self.state
    }

    pub fn current_section(&self) -> usize {
        self.tracker.current_section()
    }

    pub fn take_feedback(&mut self) -> Feedback {
        self.state.take_feedback()
    }

    pub fn into_chart(self) -> Chart {
        self.chart
    }
}

#[cfg(test)]
mod tests {
    use kanade_chart::{ChartHeader, Note, NoteKind, Timeline, TimingPoint};

    use super::*;

    fn chart(with_timing: bool) -> Chart {
        let mut timeline = Timeline::with_key_count(2);
        timeline.lanes[0].push(Note::new(1000.0, NoteKind::Normal));
        timeline.lanes[1].push(Note::new(2000.0, NoteKind::Normal));
        if with_timing {
            timeline.timing_points.push(TimingPoint {
                time: 0.0,
                bpm: 120.0,
                signature: "4/4".to_string(),
            });
        }
        Chart::new(ChartHeader::default(), 0.0, timeline)
    }

    fn config() -> PlayConfig {
        PlayConfig {
            play_delay: 1000.0,
            universal_offset: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_start_requires_timing_points() {
        let result = Session::start(chart(false), 1.0, config(), 0.0);
        assert!(matches!(result, Err(SessionError::NoTimingPoints)));

        let result = Session::start(chart(true), 0.0, config(), 0.0);
        assert!(matches!(result, Err(SessionError::InvalidRate(_))));
    }

    #[test]
    fn test_play_time_includes_lead_in() {
        let session = Session::start(chart(true), 1.0, PlayConfig::default(), 500.0).unwrap();
        assert_eq!(session.play_time(500.0), -3090.0);
        assert_eq!(session.play_time(3590.0), 0.0);
    }

    #[test]
    fn test_key_events_use_play_time() {
        let mut session = Session::start(chart(true), 1.0, config(), 0.0).unwrap();

        // Play time 1000 is monotonic time 2000.
        assert_eq!(session.key_down(0, 2010.0), Some(Tier::Marvelous));
        assert_eq!(session.state().combo().current(), 1);
    }

    #[test]
    fn test_rate_scales_note_times() {
        let mut session = Session::start(chart(true), 2.0, config(), 0.0).unwrap();
        assert_eq!(session.key_down(0, 1500.0), Some(Tier::Marvelous));
        assert_eq!(session.chart().rate(), 2.0);
    }

    #[test]
    fn test_session_ends_after_last_note() {
        let mut session = Session::start(chart(true), 1.0, config(), 0.0).unwrap();

        assert_eq!(session.tick(1000.0 + 5000.0), SessionStatus::Playing);
        assert_eq!(session.state().ledger().judged_count(), 2);

        assert_eq!(session.tick(1000.0 + 5001.0), SessionStatus::Ended);
        assert_eq!(session.state().combo().current(), 0);

        // Input after the end is ignored.
        assert_eq!(session.key_down(0, 7000.0), None);
    }

    #[test]
    fn test_autoplay_ignores_keys() {
        let config = PlayConfig {
            autoplay: true,
            ..config()
        };
        let mut session = Session::start(chart(true), 1.0, config, 0.0).unwrap();

        assert_eq!(session.key_down(0, 2000.0), None);
        session.tick(2000.0);
        session.tick(3000.0);

        assert_eq!(session.state().combo().current(), 2);
        assert!(session.take_feedback().judgment_pulse);
    }

    #[test]
    fn test_restart_resets_state() {
        let mut session = Session::start(chart(true), 1.0, config(), 0.0).unwrap();
        session.key_down(0, 2000.0);
        session.stop();
        assert_eq!(session.status(), SessionStatus::Ended);

        session.restart(1.5, 10000.0).unwrap();
        assert_eq!(session.status(), SessionStatus::Playing);
        assert_eq!(session.state().ledger().judged_count(), 0);
        assert_eq!(session.current_section(), 0);
        assert_eq!(session.chart().lanes()[1][0].time, 2000.0 / 1.5);
    }

    #[test]
    fn test_stop_ends_on_next_tick() {
        let mut session = Session::start(chart(true), 1.0, config(), 0.0).unwrap();
        assert_eq!(session.tick(1500.0), SessionStatus::Playing);

        session.stop();
        assert_eq!(session.tick(1600.0), SessionStatus::Ended);
        assert_eq!(session.tick(1700.0), SessionStatus::Ended);
        // No judging after the stop.
        assert_eq!(session.state().ledger().judged_count(), 0);
    }

    #[test]
    fn test_beat_phase_flat_during_lead_in() {
        let session = Session::start(chart(true), 1.0, config(), 0.0).unwrap();
        assert_eq!(session.beat_phase(625.0), Some(0.0));
    }

    #[test]
    fn test_beat_phase_follows_play_time() {
        let session = Session::start(chart(true), 1.0, config(), 0.0).unwrap();
        // Play time 250 is half a beat at 120 BPM.
        assert!((session.beat_phase(1250.0).unwrap() - 0.5).abs() < 1e-9);
    }
}

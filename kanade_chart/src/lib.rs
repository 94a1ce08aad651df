pub mod parse;
mod rate;
mod util;

pub use parse::{load_chart, parse, probe_header, ChartFiles, FileList, ParseError};
pub use rate::InvalidRate;

/// Osu!mania game mode id as written in the `Mode` field.
pub const MANIA_MODE: u8 = 3;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum NoteKind {
    Normal,
    /// Start of a hold. Always directly followed by its `LongTail` in the same lane.
    LongHead,
    LongTail,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Note {
    /// Time in milliseconds from the start of the audio.
    pub time: f64,
    pub kind: NoteKind,
}

impl Note {
    pub fn new(time: f64, kind: NoteKind) -> Self {
        Self { time, kind }
    }
}

/// Start of a BPM region, open-ended until the next timing point.
#[derive(Clone, Debug, PartialEq)]
pub struct TimingPoint {
    pub time: f64,
    pub bpm: f64,
    /// Written as `N/4`.
    pub signature: String,
}

impl TimingPoint {
    pub fn ms_per_beat(&self) -> f64 {
        60000.0 / self.bpm
    }
}

/// Local scroll velocity override. Only affects where notes are drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollSpeedPoint {
    pub time: f64,
    pub speed_multiplier: f64,
}

/// Everything in a chart that lives on the time axis.
/// Vec members are sorted by time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    /// One note sequence per key.
    pub lanes: Vec<Vec<Note>>,
    pub timing_points: Vec<TimingPoint>,
    pub scroll_speed_points: Vec<ScrollSpeedPoint>,
}

impl Timeline {
    pub fn with_key_count(key_count: usize) -> Self {
        Self {
            lanes: vec![Vec::new(); key_count],
            ..Default::default()
        }
    }

    pub fn note_count(&self) -> usize {
        self.lanes.iter().map(Vec::len).sum()
    }

    pub fn first_note_time(&self) -> Option<f64> {
        self.lanes
            .iter()
            .filter_map(|lane| lane.first())
            .map(|note| note.time)
            .reduce(f64::min)
    }

    pub fn last_note_time(&self) -> Option<f64> {
        self.lanes
            .iter()
            .filter_map(|lane| lane.last())
            .map(|note| note.time)
            .reduce(f64::max)
    }

    /// BPM that covers the longest stretch between the first and the last note.
    pub fn dominant_bpm(&self) -> Option<f64> {
        let start = self.first_note_time()?;
        let end = self.last_note_time()?;
        util::dominant_bpm(&self.timing_points, start, end)
    }

    /// Stable sort of every collection by time. Equal times keep their insertion order.
    pub(crate) fn sort_by_time(&mut self) {
        for lane in &mut self.lanes {
            lane.sort_by(|a, b| a.time.total_cmp(&b.time));
        }
        self.timing_points
            .sort_by(|a, b| a.time.total_cmp(&b.time));
        self.scroll_speed_points
            .sort_by(|a, b| a.time.total_cmp(&b.time));
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChartHeader {
    pub title: String,
    pub artist: String,
    pub creator: String,
    /// Difficulty name.
    pub version: String,

    /// Path of audio file, relative to the chart file.
    pub audio_filename: String,
    /// Path of background image, relative to the chart file.
    pub background_filename: Option<String>,

    pub mode: Option<u8>,
    /// N+1 layout where one lane is set apart from the others.
    pub special_style: bool,
}

impl ChartHeader {
    pub fn is_mania(&self) -> bool {
        self.mode == Some(MANIA_MODE)
    }
}

#[derive(Clone, Debug)]
pub struct Chart {
    pub header: ChartHeader,
    key_count: usize,
    preview_time: f64,

    /// As parsed. Source of every rescale.
    original: Timeline,
    /// Timeline the game is played against, scaled by `rate`.
    working: Timeline,
    rate: f64,
}

impl Chart {
    /// Sorts the timeline and snapshots it as the pristine original.
    pub fn new(header: ChartHeader, preview_time: f64, mut timeline: Timeline) -> Self {
        timeline.sort_by_time();

        Self {
            header,
            key_count: timeline.lanes.len(),
            preview_time,
            working: timeline.clone(),
            original: timeline,
            rate: 1.0,
        }
    }

    pub fn key_count(&self) -> usize {
        self.key_count
    }

    pub fn preview_time(&self) -> f64 {
        self.preview_time
    }

    /// Timeline as parsed, independent of the current rate.
    pub fn original(&self) -> &Timeline {
        &self.original
    }

    /// Timeline scaled by the current rate.
    pub fn timeline(&self) -> &Timeline {
        &self.working
    }

    pub fn lanes(&self) -> &[Vec<Note>] {
        &self.working.lanes
    }

    pub fn timing_points(&self) -> &[TimingPoint] {
        &self.working.timing_points
    }

    pub fn scroll_speed_points(&self) -> &[ScrollSpeedPoint] {
        &self.working.scroll_speed_points
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }
}

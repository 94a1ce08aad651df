use std::collections::HashMap;

use regex::Regex;

use crate::{
    parse::ParseError, Chart, ChartHeader, Note, NoteKind, ScrollSpeedPoint, Timeline,
    TimingPoint,
};

/// Width of the osu! playfield that hit object x coordinates are written against.
pub const PLAYFIELD_WIDTH: f64 = 512.0;

/// Largest key count osu!mania supports.
pub const MAX_KEY_COUNT: usize = 18;

const TIMING_POINT_FIELDS: usize = 8;
const HIT_OBJECT_FIELDS: usize = 6;

const TYPE_HIT_CIRCLE: u32 = 1;
const TYPE_HOLD: u32 = 1 << 7;

/// Slider velocity multipliers outside this range are clamped, as the game does.
const MIN_SPEED_MULTIPLIER: f64 = 0.1;
const MAX_SPEED_MULTIPLIER: f64 = 10.0;

enum Tag {
    General,
    Metadata,
    Difficulty,
    Events,
    TimingPoints,
    HitObjects,
    /// Skip/not interested in.
    Other,
}

impl From<&str> for Tag {
    fn from(s: &str) -> Self {
        match s {
            "[General]" => Tag::General,
            "[Metadata]" => Tag::Metadata,
            "[Difficulty]" => Tag::Difficulty,
            "[Events]" => Tag::Events,
            "[TimingPoints]" => Tag::TimingPoints,
            "[HitObjects]" => Tag::HitObjects,
            _ => Tag::Other,
        }
    }
}

/// Reason a single line was skipped. Never leaves the parser.
#[derive(Debug, PartialEq)]
enum MalformedLine {
    FieldCount(usize),
    Number(&'static str),
    NoteType(u32),
    Lane(f64),
    HoldEnd,
}

type LineResult<T> = Result<T, MalformedLine>;

fn number(field: &str, name: &'static str) -> LineResult<f64> {
    field
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or(MalformedLine::Number(name))
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum TimingLine {
    Bpm { time: f64, bpm: f64, meter: u32 },
    ScrollSpeed { time: f64, speed_multiplier: f64 },
}

/// A hit object placed in a lane, before it is split into notes.
#[derive(Clone, Copy, Debug, PartialEq)]
enum LaneObject {
    Tap { time: f64 },
    Hold { time: f64, end_time: f64 },
}

impl LaneObject {
    fn start(&self) -> f64 {
        match *self {
            LaneObject::Tap { time } | LaneObject::Hold { time, .. } => time,
        }
    }

    fn end(&self) -> f64 {
        match *self {
            LaneObject::Tap { time } => time,
            LaneObject::Hold { end_time, .. } => end_time,
        }
    }
}

/// Raw content of a `.osu` file grouped by section.
#[derive(Default)]
struct Sections<'a> {
    general: HashMap<String, String>,
    metadata: HashMap<String, String>,
    difficulty: HashMap<String, String>,
    events: Vec<&'a str>,
    timing_points: Vec<&'a str>,
    hit_objects: Vec<&'a str>,
}

pub struct OsuManiaParser {
    regex_key_value: Regex,
    regex_background: Regex,
}

impl OsuManiaParser {
    pub fn new() -> Result<Self, ParseError> {
        Ok(Self {
            regex_key_value: Regex::new(r"^(?P<key>[A-Za-z]+)\s*:\s*(?P<value>.*)$")?,
            regex_background: Regex::new(r#"^0\s*,\s*0\s*,\s*"(?P<file>[^"]+)""#)?,
        })
    }

    pub fn parse_str(&self, raw: &str) -> Result<Chart, ParseError> {
        let sections = self.split_sections(raw);
        let header = self.header(&sections);

        let key_count = Self::key_count(&sections)?;
        let preview_time = sections
            .general
            .get("PreviewTime")
            .and_then(|value| number(value, "preview time").ok())
            .unwrap_or(0.0);

        let mut timeline = Timeline::with_key_count(key_count);

        for line in &sections.timing_points {
            match Self::parse_timing_point(line) {
                Ok(TimingLine::Bpm { time, bpm, meter }) => {
                    timeline.timing_points.push(TimingPoint {
                        time,
                        bpm,
                        signature: format!("{}/4", meter),
                    })
                }
                Ok(TimingLine::ScrollSpeed {
                    time,
                    speed_multiplier,
                }) => timeline.scroll_speed_points.push(ScrollSpeedPoint {
                    time,
                    speed_multiplier,
                }),
                Err(e) => log::trace!("Skipping timing point line {:?}: {:?}", line, e),
            }
        }

        let mut lane_objects = vec![Vec::new(); key_count];
        for line in &sections.hit_objects {
            match Self::parse_hit_object(line, key_count) {
                Ok((lane, object)) => lane_objects[lane].push(object),
                Err(e) => log::trace!("Skipping hit object line {:?}: {:?}", line, e),
            }
        }

        for (lane, objects) in lane_objects.into_iter().enumerate() {
            timeline.lanes[lane] = Self::lane_notes(lane, objects);
        }

        if timeline.note_count() == 0 {
            return Err(ParseError::NoNotes);
        }
        if timeline.timing_points.is_empty() {
            return Err(ParseError::NoTimingPoints);
        }

        log::debug!(
            "Parsed {}K chart with {} notes, {} timing points, {} scroll speed points",
            key_count,
            timeline.note_count(),
            timeline.timing_points.len(),
            timeline.scroll_speed_points.len()
        );

        Ok(Chart::new(header, preview_time, timeline))
    }

    pub fn parse_header(&self, raw: &str) -> ChartHeader {
        let sections = self.split_sections(raw);
        self.header(&sections)
    }

    fn split_sections<'a>(&self, raw: &'a str) -> Sections<'a> {
        let mut sections = Sections::default();
        let mut current_tag = None;

        for line in raw.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with("//") {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                current_tag = Some(Tag::from(line));
                continue;
            }

            if let Some(ref tag) = current_tag {
                match tag {
                    Tag::General => self.insert_key_value(&mut sections.general, line),
                    Tag::Metadata => self.insert_key_value(&mut sections.metadata, line),
                    Tag::Difficulty => self.insert_key_value(&mut sections.difficulty, line),
                    Tag::Events => sections.events.push(line),
                    Tag::TimingPoints => sections.timing_points.push(line),
                    Tag::HitObjects => sections.hit_objects.push(line),
                    Tag::Other => {}
                }
            }
        }

        sections
    }

    fn insert_key_value(&self, section: &mut HashMap<String, String>, line: &str) {
        if let Some(captures) = self.regex_key_value.captures(line) {
            section.insert(
                captures["key"].to_string(),
                captures["value"].trim().to_string(),
            );
        } else {
            log::trace!("Unrecognized key/value line {:?}", line);
        }
    }

    fn header(&self, sections: &Sections) -> ChartHeader {
        let text = |section: &HashMap<String, String>, key: &str| {
            section.get(key).cloned().unwrap_or_default()
        };

        let background_filename = sections.events.iter().find_map(|line| {
            self.regex_background
                .captures(line)
                .map(|captures| captures["file"].to_string())
        });

        ChartHeader {
            title: text(&sections.metadata, "Title"),
            artist: text(&sections.metadata, "Artist"),
            creator: text(&sections.metadata, "Creator"),
            version: text(&sections.metadata, "Version"),
            audio_filename: text(&sections.general, "AudioFilename"),
            background_filename,
            mode: sections
                .general
                .get("Mode")
                .and_then(|value| value.parse().ok()),
            special_style: sections
                .general
                .get("SpecialStyle")
                .is_some_and(|value| value == "1"),
        }
    }

    fn key_count(sections: &Sections) -> Result<usize, ParseError> {
        let value = sections
            .difficulty
            .get("CircleSize")
            .ok_or(ParseError::MissingKeyCount)?;

        let key_count = value
            .parse::<f64>()
            .ok()
            .filter(|count| count.fract() == 0.0)
            .filter(|count| (1.0..=MAX_KEY_COUNT as f64).contains(count))
            .ok_or_else(|| ParseError::InvalidKeyCount(value.clone()))?;

        Ok(key_count as usize)
    }

    /// `time,beatLength,meter,sampleSet,sampleIndex,volume,uninherited,effects`
    fn parse_timing_point(line: &str) -> LineResult<TimingLine> {
        let parts = line.split(',').collect::<Vec<_>>();
        if parts.len() != TIMING_POINT_FIELDS {
            return Err(MalformedLine::FieldCount(parts.len()));
        }

        let time = number(parts[0], "time")?;
        let beat_length = number(parts[1], "beat length")?;
        let meter: u32 = parts[2]
            .trim()
            .parse()
            .ok()
            .filter(|meter| *meter > 0)
            .ok_or(MalformedLine::Number("meter"))?;

        if beat_length > 0.0 {
            Ok(TimingLine::Bpm {
                time,
                bpm: 60000.0 / beat_length,
                meter,
            })
        } else {
            Ok(TimingLine::ScrollSpeed {
                time,
                speed_multiplier: Self::speed_multiplier(beat_length),
            })
        }
    }

    /// Inherited timing points store the slider velocity as `-100 / multiplier`.
    fn speed_multiplier(beat_length: f64) -> f64 {
        if beat_length == 0.0 {
            return 1.0;
        }
        (-100.0 / beat_length).clamp(MIN_SPEED_MULTIPLIER, MAX_SPEED_MULTIPLIER)
    }

    /// `x,y,time,type,hitSound,objectParams:hitSample`
    fn parse_hit_object(line: &str, key_count: usize) -> LineResult<(usize, LaneObject)> {
        let parts = line.split(',').collect::<Vec<_>>();
        if parts.len() != HIT_OBJECT_FIELDS {
            return Err(MalformedLine::FieldCount(parts.len()));
        }

        let x = number(parts[0], "x position")?;
        let lane = Self::lane_from_x(x, key_count)?;
        let time = number(parts[2], "time")?;
        let object_type: u32 = parts[3]
            .trim()
            .parse()
            .map_err(|_| MalformedLine::Number("object type"))?;

        let is_hit = object_type & TYPE_HIT_CIRCLE != 0;
        let is_hold = object_type & TYPE_HOLD != 0;

        let object = match (is_hit, is_hold) {
            (true, false) => LaneObject::Tap { time },
            (false, true) => {
                let end_field = parts[5].split(':').next().unwrap_or_default();
                let end_time = number(end_field, "hold end").map_err(|_| MalformedLine::HoldEnd)?;
                if end_time < time {
                    return Err(MalformedLine::HoldEnd);
                }
                LaneObject::Hold { time, end_time }
            }
            _ => return Err(MalformedLine::NoteType(object_type)),
        };

        Ok((lane, object))
    }

    fn lane_from_x(x: f64, key_count: usize) -> LineResult<usize> {
        if x < 0.0 {
            return Err(MalformedLine::Lane(x));
        }
        let lane = (x / (PLAYFIELD_WIDTH / key_count as f64)).floor() as usize;
        // x == 512 is written by some editors for the last lane.
        Ok(lane.min(key_count - 1))
    }

    /// Orders a lane's objects and splits them into notes.
    ///
    /// Objects starting inside a preceding hold are dropped so every head stays directly
    /// followed by its tail.
    fn lane_notes(lane: usize, mut objects: Vec<LaneObject>) -> Vec<Note> {
        objects.sort_by(|a, b| a.start().total_cmp(&b.start()));

        let mut notes = Vec::with_capacity(objects.len());
        let mut hold_end = f64::NEG_INFINITY;

        for object in objects {
            if object.start() < hold_end {
                log::warn!(
                    "Dropping object at {}ms in lane {}, overlaps a hold ending at {}ms",
                    object.start(),
                    lane,
                    hold_end
                );
                continue;
            }

            match object {
                LaneObject::Tap { time } => notes.push(Note::new(time, NoteKind::Normal)),
                LaneObject::Hold { time, end_time } => {
                    notes.push(Note::new(time, NoteKind::LongHead));
                    notes.push(Note::new(end_time, NoteKind::LongTail));
                    hold_end = object.end();
                }
            }
        }

        debug_assert!(notes.windows(2).all(|pair| pair[0].time <= pair[1].time));

        notes
    }
}

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::{Chart, ChartHeader};

pub mod osu;

/// Extension of files the parser accepts.
pub const CHART_EXTENSION: &str = "osu";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("File {0} is not a .osu chart")]
    WrongFileType(String),

    #[error("Failed to read chart file {path}")]
    Unreadable {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("No chart file at index {0}")]
    MissingFile(usize),

    #[error("Missing CircleSize, key count is unknown")]
    MissingKeyCount,

    #[error("Invalid key count {0:?}")]
    InvalidKeyCount(String),

    #[error("Chart has no valid hit objects")]
    NoNotes,

    #[error("Chart has no valid timing points")]
    NoTimingPoints,

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

/// Access to the files of a song library, addressed by index.
pub trait ChartFiles {
    fn has_chart_extension(&self, index: usize) -> bool;

    fn read_text(&self, index: usize) -> Result<String, ParseError>;
}

/// Plain list of paths on the local file system.
#[derive(Clone, Debug, Default)]
pub struct FileList {
    paths: Vec<PathBuf>,
}

impl FileList {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn path(&self, index: usize) -> Option<&Path> {
        self.paths.get(index).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl ChartFiles for FileList {
    fn has_chart_extension(&self, index: usize) -> bool {
        self.path(index)
            .and_then(Path::extension)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(CHART_EXTENSION))
    }

    fn read_text(&self, index: usize) -> Result<String, ParseError> {
        let path = self.path(index).ok_or(ParseError::MissingFile(index))?;
        fs::read_to_string(path).map_err(|source| ParseError::Unreadable {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Parses a whole chart from the text of a `.osu` file.
pub fn parse(raw: &str) -> Result<Chart, ParseError> {
    osu::OsuManiaParser::new()?.parse_str(raw)
}

/// Parses only the header sections, without building notes.
pub fn probe_header(raw: &str) -> Result<ChartHeader, ParseError> {
    Ok(osu::OsuManiaParser::new()?.parse_header(raw))
}

/// Checks the file type, reads the file and parses it.
pub fn load_chart<F>(files: &F, index: usize) -> Result<Chart, ParseError>
where
    F: ChartFiles + ?Sized,
{
    if !files.has_chart_extension(index) {
        return Err(ParseError::WrongFileType(format!("#{}", index)));
    }

    let raw = files.read_text(index)?;
    let chart = parse(&raw)?;

    log::info!(
        "Loaded chart #{} \"{}\" [{}], {}K, {} notes",
        index,
        chart.header.title,
        chart.header.version,
        chart.key_count(),
        chart.original().note_count()
    );

    Ok(chart)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_ignores_case() {
        let files = FileList::new(vec![
            PathBuf::from("songs/a/hard.osu"),
            PathBuf::from("songs/a/HARD.OSU"),
            PathBuf::from("songs/a/audio.mp3"),
            PathBuf::from("songs/a/osu"),
        ]);

        assert!(files.has_chart_extension(0));
        assert!(files.has_chart_extension(1));
        assert!(!files.has_chart_extension(2));
        assert!(!files.has_chart_extension(3));
        assert!(!files.has_chart_extension(4));
    }

    #[test]
    fn wrong_extension_is_a_load_failure() {
        let files = FileList::new(vec![PathBuf::from("songs/a/bg.png")]);
        assert!(matches!(
            load_chart(&files, 0),
            Err(ParseError::WrongFileType(_))
        ));
    }

    #[test]
    fn unreadable_file_is_a_load_failure() {
        let files = FileList::new(vec![PathBuf::from("does/not/exist.osu")]);
        assert!(matches!(
            load_chart(&files, 0),
            Err(ParseError::Unreadable { .. })
        ));
    }
}

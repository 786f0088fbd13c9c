use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use thiserror::Error;

use crate::landmarks::domain::face_landmarks::FaceLandmarks;
use crate::landmarks::domain::landmark_provider::LandmarkProvider;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum LandmarkTrackError {
    #[error("failed to read landmark track: {0}")]
    Io(#[from] std::io::Error),
    #[error("landmark track line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("landmark track line {line}: point {point} has {len} coordinates, need at least 2")]
    Shape { line: usize, point: usize, len: usize },
}

/// Replays a pre-computed landmark track, one line per video frame.
///
/// Each line is `null` (no face) or a JSON array of points, each point an
/// array `[x, y]` or `[x, y, z]` in normalized frame coordinates; `z` is
/// ignored. Blank lines and empty arrays also mean no face, and so does
/// every frame past the end of the track.
pub struct JsonlLandmarkProvider {
    lines: Lines<Box<dyn BufRead + Send>>,
    line: usize,
    exhausted: bool,
}

impl JsonlLandmarkProvider {
    pub fn open(path: &Path) -> Result<Self, LandmarkTrackError> {
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file)))
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        let boxed: Box<dyn BufRead + Send> = Box::new(reader);
        Self {
            lines: boxed.lines(),
            line: 0,
            exhausted: false,
        }
    }

    /// Entries consumed so far.
    pub fn position(&self) -> usize {
        self.line
    }

    fn next_entry(&mut self) -> Result<Option<FaceLandmarks>, LandmarkTrackError> {
        if self.exhausted {
            return Ok(None);
        }
        let Some(text) = self.lines.next().transpose()? else {
            log::debug!("Landmark track ended after {} frames", self.line);
            self.exhausted = true;
            return Ok(None);
        };
        self.line += 1;
        parse_entry(&text, self.line)
    }
}

fn parse_entry(text: &str, line: usize) -> Result<Option<FaceLandmarks>, LandmarkTrackError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let parsed: Option<Vec<Vec<f64>>> =
        serde_json::from_str(text).map_err(|source| LandmarkTrackError::Json { line, source })?;
    let Some(raw) = parsed.filter(|points| !points.is_empty()) else {
        return Ok(None);
    };

    let points = raw
        .iter()
        .enumerate()
        .map(|(point, coords)| match coords.as_slice() {
            [x, y, ..] => Ok((*x, *y)),
            _ => Err(LandmarkTrackError::Shape {
                line,
                point,
                len: coords.len(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(FaceLandmarks::new(points)))
}

impl LandmarkProvider for JsonlLandmarkProvider {
    fn locate(&mut self, _frame: &Frame) -> Result<Option<FaceLandmarks>, Box<dyn std::error::Error>> {
        Ok(self.next_entry()?)
    }
}

//! Where observations come from.
//!
//! The tracker only needs two things from the outside world each tick: a
//! frame and, for that frame, the single largest face in it. Both are traits
//! so the session loop can run against a camera, a recording or a test fake.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use tracing::{debug, info};

use crate::data::{Candidate, TargetObservation};
use crate::error::{TrackerError, TrackerResult};

pub trait FrameSource {
    type Frame;

    /// Next frame, or `None` once the stream has ended.
    fn next_frame(&mut self) -> TrackerResult<Option<Self::Frame>>;
}

/// Turns a frame into at most one observation. Finding nothing is a normal
/// outcome and must not be reported as an error.
pub trait TargetProvider<F> {
    fn detect(&mut self, frame: &F) -> Option<TargetObservation>;
}

/// Largest candidate by area. On equal areas the earliest one wins.
pub fn select_largest(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates
        .iter()
        .reduce(|best, c| if c.area() > best.area() { c } else { best })
}

/// Post-processing stage of a cascade detector: raw hits in, biggest face out.
#[derive(Debug, Default)]
pub struct LargestCandidate;

impl TargetProvider<Vec<Candidate>> for LargestCandidate {
    fn detect(&mut self, frame: &Vec<Candidate>) -> Option<TargetObservation> {
        let best = select_largest(frame)?;
        debug!(candidates = frame.len(), x = best.x, y = best.y, w = best.w, h = best.h, "selected face");
        Some(best.observation())
    }
}

/// Recorded detector output, one JSON array of candidates per line.
pub struct ReplayFile<R> {
    lines: Lines<R>,
    line: usize,
}

impl ReplayFile<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> TrackerResult<Self> {
        let file = File::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "replaying detections");
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplayFile<R> {
    pub fn from_reader(reader: R) -> Self {
        ReplayFile { lines: reader.lines(), line: 0 }
    }
}

impl<R: BufRead> FrameSource for ReplayFile<R> {
    type Frame = Vec<Candidate>;

    fn next_frame(&mut self) -> TrackerResult<Option<Vec<Candidate>>> {
        for text in self.lines.by_ref() {
            self.line += 1;
            let text = text?;
            if text.trim().is_empty() {
                continue;
            }
            let candidates = serde_json::from_str(&text)
                .map_err(|source| TrackerError::Replay { line: self.line, source })?;
            return Ok(Some(candidates));
        }
        Ok(None)
    }
}

use crate::error::EditError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Smallest piece a split or trim may leave behind, in seconds.
pub const MIN_SPLIT_GAP: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClipSource {
    Media { path: PathBuf },
    /// Generated silence; only valid on the speech track.
    Silence,
}

/// A window onto a source file (or silence) placed on a track.
///
/// `duration` is the full source length. `trim_start` and `trim_end` cut
/// seconds from the head and tail; the visible length is what remains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: Uuid,
    pub source: ClipSource,
    pub duration: f64,
    pub trim_start: f64,
    pub trim_end: f64,
}

impl Clip {
    pub fn media(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: ClipSource::Media { path: path.into() },
            duration: duration.max(0.0),
            trim_start: 0.0,
            trim_end: 0.0,
        }
    }

    pub fn silence(duration: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: ClipSource::Silence,
            duration: duration.max(0.0),
            trim_start: 0.0,
            trim_end: 0.0,
        }
    }

    pub fn is_silence(&self) -> bool {
        matches!(self.source, ClipSource::Silence)
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            ClipSource::Media { path } => Some(path),
            ClipSource::Silence => None,
        }
    }

    pub fn display_name(&self) -> String {
        match &self.source {
            ClipSource::Media { path } => path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            ClipSource::Silence => "Silence".to_string(),
        }
    }

    /// Effective length on the timeline.
    pub fn trimmed_duration(&self) -> f64 {
        if self.is_silence() {
            return self.duration;
        }
        (self.duration - self.trim_start - self.trim_end).max(0.0)
    }

    /// Split at `offset` seconds from the clip's visible start.
    ///
    /// The left half keeps this clip's id, the right half gets a new one.
    pub fn split_at(&self, offset: f64) -> Result<(Clip, Clip), EditError> {
        let length = self.trimmed_duration();
        if !offset.is_finite() || offset < MIN_SPLIT_GAP || offset > length - MIN_SPLIT_GAP {
            return Err(EditError::SplitOutOfRange { offset, length });
        }

        let mut left = self.clone();
        let mut right = self.clone();
        right.id = Uuid::new_v4();

        if self.is_silence() {
            left.duration = offset;
            right.duration = length - offset;
        } else {
            left.trim_end += length - offset;
            right.trim_start += offset;
        }

        Ok((left, right))
    }

    /// Replace both trims, keeping at least `MIN_SPLIT_GAP` of media visible.
    pub fn set_trim(&mut self, start: f64, end: f64) -> Result<(), EditError> {
        let invalid = EditError::InvalidTrim {
            start,
            end,
            duration: self.duration,
        };
        if self.is_silence() || start < 0.0 || end < 0.0 {
            return Err(invalid);
        }
        if self.duration - start - end < MIN_SPLIT_GAP {
            return Err(invalid);
        }
        self.trim_start = start;
        self.trim_end = end;
        Ok(())
    }

    /// Source time (seconds into the file) where playback of this clip begins.
    pub fn source_in(&self) -> f64 {
        if self.is_silence() {
            0.0
        } else {
            self.trim_start
        }
    }

    pub fn is_trimmed(&self) -> bool {
        !self.is_silence() && (self.trim_start > 0.0 || self.trim_end > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_trimmed_duration() {
        let mut clip = Clip::media("a.mp4", 20.0);
        assert!(approx(clip.trimmed_duration(), 20.0));

        clip.trim_start = 3.0;
        clip.trim_end = 2.0;
        assert!(approx(clip.trimmed_duration(), 15.0));

        clip.trim_end = 30.0;
        assert_eq!(clip.trimmed_duration(), 0.0);
    }

    #[test]
    fn test_silence_ignores_trims() {
        let mut clip = Clip::silence(4.0);
        clip.trim_start = 1.0;
        assert!(approx(clip.trimmed_duration(), 4.0));
        assert!(clip.path().is_none());
        assert_eq!(clip.display_name(), "Silence");
    }

    #[test]
    fn test_split_twenty_second_clip_at_eight() {
        let clip = Clip::media("a.mp4", 20.0);
        let (left, right) = clip.split_at(8.0).unwrap();

        assert!(approx(left.trimmed_duration(), 8.0));
        assert!(approx(right.trimmed_duration(), 12.0));
        assert!(approx(left.trim_end, 12.0));
        assert!(approx(right.trim_start, 8.0));
        assert_eq!(left.id, clip.id);
        assert_ne!(right.id, clip.id);
    }

    #[test]
    fn test_split_trimmed_clip_keeps_coverage() {
        let mut clip = Clip::media("a.mp4", 30.0);
        clip.set_trim(5.0, 5.0).unwrap();

        let (left, right) = clip.split_at(6.0).unwrap();
        assert!(approx(left.trimmed_duration() + right.trimmed_duration(), 20.0));
        assert!(approx(left.trim_start, 5.0));
        assert!(approx(left.trim_end, 19.0));
        assert!(approx(right.trim_start, 11.0));
        assert!(approx(right.trim_end, 5.0));
        assert!(approx(right.source_in(), 11.0));
    }

    #[test]
    fn test_split_silence() {
        let clip = Clip::silence(10.0);
        let (left, right) = clip.split_at(4.0).unwrap();
        assert!(approx(left.duration, 4.0));
        assert!(approx(right.duration, 6.0));
        assert!(right.is_silence());
    }

    #[test]
    fn test_split_on_edge_rejected() {
        let clip = Clip::media("a.mp4", 10.0);
        assert!(matches!(clip.split_at(0.0), Err(EditError::SplitOutOfRange { .. })));
        assert!(matches!(clip.split_at(10.0), Err(EditError::SplitOutOfRange { .. })));
        assert!(clip.split_at(f64::NAN).is_err());
    }

    #[test]
    fn test_set_trim_validation() {
        let mut clip = Clip::media("a.mp4", 10.0);
        assert!(clip.set_trim(-1.0, 0.0).is_err());
        assert!(clip.set_trim(6.0, 4.0).is_err());
        assert!(clip.set_trim(2.0, 3.0).is_ok());
        assert!(clip.is_trimmed());

        let mut silence = Clip::silence(2.0);
        assert!(silence.set_trim(0.5, 0.0).is_err());
    }
}

use super::clip::Clip;
use crate::error::EditError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    Video,
    Speech,
    Music,
}

impl TrackKind {
    pub fn all() -> &'static [TrackKind] {
        &[TrackKind::Video, TrackKind::Speech, TrackKind::Music]
    }

    pub fn name(&self) -> &'static str {
        match self {
            TrackKind::Video => "video",
            TrackKind::Speech => "speech",
            TrackKind::Music => "music",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrackKind::Video => "Video",
            TrackKind::Speech => "Speech",
            TrackKind::Music => "Music",
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The clip store: three tracks of back-to-back clips.
///
/// Clips carry no position of their own; a clip starts where the previous
/// one on its track ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub video: Vec<Clip>,
    pub speech: Vec<Clip>,
    pub music: Vec<Clip>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, kind: TrackKind) -> &[Clip] {
        match kind {
            TrackKind::Video => &self.video,
            TrackKind::Speech => &self.speech,
            TrackKind::Music => &self.music,
        }
    }

    pub fn track_mut(&mut self, kind: TrackKind) -> &mut Vec<Clip> {
        match kind {
            TrackKind::Video => &mut self.video,
            TrackKind::Speech => &mut self.speech,
            TrackKind::Music => &mut self.music,
        }
    }

    pub fn clip(&self, kind: TrackKind, index: usize) -> Option<&Clip> {
        self.track(kind).get(index)
    }

    pub fn push_clip(&mut self, kind: TrackKind, clip: Clip) -> Result<usize, EditError> {
        check_placement(kind, &clip)?;
        let track = self.track_mut(kind);
        track.push(clip);
        Ok(track.len() - 1)
    }

    pub fn insert_clip(&mut self, kind: TrackKind, index: usize, clip: Clip) -> Result<(), EditError> {
        check_placement(kind, &clip)?;
        let track = self.track_mut(kind);
        if index > track.len() {
            return Err(EditError::ClipIndexOutOfRange { track: kind, index });
        }
        track.insert(index, clip);
        Ok(())
    }

    /// The music track is a single slot: a new file replaces every piece.
    pub fn set_music(&mut self, clip: Clip) -> Result<(), EditError> {
        check_placement(TrackKind::Music, &clip)?;
        self.music = vec![clip];
        Ok(())
    }

    pub fn remove_clip(&mut self, kind: TrackKind, index: usize) -> Result<Clip, EditError> {
        let track = self.track_mut(kind);
        if index >= track.len() {
            return Err(EditError::ClipIndexOutOfRange { track: kind, index });
        }
        Ok(track.remove(index))
    }

    pub fn move_clip(&mut self, kind: TrackKind, from: usize, to: usize) -> Result<(), EditError> {
        let track = self.track_mut(kind);
        let len = track.len();
        if from >= len {
            return Err(EditError::ClipIndexOutOfRange { track: kind, index: from });
        }
        if to >= len {
            return Err(EditError::ClipIndexOutOfRange { track: kind, index: to });
        }
        let clip = track.remove(from);
        track.insert(to, clip);
        Ok(())
    }

    /// Start time of a clip: the sum of the trimmed lengths before it.
    pub fn clip_start(&self, kind: TrackKind, index: usize) -> f64 {
        self.track(kind)
            .iter()
            .take(index)
            .map(Clip::trimmed_duration)
            .sum()
    }

    pub fn track_duration(&self, kind: TrackKind) -> f64 {
        self.track(kind).iter().map(Clip::trimmed_duration).sum()
    }

    pub fn total_duration(&self) -> f64 {
        TrackKind::all()
            .iter()
            .map(|&kind| self.track_duration(kind))
            .fold(0.0, f64::max)
    }

    /// Find the clip under `time`, returning its index and the offset into it.
    pub fn clip_at(&self, kind: TrackKind, time: f64) -> Option<(usize, f64)> {
        if time < 0.0 {
            return None;
        }
        let mut start = 0.0;
        for (index, clip) in self.track(kind).iter().enumerate() {
            let length = clip.trimmed_duration();
            if time >= start && time < start + length {
                return Some((index, time - start));
            }
            start += length;
        }
        None
    }

    /// Split the clip under `time` in place. Returns the index of the right half.
    pub fn split_at(&mut self, kind: TrackKind, time: f64) -> Result<usize, EditError> {
        let (index, offset) = self
            .clip_at(kind, time)
            .ok_or(EditError::NothingToSplit(kind))?;
        let (left, right) = self.track(kind)[index].split_at(offset)?;

        let track = self.track_mut(kind);
        track[index] = left;
        track.insert(index + 1, right);
        Ok(index + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.video.is_empty() && self.speech.is_empty() && self.music.is_empty()
    }

    pub fn clip_count(&self) -> usize {
        self.video.len() + self.speech.len() + self.music.len()
    }

    pub fn clear(&mut self) {
        self.video.clear();
        self.speech.clear();
        self.music.clear();
    }
}

fn check_placement(kind: TrackKind, clip: &Clip) -> Result<(), EditError> {
    if clip.is_silence() && kind != TrackKind::Speech {
        return Err(EditError::SilenceOutsideSpeech);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline_with_video(durations: &[f64]) -> Timeline {
        let mut timeline = Timeline::new();
        for (i, d) in durations.iter().enumerate() {
            timeline
                .push_clip(TrackKind::Video, Clip::media(format!("v{}.mp4", i), *d))
                .unwrap();
        }
        timeline
    }

    #[test]
    fn test_clip_starts_are_cumulative() {
        let timeline = timeline_with_video(&[5.0, 10.0, 3.0]);
        assert_eq!(timeline.clip_start(TrackKind::Video, 0), 0.0);
        assert_eq!(timeline.clip_start(TrackKind::Video, 1), 5.0);
        assert_eq!(timeline.clip_start(TrackKind::Video, 2), 15.0);
        assert_eq!(timeline.track_duration(TrackKind::Video), 18.0);
    }

    #[test]
    fn test_total_duration_is_longest_track() {
        let mut timeline = timeline_with_video(&[5.0]);
        timeline.push_clip(TrackKind::Speech, Clip::silence(12.0)).unwrap();
        timeline.set_music(Clip::media("m.mp3", 7.0)).unwrap();
        assert_eq!(timeline.total_duration(), 12.0);
        assert_eq!(timeline.clip_count(), 3);
    }

    #[test]
    fn test_clip_at() {
        let timeline = timeline_with_video(&[5.0, 10.0]);
        assert_eq!(timeline.clip_at(TrackKind::Video, 0.0), Some((0, 0.0)));
        assert_eq!(timeline.clip_at(TrackKind::Video, 7.0), Some((1, 2.0)));
        assert_eq!(timeline.clip_at(TrackKind::Video, 15.0), None);
        assert_eq!(timeline.clip_at(TrackKind::Video, -1.0), None);
        assert_eq!(timeline.clip_at(TrackKind::Speech, 1.0), None);
    }

    #[test]
    fn test_split_at_time() {
        let mut timeline = timeline_with_video(&[5.0, 20.0]);
        let right = timeline.split_at(TrackKind::Video, 13.0).unwrap();

        assert_eq!(right, 2);
        assert_eq!(timeline.video.len(), 3);
        assert!((timeline.video[1].trimmed_duration() - 8.0).abs() < 1e-9);
        assert!((timeline.video[2].trimmed_duration() - 12.0).abs() < 1e-9);
        assert_eq!(timeline.track_duration(TrackKind::Video), 25.0);
    }

    #[test]
    fn test_split_outside_clips() {
        let mut timeline = timeline_with_video(&[5.0]);
        assert_eq!(
            timeline.split_at(TrackKind::Video, 9.0),
            Err(EditError::NothingToSplit(TrackKind::Video))
        );
        assert!(matches!(
            timeline.split_at(TrackKind::Video, 5.0 - 0.01),
            Err(EditError::SplitOutOfRange { .. })
        ));
    }

    #[test]
    fn test_music_slot_replaces() {
        let mut timeline = Timeline::new();
        timeline.set_music(Clip::media("a.mp3", 30.0)).unwrap();
        timeline.split_at(TrackKind::Music, 10.0).unwrap();
        assert_eq!(timeline.music.len(), 2);

        timeline.set_music(Clip::media("b.mp3", 12.0)).unwrap();
        assert_eq!(timeline.music.len(), 1);
        assert_eq!(timeline.track_duration(TrackKind::Music), 12.0);
    }

    #[test]
    fn test_silence_only_on_speech() {
        let mut timeline = Timeline::new();
        assert_eq!(
            timeline.push_clip(TrackKind::Video, Clip::silence(2.0)),
            Err(EditError::SilenceOutsideSpeech)
        );
        assert_eq!(timeline.push_clip(TrackKind::Speech, Clip::silence(2.0)), Ok(0));
    }

    #[test]
    fn test_move_and_remove() {
        let mut timeline = timeline_with_video(&[1.0, 2.0, 3.0]);
        let first = timeline.video[0].id;
        timeline.move_clip(TrackKind::Video, 0, 2).unwrap();
        assert_eq!(timeline.video[2].id, first);
        assert_eq!(timeline.video[0].duration, 2.0);

        assert!(timeline.move_clip(TrackKind::Video, 0, 3).is_err());

        let removed = timeline.remove_clip(TrackKind::Video, 2).unwrap();
        assert_eq!(removed.id, first);
        assert!(matches!(
            timeline.remove_clip(TrackKind::Video, 5),
            Err(EditError::ClipIndexOutOfRange { index: 5, .. })
        ));
    }

    #[test]
    fn test_insert_clip() {
        let mut timeline = timeline_with_video(&[1.0, 3.0]);
        timeline
            .insert_clip(TrackKind::Video, 1, Clip::media("x.mp4", 2.0))
            .unwrap();
        assert_eq!(timeline.video[1].duration, 2.0);
        assert!(timeline
            .insert_clip(TrackKind::Video, 9, Clip::media("y.mp4", 1.0))
            .is_err());
    }
}

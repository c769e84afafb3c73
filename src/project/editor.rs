use super::clip::Clip;
use super::export::{ClipInput, CompositionInput, CompositionSettings, RenderTarget};
use super::history::History;
use super::selection::{ClipRef, Selection};
use super::timeline::{Timeline, TrackKind};
use crate::error::EditError;
use std::path::Path;
use tracing::{debug, info};

pub const MAX_VOLUME_PERCENT: u32 = 200;

/// Track volumes in percent (0-200).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Volumes {
    pub speech_percent: u32,
    pub music_percent: u32,
}

impl Volumes {
    pub fn set_speech(&mut self, percent: u32) {
        self.speech_percent = percent.min(MAX_VOLUME_PERCENT);
    }

    pub fn set_music(&mut self, percent: u32) {
        self.music_percent = percent.min(MAX_VOLUME_PERCENT);
    }

    pub fn speech_gain(&self) -> f64 {
        self.speech_percent as f64 / 100.0
    }

    pub fn music_gain(&self) -> f64 {
        self.music_percent as f64 / 100.0
    }
}

impl Default for Volumes {
    fn default() -> Self {
        Self {
            speech_percent: 100,
            music_percent: 50,
        }
    }
}

/// Timeline editing state: clips, history, selection and playhead.
///
/// Every structural change snapshots the timeline first, so undo restores
/// exactly what was on screen before the action. Playhead moves, selection
/// and volumes are not part of the history.
#[derive(Debug, Clone)]
pub struct Editor {
    timeline: Timeline,
    history: History<Timeline>,
    selection: Selection,
    playhead: f64,
    pub volumes: Volumes,
}

impl Editor {
    pub fn new(undo_limit: usize) -> Self {
        Self {
            timeline: Timeline::new(),
            history: History::new(undo_limit),
            selection: Selection::default(),
            playhead: 0.0,
            volumes: Volumes::default(),
        }
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn history(&self) -> &History<Timeline> {
        &self.history
    }

    pub fn selection(&self) -> Option<ClipRef> {
        self.selection.get()
    }

    pub fn is_selected(&self, track: TrackKind, index: usize) -> bool {
        self.selection.is_selected(track, index)
    }

    pub fn playhead(&self) -> f64 {
        self.playhead
    }

    pub fn total_duration(&self) -> f64 {
        self.timeline.total_duration()
    }

    /// Snapshot, mutate, and keep the snapshot only if the mutation succeeded.
    fn apply<R>(
        &mut self,
        label: &str,
        edit: impl FnOnce(&mut Timeline) -> Result<R, EditError>,
    ) -> Result<R, EditError> {
        let snapshot = self.timeline.clone();
        let result = edit(&mut self.timeline)?;
        self.history.record(label, snapshot);
        info!(action = label, undo_depth = self.history.undo_len(), "timeline edited");
        Ok(result)
    }

    /// Append a clip. On the music track this replaces the current music.
    pub fn add_clip(&mut self, kind: TrackKind, clip: Clip) -> Result<usize, EditError> {
        let label = format!("Add {} clip", kind);
        match kind {
            TrackKind::Music => {
                let index = self.apply(&label, |t| t.set_music(clip).map(|_| 0))?;
                self.selection.clear_track(TrackKind::Music);
                Ok(index)
            }
            _ => self.apply(&label, |t| t.push_clip(kind, clip)),
        }
    }

    pub fn add_silence(&mut self, duration: f64) -> Result<usize, EditError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(EditError::InvalidDuration(duration));
        }
        self.apply("Add silence", |t| t.push_clip(TrackKind::Speech, Clip::silence(duration)))
    }

    pub fn remove_clip(&mut self, kind: TrackKind, index: usize) -> Result<Clip, EditError> {
        let removed = self.apply(&format!("Remove {} clip", kind), |t| t.remove_clip(kind, index))?;
        self.selection.on_removed(kind, index);
        self.clamp_playhead();
        Ok(removed)
    }

    pub fn delete_selected(&mut self) -> Result<Clip, EditError> {
        let selected = self.selection.get().ok_or(EditError::NothingSelected)?;
        self.remove_clip(selected.track, selected.index)
    }

    /// Split the clip under the playhead. Returns the index of the right half.
    pub fn split_at_playhead(&mut self, kind: TrackKind) -> Result<usize, EditError> {
        let time = self.playhead;
        let right = self.apply(&format!("Split {} clip", kind), |t| t.split_at(kind, time))?;
        self.selection.clear();
        debug!(track = %kind, time, right, "split clip");
        Ok(right)
    }

    /// Split on the selected clip's track, or the video track with no selection.
    pub fn split_selected_at_playhead(&mut self) -> Result<usize, EditError> {
        let kind = self
            .selection
            .get()
            .map(|s| s.track)
            .unwrap_or(TrackKind::Video);
        self.split_at_playhead(kind)
    }

    pub fn move_clip(&mut self, kind: TrackKind, from: usize, to: usize) -> Result<(), EditError> {
        if from == to {
            return Ok(());
        }
        self.apply(&format!("Move {} clip", kind), |t| t.move_clip(kind, from, to))?;
        self.selection.on_moved(kind, from, to);
        Ok(())
    }

    pub fn trim_clip(
        &mut self,
        kind: TrackKind,
        index: usize,
        start: f64,
        end: f64,
    ) -> Result<(), EditError> {
        self.apply(&format!("Trim {} clip", kind), |t| {
            t.track_mut(kind)
                .get_mut(index)
                .ok_or(EditError::ClipIndexOutOfRange { track: kind, index })?
                .set_trim(start, end)
        })?;
        self.clamp_playhead();
        Ok(())
    }

    pub fn undo(&mut self) -> Result<String, EditError> {
        let current = self.timeline.clone();
        let (label, state) = self.history.undo(current).ok_or(EditError::NothingToUndo)?;
        self.restore(state);
        info!(action = %label, undo_depth = self.history.undo_len(), "undo");
        Ok(label)
    }

    pub fn redo(&mut self) -> Result<String, EditError> {
        let current = self.timeline.clone();
        let (label, state) = self.history.redo(current).ok_or(EditError::NothingToRedo)?;
        self.restore(state);
        info!(action = %label, redo_depth = self.history.redo_len(), "redo");
        Ok(label)
    }

    fn restore(&mut self, state: Timeline) {
        self.timeline = state;
        self.selection.clear();
        self.clamp_playhead();
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Label of the action the next undo reverts.
    pub fn undo_label(&self) -> Option<&str> {
        self.history.undo_label()
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.history.redo_label()
    }

    pub fn select(&mut self, kind: TrackKind, index: usize) -> Result<(), EditError> {
        if self.timeline.clip(kind, index).is_none() {
            return Err(EditError::ClipIndexOutOfRange { track: kind, index });
        }
        self.selection.select(kind, index);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn set_playhead(&mut self, time: f64) {
        let max = self.timeline.total_duration().max(0.0);
        self.playhead = if time.is_finite() { time.clamp(0.0, max) } else { 0.0 };
    }

    fn clamp_playhead(&mut self) {
        self.set_playhead(self.playhead);
    }

    /// Drop all clips and history.
    pub fn reset(&mut self) {
        self.timeline.clear();
        self.history.clear();
        self.selection.clear();
        self.playhead = 0.0;
    }

    /// Describe the current timeline for the renderer.
    pub fn composition(
        &self,
        settings: &CompositionSettings,
        target: RenderTarget,
        has_audio: impl Fn(&Path) -> bool,
    ) -> Result<CompositionInput, EditError> {
        if self.timeline.is_empty() {
            return Err(EditError::EmptyComposition);
        }

        let inputs = |kind: TrackKind| -> Vec<ClipInput> {
            self.timeline
                .track(kind)
                .iter()
                // Unprobed files have no length and nothing to render.
                .filter(|clip| clip.trimmed_duration() > 0.0)
                .map(|clip| ClipInput {
                    path: clip.path().map(Path::to_path_buf),
                    trim_start: clip.source_in(),
                    length: clip.trimmed_duration(),
                    trimmed: clip.is_trimmed(),
                    has_audio: clip.path().map(|p| has_audio(p)).unwrap_or(false),
                })
                .collect()
        };

        let (width, height) = target.resolution();
        Ok(CompositionInput {
            video: inputs(TrackKind::Video),
            speech: inputs(TrackKind::Speech),
            music: inputs(TrackKind::Music),
            speech_gain: self.volumes.speech_gain(),
            music_gain: self.volumes.music_gain(),
            settings: settings.clone(),
            width,
            height,
        })
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(super::history::DEFAULT_UNDO_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor_with_speech(durations: &[f64]) -> Editor {
        let mut editor = Editor::default();
        for (i, d) in durations.iter().enumerate() {
            editor
                .add_clip(TrackKind::Speech, Clip::media(format!("s{}.mp3", i), *d))
                .unwrap();
        }
        editor
    }

    #[test]
    fn test_undo_redo_restores_clip_counts() {
        let mut editor = editor_with_speech(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(editor.timeline().speech.len(), 5);

        for _ in 0..3 {
            editor.undo().unwrap();
        }
        assert_eq!(editor.timeline().speech.len(), 2);
        assert_eq!(editor.history().redo_len(), 3);

        editor.redo().unwrap();
        editor.redo().unwrap();
        assert_eq!(editor.timeline().speech.len(), 4);

        editor.undo().unwrap();
        assert_eq!(editor.timeline().speech.len(), 3);
    }

    #[test]
    fn test_history_bounded() {
        let mut editor = Editor::default();
        for _ in 0..25 {
            editor.add_silence(1.0).unwrap();
        }
        assert_eq!(editor.history().undo_len(), 20);
        assert!(editor.can_undo());
        assert!(!editor.can_redo());
    }

    #[test]
    fn test_empty_history_errors() {
        let mut editor = Editor::default();
        assert_eq!(editor.undo(), Err(EditError::NothingToUndo));
        assert_eq!(editor.redo(), Err(EditError::NothingToRedo));
    }

    #[test]
    fn test_split_at_playhead() {
        let mut editor = Editor::default();
        editor
            .add_clip(TrackKind::Video, Clip::media("a.mp4", 20.0))
            .unwrap();
        editor.set_playhead(8.0);

        let right = editor.split_at_playhead(TrackKind::Video).unwrap();
        assert_eq!(right, 1);
        let video = &editor.timeline().video;
        assert!((video[0].trimmed_duration() - 8.0).abs() < 1e-9);
        assert!((video[1].trimmed_duration() - 12.0).abs() < 1e-9);

        editor.undo().unwrap();
        assert_eq!(editor.timeline().video.len(), 1);
    }

    #[test]
    fn test_failed_split_not_recorded() {
        let mut editor = editor_with_speech(&[5.0]);
        let depth = editor.history().undo_len();
        editor.set_playhead(5.0);
        assert!(editor.split_at_playhead(TrackKind::Video).is_err());
        assert_eq!(editor.history().undo_len(), depth);
    }

    #[test]
    fn test_split_selected_uses_selected_track() {
        let mut editor = editor_with_speech(&[10.0]);
        editor.select(TrackKind::Speech, 0).unwrap();
        editor.set_playhead(4.0);
        editor.split_selected_at_playhead().unwrap();
        assert_eq!(editor.timeline().speech.len(), 2);
        assert_eq!(editor.selection(), None);
    }

    #[test]
    fn test_delete_selected() {
        let mut editor = editor_with_speech(&[1.0, 2.0, 3.0]);
        assert_eq!(editor.delete_selected(), Err(EditError::NothingSelected));

        editor.select(TrackKind::Speech, 1).unwrap();
        let removed = editor.delete_selected().unwrap();
        assert_eq!(removed.duration, 2.0);
        assert_eq!(editor.timeline().speech.len(), 2);
        assert_eq!(editor.selection(), None);

        assert!(editor.select(TrackKind::Speech, 9).is_err());
    }

    #[test]
    fn test_music_replaces_slot() {
        let mut editor = Editor::default();
        editor.add_clip(TrackKind::Music, Clip::media("a.mp3", 60.0)).unwrap();
        editor.add_clip(TrackKind::Music, Clip::media("b.mp3", 30.0)).unwrap();
        assert_eq!(editor.timeline().music.len(), 1);
        editor.undo().unwrap();
        assert_eq!(editor.timeline().music[0].duration, 60.0);
    }

    #[test]
    fn test_playhead_clamped() {
        let mut editor = editor_with_speech(&[10.0]);
        editor.set_playhead(25.0);
        assert_eq!(editor.playhead(), 10.0);
        editor.set_playhead(-4.0);
        assert_eq!(editor.playhead(), 0.0);

        editor.set_playhead(9.0);
        editor.undo().unwrap();
        assert_eq!(editor.playhead(), 0.0);
    }

    #[test]
    fn test_volumes() {
        let mut volumes = Volumes::default();
        assert_eq!(volumes.speech_percent, 100);
        assert_eq!(volumes.music_percent, 50);
        assert_eq!(volumes.music_gain(), 0.5);

        volumes.set_speech(350);
        assert_eq!(volumes.speech_percent, 200);
        assert_eq!(volumes.speech_gain(), 2.0);
    }

    #[test]
    fn test_trim_and_move() {
        let mut editor = editor_with_speech(&[10.0, 4.0]);
        editor.trim_clip(TrackKind::Speech, 0, 2.0, 3.0).unwrap();
        assert_eq!(editor.timeline().track_duration(TrackKind::Speech), 9.0);
        assert!(editor.trim_clip(TrackKind::Speech, 5, 0.0, 0.0).is_err());

        editor.select(TrackKind::Speech, 0).unwrap();
        editor.move_clip(TrackKind::Speech, 0, 1).unwrap();
        assert_eq!(editor.timeline().speech[1].duration, 10.0);
        assert!(editor.is_selected(TrackKind::Speech, 1));
    }

    #[test]
    fn test_composition() {
        let mut editor = Editor::default();
        assert_eq!(
            editor
                .composition(&CompositionSettings::default(), RenderTarget::Preview, |_| true)
                .unwrap_err(),
            EditError::EmptyComposition
        );

        let mut clip = Clip::media("a.mp4", 20.0);
        clip.set_trim(2.0, 3.0).unwrap();
        editor.add_clip(TrackKind::Video, clip).unwrap();
        editor.add_silence(1.5).unwrap();

        let input = editor
            .composition(&CompositionSettings::default(), RenderTarget::Export, |p| {
                p.ends_with("a.mp4")
            })
            .unwrap();
        assert_eq!((input.width, input.height), (1920, 1080));
        assert_eq!(input.video[0].trim_start, 2.0);
        assert_eq!(input.video[0].length, 15.0);
        assert!(input.video[0].has_audio);
        assert!(input.speech[0].path.is_none());
        assert_eq!(input.music_gain, 0.5);
    }

    #[test]
    fn test_composition_skips_empty_clips() {
        let mut editor = Editor::default();
        editor.add_clip(TrackKind::Video, Clip::media("broken.mp4", 0.0)).unwrap();
        editor.add_clip(TrackKind::Video, Clip::media("ok.mp4", 4.0)).unwrap();

        let input = editor
            .composition(&CompositionSettings::default(), RenderTarget::Preview, |_| false)
            .unwrap();
        assert_eq!(input.video.len(), 1);
        assert_eq!(input.video[0].path.as_deref(), Some(Path::new("ok.mp4")));
    }

    #[test]
    fn test_move_keeps_selection_on_same_clip() {
        let mut editor = Editor::default();
        for i in 0..4 {
            editor
                .add_clip(TrackKind::Video, Clip::media(format!("v{}.mp4", i), 5.0))
                .unwrap();
        }
        editor.select(TrackKind::Video, 2).unwrap();
        let selected_id = editor.timeline().clip(TrackKind::Video, 2).unwrap().id;

        editor.move_clip(TrackKind::Video, 0, 3).unwrap();
        let sel = editor.selection().unwrap();
        assert_eq!(sel.index, 1);
        assert_eq!(editor.timeline().clip(TrackKind::Video, sel.index).unwrap().id, selected_id);

        editor.move_clip(TrackKind::Video, 3, 0).unwrap();
        let sel = editor.selection().unwrap();
        assert_eq!(editor.timeline().clip(TrackKind::Video, sel.index).unwrap().id, selected_id);

        let removed = editor.delete_selected().unwrap();
        assert_eq!(removed.id, selected_id);
    }

    #[test]
    fn test_music_replace_clears_music_selection() {
        let mut editor = Editor::default();
        editor.add_clip(TrackKind::Music, Clip::media("song.mp3", 10.0)).unwrap();
        editor.set_playhead(4.0);
        editor.split_at_playhead(TrackKind::Music).unwrap();
        editor.select(TrackKind::Music, 1).unwrap();

        editor.add_clip(TrackKind::Music, Clip::media("other.mp3", 8.0)).unwrap();
        assert_eq!(editor.selection(), None);
        assert_eq!(editor.delete_selected().unwrap_err(), EditError::NothingSelected);

        // A selection on another track survives the replace.
        editor.add_clip(TrackKind::Speech, Clip::media("voice.mp3", 3.0)).unwrap();
        editor.select(TrackKind::Speech, 0).unwrap();
        editor.add_clip(TrackKind::Music, Clip::media("third.mp3", 6.0)).unwrap();
        assert!(editor.is_selected(TrackKind::Speech, 0));
    }
}

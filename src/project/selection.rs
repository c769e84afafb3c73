use super::timeline::TrackKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipRef {
    pub track: TrackKind,
    pub index: usize,
}

/// The currently selected clip, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection(Option<ClipRef>);

impl Selection {
    pub fn select(&mut self, track: TrackKind, index: usize) {
        self.0 = Some(ClipRef { track, index });
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    pub fn get(&self) -> Option<ClipRef> {
        self.0
    }

    pub fn is_selected(&self, track: TrackKind, index: usize) -> bool {
        self.0 == Some(ClipRef { track, index })
    }

    /// Keep the selection pointing at the same clip after a removal.
    pub fn on_removed(&mut self, track: TrackKind, index: usize) {
        if let Some(current) = self.0 {
            if current.track != track {
                return;
            }
            if current.index == index {
                self.0 = None;
            } else if current.index > index {
                self.0 = Some(ClipRef {
                    track,
                    index: current.index - 1,
                });
            }
        }
    }

    /// Follow a clip moved from `from` to `to` on `track`, and shift the
    /// clips in between.
    pub fn on_moved(&mut self, track: TrackKind, from: usize, to: usize) {
        let Some(current) = self.0 else { return };
        if current.track != track {
            return;
        }
        let index = if current.index == from {
            to
        } else if from < current.index && current.index <= to {
            current.index - 1
        } else if to <= current.index && current.index < from {
            current.index + 1
        } else {
            current.index
        };
        self.0 = Some(ClipRef { track, index });
    }

    /// Drop the selection if it is on `track`.
    pub fn clear_track(&mut self, track: TrackKind) {
        if self.0.map(|c| c.track == track).unwrap_or(false) {
            self.0 = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_and_clear() {
        let mut selection = Selection::default();
        assert_eq!(selection.get(), None);

        selection.select(TrackKind::Speech, 2);
        assert!(selection.is_selected(TrackKind::Speech, 2));
        assert!(!selection.is_selected(TrackKind::Music, 2));

        selection.clear();
        assert_eq!(selection.get(), None);
    }

    #[test]
    fn test_removal_adjusts_index() {
        let mut selection = Selection::default();
        selection.select(TrackKind::Video, 3);

        selection.on_removed(TrackKind::Speech, 0);
        assert!(selection.is_selected(TrackKind::Video, 3));

        selection.on_removed(TrackKind::Video, 1);
        assert!(selection.is_selected(TrackKind::Video, 2));

        selection.on_removed(TrackKind::Video, 5);
        assert!(selection.is_selected(TrackKind::Video, 2));

        selection.on_removed(TrackKind::Video, 2);
        assert_eq!(selection.get(), None);
    }

    #[test]
    fn test_move_adjusts_index() {
        let mut selection = Selection::default();
        selection.select(TrackKind::Video, 2);

        // Moving an earlier clip past it shifts it left.
        selection.on_moved(TrackKind::Video, 0, 3);
        assert!(selection.is_selected(TrackKind::Video, 1));

        // Moving a later clip in front of it shifts it right.
        selection.on_moved(TrackKind::Video, 3, 0);
        assert!(selection.is_selected(TrackKind::Video, 2));

        // The moved clip itself follows the move.
        selection.on_moved(TrackKind::Video, 2, 0);
        assert!(selection.is_selected(TrackKind::Video, 0));

        // Moves elsewhere leave it alone.
        selection.on_moved(TrackKind::Video, 2, 3);
        selection.on_moved(TrackKind::Speech, 3, 0);
        assert!(selection.is_selected(TrackKind::Video, 0));
    }

    #[test]
    fn test_clear_track() {
        let mut selection = Selection::default();
        selection.select(TrackKind::Music, 1);
        selection.clear_track(TrackKind::Video);
        assert!(selection.is_selected(TrackKind::Music, 1));
        selection.clear_track(TrackKind::Music);
        assert_eq!(selection.get(), None);
    }
}

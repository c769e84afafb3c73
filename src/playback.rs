use std::time::Instant;

/// Wall clock that drives the playhead while the timeline plays.
#[derive(Debug)]
pub struct PlaybackClock {
    start_time: Option<Instant>,
    paused_time: f64,
    offset: f64,
    is_paused: bool,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self {
            start_time: None,
            paused_time: 0.0,
            offset: 0.0,
            is_paused: true,
        }
    }

    /// Start or resume from the current time
    pub fn resume(&mut self) {
        if self.is_paused {
            self.start_time = Some(Instant::now());
            self.offset = self.paused_time;
            self.is_paused = false;
        }
    }

    pub fn pause(&mut self) {
        if !self.is_paused {
            self.paused_time = self.time();
            self.is_paused = true;
        }
    }

    pub fn toggle(&mut self) {
        if self.is_paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Seek. Keeps playing if it was playing.
    pub fn set_time(&mut self, time: f64) {
        let time = time.max(0.0);
        if self.is_paused {
            self.paused_time = time;
        } else {
            self.start_time = Some(Instant::now());
            self.offset = time;
        }
    }

    /// Current time in seconds
    pub fn time(&self) -> f64 {
        if self.is_paused {
            self.paused_time
        } else if let Some(start) = self.start_time {
            start.elapsed().as_secs_f64() + self.offset
        } else {
            0.0
        }
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    /// Time to show for a timeline of length `total`.
    ///
    /// Pauses at the end; the next `resume` starts over from zero.
    pub fn tick(&mut self, total: f64) -> f64 {
        let time = self.time();
        if !self.is_paused && time >= total {
            self.pause();
            self.paused_time = total.max(0.0);
            return self.paused_time;
        }
        time.min(total.max(0.0))
    }

    /// Resume, rewinding first if the playhead sits at the end.
    pub fn play_from(&mut self, time: f64, total: f64) {
        let start = if time >= total { 0.0 } else { time };
        self.set_time(start);
        self.resume();
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

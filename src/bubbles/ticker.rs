/// Receives elapsed time from a [`Ticker`].
pub trait Tick {
    /// Returns whether the handler wants further ticks soon.
    fn on_tick(&mut self, elapsed_secs: f32) -> bool;
}

/// Frame scheduler decoupled from any rendering framework.
///
/// The host calls [`Ticker::advance`] once per rendered frame with its own
/// clock reading. A stopped ticker never reaches the handler, so tearing a
/// view down is a matter of calling [`Ticker::stop`].
#[derive(Clone, Debug)]
pub struct Ticker {
    running: bool,
    last_secs: Option<f64>,
    max_delta_secs: f32,
    ticks: u64,
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl Ticker {
    pub fn new(max_delta_secs: f32) -> Self {
        Self {
            running: false,
            last_secs: None,
            max_delta_secs: max_delta_secs.max(0.0),
            ticks: 0,
        }
    }

    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            self.last_secs = None;
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.last_secs = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Delivers the time since the previous advance, clamped to the max
    /// delta. The first advance after [`Ticker::start`] delivers zero.
    pub fn advance<T: Tick + ?Sized>(&mut self, now_secs: f64, handler: &mut T) -> bool {
        if !self.running {
            return false;
        }

        let elapsed = match self.last_secs {
            Some(previous) if now_secs.is_finite() => {
                ((now_secs - previous).max(0.0) as f32).min(self.max_delta_secs)
            }
            _ => 0.0,
        };
        if now_secs.is_finite() {
            self.last_secs = Some(now_secs);
        }
        self.ticks = self.ticks.wrapping_add(1);
        handler.on_tick(elapsed)
    }
}

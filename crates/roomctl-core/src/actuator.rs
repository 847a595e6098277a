use tracing::error;

use crate::hal::OutputLine;

/// Relay feeding the room plus the occupancy indicator. Both are written on
/// every call, whether or not the state changed.
pub struct PowerActuator {
    relay: OutputLine,
    indicator: OutputLine,
}

impl PowerActuator {
    pub fn new(relay: OutputLine, indicator: OutputLine) -> Self {
        Self { relay, indicator }
    }

    pub fn apply(&mut self, occupied: bool) {
        for line in [&mut self.relay, &mut self.indicator] {
            if let Err(e) = line.set(occupied) {
                error!("{}: write failed: {}", line.name(), e);
            }
        }
    }
}

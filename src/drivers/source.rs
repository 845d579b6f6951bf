use std::collections::VecDeque;
use rand::Rng;
/// Anything that can hand out the next raw belt reading.
///
/// Implementations never fail: a real sensor feed is expected to hold its last
/// known value (or report a neutral reading) instead of surfacing transport errors
/// into the tick loop.
pub trait SignalSource {
    fn next_sample(&mut self) -> f64;
}
/// Synthetic breathing signal: `sin(phase)` with a fixed phase step per call.
pub struct FakeBreathSource {
    phase: f64,
    step: f64,
    noise: f64,
}
impl FakeBreathSource {
    pub fn new(step: f64, noise: f64) -> Self {
        Self {
            phase: 0.0,
            step,
            noise: noise.abs(),
        }
    }
    #[cfg(test)]
    pub fn phase(&self) -> f64 {
        self.phase
    }
}
impl Default for FakeBreathSource {
    fn default() -> Self {
        Self::new(0.1, 0.0)
    }
}
impl SignalSource for FakeBreathSource {
    fn next_sample(&mut self) -> f64 {
        self.phase += self.step;
        let clean = self.phase.sin();
        if self.noise > 0.0 {
            clean + rand::thread_rng().gen_range(-self.noise..self.noise)
        } else {
            clean
        }
    }
}
/// In-memory source useful for tests and deterministic playback.
/// Once the queue runs dry the last value is held.
pub struct ManualSource {
    queue: VecDeque<f64>,
    last: f64,
}
impl ManualSource {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            queue: values.into_iter().collect(),
            last: 0.0,
        }
    }
    pub fn constant(value: f64) -> Self {
        Self {
            queue: VecDeque::new(),
            last: value,
        }
    }
    pub fn push(&mut self, value: f64) {
        self.queue.push_back(value);
    }
}
impl SignalSource for ManualSource {
    fn next_sample(&mut self) -> f64 {
        if let Some(v) = self.queue.pop_front() {
            self.last = v;
        }
        self.last
    }
}

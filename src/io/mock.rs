//! Scriptable in-memory hardware for tests and host runs
//!
//! `MockGpio` holds settable input levels, a queue of analog samples,
//! and records every discrete output write. Paired with a `MockClock`
//! it can also play back an ultrasonic echo pulse: the echo line reads
//! high exactly while the mock time sits inside the scheduled pulse,
//! which lets the bounded spin-waits in the ranging service run
//! deterministically.

use crate::io::clock::Clock;
use crate::io::display::Display;
use crate::io::gpio::{AnalogChannel, Gpio, InputLine, Level, OutputLine};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Manually-advanced clock. Every `now_us` call steps time forward by
/// `step_us`, so hardware-polling loops make progress without a real
/// timer; `now_ms` reads do not advance.
pub struct MockClock {
    inner: Mutex<ClockInner>,
}

struct ClockInner {
    now_us: u64,
    step_us: u64,
}

impl MockClock {
    pub fn new() -> Self {
        Self::with_step_us(0)
    }

    pub fn with_step_us(step_us: u64) -> Self {
        Self { inner: Mutex::new(ClockInner { now_us: 0, step_us }) }
    }

    /// Current time without advancing it
    pub fn peek_us(&self) -> u64 {
        self.inner.lock().now_us
    }

    pub fn advance_ms(&self, ms: u64) {
        self.inner.lock().now_us += ms * 1_000;
    }

    pub fn set_ms(&self, ms: u64) {
        self.inner.lock().now_us = ms * 1_000;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u32 {
        (self.peek_us() / 1_000) as u32
    }

    fn now_us(&self) -> u64 {
        let mut inner = self.inner.lock();
        let now = inner.now_us;
        inner.now_us += inner.step_us;
        now
    }
}

/// In-memory GPIO fabric
pub struct MockGpio {
    inner: Mutex<GpioInner>,
    /// Needed to evaluate a scheduled echo pulse against mock time
    clock: Option<Arc<MockClock>>,
}

struct GpioInner {
    inputs: HashMap<InputLine, Level>,
    outputs: HashMap<OutputLine, Level>,
    analog_queue: VecDeque<u16>,
    analog_last: u16,
    echo_pulse: Option<(u64, u64)>,
    output_history: Vec<(OutputLine, Level)>,
}

impl MockGpio {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(GpioInner {
                inputs: HashMap::new(),
                outputs: HashMap::new(),
                analog_queue: VecDeque::new(),
                analog_last: 0,
                echo_pulse: None,
                output_history: Vec::new(),
            }),
            clock: None,
        }
    }

    /// Attach the clock that echo pulse playback is timed against
    pub fn with_clock(mut self, clock: Arc<MockClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn set_level(&self, line: InputLine, level: Level) {
        self.inner.lock().inputs.insert(line, level);
    }

    /// Queue an analog conversion result; the last queued value
    /// repeats once the queue drains.
    pub fn push_analog(&self, sample: u16) {
        let mut inner = self.inner.lock();
        inner.analog_queue.push_back(sample);
    }

    /// Schedule the echo line high for `[rise_us, fall_us)` in mock time
    pub fn set_echo_pulse(&self, rise_us: u64, fall_us: u64) {
        self.inner.lock().echo_pulse = Some((rise_us, fall_us));
    }

    pub fn clear_echo_pulse(&self) {
        self.inner.lock().echo_pulse = None;
    }

    /// Last level written to an output line (Low if never written)
    pub fn output(&self, line: OutputLine) -> Level {
        self.inner.lock().outputs.get(&line).copied().unwrap_or(Level::Low)
    }

    /// Every output write in order, for asserting what was driven
    pub fn output_history(&self) -> Vec<(OutputLine, Level)> {
        self.inner.lock().output_history.clone()
    }
}

impl Default for MockGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl Gpio for MockGpio {
    fn read_digital(&self, line: InputLine) -> Level {
        if line == InputLine::UltrasonicEcho {
            if let (Some(clock), Some((rise, fall))) =
                (self.clock.as_ref(), self.inner.lock().echo_pulse)
            {
                let now = clock.peek_us();
                return if now >= rise && now < fall { Level::High } else { Level::Low };
            }
        }

        // Pull-ups on the original board: unset lines read high
        self.inner.lock().inputs.get(&line).copied().unwrap_or(Level::High)
    }

    fn read_analog(&self, _channel: AnalogChannel) -> u16 {
        let mut inner = self.inner.lock();
        if let Some(sample) = inner.analog_queue.pop_front() {
            inner.analog_last = sample;
        }
        inner.analog_last
    }

    fn set_output(&self, line: OutputLine, level: Level) {
        let mut inner = self.inner.lock();
        inner.outputs.insert(line, level);
        inner.output_history.push((line, level));
    }
}

/// Display that records every write for assertions
pub struct MockDisplay {
    writes: Vec<(u8, u8, String)>,
    clears: usize,
}

impl MockDisplay {
    pub fn new() -> Self {
        Self { writes: Vec::new(), clears: 0 }
    }

    pub fn writes(&self) -> &[(u8, u8, String)] {
        &self.writes
    }

    /// Most recent text written to a row, if any
    pub fn last_on_row(&self, row: u8) -> Option<&str> {
        self.writes.iter().rev().find(|(r, _, _)| *r == row).map(|(_, _, text)| text.as_str())
    }

    pub fn clears(&self) -> usize {
        self.clears
    }
}

impl Default for MockDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for MockDisplay {
    fn write_at(&mut self, row: u8, col: u8, text: &str) {
        self.writes.push((row, col, text.to_string()));
    }

    fn clear(&mut self) {
        self.clears += 1;
    }
}

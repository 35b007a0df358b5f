//! IO modules - hardware seams the interlock core drives
//!
//! This module contains the traits behind which the excluded
//! peripheral layers sit, plus the mock implementations used by tests
//! and the simulation binary:
//! - `gpio` - digital/analog input and discrete output lines
//! - `clock` - monotonic tick source for debounce and cadence timing
//! - `display` - row/column character display, mutex-arbitrated
//! - `mock` - scriptable in-memory implementations of all three

pub mod clock;
pub mod display;
pub mod gpio;
pub mod mock;

// Re-export commonly used types
pub use clock::{ticks_elapsed, Clock, MonotonicClock};
pub use display::{Display, SharedDisplay, TracingDisplay};
pub use gpio::{AnalogChannel, Gpio, InputLine, Level, OutputLine};
pub use mock::{MockClock, MockDisplay, MockGpio};

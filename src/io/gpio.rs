//! Digital/analog input and discrete output abstraction
//!
//! The core never touches peripheral registers; it reads instantaneous
//! line levels and fires discrete outputs through this trait. Inputs
//! from buttons and switches are wired with pull-ups on the original
//! board, so `Low` means pressed/asserted for the door inputs.

/// Instantaneous logic level of a digital line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(&self) -> bool {
        matches!(self, Level::High)
    }
}

/// Digital input lines the state machines sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputLine {
    /// External lock button, active low
    LockButton,
    /// Unlock button, active low
    UnlockButton,
    /// Ignition request switch; high = on requested
    Ignition,
    /// Door switch; high = closed (pull-up), low = open
    DoorSwitch,
    /// Gear selector, drive position
    GearDrive,
    /// Gear selector, reverse position
    GearReverse,
    /// Ultrasonic echo line
    UltrasonicEcho,
}

/// Discrete output lines the core asserts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputLine {
    UltrasonicTrigger,
    GreenLed,
    YellowLed,
    RedLed,
    Buzzer,
}

/// Analog input channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalogChannel {
    /// Potentiometer standing in for the speed sender, 12-bit samples
    SpeedSense,
}

/// Raw peripheral access as seen by the interlock core.
///
/// All calls return/apply the instantaneous hardware state and never
/// block; the bounded conversion/echo waits live in the services that
/// poll these lines. Implementations are shared across tasks, so
/// output state is behind interior mutability.
pub trait Gpio: Send + Sync {
    fn read_digital(&self, line: InputLine) -> Level;

    /// 12-bit conversion result, 0..=4095
    fn read_analog(&self, channel: AnalogChannel) -> u16;

    /// Fire-and-forget; no acknowledgment from the output layer
    fn set_output(&self, line: OutputLine, level: Level);
}

//! Character display seam
//!
//! The byte-level transport to the 2x16 panel is an external
//! collaborator; the core's only obligation is to hold the display
//! mutex across each logically-related group of writes so physical
//! writes from different tasks never interleave mid-command.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

pub trait Display: Send {
    /// Write text at (row, column); each call is atomic at the
    /// transport level.
    fn write_at(&mut self, row: u8, col: u8, text: &str);

    fn clear(&mut self);
}

/// Tasks share one physical display behind an unbounded-wait mutex
pub type SharedDisplay = Arc<Mutex<dyn Display>>;

/// Display implementation that mirrors panel writes into the log.
///
/// Stands in for the real panel driver on development hosts; keeps a
/// 2x16 shadow buffer so each write logs the full rendered row.
pub struct TracingDisplay {
    rows: [[u8; Self::COLS]; Self::ROWS],
}

impl TracingDisplay {
    const ROWS: usize = 2;
    const COLS: usize = 16;

    pub fn new() -> Self {
        Self { rows: [[b' '; Self::COLS]; Self::ROWS] }
    }

    fn render_row(&self, row: usize) -> String {
        String::from_utf8_lossy(&self.rows[row]).into_owned()
    }
}

impl Default for TracingDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TracingDisplay {
    fn write_at(&mut self, row: u8, col: u8, text: &str) {
        let row = row as usize;
        if row >= Self::ROWS {
            return;
        }
        let mut col = col as usize;
        for byte in text.bytes() {
            if col >= Self::COLS {
                break;
            }
            self.rows[row][col] = byte;
            col += 1;
        }
        debug!(row = row, content = %self.render_row(row), "display_row");
    }

    fn clear(&mut self) {
        self.rows = [[b' '; Self::COLS]; Self::ROWS];
        debug!("display_clear");
    }
}

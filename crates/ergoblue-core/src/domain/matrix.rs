//! Scan-matrix decoding for the two keyboard halves.
//!
//! Each half sends an 8-byte report per scan.  Byte 0 is a framing byte; the
//! remaining bytes form a little-endian bit field where bit `row + 6 * column`
//! is set while the switch at that row/column is closed.
//!
//! # Position numbering (for beginners)
//!
//! The keymap addresses keys by a single *position* in `0..76`, reading each
//! half top to bottom and left to right as the user sees it:
//!
//! ```text
//!        left half (0..38)                right half (38..76)
//!   row 0   0  1  2  3  4  5  6        38 39 40 41 42 43 44
//!   row 1   7  8  9 10 11 12 13        45 46 47 48 49 50 51
//!   ...
//! ```
//!
//! The left half is wired as a mirror image of the right, so its columns are
//! walked from 6 down to 0 while the right half walks 0 up to 6.  Four bit
//! positions sit under key stabilizers and carry no switch; they are skipped,
//! leaving 38 keys per half.

/// Total number of logical key positions across both halves.
pub const MATRIX_KEYS: usize = 76;
/// Logical key positions contributed by one half.
pub const KEYS_PER_HALF: usize = 38;
/// Length of one raw scan report.
pub const RAW_REPORT_LEN: usize = 8;

const ROWS: u32 = 6;
const COLUMNS: u32 = 7;

/// Bits with no physical switch behind them.
const STABILIZER_BITS: [u32; 4] = [2, 4, 10, 41];

/// Which physical half a report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// First logical position owned by this half.
    pub fn offset(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => KEYS_PER_HALF,
        }
    }

    /// Physical column visited at step `step` of a row scan.
    fn column(self, step: u32) -> u32 {
        match self {
            Side::Left => COLUMNS - 1 - step,
            Side::Right => step,
        }
    }
}

/// One raw report from one half, exactly as read from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMatrixEvent {
    pub raw: [u8; RAW_REPORT_LEN],
    pub side: Side,
}

/// A change of state at one logical position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEdge {
    pub position: usize,
    pub pressed: bool,
}

/// Decoded switch states of one half.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HalfScan {
    side: Side,
    states: [bool; KEYS_PER_HALF],
}

impl KeyMatrixEvent {
    pub fn new(raw: [u8; RAW_REPORT_LEN], side: Side) -> Self {
        Self { raw, side }
    }

    /// Maps the report's bit field onto this half's logical positions.
    pub fn decode(&self) -> HalfScan {
        let value = u64::from_le_bytes(self.raw) >> 8;
        let mut states = [false; KEYS_PER_HALF];
        let mut index = 0;

        for row in 0..ROWS {
            for step in 0..COLUMNS {
                let column = self.side.column(step);
                let bit = row + ROWS * column;
                if STABILIZER_BITS.contains(&bit) {
                    continue;
                }
                states[index] = value & (1 << bit) != 0;
                index += 1;
            }
        }

        HalfScan {
            side: self.side,
            states,
        }
    }
}

impl HalfScan {
    pub fn side(&self) -> Side {
        self.side
    }

    /// Whether the key at the global `position` is down in this scan.
    ///
    /// Positions belonging to the other half are reported as released.
    pub fn is_pressed(&self, position: usize) -> bool {
        position
            .checked_sub(self.side.offset())
            .and_then(|local| self.states.get(local))
            .copied()
            .unwrap_or(false)
    }

    /// Edges of this half relative to `previous`, in ascending position order.
    pub fn edges<'a>(
        &'a self,
        previous: &'a [bool; MATRIX_KEYS],
    ) -> impl Iterator<Item = KeyEdge> + 'a {
        let offset = self.side.offset();
        self.states
            .iter()
            .enumerate()
            .filter_map(move |(local, &pressed)| {
                let position = offset + local;
                (previous[position] != pressed).then_some(KeyEdge { position, pressed })
            })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Line-oriented serial channel.
//!
//! ```text
//!  RX interrupt ──▶ SerialRx::feed_byte ──┬─▶ realtime byte ──▶ RealtimeFlags
//!                                         └─▶ RxChannel ──▶ SerialPort::read_line
//! ```
//!
//! Realtime command bytes never enter the line buffer: they are turned
//! into execution requests at interrupt level so they work even while the
//! command engine is busy.  Everything else is queued in a bounded
//! `embassy-sync` channel and assembled into lines by the engine.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::{Deque, String};
use log::{debug, warn};

use crate::system::{ExecFlag, RealtimeFlags};

/// Bytes buffered between the RX interrupt and the engine.
pub const RX_CAPACITY: usize = 128;
/// Longest accepted command line, terminator excluded.
pub const LINE_MAX: usize = 80;
/// Longest response line; longer responses are truncated.
pub const TX_LINE_MAX: usize = 128;
/// Responses kept for inspection.
pub const TX_HISTORY: usize = 64;

pub type RxChannel = Channel<CriticalSectionRawMutex, u8, RX_CAPACITY>;
pub type Line = String<LINE_MAX>;
pub type TxLine = String<TX_LINE_MAX>;

// ---------------------------------------------------------------------------
// Realtime command bytes
// ---------------------------------------------------------------------------

pub const CMD_STATUS_REPORT: u8 = b'?';
pub const CMD_CYCLE_START: u8 = b'~';
pub const CMD_FEED_HOLD: u8 = b'!';
/// Ctrl-X
pub const CMD_RESET: u8 = 0x18;

/// Map a realtime byte to the execution request it raises.
pub const fn realtime_command(byte: u8) -> Option<ExecFlag> {
    match byte {
        CMD_STATUS_REPORT => Some(ExecFlag::StatusReport),
        CMD_CYCLE_START => Some(ExecFlag::CycleStart),
        CMD_FEED_HOLD => Some(ExecFlag::FeedHold),
        CMD_RESET => Some(ExecFlag::Reset),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// RX side (interrupt context)
// ---------------------------------------------------------------------------

/// Producer handle for the receive path.  `Copy`, so the interrupt
/// handler (or the host's stdin thread) can hold its own.
#[derive(Clone, Copy)]
pub struct SerialRx<'a> {
    channel: &'a RxChannel,
}

impl<'a> SerialRx<'a> {
    pub const fn new(channel: &'a RxChannel) -> Self {
        Self { channel }
    }

    /// Handle one received byte.  Returns `false` if the byte was dropped
    /// because the buffer is full.
    pub fn feed_byte(&self, byte: u8, rt: &RealtimeFlags) -> bool {
        if let Some(flag) = realtime_command(byte) {
            rt.set_exec(flag);
            return true;
        }
        self.channel.try_send(byte).is_ok()
    }
}

// ---------------------------------------------------------------------------
// Engine side
// ---------------------------------------------------------------------------

/// Result of assembling one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RxLine {
    Complete(Line),
    /// The line exceeded [`LINE_MAX`]; its contents were discarded.
    Overflow,
}

pub struct SerialPort<'a> {
    rx: &'a RxChannel,
    line: Line,
    overflow: bool,
    tx: Deque<TxLine, TX_HISTORY>,
    echo: bool,
    baud: u32,
    open: bool,
}

impl<'a> SerialPort<'a> {
    pub fn new(rx: &'a RxChannel) -> Self {
        Self {
            rx,
            line: Line::new(),
            overflow: false,
            tx: Deque::new(),
            echo: false,
            baud: 0,
            open: false,
        }
    }

    /// Also print every response to stdout.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn open(&mut self, baud: u32) {
        self.baud = baud;
        self.open = true;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }

    /// Drop every buffered byte and the partially assembled line.
    pub fn reset_read_buffer(&mut self) {
        let mut dropped = 0usize;
        while self.rx.try_receive().is_ok() {
            dropped += 1;
        }
        dropped += self.line.len();
        self.line.clear();
        self.overflow = false;
        if dropped > 0 {
            debug!("serial: discarded {} unread byte(s)", dropped);
        }
    }

    /// Assemble the next line from buffered bytes.  Returns `None` when no
    /// complete line is available yet.
    pub fn read_line(&mut self) -> Option<RxLine> {
        while let Ok(byte) = self.rx.try_receive() {
            match byte {
                b'\n' | b'\r' => {
                    if self.overflow {
                        self.overflow = false;
                        self.line.clear();
                        return Some(RxLine::Overflow);
                    }
                    if self.line.is_empty() {
                        continue;
                    }
                    let line = core::mem::take(&mut self.line);
                    return Some(RxLine::Complete(line));
                }
                _ if self.overflow => {}
                _ => {
                    if self.line.push(char::from(byte)).is_err() {
                        warn!("serial: line exceeds {} bytes", LINE_MAX);
                        self.overflow = true;
                    }
                }
            }
        }
        None
    }

    /// Queue a response line.
    pub fn write_line(&mut self, text: &str) {
        let mut line = TxLine::new();
        for c in text.chars() {
            if line.push(c).is_err() {
                break;
            }
        }
        debug!("serial tx: {}", line);
        if self.echo {
            println!("{line}");
        }
        if self.tx.is_full() {
            self.tx.pop_front();
        }
        // Cannot fail: a slot was just freed if needed.
        let _ = self.tx.push_back(line);
    }

    /// Responses written so far, oldest first.
    pub fn responses(&self) -> impl Iterator<Item = &str> {
        self.tx.iter().map(TxLine::as_str)
    }

    /// Most recent response.
    pub fn last_response(&self) -> Option<&str> {
        self.tx.back().map(TxLine::as_str)
    }

    pub fn clear_responses(&mut self) {
        self.tx.clear();
    }
}

//! Elm Architecture (TEA) action and command types for the TUI.
//!
//! Every input and every async completion reaches the session as an
//! [`Action`]; `TuiApp::update()` applies it and returns the [`Command`] the
//! event loop must execute.

use crossterm::event::KeyEvent;
use proto::{LaunchRequest, ModelDetails, RemoteModel};

// ─── Action ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Action {
    // ── Terminal ─────────────────────────────────────────────
    /// A key press.
    Key(KeyEvent),
    /// Terminal was resized.
    Resize { width: u16, height: u16 },
    /// Emitted once after the loop starts.
    Initialized,

    // ── Process ──────────────────────────────────────────────
    /// Periodic tick carrying whatever output was queued since the last one.
    Tick {
        output: Vec<String>,
        running: bool,
        /// Exit status text when the child exited on its own since the last tick.
        exited: Option<String>,
    },
    /// A start request finished. `Ok` carries the child's pid.
    LaunchFinished {
        request: LaunchRequest,
        result: Result<Option<u32>, String>,
    },
    /// Writing relay input to the child failed.
    InputFailed(String),

    // ── Catalog ──────────────────────────────────────────────
    SearchFinished {
        query: String,
        result: Result<Vec<RemoteModel>, String>,
    },
    QuantizationsFinished {
        model_id: String,
        result: Result<Vec<String>, String>,
    },
    DetailsFinished {
        model_id: String,
        result: Result<ModelDetails, String>,
    },
}

// ─── Command ─────────────────────────────────────────────────────────────────

/// Side effects returned by `TuiApp::update()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    None,
    /// Start (or replace) the external process.
    Launch(LaunchRequest),
    /// Write text to the interactive process's stdin.
    SendInput(String),
    Search(String),
    FetchQuantizations(String),
    FetchDetails(String),
    /// Stop the process and leave the loop.
    Quit,
}

//! Full-screen ratatui launcher: model browser, output pane and modals.
#![allow(dead_code)]

pub mod action;
pub mod app;
pub mod event;
pub mod input;
pub mod modal;
pub mod output;
pub mod render;
pub mod status;
pub mod theme;

pub use event::run_tui;

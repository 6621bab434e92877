//! Centralized TUI theme built on ratatui's Tailwind CSS palette.

use ratatui::style::Color;
use ratatui::style::palette::tailwind;

/// The application theme: all visual tokens in one place.
pub struct Theme {
    // ── Base ──
    /// Primary foreground/text color.
    pub fg: Color,
    /// Dimmed foreground for less prominent text.
    pub fg_dim: Color,
    /// Muted foreground for minimal-emphasis elements.
    pub fg_muted: Color,
    /// Default border color for panels and widgets.
    pub border: Color,
    /// Border color for the focused pane.
    pub border_active: Color,

    // ── Accent ──
    pub accent: Color,
    pub accent_bright: Color,

    // ── Semantic ──
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,

    // ── Status bar ──
    /// Selected model name in the status bar.
    pub status_model: Color,
    /// Spinner shown while a catalog call is in flight.
    pub status_spinner: Color,
    /// Hint/keybinding text color in the status bar.
    pub status_hint: Color,
    /// Relay input line.
    pub status_relay: Color,

    // ── Lists ──
    /// Background of the highlighted row.
    pub selection_bg: Color,
    /// Foreground of the highlighted row.
    pub selection_fg: Color,
    /// Active source tab.
    pub tab_active: Color,
    /// Inactive source tab.
    pub tab_inactive: Color,

    // ── Modals ──
    pub modal_border: Color,
    /// Label column in key/value modals.
    pub modal_label: Color,
    /// Footer hint text in modals.
    pub modal_hint: Color,
}

impl Theme {
    /// The default dark theme using Tailwind palette.
    pub const fn default_dark() -> Self {
        Self {
            // Base
            fg: tailwind::SLATE.c100,
            fg_dim: tailwind::SLATE.c400,
            fg_muted: tailwind::SLATE.c500,
            border: tailwind::SLATE.c700,
            border_active: tailwind::EMERALD.c500,

            // Accent
            accent: tailwind::EMERALD.c500,
            accent_bright: tailwind::EMERALD.c400,

            // Semantic
            success: tailwind::EMERALD.c500,
            warning: tailwind::AMBER.c500,
            error: tailwind::RED.c500,
            info: tailwind::SKY.c500,

            // Status bar
            status_model: tailwind::SKY.c400,
            status_spinner: tailwind::AMBER.c400,
            status_hint: tailwind::SLATE.c500,
            status_relay: tailwind::CYAN.c400,

            // Lists
            selection_bg: tailwind::SKY.c700,
            selection_fg: tailwind::SLATE.c100,
            tab_active: tailwind::EMERALD.c400,
            tab_inactive: tailwind::SLATE.c500,

            // Modals
            modal_border: tailwind::EMERALD.c500,
            modal_label: tailwind::EMERALD.c400,
            modal_hint: tailwind::SLATE.c500,
        }
    }
}

/// Global theme instance.
pub const THEME: Theme = Theme::default_dark();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dark_theme_has_distinct_colors() {
        let theme = Theme::default_dark();
        assert_ne!(theme.fg, theme.border);
        assert_ne!(theme.accent, theme.error);
        assert_ne!(theme.tab_active, theme.tab_inactive);
        assert_ne!(theme.selection_bg, theme.selection_fg);
    }
}

//! Modal dialogs. A session holds exactly one [`Modal`] value, so at most one
//! dialog can own input at any time.

use proto::{LaunchOverrides, ModelDetails, RemoteModel};

use super::input::LineInput;

/// Maximum rows shown by the quantization picker.
pub const QUANT_WINDOW: usize = 15;
const NGL_CHAR_LIMIT: usize = 5;
const CTX_SIZE_CHAR_LIMIT: usize = 10;

#[derive(Debug, Clone, Default)]
pub enum Modal {
    #[default]
    None,
    /// Session override editor.
    ConfigEdit(OverrideEditor),
    /// Quantization picker for a remote model.
    QuantPick(QuantPicker),
    /// Remote model metadata.
    Details(Box<ModelDetails>),
    /// Offer to launch a remote model with no quantization pinned.
    NoQuantConfirm(RemoteModel),
}

impl Modal {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ConfigEdit(_) => "config-edit",
            Self::QuantPick(_) => "quant-pick",
            Self::Details(_) => "details",
            Self::NoQuantConfirm(_) => "no-quant-confirm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorField {
    Ngl,
    CtxSize,
}

/// Two-field editor for the session's GPU-layer count and context size.
#[derive(Debug, Clone)]
pub struct OverrideEditor {
    pub ngl: LineInput,
    pub ctx_size: LineInput,
    pub focus: EditorField,
}

impl OverrideEditor {
    pub fn new(current: LaunchOverrides) -> Self {
        Self {
            ngl: LineInput::with_value(NGL_CHAR_LIMIT, &current.ngl.to_string()),
            ctx_size: LineInput::with_value(CTX_SIZE_CHAR_LIMIT, &current.ctx_size.to_string()),
            focus: EditorField::Ngl,
        }
    }

    /// With two fields, forward and backward cycling coincide.
    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            EditorField::Ngl => EditorField::CtxSize,
            EditorField::CtxSize => EditorField::Ngl,
        };
    }

    pub fn focused_mut(&mut self) -> &mut LineInput {
        match self.focus {
            EditorField::Ngl => &mut self.ngl,
            EditorField::CtxSize => &mut self.ctx_size,
        }
    }

    /// Applies every field that parses as a non-negative integer; the others
    /// keep their value from `current`.
    pub fn commit(&self, current: LaunchOverrides) -> LaunchOverrides {
        LaunchOverrides {
            ngl: self.ngl.value().trim().parse().unwrap_or(current.ngl),
            ctx_size: self.ctx_size.value().trim().parse().unwrap_or(current.ctx_size),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuantPicker {
    pub model: RemoteModel,
    pub quants: Vec<String>,
    pub selected: usize,
}

impl QuantPicker {
    pub fn new(model: RemoteModel, quants: Vec<String>) -> Self {
        Self {
            model,
            quants,
            selected: 0,
        }
    }

    pub fn up(&mut self) {
        if self.quants.is_empty() {
            return;
        }
        self.selected = self.selected.checked_sub(1).unwrap_or(self.quants.len() - 1);
    }

    pub fn down(&mut self) {
        if self.quants.is_empty() {
            return;
        }
        self.selected = (self.selected + 1) % self.quants.len();
    }

    pub fn selected_quant(&self) -> Option<&str> {
        self.quants.get(self.selected).map(String::as_str)
    }

    /// Index range of the rows to draw so the cursor stays visible.
    pub fn window(&self) -> std::ops::Range<usize> {
        let rows = self.quants.len().min(QUANT_WINDOW);
        let start = (self.selected + 1).saturating_sub(rows);
        start..(start + rows).min(self.quants.len())
    }

    /// `(n/total)` when the list does not fit the window.
    pub fn position_hint(&self) -> Option<String> {
        (self.quants.len() > QUANT_WINDOW)
            .then(|| format!("({}/{})", self.selected + 1, self.quants.len()))
    }
}

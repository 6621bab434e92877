//! Launch request vocabulary shared by the session and the process supervisor.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How the external program is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    /// Long-running server; stdin is not connected.
    Server,
    /// Interactive command-line process fed through relay mode.
    Interactive,
}

impl LaunchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Interactive => "interactive",
        }
    }

    /// Returns `true` when the child gets a writable stdin pipe.
    pub fn wants_stdin(&self) -> bool {
        matches!(self, Self::Interactive)
    }
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to launch: a file on disk or a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchTarget {
    /// A model file discovered in the local models directory.
    Local { path: PathBuf, name: String },
    /// A remote catalog entry, optionally pinned to a quantization.
    Remote {
        model_id: String,
        quant: Option<String>,
    },
}

/// Builds the `identifier` or `identifier:quant` reference for a remote model.
pub fn remote_model_ref(model_id: &str, quant: Option<&str>) -> String {
    match quant {
        Some(q) if !q.is_empty() => format!("{model_id}:{q}"),
        _ => model_id.to_string(),
    }
}

impl LaunchTarget {
    /// Human-readable label used in log lines. Remote targets use the same
    /// reference that is passed to the launched program.
    pub fn label(&self) -> String {
        match self {
            Self::Local { name, .. } => name.clone(),
            Self::Remote { model_id, quant } => remote_model_ref(model_id, quant.as_deref()),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

/// Session-scoped numeric overrides applied at launch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LaunchOverrides {
    /// GPU-layer count.
    pub ngl: u32,
    /// Context size; zero lets the model choose.
    pub ctx_size: u32,
}

/// A complete start request handed to the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub target: LaunchTarget,
    pub mode: LaunchMode,
    pub overrides: LaunchOverrides,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_label_appends_quant_only_when_present() {
        let pinned = LaunchTarget::Remote {
            model_id: "foo/bar".into(),
            quant: Some("Q4_K_M".into()),
        };
        assert_eq!(pinned.label(), "foo/bar:Q4_K_M");

        let bare = LaunchTarget::Remote {
            model_id: "foo/bar".into(),
            quant: None,
        };
        assert_eq!(bare.label(), "foo/bar");

        let empty = LaunchTarget::Remote {
            model_id: "foo/bar".into(),
            quant: Some(String::new()),
        };
        assert_eq!(empty.label(), "foo/bar");
        assert_eq!(remote_model_ref("foo/bar", Some("Q8_0")), "foo/bar:Q8_0");
    }

    #[test]
    fn only_interactive_mode_wants_stdin() {
        assert!(LaunchMode::Interactive.wants_stdin());
        assert!(!LaunchMode::Server.wants_stdin());
        assert_eq!(LaunchMode::Server.to_string(), "server");
    }
}

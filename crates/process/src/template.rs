//! Command-template interpreter.
//!
//! A template is a human-authored command line such as
//! `llama-server -m {model_path} -ngl {ngl} -c {ctx_size}`. Resolution
//! tokenizes on whitespace, substitutes placeholders inside each token, and
//! for remote targets rewrites the model-path flag into the remote-model flag.
//! No shell is involved, so argument boundaries are exact.

use proto::{LaunchOverrides, LaunchTarget, ProcessError, remote_model_ref};

/// Flag that carries a local model path.
pub const MODEL_PATH_FLAG: &str = "-m";
/// Flag that carries a remote `identifier[:quant]` argument.
pub const REMOTE_MODEL_FLAG: &str = "-hf";

const PLACEHOLDER_MODEL_PATH: &str = "{model_path}";
const PLACEHOLDER_MODEL_NAME: &str = "{model_name}";
const PLACEHOLDER_NGL: &str = "{ngl}";
const PLACEHOLDER_CTX_SIZE: &str = "{ctx_size}";

/// A configured command line with placeholders. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate(String);

impl CommandTemplate {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves the template into an argument vector for `target`.
    pub fn resolve(
        &self,
        target: &LaunchTarget,
        overrides: LaunchOverrides,
    ) -> Result<Vec<String>, ProcessError> {
        let (model_path, model_name) = match target {
            LaunchTarget::Local { path, name } => (path.to_string_lossy().into_owned(), name.clone()),
            LaunchTarget::Remote { model_id, .. } => (String::new(), model_id.clone()),
        };
        let ngl = overrides.ngl.to_string();
        let ctx_size = overrides.ctx_size.to_string();
        let values = [
            (PLACEHOLDER_MODEL_PATH, model_path.as_str()),
            (PLACEHOLDER_MODEL_NAME, model_name.as_str()),
            (PLACEHOLDER_NGL, ngl.as_str()),
            (PLACEHOLDER_CTX_SIZE, ctx_size.as_str()),
        ];

        let tokens: Vec<String> = self
            .0
            .split_whitespace()
            .map(|token| substitute(token, &values))
            .filter(|token| !token.is_empty())
            .collect();

        let argv = match target {
            LaunchTarget::Local { .. } => tokens,
            LaunchTarget::Remote { model_id, quant } => {
                rewrite_for_remote(tokens, &remote_model_ref(model_id, quant.as_deref()))
            }
        };

        if argv.is_empty() {
            return Err(ProcessError::EmptyCommand);
        }
        Ok(argv)
    }
}

/// Single-pass placeholder substitution. Inserted values are never rescanned,
/// and unknown placeholders are left verbatim.
fn substitute(token: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(token.len());
    let mut rest = token;
    'scan: while !rest.is_empty() {
        for (placeholder, value) in values {
            if let Some(after) = rest.strip_prefix(placeholder) {
                out.push_str(value);
                rest = after;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(ch) = chars.next() {
            out.push(ch);
        }
        rest = chars.as_str();
    }
    out
}

fn is_flag(token: &str) -> bool {
    token.starts_with('-')
}

/// Replaces every model-path flag (bare or `=`-fused) with the remote flag and
/// `remote_arg`, dropping the path value that followed a bare flag.
///
/// When the template has no model-path flag at all, the remote flag is
/// appended so the launched program still learns which model to fetch.
fn rewrite_for_remote(tokens: Vec<String>, remote_arg: &str) -> Vec<String> {
    let fused_prefix = format!("{MODEL_PATH_FLAG}=");
    let mut out = Vec::with_capacity(tokens.len() + 1);
    let mut rewrote = false;
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        if token == MODEL_PATH_FLAG {
            out.push(REMOTE_MODEL_FLAG.to_string());
            out.push(remote_arg.to_string());
            rewrote = true;
            if iter.peek().is_some_and(|next| !is_flag(next)) {
                iter.next();
            }
        } else if token.starts_with(&fused_prefix) {
            out.push(REMOTE_MODEL_FLAG.to_string());
            out.push(remote_arg.to_string());
            rewrote = true;
        } else {
            out.push(token);
        }
    }

    if !rewrote && !out.is_empty() {
        out.push(REMOTE_MODEL_FLAG.to_string());
        out.push(remote_arg.to_string());
    }
    out
}

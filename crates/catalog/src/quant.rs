//! Quantization label extraction from repository file names.

use std::collections::BTreeSet;

const GGUF_EXT: &str = ".gguf";
const FLOAT_LABELS: [&str; 4] = ["F16", "BF16", "F32", "FP16"];
const QUANT_PREFIXES: [&str; 3] = ["IQ", "TQ", "Q"];

/// Extracts the distinct quantization labels from a list of repository file
/// names, sorted. Projector files and non-GGUF files are ignored.
pub fn quantizations_from_files<S: AsRef<str>>(files: &[S]) -> Vec<String> {
    files
        .iter()
        .filter_map(|file| quant_label(file.as_ref()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn quant_label(file: &str) -> Option<String> {
    let base = file.rsplit('/').next().unwrap_or(file);
    if base.len() <= GGUF_EXT.len() || !base.is_char_boundary(base.len() - GGUF_EXT.len()) {
        return None;
    }
    let (stem, ext) = base.split_at(base.len() - GGUF_EXT.len());
    if !ext.eq_ignore_ascii_case(GGUF_EXT) {
        return None;
    }
    if stem.to_ascii_lowercase().starts_with("mmproj") {
        return None;
    }
    let stem = strip_shard_suffix(stem);
    let label = stem.rsplit(['-', '.']).next()?.to_ascii_uppercase();
    is_quant_label(&label).then_some(label)
}

/// Strips a `-00001-of-00003` style suffix.
fn strip_shard_suffix(stem: &str) -> &str {
    let Some((head, total)) = stem.rsplit_once("-of-") else {
        return stem;
    };
    let Some((rest, index)) = head.rsplit_once('-') else {
        return stem;
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if digits(index) && digits(total) {
        rest
    } else {
        stem
    }
}

fn is_quant_label(label: &str) -> bool {
    if FLOAT_LABELS.contains(&label) {
        return true;
    }
    QUANT_PREFIXES.iter().any(|prefix| {
        label.strip_prefix(prefix).is_some_and(|rest| {
            let mut chars = rest.chars();
            chars.next().is_some_and(|c| c.is_ascii_digit())
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
    })
}

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub models: Option<ModelsConfig>,
    pub parsing: Option<ParsingSection>,
}

/// Where the external classifier and tagger are served.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub classifier_url: Option<String>,
    pub tagger_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Scalar parsing options; anything unset falls back to the built-in default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsingSection {
    pub threshold: Option<f64>,
    pub citation_threshold: Option<f64>,
    pub entity_density: Option<bool>,
    pub lookahead_blocks: Option<usize>,
    pub min_key_occurrences: Option<usize>,
    pub key_excluded_pos: Option<Vec<String>>,
    /// `"drop"` or `"append"`.
    pub org_after_person: Option<String>,
    pub strip_leading_keys: Option<bool>,
    pub remove_line_numbers: Option<bool>,
    pub fix_diacritics: Option<bool>,
}

/// Platform config directory path: `<config_dir>/affiliator/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("affiliator").join("config.toml"))
}

/// Load config by cascading CWD `.affiliator.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".affiliator.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

fn pick<S, T>(overlay: Option<&S>, base: Option<&S>, field: impl Fn(&S) -> Option<T>) -> Option<T> {
    overlay.and_then(&field).or_else(|| base.and_then(&field))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let (bm, om) = (base.models.as_ref(), overlay.models.as_ref());
    let (bp, op) = (base.parsing.as_ref(), overlay.parsing.as_ref());

    ConfigFile {
        models: Some(ModelsConfig {
            classifier_url: pick(om, bm, |m| m.classifier_url.clone()),
            tagger_url: pick(om, bm, |m| m.tagger_url.clone()),
            timeout_secs: pick(om, bm, |m| m.timeout_secs),
        }),
        parsing: Some(ParsingSection {
            threshold: pick(op, bp, |p| p.threshold),
            citation_threshold: pick(op, bp, |p| p.citation_threshold),
            entity_density: pick(op, bp, |p| p.entity_density),
            lookahead_blocks: pick(op, bp, |p| p.lookahead_blocks),
            min_key_occurrences: pick(op, bp, |p| p.min_key_occurrences),
            key_excluded_pos: pick(op, bp, |p| p.key_excluded_pos.clone()),
            org_after_person: pick(op, bp, |p| p.org_after_person.clone()),
            strip_leading_keys: pick(op, bp, |p| p.strip_leading_keys),
            remove_line_numbers: pick(op, bp, |p| p.remove_line_numbers),
            fix_diacritics: pick(op, bp, |p| p.fix_diacritics),
        }),
    }
}

//! Immutable conversion settings shared by every job of a run.

use serde::Serialize;

/// Maximum length of a rendered resource path, in bytes
pub const MAX_PATH_LEN: usize = 4096;

/// Maximum length of a single object key before escaping, in bytes
pub const MAX_NAME_LEN: usize = 4096;

/// Highest gzip level accepted for canonical output
pub const MAX_COMPRESSION: u32 = 9;

/// How object keys are turned into path components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeMode {
    /// Keys are used verbatim
    #[default]
    None,
    /// Bytes outside `[A-Za-z0-9_]` become `_XX` and the component is braced
    Escape,
    /// Quattor-style `_XX` sequences are decoded where they look like escapes
    Unescape,
}

/// Logical size limits enforced while converting a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Limits {
    pub max_path_len: usize,
    pub max_name_len: usize,
    pub max_value_len: Option<usize>,
}

impl Default for Limits {
    fn default() -> Self {
        Self { max_path_len: MAX_PATH_LEN, max_name_len: MAX_NAME_LEN, max_value_len: None }
    }
}

/// Option set applied to every document of a conversion run.
///
/// Output is a pure function of the input bytes and this value, so the same
/// options must be handed to every worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertOptions {
    pub escape: EscapeMode,
    pub generate_indices: bool,
    pub show_terminals: bool,
    pub multiline: bool,
    pub multiline_prefix: bool,
    pub output_suffix: String,
    pub strip_suffixes: Vec<String>,
    pub slice_suffix: String,
    pub compression: u32,
    pub slices: Vec<String>,
    pub force: bool,
    pub limits: Limits,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            escape: EscapeMode::None,
            generate_indices: true,
            show_terminals: true,
            multiline: false,
            multiline_prefix: false,
            output_suffix: ".txt".to_string(),
            strip_suffixes: vec![".json".to_string(), ".xml".to_string()],
            slice_suffix: ".slice".to_string(),
            compression: 1,
            slices: Vec::new(),
            force: false,
            limits: Limits::default(),
        }
    }
}

impl ConvertOptions {
    /// True when `path` is one of the configured slice targets
    pub fn is_slice(&self, path: &[u8]) -> bool {
        self.slices.iter().any(|s| s.as_bytes() == path)
    }

    pub fn has_slices(&self) -> bool {
        !self.slices.is_empty()
    }

    pub fn compressed(&self) -> bool {
        self.compression > 0
    }
}

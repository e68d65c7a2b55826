//! Code taxonomy record.
//!
//! # Responsibility
//! - Define the `Code` node stored in the taxonomy forest.
//! - Normalize user-facing name and color input.
//!
//! # Invariants
//! - `name` is trimmed and never blank.
//! - `color` is `#rrggbb` lowercase hex.
//! - `parent_id` is a weak reference resolved by id lookup, never ownership.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one code.
pub type CodeId = Uuid;

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid color regex"));
static SHORT_HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#([0-9a-fA-F])([0-9a-fA-F])([0-9a-fA-F])$").expect("valid color regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Field validation failures for code input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeValidationError {
    /// Name is empty after trimming.
    BlankName,
    /// Color is not a `#rgb` / `#rrggbb` hex string.
    InvalidColor(String),
}

impl Display for CodeValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "code name must not be blank"),
            Self::InvalidColor(value) => {
                write!(f, "invalid code color `{value}`; expected #rrggbb")
            }
        }
    }
}

impl Error for CodeValidationError {}

/// One node of the code taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Code {
    pub id: CodeId,
    pub name: String,
    pub color: String,
    /// `None` means the code is a root of the forest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CodeId>,
    /// Position among siblings of the same parent. Maintained by the repository.
    #[serde(default)]
    pub sort_order: i64,
}

impl Code {
    /// Creates a code with a generated id.
    pub fn new(
        name: &str,
        color: &str,
        parent_id: Option<CodeId>,
    ) -> Result<Self, CodeValidationError> {
        Self::with_id(Uuid::new_v4(), name, color, parent_id)
    }

    /// Creates a code with a caller-provided id.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(
        id: CodeId,
        name: &str,
        color: &str,
        parent_id: Option<CodeId>,
    ) -> Result<Self, CodeValidationError> {
        Ok(Self {
            id,
            name: normalize_code_name(name)?,
            color: normalize_color(color)?,
            parent_id,
            sort_order: 0,
        })
    }

    /// Re-checks field invariants on an already-built record.
    pub fn validate(&self) -> Result<(), CodeValidationError> {
        if self.name.trim().is_empty() {
            return Err(CodeValidationError::BlankName);
        }
        if !HEX_COLOR_RE.is_match(&self.color) {
            return Err(CodeValidationError::InvalidColor(self.color.clone()));
        }
        Ok(())
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Trims and collapses inner whitespace of a code name.
pub fn normalize_code_name(value: &str) -> Result<String, CodeValidationError> {
    let collapsed = WHITESPACE_RE.replace_all(value.trim(), " ");
    if collapsed.is_empty() {
        return Err(CodeValidationError::BlankName);
    }
    Ok(collapsed.into_owned())
}

/// Normalizes a hex color to lowercase `#rrggbb`.
///
/// Short `#rgb` input is expanded.
pub fn normalize_color(value: &str) -> Result<String, CodeValidationError> {
    let trimmed = value.trim();
    if HEX_COLOR_RE.is_match(trimmed) {
        return Ok(trimmed.to_ascii_lowercase());
    }
    if let Some(caps) = SHORT_HEX_COLOR_RE.captures(trimmed) {
        let mut expanded = String::from("#");
        for index in 1..=3 {
            let digit = &caps[index];
            expanded.push_str(digit);
            expanded.push_str(digit);
        }
        return Ok(expanded.to_ascii_lowercase());
    }
    Err(CodeValidationError::InvalidColor(value.to_string()))
}

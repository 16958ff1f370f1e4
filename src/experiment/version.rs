//! Version Fields - categorical dimensions embedded in dataset version names

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const VERSION_PATTERN: &str = concat!(
    r"^kg_base_prop_(?P<prop>[^_]+)",
    r"_subevent_(?P<subevent>[^_]+)",
    r"_role_(?P<role>[^_]+)",
    r"_causation_(?P<causation>[^_]+)",
    r"_syntax_simple_rdf_(?P<syntax>[^_]+)$",
);

/// Prefix prepended to the syntax field for display.
pub const SYNTAX_DISPLAY_PREFIX: &str = "simple_rdf_";

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(VERSION_PATTERN).expect("version pattern is valid"))
}

/// Categorical fields of a narrative dataset version.
///
/// Versions are named
/// `kg_base_prop_<prop>_subevent_<subevent>_role_<role>_causation_<causation>_syntax_simple_rdf_<syntax>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionFields {
    /// Proportion level
    pub prop: u32,
    /// Sub-event level
    pub subevent: u32,
    /// Role level
    pub role: u32,
    /// Causation level
    pub causation: u32,
    /// Syntax variant, without the `simple_rdf_` prefix
    pub syntax: String,
}

impl VersionFields {
    /// Decode the categorical fields of a version name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRunName`] if the version does not follow the
    /// narrative layout or a level is not an integer.
    pub fn parse(version: &str) -> Result<Self> {
        let caps = version_regex().captures(version).ok_or_else(|| {
            Error::invalid_run_name(version, "version does not follow the narrative layout")
        })?;

        let level = |field: &str| -> Result<u32> {
            caps[field].parse().map_err(|e| {
                Error::invalid_run_name(version, format!("{field} '{}': {e}", &caps[field]))
            })
        };

        Ok(Self {
            prop: level("prop")?,
            subevent: level("subevent")?,
            role: level("role")?,
            causation: level("causation")?,
            syntax: caps["syntax"].to_string(),
        })
    }

    /// Render the version name these fields were parsed from.
    #[must_use]
    pub fn to_version(&self) -> String {
        format!(
            "kg_base_prop_{}_subevent_{}_role_{}_causation_{}_syntax_{SYNTAX_DISPLAY_PREFIX}{}",
            self.prop, self.subevent, self.role, self.causation, self.syntax
        )
    }

    /// Syntax with its display prefix, e.g. `simple_rdf_ttl`.
    #[must_use]
    pub fn display_syntax(&self) -> String {
        format!("{SYNTAX_DISPLAY_PREFIX}{}", self.syntax)
    }
}

use crate::error::{GraphError, Result};
use crate::types::{TYPE_NONE, TYPE_WORKGROUP};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Color used when a type has no mapping
pub const DEFAULT_COLOR_CODE: &str = "#3AB6E3";

/// Key of the mandatory fallback color entry
pub const COLOR_DEFAULT_KEY: &str = "default";

/// Card attribute lists are cut to this many entries
pub const MAX_CARD_ATTRIBUTES: usize = 3;

/// Tunable org chart settings, read once per request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrgChartSettings {
    /// Maximum number of manager/owner hops above the start record
    pub levels: u32,

    /// Comma separated attributes shown on person cards
    pub identity_card_attributes: String,

    /// Comma separated attributes shown on group cards
    pub workgroup_card_attributes: String,

    /// Comma separated attributes for the details view
    pub identity_detail_attributes: String,

    /// Attribute holding the person icon
    pub identity_icon_img_attribute: String,

    /// JSON object of type -> color, merged over the default color
    pub color_codes: String,

    /// Name of the external rule computing connections
    pub connection_rule: String,

    /// Host capability: emit indented JSON
    pub pretty_json: bool,

    /// Type code -> display label for pickers
    pub identity_types: BTreeMap<String, String>,
}

impl Default for OrgChartSettings {
    fn default() -> Self {
        Self {
            levels: 5,
            identity_card_attributes: String::new(),
            workgroup_card_attributes: String::new(),
            identity_detail_attributes: String::new(),
            identity_icon_img_attribute: String::new(),
            color_codes: String::new(),
            connection_rule: String::new(),
            pretty_json: false,
            identity_types: BTreeMap::new(),
        }
    }
}

impl OrgChartSettings {
    pub fn from_toml(raw: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(raw).map_err(|e| GraphError::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            GraphError::InvalidSettings(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&raw)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.color_codes.trim().is_empty() {
            parse_color_codes(&self.color_codes)?;
        }
        Ok(())
    }

    pub fn depth_limit(&self) -> usize {
        self.levels as usize
    }

    pub fn person_card_attributes(&self) -> Vec<String> {
        card_attributes(&self.identity_card_attributes)
    }

    pub fn group_card_attributes(&self) -> Vec<String> {
        card_attributes(&self.workgroup_card_attributes)
    }

    /// Configured detail attributes; empty when the directory default applies
    pub fn detail_attributes(&self) -> Vec<String> {
        csv_to_list(&self.identity_detail_attributes)
    }

    pub fn icon_attribute(&self) -> Option<&str> {
        non_empty(&self.identity_icon_img_attribute)
    }

    pub fn connection_rule(&self) -> Option<&str> {
        non_empty(&self.connection_rule)
    }

    /// Color map with the configured entries merged over the default
    ///
    /// A malformed color setting is logged and ignored.
    pub fn color_codes(&self) -> ColorCodes {
        let mut codes = BTreeMap::from([(
            COLOR_DEFAULT_KEY.to_string(),
            DEFAULT_COLOR_CODE.to_string(),
        )]);
        if !self.color_codes.trim().is_empty() {
            match parse_color_codes(&self.color_codes) {
                Ok(configured) => codes.extend(configured),
                Err(e) => log::error!("Ignoring color code setting: {e}"),
            }
        }
        log::trace!("colorCodeMap: {codes:?}");
        ColorCodes { codes }
    }

    /// Type code -> label, always including workgroup and none
    pub fn node_types(&self) -> BTreeMap<String, String> {
        let mut types = BTreeMap::from([
            (TYPE_WORKGROUP.to_string(), "Workgroup".to_string()),
            (TYPE_NONE.to_string(), "None".to_string()),
        ]);
        types.extend(
            self.identity_types
                .iter()
                .map(|(code, label)| (code.clone(), label.clone())),
        );
        types
    }
}

/// Resolved type -> color mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorCodes {
    codes: BTreeMap<String, String>,
}

impl ColorCodes {
    /// Color for `node_type`, falling back to the default entry
    pub fn resolve(&self, node_type: Option<&str>) -> String {
        node_type
            .filter(|t| !t.is_empty())
            .and_then(|t| self.codes.get(t))
            .or_else(|| self.codes.get(COLOR_DEFAULT_KEY))
            .cloned()
            .unwrap_or_else(|| DEFAULT_COLOR_CODE.to_string())
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.codes
    }
}

fn parse_color_codes(raw: &str) -> Result<BTreeMap<String, String>> {
    serde_json::from_str(raw)
        .map_err(|e| GraphError::InvalidSettings(format!("color_codes: {e}")))
}

fn card_attributes(raw: &str) -> Vec<String> {
    let mut attributes = csv_to_list(raw);
    attributes.truncate(MAX_CARD_ATTRIBUTES);
    attributes
}

fn csv_to_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

//! The migration snapshot data model (§3). Every identifier in this tree
//! is a codename; ids only exist transiently inside export/import
//! contexts (`crate::export::context`, `crate::import::context`).

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::error::MigrateError;

/// A reference to another entity purely by its stable codename.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CodenameRef {
    pub codename: String,
}

impl CodenameRef {
    pub fn new(codename: impl Into<String>) -> Self {
        Self {
            codename: codename.into(),
        }
    }
}

impl From<&str> for CodenameRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CodenameRef {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub publish_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub publish_display_timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub unpublish_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub unpublish_display_timezone: Option<String>,
}

impl Schedule {
    pub fn is_empty(&self) -> bool {
        self.publish_time.is_none() && self.unpublish_time.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationItemSystem {
    pub name: String,
    pub codename: String,
    pub language: CodenameRef,
    #[serde(rename = "type")]
    pub content_type: CodenameRef,
    pub collection: CodenameRef,
    pub workflow: CodenameRef,
}

/// One inline content item nested in a rich-text element (§3 invariant 4).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationComponent {
    pub id: Uuid,
    pub elements: BTreeMap<String, MigrationElement>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UrlSlugMode {
    Autogenerated,
    Custom,
}

impl Default for UrlSlugMode {
    fn default() -> Self {
        Self::Autogenerated
    }
}

/// A typed field inside a language variant (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MigrationElement {
    Text {
        value: Option<String>,
    },
    Number {
        value: Option<f64>,
    },
    DateTime {
        value: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        display_timezone: Option<String>,
    },
    RichText {
        value: String,
        #[serde(default)]
        components: Vec<MigrationComponent>,
    },
    Asset {
        value: Vec<CodenameRef>,
    },
    Taxonomy {
        value: Vec<CodenameRef>,
    },
    ModularContent {
        value: Vec<CodenameRef>,
    },
    Custom {
        value: Option<String>,
    },
    UrlSlug {
        value: Option<String>,
        #[serde(default)]
        mode: UrlSlugMode,
    },
    MultipleChoice {
        value: Vec<CodenameRef>,
    },
    Subpages {
        value: Vec<CodenameRef>,
    },
}

impl MigrationElement {
    pub fn kind(&self) -> &'static str {
        match self {
            MigrationElement::Text { .. } => "text",
            MigrationElement::Number { .. } => "number",
            MigrationElement::DateTime { .. } => "date_time",
            MigrationElement::RichText { .. } => "rich_text",
            MigrationElement::Asset { .. } => "asset",
            MigrationElement::Taxonomy { .. } => "taxonomy",
            MigrationElement::ModularContent { .. } => "modular_content",
            MigrationElement::Custom { .. } => "custom",
            MigrationElement::UrlSlug { .. } => "url_slug",
            MigrationElement::MultipleChoice { .. } => "multiple_choice",
            MigrationElement::Subpages { .. } => "subpages",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationItemVersion {
    pub elements: BTreeMap<String, MigrationElement>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub schedule: Option<Schedule>,
    pub workflow_step: CodenameRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationItem {
    pub system: MigrationItemSystem,
    pub versions: Vec<MigrationItemVersion>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetDescription {
    pub language: CodenameRef,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationAsset {
    pub codename: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    #[serde(skip, default)]
    pub binary_data: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub collection: Option<CodenameRef>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub folder: Option<CodenameRef>,
    #[serde(default)]
    pub descriptions: Vec<AssetDescription>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MigrationData {
    pub items: Vec<MigrationItem>,
    pub assets: Vec<MigrationAsset>,
}

impl MigrationData {
    /// Shape + required-field validation (§4.7, §3 "Must be
    /// schema-validated before use"). Does not require workflow
    /// definitions, so it can run identically before export and after any
    /// `mapMigrationData` transform.
    pub fn validate_shape(&self) -> Result<(), MigrateError> {
        for item in &self.items {
            if item.system.codename.trim().is_empty() {
                return Err(MigrateError::Config(
                    "migration item has an empty codename".to_string(),
                ));
            }
            if item.versions.len() > 2 {
                return Err(MigrateError::Config(format!(
                    "item {} has {} versions, expected at most 2 (one published, one draft)",
                    item.system.codename,
                    item.versions.len()
                )));
            }
            for version in &item.versions {
                if version.workflow_step.codename.trim().is_empty() {
                    return Err(MigrateError::Config(format!(
                        "item {} has a version with an empty workflow step codename",
                        item.system.codename
                    )));
                }
                for codename in version.elements.keys() {
                    if codename.trim().is_empty() {
                        return Err(MigrateError::Config(format!(
                            "item {} has an element with an empty codename",
                            item.system.codename
                        )));
                    }
                }
            }
        }
        for asset in &self.assets {
            if asset.codename.trim().is_empty() {
                return Err(MigrateError::Config(
                    "migration asset has an empty codename".to_string(),
                ));
            }
            if asset.filename.trim().is_empty() {
                return Err(MigrateError::Config(format!(
                    "asset {} has an empty filename",
                    asset.codename
                )));
            }
        }
        Ok(())
    }
}

/// §3 invariant 4: a component id is either the component's own UUID, or
/// the UUID-v5 hash of its codename (with `_` normalized to `-`) when the
/// codename is not already a valid UUID.
pub fn component_id_for_codename(codename: &str) -> Uuid {
    let normalized = codename.replace('_', "-");
    if let Ok(uuid) = Uuid::parse_str(&normalized) {
        return uuid;
    }
    Uuid::new_v5(&COMPONENT_NAMESPACE, codename.as_bytes())
}

/// Fixed namespace used to derive deterministic component ids from
/// codenames. Arbitrary but stable across runs (§8 invariant 5).
const COMPONENT_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6f, 0x6e, 0x74, 0x65, 0x6e, 0x74, 0x2d, 0x6d, 0x69, 0x67, 0x72, 0x61, 0x74, 0x65, 0x00, 0x01,
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_uuid_is_deterministic_for_codename() {
        let first = component_id_for_codename("hero_banner");
        let second = component_id_for_codename("hero_banner");
        assert_eq!(first, second);
        assert_eq!(first, Uuid::new_v5(&COMPONENT_NAMESPACE, b"hero_banner"));
    }

    #[test]
    fn component_uuid_reuses_valid_uuid_codenames() {
        let underscored = "123e4567-e89b-12d3-a456-426614174000".replace('-', "_");
        let id = component_id_for_codename(&underscored);
        assert_eq!(
            id,
            Uuid::parse_str("123e4567-e89b-12d3-a456-426614174000").expect("valid uuid")
        );
    }

    #[test]
    fn validate_shape_rejects_empty_codename() {
        let data = MigrationData {
            items: vec![MigrationItem {
                system: MigrationItemSystem {
                    name: "About".into(),
                    codename: String::new(),
                    language: "en".into(),
                    content_type: "page".into(),
                    collection: "default".into(),
                    workflow: "default".into(),
                },
                versions: vec![],
            }],
            assets: vec![],
        };
        assert!(data.validate_shape().is_err());
    }
}

//! Wire-format DTOs: the id-addressed shapes the management API actually
//! speaks. `migrate-core` translates these into codename-addressed
//! `MigrationItem`/`MigrationAsset` values; nothing here knows about
//! codenames-as-the-only-key the way the migration snapshot does.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// A reference to another entity, as the platform serializes it: an
/// id, or a codename, or (for creates) an external id. At most one is
/// populated on any given wire payload, but all three parse into this type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferenceWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl ReferenceWire {
    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            codename: None,
            external_id: None,
        }
    }

    pub fn by_codename(codename: impl Into<String>) -> Self {
        Self {
            id: None,
            codename: Some(codename.into()),
            external_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItemWire {
    pub id: Uuid,
    pub name: String,
    pub codename: String,
    #[serde(rename = "type")]
    pub content_type: ReferenceWire,
    pub collection: ReferenceWire,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItemUpsertWire {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<ReferenceWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItemCreateWire {
    pub name: String,
    pub codename: String,
    #[serde(rename = "type")]
    pub content_type: ReferenceWire,
    pub collection: ReferenceWire,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementWire {
    pub element: ReferenceWire,
    pub value: serde_json::Value,
}

/// The decoded shape of a `rich_text` element's `value`: an HTML fragment
/// plus the raw wire elements of any inline components it embeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RichTextValueWire {
    pub value: String,
    #[serde(default)]
    pub components: Vec<RichTextComponentWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RichTextComponentWire {
    pub id: Uuid,
    /// The local slug the component's `<object data-rel="component">` tag
    /// is addressed by inside this one rich-text value. Not a globally
    /// registered codename.
    pub codename: String,
    #[serde(rename = "type")]
    pub component_type: ReferenceWire,
    #[serde(default)]
    pub elements: Vec<ElementWire>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_display_timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unpublish_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unpublish_display_timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStepRefWire {
    pub workflow: ReferenceWire,
    pub step: ReferenceWire,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageVariantWire {
    pub item: ReferenceWire,
    pub language: ReferenceWire,
    pub elements: Vec<ElementWire>,
    pub workflow: WorkflowStepRefWire,
    #[serde(default)]
    pub schedule: Option<ScheduleWire>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageVariantUpsertWire {
    pub elements: Vec<ElementWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDescriptionWire {
    pub language: ReferenceWire,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetWire {
    pub id: Uuid,
    pub codename: String,
    pub file_name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub descriptions: Vec<AssetDescriptionWire>,
    #[serde(default)]
    pub collection: Option<ReferenceWire>,
    #[serde(default)]
    pub folder: Option<ReferenceWire>,
    #[serde(default)]
    pub external_id: Option<String>,
    pub url: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetUpsertWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub descriptions: Vec<AssetDescriptionWire>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<ReferenceWire>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<ReferenceWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetCreateWire {
    pub file_reference: FileReferenceWire,
    pub codename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub descriptions: Vec<AssetDescriptionWire>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<ReferenceWire>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<ReferenceWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReferenceWire {
    pub id: String,
    #[serde(rename = "type")]
    pub reference_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionWire {
    pub id: Uuid,
    pub codename: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageWire {
    pub id: Uuid,
    pub codename: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetFolderWire {
    pub id: Uuid,
    pub codename: String,
    pub name: String,
    #[serde(default)]
    pub folders: Vec<AssetFolderWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStepDefWire {
    pub id: Uuid,
    pub codename: String,
    pub name: String,
    #[serde(default)]
    pub transitions_to: Vec<ReferenceWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowWire {
    pub id: Uuid,
    pub codename: String,
    pub name: String,
    pub steps: Vec<WorkflowStepDefWire>,
    pub published_step: WorkflowStepDefWire,
    pub archived_step: WorkflowStepDefWire,
    pub scheduled_step: WorkflowStepDefWire,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyTermWire {
    pub id: Uuid,
    pub codename: String,
    pub name: String,
    #[serde(default)]
    pub terms: Vec<TaxonomyTermWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyGroupWire {
    pub id: Uuid,
    pub codename: String,
    pub name: String,
    #[serde(default)]
    pub terms: Vec<TaxonomyTermWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultipleChoiceOptionWire {
    pub id: Uuid,
    pub codename: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentTypeElementWire {
    pub id: Uuid,
    pub codename: String,
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(default)]
    pub taxonomy_group: Option<ReferenceWire>,
    #[serde(default)]
    pub options: Vec<MultipleChoiceOptionWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlattenedContentTypeWire {
    pub id: Uuid,
    pub codename: String,
    pub name: String,
    pub elements: Vec<ContentTypeElementWire>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PaginationWire {
    #[serde(default)]
    pub continuation_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PaginatedListWire<T> {
    pub pagination: PaginationWire,
    #[serde(alias = "items")]
    pub data: Vec<T>,
}

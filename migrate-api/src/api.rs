use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::wire::AssetCreateWire;
use crate::wire::AssetFolderWire;
use crate::wire::AssetUpsertWire;
use crate::wire::AssetWire;
use crate::wire::CollectionWire;
use crate::wire::ContentItemCreateWire;
use crate::wire::ContentItemUpsertWire;
use crate::wire::ContentItemWire;
use crate::wire::FileReferenceWire;
use crate::wire::FlattenedContentTypeWire;
use crate::wire::LanguageVariantUpsertWire;
use crate::wire::LanguageVariantWire;
use crate::wire::LanguageWire;
use crate::wire::ScheduleWire;
use crate::wire::TaxonomyGroupWire;
use crate::wire::WorkflowWire;

/// A binary payload queued for upload before an asset's metadata exists.
pub struct BinaryFileUpload {
    pub binary_data: Vec<u8>,
    pub content_type: String,
    pub filename: String,
}

/// The narrow REST capability the migration engine depends on (§6). Every
/// operation the core needs is named here; nothing else about the
/// transport (retries, auth headers, base URL) leaks into `migrate-core`.
#[async_trait]
pub trait ManagementApi: Send + Sync {
    async fn view_content_item(&self, codename_or_id: &str) -> Result<ContentItemWire>;
    async fn add_content_item(&self, data: ContentItemCreateWire) -> Result<ContentItemWire>;
    async fn upsert_content_item(
        &self,
        codename: &str,
        data: ContentItemUpsertWire,
    ) -> Result<ContentItemWire>;

    async fn view_language_variant(
        &self,
        item_codename: &str,
        language_codename: &str,
        published: bool,
    ) -> Result<LanguageVariantWire>;
    async fn upsert_language_variant(
        &self,
        item_codename: &str,
        language_codename: &str,
        data: LanguageVariantUpsertWire,
    ) -> Result<LanguageVariantWire>;
    async fn create_new_version(
        &self,
        item_codename: &str,
        language_codename: &str,
    ) -> Result<LanguageVariantWire>;
    async fn change_workflow_of_language_variant(
        &self,
        item_codename: &str,
        language_codename: &str,
        workflow_codename: &str,
        step_codename: &str,
    ) -> Result<()>;
    async fn publish_language_variant(
        &self,
        item_codename: &str,
        language_codename: &str,
        schedule: Option<ScheduleWire>,
    ) -> Result<()>;
    async fn unpublish_language_variant(
        &self,
        item_codename: &str,
        language_codename: &str,
        schedule: Option<ScheduleWire>,
    ) -> Result<()>;
    async fn cancel_scheduled_publish(
        &self,
        item_codename: &str,
        language_codename: &str,
    ) -> Result<()>;
    async fn cancel_scheduled_unpublish(
        &self,
        item_codename: &str,
        language_codename: &str,
    ) -> Result<()>;

    async fn view_asset(&self, codename_or_id: &str) -> Result<AssetWire>;
    async fn add_asset(&self, data: AssetCreateWire) -> Result<AssetWire>;
    async fn upsert_asset(&self, codename: &str, data: AssetUpsertWire) -> Result<AssetWire>;
    async fn upload_binary_file(&self, upload: BinaryFileUpload) -> Result<FileReferenceWire>;
    async fn download_binary(&self, url: &str) -> Result<Vec<u8>>;

    async fn list_collections(&self) -> Result<Vec<CollectionWire>>;
    async fn list_languages(&self) -> Result<Vec<LanguageWire>>;
    async fn list_workflows(&self) -> Result<Vec<WorkflowWire>>;
    async fn list_taxonomies(&self) -> Result<Vec<TaxonomyGroupWire>>;
    async fn list_content_types(&self) -> Result<Vec<FlattenedContentTypeWire>>;
    async fn list_asset_folders(&self) -> Result<Vec<AssetFolderWire>>;
}

/// Identifies a linked/component item purely by its opaque id, used while
/// resolving the reference closure before items have codenames assigned
/// locally.
pub type ItemId = Uuid;

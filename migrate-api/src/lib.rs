//! The `ManagementApi` capability: a narrow REST client abstraction over
//! the content platform's management API (spec §6). `migrate-core` talks
//! to environments exclusively through the `ManagementApi` trait so it can
//! be exercised against a fake/mock implementation in tests without a
//! network.

mod api;
mod client;
mod error;
mod retry;
mod wire;

pub use api::BinaryFileUpload;
pub use api::ItemId;
pub use api::ManagementApi;
pub use client::ReqwestManagementApi;
pub use client::default_http_client;
pub use error::Error;
pub use error::Result;
pub use retry::RetryConfig;
pub use retry::backoff;
pub use wire::AssetCreateWire;
pub use wire::AssetDescriptionWire;
pub use wire::AssetFolderWire;
pub use wire::AssetUpsertWire;
pub use wire::AssetWire;
pub use wire::CollectionWire;
pub use wire::ContentItemCreateWire;
pub use wire::ContentItemUpsertWire;
pub use wire::ContentItemWire;
pub use wire::ContentTypeElementWire;
pub use wire::ElementWire;
pub use wire::FileReferenceWire;
pub use wire::FlattenedContentTypeWire;
pub use wire::LanguageVariantUpsertWire;
pub use wire::LanguageVariantWire;
pub use wire::LanguageWire;
pub use wire::MultipleChoiceOptionWire;
pub use wire::ReferenceWire;
pub use wire::RichTextComponentWire;
pub use wire::RichTextValueWire;
pub use wire::ScheduleWire;
pub use wire::TaxonomyGroupWire;
pub use wire::TaxonomyTermWire;
pub use wire::WorkflowStepDefWire;
pub use wire::WorkflowStepRefWire;
pub use wire::WorkflowWire;

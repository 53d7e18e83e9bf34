//! The migration engine: translates content items, language variants,
//! and assets between two environments of the same headless CMS through
//! its management REST API. `migrate-cli` is the only consumer that
//! talks to a terminal; everything here is pure pipeline logic driven
//! through the `ManagementApi` capability (`migrate_api::ManagementApi`).

mod elements;
mod error;
mod export;
mod harness;
mod import;
mod model;
mod reference_extractor;
mod richtext;
mod workflow;

pub use elements::ElementKind;
pub use error::MigrateError;
pub use error::Result;
pub use export::context::EnvironmentData;
pub use export::context::ExportContext;
pub use export::context::ExportItem;
pub use export::manager::ExportManagerOptions;
pub use export::manager::build_migration_data;
pub use harness::NullProgressSink;
pub use harness::ProcessItemsOptions;
pub use harness::ProcessOutcome;
pub use harness::ProgressSink;
pub use import::asset_importer::import_assets;
pub use import::context::ExternalIdGenerator;
pub use import::context::ImportContext;
pub use import::context::LanguageVariantState;
pub use import::context::ScheduledState;
pub use import::context::WorkflowState;
pub use import::context::identity_external_id_generator;
pub use import::item_importer::import_content_items;
pub use import::variant_importer::import_language_variants;
pub use model::AssetDescription;
pub use model::CodenameRef;
pub use model::MigrationAsset;
pub use model::MigrationComponent;
pub use model::MigrationData;
pub use model::MigrationElement;
pub use model::MigrationItem;
pub use model::MigrationItemSystem;
pub use model::MigrationItemVersion;
pub use model::Schedule;
pub use model::UrlSlugMode;
pub use model::component_id_for_codename;

use std::sync::Arc;

use migrate_api::ManagementApi;
use tokio_util::sync::CancellationToken;

/// One (itemCodename, languageCodename) pair requested for export.
pub type ExportRequest = (String, String);

/// Runs the whole export pipeline (C6 + C7) for a set of requested
/// items: loads environment data, resolves each request and its
/// reference closure, translates every version through the element
/// registry, and downloads every referenced asset's binary.
pub async fn export(
    api: Arc<dyn ManagementApi>,
    requests: Vec<ExportRequest>,
    options: ExportManagerOptions,
    progress: &dyn ProgressSink,
) -> Result<MigrationData> {
    let ctx = export::context::build(Arc::clone(&api), requests, progress).await?;
    build_migration_data(api, &ctx, options, progress).await
}

/// Runs the whole import pipeline (C8 through C11) for a previously
/// exported (and optionally transformed) snapshot.
pub async fn import(
    api: Arc<dyn ManagementApi>,
    data: MigrationData,
    external_id_generator: ExternalIdGenerator,
    fail_on_error: bool,
    progress: &dyn ProgressSink,
) -> Result<RunSummary> {
    data.validate_shape()?;

    let ctx = Arc::new(import::context::build(Arc::clone(&api), &data, external_id_generator, progress).await?);
    let cancellation = CancellationToken::new();

    let item_systems: Vec<MigrationItemSystem> = data.items.iter().map(|item| item.system.clone()).collect();
    let item_outcomes = import_content_items(
        Arc::clone(&api),
        Arc::clone(&ctx),
        item_systems,
        progress,
        cancellation.clone(),
    )
    .await?;
    let mut summary = RunSummary::default();
    summary.absorb(&item_outcomes, fail_on_error)?;

    let asset_outcomes = import_assets(
        Arc::clone(&api),
        Arc::clone(&ctx),
        data.assets.clone(),
        progress,
        cancellation.clone(),
    )
    .await?;
    summary.absorb(&asset_outcomes, fail_on_error)?;

    let variant_outcomes =
        import_language_variants(api, Arc::clone(&ctx), data.items, progress, cancellation).await?;
    summary.absorb(&variant_outcomes, fail_on_error)?;

    Ok(summary)
}

/// Per-run tally of how every item/asset/variant processed by the import
/// pipeline classified (§7 "Propagation policy").
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub succeeded: usize,
    pub not_found: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl RunSummary {
    fn absorb<O>(&mut self, outcomes: &[ProcessOutcome<O>], fail_on_error: bool) -> Result<()> {
        for outcome in outcomes {
            match outcome {
                ProcessOutcome::Valid(_) => self.succeeded += 1,
                ProcessOutcome::NotFound => self.not_found += 1,
                ProcessOutcome::Cancelled => self.cancelled += 1,
                ProcessOutcome::Error(err) => {
                    self.failed += 1;
                    if fail_on_error {
                        return Err(MigrateError::processing("run", err.to_string()));
                    }
                    tracing::warn!(%err, "item failed during import; continuing");
                }
            }
        }
        Ok(())
    }
}

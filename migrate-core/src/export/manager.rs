//! Export Manager (C7). Turns a built `ExportContext` into the portable,
//! codename-addressed `MigrationData` snapshot: every version of every
//! export item translated through the element registry (C3), every
//! referenced asset's binary downloaded.

use std::sync::Arc;

use migrate_api::AssetWire;
use migrate_api::ManagementApi;
use migrate_api::ReferenceWire;
use tokio_util::sync::CancellationToken;

use crate::elements::export_elements;
use crate::error::MigrateError;
use crate::export::context::EnvironmentData;
use crate::export::context::ExportContext;
use crate::harness::ProcessItemsOptions;
use crate::harness::ProcessOutcome;
use crate::harness::ProgressSink;
use crate::harness::process_items;
use crate::model::AssetDescription;
use crate::model::CodenameRef;
use crate::model::MigrationAsset;
use crate::model::MigrationData;
use crate::model::MigrationItem;
use crate::model::MigrationItemSystem;
use crate::model::MigrationItemVersion;
use crate::model::Schedule;
use crate::workflow;

/// Whether the platform accepts `<a>`/inline-component links to items or
/// assets that no longer resolve in the source environment, by dropping
/// them, rather than surfacing a hard export error (§4.4).
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportManagerOptions {
    pub replace_invalid_links: bool,
}

pub async fn build_migration_data(
    api: Arc<dyn ManagementApi>,
    ctx: &ExportContext,
    options: ExportManagerOptions,
    progress: &dyn ProgressSink,
) -> Result<MigrationData, MigrateError> {
    let mut items = Vec::with_capacity(ctx.export_items.len());
    for export_item in &ctx.export_items {
        items.push(translate_item(ctx, export_item, options.replace_invalid_links)?);
    }

    let assets = download_assets(api, &ctx.environment, ctx.referenced_assets.values(), progress).await?;

    let data = MigrationData { items, assets };
    data.validate_shape()?;
    Ok(data)
}

fn translate_item(
    ctx: &ExportContext,
    export_item: &crate::export::context::ExportItem,
    replace_invalid_links: bool,
) -> Result<MigrationItem, MigrateError> {
    let system = MigrationItemSystem {
        name: export_item.content_item.name.clone(),
        codename: export_item.content_item.codename.clone(),
        language: CodenameRef::new(export_item.language.codename.clone()),
        content_type: CodenameRef::new(export_item.content_type.codename.clone()),
        collection: CodenameRef::new(export_item.collection.codename.clone()),
        workflow: CodenameRef::new(export_item.workflow.codename.clone()),
    };

    let mut versions = Vec::with_capacity(export_item.versions.len());
    for variant in &export_item.versions {
        let elements = export_elements(
            &ctx.environment.content_types,
            &export_item.content_type,
            &variant.elements,
            ctx,
            replace_invalid_links,
        )?;

        let step_codename = variant
            .workflow
            .step
            .codename
            .clone()
            .or_else(|| {
                variant
                    .workflow
                    .step
                    .id
                    .and_then(|id| workflow::step_by_id(&export_item.workflow, id))
                    .map(|step| step.codename.clone())
            })
            .ok_or_else(|| {
                MigrateError::lookup(format!(
                    "item {} has a version on an unresolvable workflow step",
                    export_item.content_item.codename
                ))
            })?;

        let schedule = variant.schedule.as_ref().map(|s| Schedule {
            publish_time: s.publish_time,
            publish_display_timezone: s.publish_display_timezone.clone(),
            unpublish_time: s.unpublish_time,
            unpublish_display_timezone: s.unpublish_display_timezone.clone(),
        });
        let schedule = schedule.filter(|s| !s.is_empty());

        versions.push(MigrationItemVersion {
            elements,
            schedule,
            workflow_step: CodenameRef::new(step_codename),
        });
    }

    Ok(MigrationItem { system, versions })
}

async fn download_assets<'a>(
    api: Arc<dyn ManagementApi>,
    environment: &EnvironmentData,
    referenced_assets: impl Iterator<Item = &'a AssetWire>,
    progress: &dyn ProgressSink,
) -> Result<Vec<MigrationAsset>, MigrateError> {
    let assets: Vec<AssetWire> = referenced_assets.cloned().collect();

    let outcomes = process_items(
        assets,
        ProcessItemsOptions::new(5),
        |asset: &AssetWire| asset.codename.clone(),
        progress,
        CancellationToken::new(),
        {
            let api = Arc::clone(&api);
            let environment = environment.clone();
            move |asset| {
                let api = Arc::clone(&api);
                let environment = environment.clone();
                async move { download_one_asset(api.as_ref(), &environment, asset).await }
            }
        },
    )
    .await?;

    Ok(outcomes.into_iter().filter_map(ProcessOutcome::into_valid).collect())
}

async fn download_one_asset(
    api: &dyn ManagementApi,
    environment: &EnvironmentData,
    asset: AssetWire,
) -> ProcessOutcome<MigrationAsset> {
    let binary_data = match api.download_binary(&asset.url).await {
        Ok(bytes) => bytes,
        Err(err) => return ProcessOutcome::Error(err.into()),
    };

    let collection = asset
        .collection
        .as_ref()
        .and_then(|reference| environment.resolve_collection(reference))
        .map(|c| CodenameRef::new(c.codename.clone()));

    let folder = asset
        .folder
        .as_ref()
        .and_then(|reference| find_asset_folder(&environment.asset_folders, reference))
        .map(|f| CodenameRef::new(f.codename.clone()));

    let descriptions = asset
        .descriptions
        .iter()
        .filter_map(|d| {
            environment
                .resolve_language(&d.language)
                .map(|language| AssetDescription {
                    language: CodenameRef::new(language.codename.clone()),
                    description: d.description.clone(),
                })
        })
        .collect();

    ProcessOutcome::Valid(MigrationAsset {
        codename: asset.codename,
        filename: asset.file_name,
        title: asset.title,
        binary_data,
        collection,
        folder,
        descriptions,
    })
}

fn find_asset_folder<'a>(
    folders: &'a [migrate_api::AssetFolderWire],
    reference: &ReferenceWire,
) -> Option<&'a migrate_api::AssetFolderWire> {
    for folder in folders {
        if Some(folder.id) == reference.id {
            return Some(folder);
        }
        if reference.codename.as_deref() == Some(folder.codename.as_str()) {
            return Some(folder);
        }
        if let Some(found) = find_asset_folder(&folder.folders, reference) {
            return Some(found);
        }
    }
    None
}

//! Asset Importer (C10). Splits the snapshot's assets into an upload
//! queue (doesn't exist yet) and an edit queue (exists, metadata
//! changed), each driven at its own parallelism.

use std::sync::Arc;

use migrate_api::AssetCreateWire;
use migrate_api::AssetDescriptionWire;
use migrate_api::AssetUpsertWire;
use migrate_api::AssetWire;
use migrate_api::BinaryFileUpload;
use migrate_api::ManagementApi;
use migrate_api::ReferenceWire;
use tokio_util::sync::CancellationToken;

use crate::error::MigrateError;
use crate::harness::ProcessItemsOptions;
use crate::harness::ProcessOutcome;
use crate::harness::ProgressSink;
use crate::harness::process_items;
use crate::import::context::ImportContext;
use crate::model::MigrationAsset;

fn guess_mime_type(filename: &str) -> String {
    mime_guess::from_path(filename).first_or_octet_stream().to_string()
}

/// Compares target-resident metadata against the snapshot's declared
/// metadata to decide whether an `upsertAsset` call is needed (§4.10).
fn should_update_asset(ctx: &ImportContext, asset: &MigrationAsset, existing: &AssetWire) -> bool {
    if existing.title != asset.title {
        return true;
    }

    let existing_collection = existing
        .collection
        .as_ref()
        .and_then(|r| ctx.environment.resolve_collection(r))
        .map(|c| c.codename.as_str());
    let wanted_collection = asset.collection.as_ref().map(|c| c.codename.as_str());
    if existing_collection != wanted_collection {
        return true;
    }

    let existing_folder = existing
        .folder
        .as_ref()
        .and_then(|r| find_asset_folder(&ctx.environment.asset_folders, r))
        .map(|f| f.codename.as_str());
    let wanted_folder = asset.folder.as_ref().map(|f| f.codename.as_str());
    if existing_folder != wanted_folder {
        return true;
    }

    let mut existing_descriptions: Vec<(&str, Option<&str>)> = existing
        .descriptions
        .iter()
        .filter_map(|d| {
            ctx.environment
                .resolve_language(&d.language)
                .map(|l| (l.codename.as_str(), d.description.as_deref()))
        })
        .collect();
    let mut wanted_descriptions: Vec<(&str, Option<&str>)> = asset
        .descriptions
        .iter()
        .map(|d| (d.language.codename.as_str(), d.description.as_deref()))
        .collect();
    existing_descriptions.sort_unstable();
    wanted_descriptions.sort_unstable();
    existing_descriptions != wanted_descriptions
}

/// Whether the binary itself differs, based on filename/size/mime rather
/// than a content hash (§4.10) — the snapshot doesn't carry the target's
/// checksum, only what the source platform reported.
fn should_replace_binary_file(asset: &MigrationAsset, existing: &AssetWire) -> bool {
    existing.file_name != asset.filename
        || existing.size as usize != asset.binary_data.len()
        || existing.mime_type != guess_mime_type(&asset.filename)
}

fn descriptions_for_target(ctx: &ImportContext, asset: &MigrationAsset) -> Vec<AssetDescriptionWire> {
    asset
        .descriptions
        .iter()
        .filter_map(|d| {
            ctx.environment
                .language_by_codename(&d.language.codename)
                .map(|language| AssetDescriptionWire {
                    language: ReferenceWire::by_id(language.id),
                    description: d.description.clone(),
                })
        })
        .collect()
}

pub async fn import_assets(
    api: Arc<dyn ManagementApi>,
    ctx: Arc<ImportContext>,
    assets: Vec<MigrationAsset>,
    progress: &dyn ProgressSink,
    cancellation: CancellationToken,
) -> Result<Vec<ProcessOutcome<AssetWire>>, MigrateError> {
    let mut to_upload = Vec::new();
    let mut to_edit = Vec::new();

    for asset in assets {
        if ctx.asset_exists(&asset.codename) {
            if let Some(existing) = ctx.existing_asset(&asset.codename) {
                if should_update_asset(&ctx, &asset, existing) {
                    to_edit.push(asset);
                } else {
                    ctx.record_asset_id(&existing.codename, existing.id)?;
                }
            }
        } else {
            to_upload.push(asset);
        }
    }

    let mut outcomes = process_items(
        to_upload,
        ProcessItemsOptions::new(3),
        |asset: &MigrationAsset| asset.codename.clone(),
        progress,
        cancellation.clone(),
        {
            let api = Arc::clone(&api);
            let ctx = Arc::clone(&ctx);
            move |asset| {
                let api = Arc::clone(&api);
                let ctx = Arc::clone(&ctx);
                async move { upload_one(api.as_ref(), ctx.as_ref(), asset).await }
            }
        },
    )
    .await?;

    let edit_outcomes = process_items(
        to_edit,
        ProcessItemsOptions::new(1),
        |asset: &MigrationAsset| asset.codename.clone(),
        progress,
        cancellation,
        {
            let api = Arc::clone(&api);
            let ctx = Arc::clone(&ctx);
            move |asset| {
                let api = Arc::clone(&api);
                let ctx = Arc::clone(&ctx);
                async move { edit_one(api.as_ref(), ctx.as_ref(), asset).await }
            }
        },
    )
    .await?;

    outcomes.extend(edit_outcomes);
    Ok(outcomes)
}

async fn upload_one(api: &dyn ManagementApi, ctx: &ImportContext, asset: MigrationAsset) -> ProcessOutcome<AssetWire> {
    let mime_type = guess_mime_type(&asset.filename);
    let file_reference = match api
        .upload_binary_file(BinaryFileUpload {
            binary_data: asset.binary_data.clone(),
            content_type: mime_type,
            filename: asset.filename.clone(),
        })
        .await
    {
        Ok(reference) => reference,
        Err(err) => return ProcessOutcome::Error(err.into()),
    };

    let external_id = ctx.external_id_for(&asset.codename).map(str::to_string);
    let created = match api
        .add_asset(AssetCreateWire {
            file_reference,
            codename: asset.codename.clone(),
            external_id,
            title: asset.title.clone(),
            descriptions: descriptions_for_target(ctx, &asset),
            collection: asset
                .collection
                .as_ref()
                .map(|c| ReferenceWire::by_codename(c.codename.clone())),
            folder: asset.folder.as_ref().map(|f| ReferenceWire::by_codename(f.codename.clone())),
        })
        .await
    {
        Ok(created) => created,
        Err(err) => return ProcessOutcome::Error(err.into()),
    };

    if let Err(err) = ctx.record_asset_id(&asset.codename, created.id) {
        return ProcessOutcome::Error(err);
    }
    ProcessOutcome::Valid(created)
}

async fn edit_one(api: &dyn ManagementApi, ctx: &ImportContext, asset: MigrationAsset) -> ProcessOutcome<AssetWire> {
    let Some(existing) = ctx.existing_asset(&asset.codename) else {
        return ProcessOutcome::Error(MigrateError::processing(
            asset.codename.clone(),
            "asset reported as existing but not probed",
        ));
    };

    if should_replace_binary_file(&asset, existing) {
        tracing::warn!(
            codename = asset.codename,
            "binary file differs but C10 only re-uploads metadata; re-run export/import of this asset as new to replace the binary"
        );
    }

    let updated = match api
        .upsert_asset(
            &asset.codename,
            AssetUpsertWire {
                title: asset.title.clone(),
                descriptions: descriptions_for_target(ctx, &asset),
                collection: asset
                    .collection
                    .as_ref()
                    .map(|c| ReferenceWire::by_codename(c.codename.clone())),
                folder: asset.folder.as_ref().map(|f| ReferenceWire::by_codename(f.codename.clone())),
            },
        )
        .await
    {
        Ok(updated) => updated,
        Err(err) => return ProcessOutcome::Error(err.into()),
    };

    if let Err(err) = ctx.record_asset_id(&asset.codename, updated.id) {
        return ProcessOutcome::Error(err);
    }
    ProcessOutcome::Valid(updated)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_mime_type_from_extension() {
        assert_eq!(guess_mime_type("banner.png"), "image/png");
        assert_eq!(guess_mime_type("doc.PDF"), "application/pdf");
        assert_eq!(guess_mime_type("mystery"), "application/octet-stream");
    }
}

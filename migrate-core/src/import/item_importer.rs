//! Content-Item Importer (C9). Serial (parallelism 1): creates the
//! language-agnostic shell for every item codename in the snapshot, or
//! renames/re-collects an existing one. This is the only stage that
//! mutates the `createdContentItems` memo (§9 design note), held here as
//! `ImportContext::resolved_item_ids`.

use std::sync::Arc;

use migrate_api::ContentItemCreateWire;
use migrate_api::ContentItemUpsertWire;
use migrate_api::ContentItemWire;
use migrate_api::ManagementApi;
use migrate_api::ReferenceWire;
use tokio_util::sync::CancellationToken;

use crate::error::MigrateError;
use crate::harness::ProcessItemsOptions;
use crate::harness::ProcessOutcome;
use crate::harness::ProgressSink;
use crate::harness::process_items;
use crate::import::context::ImportContext;
use crate::model::MigrationItemSystem;

pub async fn import_content_items(
    api: Arc<dyn ManagementApi>,
    ctx: Arc<ImportContext>,
    items: Vec<MigrationItemSystem>,
    progress: &dyn ProgressSink,
    cancellation: CancellationToken,
) -> Result<Vec<ProcessOutcome<ContentItemWire>>, MigrateError> {
    process_items(
        items,
        ProcessItemsOptions::new(1),
        |system: &MigrationItemSystem| system.codename.clone(),
        progress,
        cancellation,
        {
            let api = Arc::clone(&api);
            let ctx = Arc::clone(&ctx);
            move |system| {
                let api = Arc::clone(&api);
                let ctx = Arc::clone(&ctx);
                async move { import_one(api.as_ref(), ctx.as_ref(), system).await }
            }
        },
    )
    .await
}

async fn import_one(
    api: &dyn ManagementApi,
    ctx: &ImportContext,
    system: MigrationItemSystem,
) -> ProcessOutcome<ContentItemWire> {
    let codename = &system.codename;

    if ctx.item_exists(codename) {
        let Some(existing) = ctx.existing_item(codename) else {
            return ProcessOutcome::Error(MigrateError::processing(
                codename.clone(),
                "item reported as existing but not probed",
            ));
        };

        let current_collection_codename = ctx
            .environment
            .resolve_collection(&existing.collection)
            .map(|c| c.codename.as_str());
        let needs_update =
            existing.name != system.name || current_collection_codename != Some(system.collection.codename.as_str());

        let item = if needs_update {
            match api
                .upsert_content_item(
                    codename,
                    ContentItemUpsertWire {
                        name: system.name.clone(),
                        collection: Some(ReferenceWire::by_codename(system.collection.codename.clone())),
                    },
                )
                .await
            {
                Ok(item) => item,
                Err(err) => return ProcessOutcome::Error(err.into()),
            }
        } else {
            existing.clone()
        };

        if let Err(err) = ctx.record_item_id(codename, item.id) {
            return ProcessOutcome::Error(err);
        }
        return ProcessOutcome::Valid(item);
    }

    // The snapshot carries one `MigrationItemSystem` per language variant
    // (§3), so the same codename can appear here more than once in a run
    // that didn't already find the item on the target (C8 only probes
    // once per codename, before any variant has run). The memo this stage
    // itself populates is what catches the repeat and stops a second
    // `add_content_item` for an id C9 already minted earlier in this pass.
    match ctx.resolved_item_id(codename) {
        Ok(Some(id)) => {
            return ProcessOutcome::Valid(ContentItemWire {
                id,
                name: system.name.clone(),
                codename: codename.clone(),
                content_type: ReferenceWire::by_codename(system.content_type.codename.clone()),
                collection: ReferenceWire::by_codename(system.collection.codename.clone()),
                external_id: ctx.external_id_for(codename).map(str::to_string),
                last_modified: None,
            });
        }
        Ok(None) => {}
        Err(err) => return ProcessOutcome::Error(err),
    }

    let external_id = ctx.external_id_for(codename).map(str::to_string);
    let item = match api
        .add_content_item(ContentItemCreateWire {
            name: system.name.clone(),
            codename: codename.clone(),
            content_type: ReferenceWire::by_codename(system.content_type.codename.clone()),
            collection: ReferenceWire::by_codename(system.collection.codename.clone()),
            external_id,
        })
        .await
    {
        Ok(item) => item,
        Err(err) => return ProcessOutcome::Error(err.into()),
    };

    if let Err(err) = ctx.record_item_id(codename, item.id) {
        return ProcessOutcome::Error(err);
    }
    ProcessOutcome::Valid(item)
}

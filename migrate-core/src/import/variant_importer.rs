//! Language-Variant Importer & Workflow Driver (C11) — the heart of
//! import. Drives each item's target variant through
//! absent/draft/published/archived/scheduled states to reproduce the
//! snapshot's published and draft versions (§4.11).

use std::sync::Arc;

use migrate_api::LanguageVariantUpsertWire;
use migrate_api::ManagementApi;
use migrate_api::ScheduleWire;
use migrate_api::WorkflowWire;
use tokio_util::sync::CancellationToken;

use crate::elements::import_elements;
use crate::error::MigrateError;
use crate::harness::ProcessItemsOptions;
use crate::harness::ProcessOutcome;
use crate::harness::ProgressSink;
use crate::harness::process_items;
use crate::import::context::ImportContext;
use crate::import::context::ScheduledState;
use crate::import::context::WorkflowState;
use crate::model::MigrationItem;
use crate::model::MigrationItemVersion;
use crate::model::Schedule;
use crate::workflow;

pub async fn import_language_variants(
    api: Arc<dyn ManagementApi>,
    ctx: Arc<ImportContext>,
    items: Vec<MigrationItem>,
    progress: &dyn ProgressSink,
    cancellation: CancellationToken,
) -> Result<Vec<ProcessOutcome<()>>, MigrateError> {
    process_items(
        items,
        ProcessItemsOptions::new(1),
        |item: &MigrationItem| item.system.codename.clone(),
        progress,
        cancellation,
        {
            let api = Arc::clone(&api);
            let ctx = Arc::clone(&ctx);
            move |item| {
                let api = Arc::clone(&api);
                let ctx = Arc::clone(&ctx);
                async move { import_one_item(api.as_ref(), ctx.as_ref(), item).await }
            }
        },
    )
    .await
}

/// Splits `versions[]` by step kind; more than one of either kind is a
/// fatal per-item error (§4.11 "Version categorization").
fn categorize_versions(
    wf: &WorkflowWire,
    versions: Vec<MigrationItemVersion>,
) -> Result<(Option<MigrationItemVersion>, Option<MigrationItemVersion>), MigrateError> {
    let mut published = None;
    let mut draft = None;
    for version in versions {
        if workflow::is_published(wf, &version.workflow_step.codename) {
            if published.is_some() {
                return Err(MigrateError::config(
                    "migration item has more than one published version",
                ));
            }
            published = Some(version);
        } else {
            if draft.is_some() {
                return Err(MigrateError::config("migration item has more than one draft version"));
            }
            draft = Some(version);
        }
    }
    Ok((published, draft))
}

async fn import_one_item(api: &dyn ManagementApi, ctx: &ImportContext, item: MigrationItem) -> ProcessOutcome<()> {
    let item_codename = item.system.codename.clone();
    let language_codename = item.system.language.codename.clone();

    let Some(target_content_type) = ctx.environment.content_type_by_codename(&item.system.content_type.codename)
    else {
        return ProcessOutcome::Error(MigrateError::lookup(format!(
            "item {item_codename} declares unresolvable content type {}",
            item.system.content_type.codename
        )));
    };
    let Some(wf) = ctx.environment.workflow_by_codename(&item.system.workflow.codename) else {
        return ProcessOutcome::Error(MigrateError::lookup(format!(
            "item {item_codename} declares unresolvable workflow {}",
            item.system.workflow.codename
        )));
    };

    let (published_version, draft_version) = match categorize_versions(wf, item.versions) {
        Ok(pair) => pair,
        Err(err) => return ProcessOutcome::Error(err),
    };

    let key = (item_codename.clone(), language_codename.clone());
    let current_state = ctx.variant_states.get(&key);

    if let Err(err) = prepare_target(api, wf, &item_codename, &language_codename, current_state).await {
        return ProcessOutcome::Error(err);
    }

    let mut published_imported = false;
    if let Some(version) = &published_version {
        if let Err(err) =
            import_version(api, ctx, wf, target_content_type, &item_codename, &language_codename, version).await
        {
            return ProcessOutcome::Error(err);
        }
        published_imported = true;
    }

    if let Some(version) = &draft_version {
        if published_imported {
            if let Err(err) = api.create_new_version(&item_codename, &language_codename).await {
                return ProcessOutcome::Error(err.into());
            }
        }
        if let Err(err) =
            import_version(api, ctx, wf, target_content_type, &item_codename, &language_codename, version).await
        {
            return ProcessOutcome::Error(err);
        }
    }

    if let Some(state) = current_state {
        if state.workflow_state == WorkflowState::Published && published_version.is_none() {
            if let Err(err) = api.unpublish_language_variant(&item_codename, &language_codename, None).await {
                return ProcessOutcome::Error(err.into());
            }
        }
    }

    ProcessOutcome::Valid(())
}

/// §4.11 "Target preparation": cancels any stale schedule (the §9
/// "scheduled state bug" workaround applies regardless of what the probe
/// actually reported), then moves a published/archived variant back to a
/// draft step so element upsert has somewhere to land.
async fn prepare_target(
    api: &dyn ManagementApi,
    wf: &WorkflowWire,
    item_codename: &str,
    language_codename: &str,
    state: Option<&crate::import::context::LanguageVariantState>,
) -> Result<(), MigrateError> {
    let Some(state) = state else {
        return Ok(());
    };

    match state.scheduled_state {
        ScheduledState::ScheduledPublish => {
            if let Err(err) = api.cancel_scheduled_publish(item_codename, language_codename).await {
                if !err.is_not_found() {
                    return Err(err.into());
                }
            }
        }
        ScheduledState::ScheduledUnpublish => {
            if let Err(err) = api.cancel_scheduled_unpublish(item_codename, language_codename).await {
                if !err.is_not_found() {
                    return Err(err.into());
                }
            }
        }
        ScheduledState::None => {}
    }

    match state.workflow_state {
        WorkflowState::Published => {
            api.create_new_version(item_codename, language_codename).await?;
        }
        WorkflowState::Archived => {
            let first = workflow::first_step(wf)?;
            api.change_workflow_of_language_variant(item_codename, language_codename, &wf.codename, &first.codename)
                .await?;
        }
        WorkflowState::Draft => {}
    }

    Ok(())
}

async fn import_version(
    api: &dyn ManagementApi,
    ctx: &ImportContext,
    wf: &WorkflowWire,
    target_content_type: &migrate_api::FlattenedContentTypeWire,
    item_codename: &str,
    language_codename: &str,
    version: &MigrationItemVersion,
) -> Result<(), MigrateError> {
    let elements = import_elements(&ctx.environment.content_types, target_content_type, &version.elements, ctx)?;

    api.upsert_language_variant(item_codename, language_codename, LanguageVariantUpsertWire { elements })
        .await?;

    drive_workflow_step(api, wf, item_codename, language_codename, &version.workflow_step.codename).await?;
    apply_schedule(api, item_codename, language_codename, version.schedule.as_ref()).await?;

    Ok(())
}

/// §4.11 step 2: drives the variant, currently sitting on the target
/// workflow's first step (where `import_version`'s upsert just landed
/// it), to the snapshot's declared step.
async fn drive_workflow_step(
    api: &dyn ManagementApi,
    wf: &WorkflowWire,
    item_codename: &str,
    language_codename: &str,
    target_step_codename: &str,
) -> Result<(), MigrateError> {
    if workflow::is_published(wf, target_step_codename) {
        let first = workflow::first_step(wf)?;
        let Some(penultimate_id) = workflow::penultimate_before_published(wf, first.id) else {
            return Err(MigrateError::lookup(format!(
                "workflow {} has no path from its first step to published",
                wf.codename
            )));
        };
        let Some(penultimate) = workflow::step_by_id(wf, penultimate_id) else {
            return Err(MigrateError::lookup(format!(
                "workflow {} step {penultimate_id} no longer exists",
                wf.codename
            )));
        };
        api.change_workflow_of_language_variant(item_codename, language_codename, &wf.codename, &penultimate.codename)
            .await?;

        match api.publish_language_variant(item_codename, language_codename, None).await {
            Ok(()) => {}
            Err(err) if err.is_bad_publish() => {
                tracing::warn!(item_codename, %err, "publish rejected by target platform; leaving variant unpublished");
            }
            Err(err) => return Err(err.into()),
        }
    } else if workflow::is_scheduled(wf, target_step_codename) {
        // scheduling is applied separately (§4.11 step 3); nothing to drive here.
    } else {
        api.change_workflow_of_language_variant(item_codename, language_codename, &wf.codename, target_step_codename)
            .await?;
    }

    Ok(())
}

async fn apply_schedule(
    api: &dyn ManagementApi,
    item_codename: &str,
    language_codename: &str,
    schedule: Option<&Schedule>,
) -> Result<(), MigrateError> {
    let Some(schedule) = schedule else {
        return Ok(());
    };

    if schedule.publish_time.is_some() {
        api.publish_language_variant(
            item_codename,
            language_codename,
            Some(ScheduleWire {
                publish_time: schedule.publish_time,
                publish_display_timezone: schedule.publish_display_timezone.clone(),
                unpublish_time: None,
                unpublish_display_timezone: None,
            }),
        )
        .await?;
    }

    if schedule.unpublish_time.is_some() {
        api.unpublish_language_variant(
            item_codename,
            language_codename,
            Some(ScheduleWire {
                unpublish_time: schedule.unpublish_time,
                unpublish_display_timezone: schedule.unpublish_display_timezone.clone(),
                publish_time: None,
                publish_display_timezone: None,
            }),
        )
        .await?;
    }

    Ok(())
}

//! Import Context Builder (C8). For each codename in the snapshot, probes
//! the target environment and records what already exists, what needs an
//! external id, and (as items/assets get created by C9/C10) what id each
//! codename now resolves to.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use migrate_api::AssetWire;
use migrate_api::ContentItemWire;
use migrate_api::LanguageVariantWire;
use migrate_api::ManagementApi;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::MigrateError;
use crate::export::context::EnvironmentData;
use crate::harness::ProcessItemsOptions;
use crate::harness::ProcessOutcome;
use crate::harness::ProgressSink;
use crate::harness::process_items;
use crate::model::MigrationData;
use crate::richtext::ImportResolver;
use crate::workflow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledState {
    ScheduledPublish,
    ScheduledUnpublish,
    None,
}

#[derive(Debug, Clone)]
pub struct LanguageVariantState {
    pub draft: Option<LanguageVariantWire>,
    pub published: Option<LanguageVariantWire>,
    pub workflow_state: WorkflowState,
    pub scheduled_state: ScheduledState,
}

/// Client-supplied idempotency key generator (§9 "External-id idempotence"):
/// `Fn(sourceCodename) -> externalId`. Defaults to the identity function.
pub type ExternalIdGenerator = Arc<dyn Fn(&str) -> String + Send + Sync>;

pub fn identity_external_id_generator() -> ExternalIdGenerator {
    Arc::new(|codename: &str| codename.to_string())
}

pub struct ImportContext {
    pub environment: EnvironmentData,
    pub item_exists: HashMap<String, bool>,
    pub existing_items: HashMap<String, ContentItemWire>,
    pub variant_states: HashMap<(String, String), LanguageVariantState>,
    pub asset_exists: HashMap<String, bool>,
    pub existing_assets: HashMap<String, AssetWire>,
    pub external_ids: HashMap<String, String>,
    resolved_item_ids: Mutex<HashMap<String, Uuid>>,
    resolved_asset_ids: Mutex<HashMap<String, Uuid>>,
}

impl ImportContext {
    pub fn item_exists(&self, codename: &str) -> bool {
        self.item_exists.get(codename).copied().unwrap_or(false)
    }

    pub fn existing_item(&self, codename: &str) -> Option<&ContentItemWire> {
        self.existing_items.get(codename)
    }

    pub fn existing_asset(&self, codename: &str) -> Option<&AssetWire> {
        self.existing_assets.get(codename)
    }

    pub fn asset_exists(&self, codename: &str) -> bool {
        self.asset_exists.get(codename).copied().unwrap_or(false)
    }

    pub fn external_id_for(&self, codename: &str) -> Option<&str> {
        self.external_ids.get(codename).map(String::as_str)
    }

    pub fn record_item_id(&self, codename: &str, id: Uuid) -> Result<(), MigrateError> {
        self.resolved_item_ids
            .lock()
            .map_err(|_| MigrateError::internal("resolved_item_ids mutex poisoned"))?
            .insert(codename.to_string(), id);
        Ok(())
    }

    pub fn record_asset_id(&self, codename: &str, id: Uuid) -> Result<(), MigrateError> {
        self.resolved_asset_ids
            .lock()
            .map_err(|_| MigrateError::internal("resolved_asset_ids mutex poisoned"))?
            .insert(codename.to_string(), id);
        Ok(())
    }

    pub fn resolved_item_id(&self, codename: &str) -> Result<Option<Uuid>, MigrateError> {
        Ok(self
            .resolved_item_ids
            .lock()
            .map_err(|_| MigrateError::internal("resolved_item_ids mutex poisoned"))?
            .get(codename)
            .copied())
    }

    pub fn resolved_asset_id(&self, codename: &str) -> Result<Option<Uuid>, MigrateError> {
        Ok(self
            .resolved_asset_ids
            .lock()
            .map_err(|_| MigrateError::internal("resolved_asset_ids mutex poisoned"))?
            .get(codename)
            .copied())
    }
}

impl ImportResolver for ImportContext {
    fn item_id(&self, codename: &str) -> Option<Uuid> {
        match self.resolved_item_id(codename) {
            Ok(id) => id,
            Err(err) => {
                tracing::error!(%err, "rich text item link left unresolved");
                None
            }
        }
    }

    fn asset_id(&self, codename: &str) -> Option<Uuid> {
        match self.resolved_asset_id(codename) {
            Ok(id) => id,
            Err(err) => {
                tracing::error!(%err, "rich text asset link left unresolved");
                None
            }
        }
    }
}

pub async fn build(
    api: Arc<dyn ManagementApi>,
    data: &MigrationData,
    external_id_generator: ExternalIdGenerator,
    progress: &dyn ProgressSink,
) -> Result<ImportContext, MigrateError> {
    let environment = EnvironmentData::load(api.as_ref()).await?;

    let item_codenames: Vec<String> = data
        .items
        .iter()
        .map(|item| item.system.codename.clone())
        .collect();

    let item_outcomes = process_items(
        item_codenames.clone(),
        ProcessItemsOptions::new(5),
        |codename: &String| codename.clone(),
        progress,
        CancellationToken::new(),
        {
            let api = Arc::clone(&api);
            move |codename| {
                let api = Arc::clone(&api);
                async move { probe_content_item(api.as_ref(), codename).await }
            }
        },
    )
    .await?;

    let mut item_exists = HashMap::new();
    let mut resolved_item_ids = HashMap::new();
    let mut existing_items = HashMap::new();
    for outcome in item_outcomes {
        if let ProcessOutcome::Valid((codename, found)) = outcome {
            item_exists.insert(codename.clone(), found.is_some());
            if let Some(item) = found {
                resolved_item_ids.insert(codename.clone(), item.id);
                existing_items.insert(codename, item);
            }
        }
    }

    let variant_requests: Vec<(String, String)> = data
        .items
        .iter()
        .map(|item| (item.system.codename.clone(), item.system.language.codename.clone()))
        .collect();

    let variant_outcomes = process_items(
        variant_requests,
        ProcessItemsOptions::new(5),
        |(item, lang): &(String, String)| format!("{item}/{lang}"),
        progress,
        CancellationToken::new(),
        {
            let api = Arc::clone(&api);
            let environment = environment.clone();
            move |(item_codename, language_codename)| {
                let api = Arc::clone(&api);
                let environment = environment.clone();
                async move {
                    probe_language_variant(api.as_ref(), &environment, item_codename, language_codename)
                        .await
                }
            }
        },
    )
    .await?;

    let mut variant_states = HashMap::new();
    for outcome in variant_outcomes {
        if let ProcessOutcome::Valid((key, state)) = outcome {
            variant_states.insert(key, state);
        }
    }

    let asset_codenames: Vec<String> = data
        .assets
        .iter()
        .map(|asset| asset.codename.clone())
        .collect();

    let asset_outcomes = process_items(
        asset_codenames,
        ProcessItemsOptions::new(5),
        |codename: &String| codename.clone(),
        progress,
        CancellationToken::new(),
        {
            let api = Arc::clone(&api);
            move |codename| {
                let api = Arc::clone(&api);
                async move { probe_asset(api.as_ref(), codename).await }
            }
        },
    )
    .await?;

    let mut asset_exists = HashMap::new();
    let mut resolved_asset_ids = HashMap::new();
    let mut existing_assets = HashMap::new();
    for outcome in asset_outcomes {
        if let ProcessOutcome::Valid((codename, found)) = outcome {
            asset_exists.insert(codename.clone(), found.is_some());
            if let Some(asset) = found {
                resolved_asset_ids.insert(codename.clone(), asset.id);
                existing_assets.insert(codename, asset);
            }
        }
    }

    let mut external_ids = HashMap::new();
    for codename in item_codenames.iter().filter(|c| !item_exists.get(*c).copied().unwrap_or(false)) {
        external_ids.insert(codename.clone(), external_id_generator(codename));
    }
    for asset in &data.assets {
        if !asset_exists.get(&asset.codename).copied().unwrap_or(false) {
            external_ids.insert(asset.codename.clone(), external_id_generator(&asset.codename));
        }
    }

    Ok(ImportContext {
        environment,
        item_exists,
        existing_items,
        variant_states,
        asset_exists,
        existing_assets,
        external_ids,
        resolved_item_ids: Mutex::new(resolved_item_ids),
        resolved_asset_ids: Mutex::new(resolved_asset_ids),
    })
}

async fn probe_content_item(
    api: &dyn ManagementApi,
    codename: String,
) -> ProcessOutcome<(String, Option<ContentItemWire>)> {
    match api.view_content_item(&codename).await {
        Ok(item) => ProcessOutcome::Valid((codename, Some(item))),
        Err(err) if err.is_not_found() => ProcessOutcome::Valid((codename, None)),
        Err(err) => ProcessOutcome::Error(err.into()),
    }
}

async fn probe_asset(
    api: &dyn ManagementApi,
    codename: String,
) -> ProcessOutcome<(String, Option<AssetWire>)> {
    match api.view_asset(&codename).await {
        Ok(asset) => ProcessOutcome::Valid((codename, Some(asset))),
        Err(err) if err.is_not_found() => ProcessOutcome::Valid((codename, None)),
        Err(err) => ProcessOutcome::Error(err.into()),
    }
}

/// The "scheduled state bug" workaround (§9) starts here: the `/published`
/// read is the one known to return a stale/inverted `scheduledState`, so
/// the pre-import routine (C11) always re-cancels whatever this observed
/// regardless of which value it reports.
async fn probe_language_variant(
    api: &dyn ManagementApi,
    environment: &EnvironmentData,
    item_codename: String,
    language_codename: String,
) -> ProcessOutcome<((String, String), LanguageVariantState)> {
    let draft = match api
        .view_language_variant(&item_codename, &language_codename, false)
        .await
    {
        Ok(variant) => Some(variant),
        Err(err) if err.is_not_found() => None,
        Err(err) => return ProcessOutcome::Error(err.into()),
    };

    let published = match api
        .view_language_variant(&item_codename, &language_codename, true)
        .await
    {
        Ok(variant) => Some(variant),
        Err(err) if err.is_not_found() => None,
        Err(err) => return ProcessOutcome::Error(err.into()),
    };

    let Some(active) = draft.clone().or_else(|| published.clone()) else {
        return ProcessOutcome::NotFound;
    };

    let workflow_state = match classify_step(environment, &active.workflow) {
        Some(state) => state,
        None if published.is_some() && draft.is_none() => WorkflowState::Published,
        None => WorkflowState::Draft,
    };

    let scheduled_state = match &active.schedule {
        Some(schedule) if schedule.publish_time.is_some() => ScheduledState::ScheduledPublish,
        Some(schedule) if schedule.unpublish_time.is_some() => ScheduledState::ScheduledUnpublish,
        _ => ScheduledState::None,
    };

    ProcessOutcome::Valid((
        (item_codename, language_codename),
        LanguageVariantState {
            draft,
            published,
            workflow_state,
            scheduled_state,
        },
    ))
}

fn classify_step(
    environment: &EnvironmentData,
    step_ref: &migrate_api::WorkflowStepRefWire,
) -> Option<WorkflowState> {
    let wf = environment.resolve_workflow(&step_ref.workflow)?;
    let step_codename = step_ref
        .step
        .codename
        .clone()
        .or_else(|| step_ref.step.id.and_then(|id| workflow::step_by_id(wf, id)).map(|s| s.codename.clone()))?;
    if workflow::is_published(wf, &step_codename) {
        Some(WorkflowState::Published)
    } else if workflow::is_archived(wf, &step_codename) {
        Some(WorkflowState::Archived)
    } else {
        Some(WorkflowState::Draft)
    }
}

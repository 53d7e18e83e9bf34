//! Export Context Fetcher (C6). Loads environment metadata once, resolves
//! each requested `(item, language)` into an `ExportItem`, then walks the
//! reference closure (C5) to pull in every linked item/asset by id.

use std::collections::HashMap;
use std::sync::Arc;

use migrate_api::AssetFolderWire;
use migrate_api::AssetWire;
use migrate_api::CollectionWire;
use migrate_api::ContentItemWire;
use migrate_api::FlattenedContentTypeWire;
use migrate_api::LanguageVariantWire;
use migrate_api::LanguageWire;
use migrate_api::ManagementApi;
use migrate_api::ReferenceWire;
use migrate_api::TaxonomyGroupWire;
use migrate_api::TaxonomyTermWire;
use migrate_api::WorkflowWire;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::MigrateError;
use crate::harness::ProcessItemsOptions;
use crate::harness::ProcessOutcome;
use crate::harness::ProgressSink;
use crate::harness::process_items;
use crate::reference_extractor::ReferencedIds;
use crate::reference_extractor::extract_from_elements;
use crate::richtext::ExportResolver;
use crate::workflow;

/// Metadata pulled once per run: collections, flattened content types,
/// languages, workflows, taxonomies, asset folders (§4.6 step 1).
#[derive(Debug, Clone)]
pub struct EnvironmentData {
    pub collections: Vec<CollectionWire>,
    pub content_types: Vec<FlattenedContentTypeWire>,
    pub languages: Vec<LanguageWire>,
    pub workflows: Vec<WorkflowWire>,
    pub taxonomies: Vec<TaxonomyGroupWire>,
    pub asset_folders: Vec<AssetFolderWire>,
}

impl EnvironmentData {
    pub async fn load(api: &dyn ManagementApi) -> Result<Self, MigrateError> {
        Ok(Self {
            collections: api.list_collections().await?,
            content_types: api.list_content_types().await?,
            languages: api.list_languages().await?,
            workflows: api.list_workflows().await?,
            taxonomies: api.list_taxonomies().await?,
            asset_folders: api.list_asset_folders().await?,
        })
    }

    pub fn collection_by_codename(&self, codename: &str) -> Option<&CollectionWire> {
        self.collections.iter().find(|c| c.codename == codename)
    }

    pub fn content_type_by_codename(&self, codename: &str) -> Option<&FlattenedContentTypeWire> {
        self.content_types.iter().find(|t| t.codename == codename)
    }

    pub fn language_by_codename(&self, codename: &str) -> Option<&LanguageWire> {
        self.languages.iter().find(|l| l.codename == codename)
    }

    pub fn resolve_language(&self, reference: &ReferenceWire) -> Option<&LanguageWire> {
        if let Some(id) = reference.id {
            if let Some(l) = self.languages.iter().find(|l| l.id == id) {
                return Some(l);
            }
        }
        reference
            .codename
            .as_deref()
            .and_then(|codename| self.language_by_codename(codename))
    }

    pub fn workflow_by_codename(&self, codename: &str) -> Option<&WorkflowWire> {
        workflow::by_codename(&self.workflows, codename)
    }

    pub fn resolve_workflow(&self, reference: &ReferenceWire) -> Option<&WorkflowWire> {
        if let Some(id) = reference.id {
            if let Some(wf) = self.workflows.iter().find(|w| w.id == id) {
                return Some(wf);
            }
        }
        reference
            .codename
            .as_deref()
            .and_then(|codename| self.workflow_by_codename(codename))
    }

    pub fn resolve_collection(&self, reference: &ReferenceWire) -> Option<&CollectionWire> {
        if let Some(id) = reference.id {
            if let Some(c) = self.collections.iter().find(|c| c.id == id) {
                return Some(c);
            }
        }
        reference
            .codename
            .as_deref()
            .and_then(|codename| self.collection_by_codename(codename))
    }

    pub fn resolve_content_type(&self, reference: &ReferenceWire) -> Option<&FlattenedContentTypeWire> {
        if let Some(id) = reference.id {
            if let Some(t) = self.content_types.iter().find(|t| t.id == id) {
                return Some(t);
            }
        }
        reference
            .codename
            .as_deref()
            .and_then(|codename| self.content_type_by_codename(codename))
    }

    pub fn taxonomy_group_by_codename(&self, codename: &str) -> Option<&TaxonomyGroupWire> {
        self.taxonomies.iter().find(|g| g.codename == codename)
    }

    /// DFS through the taxonomy group's own term tree (§4.3 row
    /// "resolved by DFS through the declared taxonomy group").
    pub fn taxonomy_term_by_id<'a>(group: &'a TaxonomyGroupWire, id: Uuid) -> Option<&'a TaxonomyTermWire> {
        fn dfs(terms: &[TaxonomyTermWire], id: Uuid) -> Option<&TaxonomyTermWire> {
            for term in terms {
                if term.id == id {
                    return Some(term);
                }
                if let Some(found) = dfs(&term.terms, id) {
                    return Some(found);
                }
            }
            None
        }
        dfs(&group.terms, id)
    }
}

pub struct ExportItem {
    pub content_item: ContentItemWire,
    pub versions: Vec<LanguageVariantWire>,
    pub content_type: FlattenedContentTypeWire,
    pub collection: CollectionWire,
    pub language: LanguageWire,
    pub workflow: WorkflowWire,
}

pub struct ExportContext {
    pub environment: EnvironmentData,
    pub export_items: Vec<ExportItem>,
    pub referenced_items: HashMap<Uuid, ContentItemWire>,
    pub referenced_assets: HashMap<Uuid, AssetWire>,
}

impl ExportResolver for ExportContext {
    fn item_codename(&self, id: Uuid) -> Option<String> {
        self.referenced_items.get(&id).map(|item| item.codename.clone())
    }

    fn asset_codename(&self, id: Uuid) -> Option<String> {
        self.referenced_assets.get(&id).map(|asset| asset.codename.clone())
    }
}

/// Builds the `ExportContext` for a set of `(itemCodename, languageCodename)`
/// requests (§4.6).
pub async fn build(
    api: Arc<dyn ManagementApi>,
    requests: Vec<(String, String)>,
    progress: &dyn ProgressSink,
) -> Result<ExportContext, MigrateError> {
    let environment = EnvironmentData::load(api.as_ref()).await?;
    let environment = Arc::new(environment);

    let outcomes = process_items(
        requests,
        ProcessItemsOptions::new(1),
        |(item, language): &(String, String)| format!("{item}/{language}"),
        progress,
        CancellationToken::new(),
        {
            let api = Arc::clone(&api);
            let environment = Arc::clone(&environment);
            move |(item_codename, language_codename)| {
                let api = Arc::clone(&api);
                let environment = Arc::clone(&environment);
                async move {
                    prepare_export_item(
                        api.as_ref(),
                        environment.as_ref(),
                        item_codename,
                        language_codename,
                    )
                    .await
                }
            }
        },
    )
    .await?;

    let mut export_items = Vec::new();
    for outcome in outcomes {
        match outcome {
            ProcessOutcome::Valid(item) => export_items.push(item),
            ProcessOutcome::NotFound => {
                tracing::warn!("export item not found in source environment; skipping");
            }
            ProcessOutcome::Cancelled => {}
            ProcessOutcome::Error(err) => {
                tracing::warn!(error = %err, "dropping export item after validation failure");
            }
        }
    }

    let referenced = resolve_reference_closure(api, &environment, &export_items, progress).await?;

    Ok(ExportContext {
        environment: (*environment).clone(),
        export_items,
        referenced_items: referenced.0,
        referenced_assets: referenced.1,
    })
}

async fn prepare_export_item(
    api: &dyn ManagementApi,
    environment: &EnvironmentData,
    item_codename: String,
    language_codename: String,
) -> ProcessOutcome<ExportItem> {
    let content_item = match api.view_content_item(&item_codename).await {
        Ok(item) => item,
        Err(err) if err.is_not_found() => return ProcessOutcome::NotFound,
        Err(err) => return ProcessOutcome::Error(err.into()),
    };

    let latest = match api
        .view_language_variant(&item_codename, &language_codename, false)
        .await
    {
        Ok(variant) => variant,
        Err(err) if err.is_not_found() => return ProcessOutcome::NotFound,
        Err(err) => return ProcessOutcome::Error(err.into()),
    };

    let Some(content_type) = environment.resolve_content_type(&content_item.content_type) else {
        return ProcessOutcome::Error(MigrateError::lookup(format!(
            "item {item_codename} has an unresolvable content type"
        )));
    };
    let Some(collection) = environment.resolve_collection(&content_item.collection) else {
        return ProcessOutcome::Error(MigrateError::lookup(format!(
            "item {item_codename} has an unresolvable collection"
        )));
    };
    let Some(language) = environment.language_by_codename(&language_codename) else {
        return ProcessOutcome::Error(MigrateError::lookup(format!(
            "language {language_codename} does not exist in the source environment"
        )));
    };
    let Some(workflow) = environment.resolve_workflow(&latest.workflow.workflow) else {
        return ProcessOutcome::Error(MigrateError::lookup(format!(
            "item {item_codename} has an unresolvable workflow"
        )));
    };
    let current_step_codename = latest
        .workflow
        .step
        .codename
        .clone()
        .or_else(|| {
            latest
                .workflow
                .step
                .id
                .and_then(|id| workflow::step_by_id(workflow, id))
                .map(|step| step.codename.clone())
        });
    let Some(current_step_codename) = current_step_codename else {
        return ProcessOutcome::Error(MigrateError::lookup(format!(
            "item {item_codename} has an unresolvable workflow step"
        )));
    };
    if workflow::step_by_codename(workflow, &current_step_codename).is_none() {
        return ProcessOutcome::Error(MigrateError::lookup(format!(
            "item {item_codename} is on step {current_step_codename}, unknown to workflow {}",
            workflow.codename
        )));
    }

    let mut versions = vec![latest];
    let is_published = workflow::is_published(workflow, &current_step_codename);
    if !is_published {
        match api
            .view_language_variant(&item_codename, &language_codename, true)
            .await
        {
            Ok(published) => versions.push(published),
            Err(err) if err.is_not_found() => {}
            Err(err) => return ProcessOutcome::Error(err.into()),
        }
    }

    ProcessOutcome::Valid(ExportItem {
        content_item,
        versions,
        content_type: content_type.clone(),
        collection: collection.clone(),
        language: language.clone(),
        workflow: workflow.clone(),
    })
}

async fn resolve_reference_closure(
    api: Arc<dyn ManagementApi>,
    environment: &EnvironmentData,
    export_items: &[ExportItem],
    progress: &dyn ProgressSink,
) -> Result<(HashMap<Uuid, ContentItemWire>, HashMap<Uuid, AssetWire>), MigrateError> {
    let mut refs = ReferencedIds::default();
    for export_item in export_items {
        for version in &export_item.versions {
            refs.merge(extract_from_elements(
                &environment.content_types,
                &export_item.content_type,
                &version.elements,
            ));
        }
    }

    let item_ids: Vec<Uuid> = refs.item_ids.into_iter().collect();
    let item_outcomes = process_items(
        item_ids,
        ProcessItemsOptions::new(5),
        |id: &Uuid| id.to_string(),
        progress,
        CancellationToken::new(),
        {
            let api = Arc::clone(&api);
            move |id| {
                let api = Arc::clone(&api);
                async move {
                    match api.view_content_item(&id.to_string()).await {
                        Ok(item) => ProcessOutcome::Valid((id, item)),
                        Err(err) if err.is_not_found() => ProcessOutcome::NotFound,
                        Err(err) => ProcessOutcome::Error(err.into()),
                    }
                }
            }
        },
    )
    .await?;
    let referenced_items: HashMap<Uuid, ContentItemWire> = item_outcomes
        .into_iter()
        .filter_map(ProcessOutcome::into_valid)
        .collect();

    let asset_ids: Vec<Uuid> = refs.asset_ids.into_iter().collect();
    let asset_outcomes = process_items(
        asset_ids,
        ProcessItemsOptions::new(5),
        |id: &Uuid| id.to_string(),
        progress,
        CancellationToken::new(),
        {
            let api = Arc::clone(&api);
            move |id| {
                let api = Arc::clone(&api);
                async move {
                    match api.view_asset(&id.to_string()).await {
                        Ok(asset) => ProcessOutcome::Valid((id, asset)),
                        Err(err) if err.is_not_found() => ProcessOutcome::NotFound,
                        Err(err) => ProcessOutcome::Error(err.into()),
                    }
                }
            }
        },
    )
    .await?;
    let referenced_assets: HashMap<Uuid, AssetWire> = asset_outcomes
        .into_iter()
        .filter_map(ProcessOutcome::into_valid)
        .collect();

    Ok((referenced_items, referenced_assets))
}

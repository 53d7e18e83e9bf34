use std::io::BufRead as _;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use migrate_api::ManagementApi;
use migrate_api::ReqwestManagementApi;
use migrate_core::ExportManagerOptions;
use migrate_core::MigrationData;
use migrate_core::identity_external_id_generator;

use crate::args::ExportArgs;
use crate::args::ImportArgs;
use crate::args::MigrateArgs;
use crate::progress::TerminalProgressSink;
use crate::snapshot;

const DEFAULT_BASE_URL: &str = "https://manage.kontent.ai/v2/projects/";

fn build_api(environment_id: &str, api_key: &str, base_url: Option<&str>) -> Result<Arc<dyn ManagementApi>> {
    let root = base_url.unwrap_or(DEFAULT_BASE_URL);
    let root = if root.ends_with('/') {
        root.to_string()
    } else {
        format!("{root}/")
    };
    let url = format!("{root}{environment_id}/");
    let base_url = reqwest::Url::parse(&url).with_context(|| format!("invalid management API base URL {url}"))?;

    let http = migrate_api::default_http_client().context("building HTTP client")?;
    Ok(Arc::new(ReqwestManagementApi::new(http, base_url, api_key.to_string())))
}

fn confirm_or_bail(prompt: &str, force: bool) -> Result<()> {
    if force {
        return Ok(());
    }
    eprint!("{prompt} [y/N] ");
    use std::io::Write as _;
    std::io::stderr().flush().ok();

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading confirmation from stdin")?;
    if line.trim().eq_ignore_ascii_case("y") {
        Ok(())
    } else {
        bail!("aborted: pass --force to skip this confirmation");
    }
}

pub async fn run_export(args: ExportArgs) -> Result<()> {
    let api = build_api(&args.source_environment_id, &args.source_api_key, args.base_url.as_deref())?;
    let requests: Vec<(String, String)> = args
        .items
        .iter()
        .map(|codename| (codename.clone(), args.language.clone()))
        .collect();

    let progress = TerminalProgressSink::new("export");
    let data = migrate_core::export(api, requests, ExportManagerOptions::default(), &progress)
        .await
        .context("exporting from source environment")?;

    tracing::info!(items = data.items.len(), assets = data.assets.len(), "export complete");
    snapshot::write_snapshot(args.items_filename, args.assets_filename, data)
        .await
        .context("writing snapshot to disk")
}

pub async fn run_import(args: ImportArgs) -> Result<()> {
    confirm_or_bail(
        &format!(
            "This will write content into target environment {}. Continue?",
            args.target_environment_id
        ),
        args.force,
    )?;

    let api = build_api(&args.target_environment_id, &args.target_api_key, args.base_url.as_deref())?;
    let data = snapshot::read_snapshot(args.items_filename, args.assets_filename)
        .await
        .context("reading snapshot from disk")?;

    run_import_data(api, data, args.fail_on_error).await
}

pub async fn run_migrate(args: MigrateArgs) -> Result<()> {
    confirm_or_bail(
        &format!(
            "This will migrate {} item(s) from {} into {}. Continue?",
            args.items.len(),
            args.source_environment_id,
            args.target_environment_id
        ),
        args.force,
    )?;

    let source_api = build_api(
        &args.source_environment_id,
        &args.source_api_key,
        args.source_base_url.as_deref(),
    )?;
    let requests: Vec<(String, String)> = args
        .items
        .iter()
        .map(|codename| (codename.clone(), args.language.clone()))
        .collect();

    let export_progress = TerminalProgressSink::new("export");
    let data = migrate_core::export(source_api, requests, ExportManagerOptions::default(), &export_progress)
        .await
        .context("exporting from source environment")?;
    tracing::info!(items = data.items.len(), assets = data.assets.len(), "export complete");

    let target_api = build_api(
        &args.target_environment_id,
        &args.target_api_key,
        args.target_base_url.as_deref(),
    )?;
    run_import_data(target_api, data, args.fail_on_error).await
}

async fn run_import_data(api: Arc<dyn ManagementApi>, data: MigrationData, fail_on_error: bool) -> Result<()> {
    let progress = TerminalProgressSink::new("import");
    let summary = migrate_core::import(api, data, identity_external_id_generator(), fail_on_error, &progress)
        .await
        .context("importing into target environment")?;

    tracing::info!(
        succeeded = summary.succeeded,
        not_found = summary.not_found,
        failed = summary.failed,
        cancelled = summary.cancelled,
        "import complete"
    );
    if summary.failed > 0 {
        bail!("{} item(s) failed during import; see logs above", summary.failed);
    }
    Ok(())
}

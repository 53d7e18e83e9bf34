//! Snapshot serialization (out of scope for `migrate-core`, §1): reads and
//! writes the `items.json` document and the `assets.zip` archive that
//! together make up one portable `MigrationData` snapshot.

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use migrate_core::MigrationAsset;
use migrate_core::MigrationData;
use migrate_core::MigrationItem;
use serde::Deserialize;
use serde::Serialize;
use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::FileOptions;

#[derive(Debug, Serialize, Deserialize)]
struct ItemsFile {
    items: Vec<MigrationItem>,
}

/// Per-asset metadata stored in `assets.zip`'s manifest; the binary itself
/// lives at `<codename>.<extension>` alongside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AssetManifestEntry {
    codename: String,
    filename: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    collection: Option<migrate_core::CodenameRef>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    folder: Option<migrate_core::CodenameRef>,
    #[serde(default)]
    descriptions: Vec<migrate_core::AssetDescription>,
}

pub async fn write_snapshot(items_path: PathBuf, assets_path: PathBuf, data: MigrationData) -> Result<()> {
    tokio::task::spawn_blocking(move || write_snapshot_blocking(&items_path, &assets_path, &data))
        .await
        .context("snapshot writer task panicked")?
}

fn write_snapshot_blocking(items_path: &Path, assets_path: &Path, data: &MigrationData) -> Result<()> {
    let items_file = ItemsFile {
        items: data.items.clone(),
    };
    let json = serde_json::to_vec_pretty(&items_file).context("serializing items.json")?;
    std::fs::write(items_path, json)
        .with_context(|| format!("writing {}", items_path.display()))?;

    let zip_file =
        File::create(assets_path).with_context(|| format!("creating {}", assets_path.display()))?;
    let mut writer = ZipWriter::new(zip_file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let manifest: Vec<AssetManifestEntry> = data
        .assets
        .iter()
        .map(|asset| AssetManifestEntry {
            codename: asset.codename.clone(),
            filename: asset.filename.clone(),
            title: asset.title.clone(),
            collection: asset.collection.clone(),
            folder: asset.folder.clone(),
            descriptions: asset.descriptions.clone(),
        })
        .collect();
    writer.start_file("assets.json", options)?;
    writer.write_all(&serde_json::to_vec_pretty(&manifest)?)?;

    for asset in &data.assets {
        let entry_name = binary_entry_name(asset);
        writer.start_file(entry_name, options)?;
        writer.write_all(&asset.binary_data)?;
    }

    writer.finish()?;
    Ok(())
}

pub async fn read_snapshot(items_path: PathBuf, assets_path: PathBuf) -> Result<MigrationData> {
    tokio::task::spawn_blocking(move || read_snapshot_blocking(&items_path, &assets_path))
        .await
        .context("snapshot reader task panicked")?
}

fn read_snapshot_blocking(items_path: &Path, assets_path: &Path) -> Result<MigrationData> {
    let json = std::fs::read(items_path).with_context(|| format!("reading {}", items_path.display()))?;
    let items_file: ItemsFile = serde_json::from_slice(&json).context("parsing items.json")?;

    let zip_file =
        File::open(assets_path).with_context(|| format!("opening {}", assets_path.display()))?;
    let mut archive = ZipArchive::new(zip_file).context("reading assets.zip")?;

    let manifest: Vec<AssetManifestEntry> = {
        let mut manifest_entry = archive.by_name("assets.json").context("assets.zip has no manifest")?;
        let mut buf = String::new();
        manifest_entry.read_to_string(&mut buf)?;
        serde_json::from_str(&buf).context("parsing assets.json manifest")?
    };

    let mut assets = Vec::with_capacity(manifest.len());
    for entry in manifest {
        let binary_entry_name = binary_entry_name_for(&entry.codename, &entry.filename);
        let mut binary_data = Vec::new();
        archive
            .by_name(&binary_entry_name)
            .with_context(|| format!("assets.zip missing binary for {}", entry.codename))?
            .read_to_end(&mut binary_data)?;

        assets.push(MigrationAsset {
            codename: entry.codename,
            filename: entry.filename,
            title: entry.title,
            binary_data,
            collection: entry.collection,
            folder: entry.folder,
            descriptions: entry.descriptions,
        });
    }

    Ok(MigrationData {
        items: items_file.items,
        assets,
    })
}

fn binary_entry_name(asset: &MigrationAsset) -> String {
    binary_entry_name_for(&asset.codename, &asset.filename)
}

fn binary_entry_name_for(codename: &str, filename: &str) -> String {
    let extension = Path::new(filename).extension().and_then(|ext| ext.to_str()).unwrap_or("bin");
    format!("{codename}.{extension}")
}

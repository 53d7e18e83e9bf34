//! Import-direction pipeline stages: target-environment probing (C8),
//! content-item shells (C9), assets (C10), and language variants (C11).

pub mod asset_importer;
pub mod context;
pub mod item_importer;
pub mod variant_importer;

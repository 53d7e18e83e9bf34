//! Element Transform Registry (C3). A closed `ElementKind` enum with one
//! export (wire → migration) and one import (migration → wire) function
//! per variant — a tagged-variant dispatch rather than open polymorphism
//! (§9 design note).

use std::collections::BTreeMap;

use migrate_api::ContentTypeElementWire;
use migrate_api::ElementWire;
use migrate_api::FlattenedContentTypeWire;
use migrate_api::ReferenceWire;
use migrate_api::RichTextValueWire;
use migrate_api::TaxonomyGroupWire;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::error::MigrateError;
use crate::export::context::ExportContext;
use crate::import::context::ImportContext;
use crate::model::CodenameRef;
use crate::model::MigrationComponent;
use crate::model::MigrationElement;
use crate::model::UrlSlugMode;
use crate::richtext;
use crate::richtext::ExportResolver;
use crate::richtext::ImportResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Text,
    Number,
    DateTime,
    RichText,
    Asset,
    Taxonomy,
    ModularContent,
    Custom,
    UrlSlug,
    MultipleChoice,
    Subpages,
}

impl ElementKind {
    fn from_wire_type(value: &str) -> Option<Self> {
        Some(match value {
            "text" => Self::Text,
            "number" => Self::Number,
            "date_time" => Self::DateTime,
            "rich_text" => Self::RichText,
            "asset" => Self::Asset,
            "taxonomy" => Self::Taxonomy,
            "modular_content" => Self::ModularContent,
            "custom" => Self::Custom,
            "url_slug" => Self::UrlSlug,
            "multiple_choice" => Self::MultipleChoice,
            "subpages" => Self::Subpages,
            _ => return None,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DateTimeValueWire {
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    display_timezone: Option<String>,
}

#[derive(Debug, Serialize)]
struct DateTimeValueOut<'a> {
    value: &'a Option<String>,
    display_timezone: &'a Option<String>,
}

#[derive(Debug, Deserialize)]
struct UrlSlugValueWire {
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    mode: Option<String>,
}

fn find_element_def<'a>(
    content_type: &'a FlattenedContentTypeWire,
    reference: &ReferenceWire,
) -> Option<&'a ContentTypeElementWire> {
    if let Some(id) = reference.id {
        if let Some(def) = content_type.elements.iter().find(|e| e.id == id) {
            return Some(def);
        }
    }
    reference
        .codename
        .as_deref()
        .and_then(|codename| content_type.elements.iter().find(|e| e.codename == codename))
}

fn find_content_type_by_ref<'a>(
    content_types: &'a [FlattenedContentTypeWire],
    reference: &ReferenceWire,
) -> Option<&'a FlattenedContentTypeWire> {
    if let Some(id) = reference.id {
        if let Some(ct) = content_types.iter().find(|t| t.id == id) {
            return Some(ct);
        }
    }
    reference
        .codename
        .as_deref()
        .and_then(|codename| content_types.iter().find(|t| t.codename == codename))
}

fn dfs_term_by_id(terms: &[migrate_api::TaxonomyTermWire], id: uuid::Uuid) -> Option<&migrate_api::TaxonomyTermWire> {
    for term in terms {
        if term.id == id {
            return Some(term);
        }
        if let Some(found) = dfs_term_by_id(&term.terms, id) {
            return Some(found);
        }
    }
    None
}

fn dfs_term_by_codename<'a>(
    terms: &'a [migrate_api::TaxonomyTermWire],
    codename: &str,
) -> Option<&'a migrate_api::TaxonomyTermWire> {
    for term in terms {
        if term.codename == codename {
            return Some(term);
        }
        if let Some(found) = dfs_term_by_codename(&term.terms, codename) {
            return Some(found);
        }
    }
    None
}

fn reference_ids(value: &Value) -> Vec<uuid::Uuid> {
    serde_json::from_value::<Vec<ReferenceWire>>(value.clone())
        .map(|refs| refs.into_iter().filter_map(|r| r.id).collect())
        .unwrap_or_default()
}

/// Translates every element of one language variant, export direction
/// (§4.7: "sorting elements by codename and invoking C3 in export
/// direction").
pub fn export_elements(
    content_types: &[FlattenedContentTypeWire],
    content_type: &FlattenedContentTypeWire,
    elements: &[ElementWire],
    ctx: &ExportContext,
    replace_invalid_links: bool,
) -> Result<BTreeMap<String, MigrationElement>, MigrateError> {
    let mut out = BTreeMap::new();
    for element in elements {
        let Some(def) = find_element_def(content_type, &element.element) else {
            continue;
        };
        let migrated = export_element(content_types, content_type, def, element, ctx, replace_invalid_links)?;
        out.insert(def.codename.clone(), migrated);
    }
    Ok(out)
}

fn export_element(
    content_types: &[FlattenedContentTypeWire],
    content_type: &FlattenedContentTypeWire,
    def: &ContentTypeElementWire,
    element: &ElementWire,
    ctx: &ExportContext,
    replace_invalid_links: bool,
) -> Result<MigrationElement, MigrateError> {
    let Some(kind) = ElementKind::from_wire_type(&def.element_type) else {
        return Err(MigrateError::transform(format!(
            "element {} has unknown type {}",
            def.codename, def.element_type
        )));
    };

    Ok(match kind {
        ElementKind::Text => MigrationElement::Text {
            value: element.value.as_str().map(str::to_string),
        },
        ElementKind::Custom => MigrationElement::Custom {
            value: element.value.as_str().map(str::to_string),
        },
        ElementKind::Number => MigrationElement::Number {
            value: element.value.as_f64(),
        },
        ElementKind::DateTime => {
            let parsed: DateTimeValueWire =
                serde_json::from_value(element.value.clone()).map_err(|e| {
                    MigrateError::transform(format!("element {} malformed date_time: {e}", def.codename))
                })?;
            MigrationElement::DateTime {
                value: parsed.value,
                display_timezone: parsed.display_timezone,
            }
        }
        ElementKind::UrlSlug => {
            let parsed: UrlSlugValueWire =
                serde_json::from_value(element.value.clone()).map_err(|e| {
                    MigrateError::transform(format!("element {} malformed url_slug: {e}", def.codename))
                })?;
            let mode = match parsed.mode.as_deref() {
                Some("custom") => UrlSlugMode::Custom,
                _ => UrlSlugMode::Autogenerated,
            };
            MigrationElement::UrlSlug {
                value: parsed.value,
                mode,
            }
        }
        ElementKind::Asset => {
            let mut codenames = Vec::new();
            for id in reference_ids(&element.value) {
                let codename = ctx.asset_codename(id).ok_or_else(|| {
                    MigrateError::lookup(format!(
                        "element {} references unresolvable asset {id}",
                        def.codename
                    ))
                })?;
                codenames.push(CodenameRef::new(codename));
            }
            MigrationElement::Asset { value: codenames }
        }
        ElementKind::ModularContent => {
            let mut codenames = Vec::new();
            for id in reference_ids(&element.value) {
                if let Some(codename) = ctx.item_codename(id) {
                    codenames.push(CodenameRef::new(codename));
                }
                // missing ids are silently dropped (lenient, §4.3)
            }
            MigrationElement::ModularContent { value: codenames }
        }
        ElementKind::Subpages => {
            let mut codenames = Vec::new();
            for id in reference_ids(&element.value) {
                let Some(codename) = ctx.item_codename(id) else {
                    return Err(MigrateError::transform(format!(
                        "element {} references unresolvable subpage id {id}",
                        def.codename
                    )));
                };
                codenames.push(CodenameRef::new(codename));
            }
            MigrationElement::Subpages { value: codenames }
        }
        ElementKind::Taxonomy => {
            let group = def
                .taxonomy_group
                .as_ref()
                .and_then(|reference| resolve_taxonomy_group(&ctx.environment.taxonomies, reference))
                .ok_or_else(|| {
                    MigrateError::lookup(format!(
                        "element {} has no resolvable taxonomy group",
                        def.codename
                    ))
                })?;
            let mut codenames = Vec::new();
            for id in reference_ids(&element.value) {
                let term = dfs_term_by_id(&group.terms, id).ok_or_else(|| {
                    MigrateError::lookup(format!(
                        "element {} references unresolvable taxonomy term {id}",
                        def.codename
                    ))
                })?;
                codenames.push(CodenameRef::new(term.codename.clone()));
            }
            MigrationElement::Taxonomy { value: codenames }
        }
        ElementKind::MultipleChoice => {
            let mut codenames = Vec::new();
            for id in reference_ids(&element.value) {
                let option = def.options.iter().find(|o| o.id == id).ok_or_else(|| {
                    MigrateError::lookup(format!(
                        "element {} references unresolvable choice option {id}",
                        def.codename
                    ))
                })?;
                codenames.push(CodenameRef::new(option.codename.clone()));
            }
            MigrationElement::MultipleChoice { value: codenames }
        }
        ElementKind::RichText => {
            let parsed: RichTextValueWire = serde_json::from_value(element.value.clone())
                .map_err(|e| MigrateError::transform(format!("element {} malformed rich_text: {e}", def.codename)))?;

            let exported = richtext::export_html(&parsed.value, &parsed.components, ctx, replace_invalid_links);

            let mut components = Vec::with_capacity(exported.components.len());
            for raw in exported.components {
                let component_elements = match find_content_type_by_ref(content_types, &raw.component_type) {
                    Some(component_type) => export_elements(
                        content_types,
                        component_type,
                        &raw.elements,
                        ctx,
                        replace_invalid_links,
                    )?,
                    None => BTreeMap::new(),
                };
                components.push(MigrationComponent {
                    id: raw.id,
                    elements: component_elements,
                });
            }

            MigrationElement::RichText {
                value: exported.html,
                components,
            }
        }
    })
}

fn resolve_taxonomy_group<'a>(
    taxonomies: &'a [TaxonomyGroupWire],
    reference: &ReferenceWire,
) -> Option<&'a TaxonomyGroupWire> {
    if let Some(id) = reference.id {
        if let Some(group) = taxonomies.iter().find(|g| g.id == id) {
            return Some(group);
        }
    }
    reference
        .codename
        .as_deref()
        .and_then(|codename| taxonomies.iter().find(|g| g.codename == codename))
}

/// Translates every element back into wire form, import direction.
/// `target_content_type` is the content type resolved in the *target*
/// environment by codename (content models are assumed equal, §1
/// Non-goals, but element/taxonomy/option ids differ per environment).
pub fn import_elements(
    target_content_types: &[FlattenedContentTypeWire],
    target_content_type: &FlattenedContentTypeWire,
    elements: &BTreeMap<String, MigrationElement>,
    ctx: &ImportContext,
) -> Result<Vec<ElementWire>, MigrateError> {
    let mut out = Vec::with_capacity(elements.len());
    for (codename, element) in elements {
        let def = find_element_def(target_content_type, &ReferenceWire::by_codename(codename.clone()));
        let value = import_element(target_content_types, def, codename, element, ctx)?;
        out.push(ElementWire {
            element: ReferenceWire::by_codename(codename.clone()),
            value,
        });
    }
    Ok(out)
}

fn import_element(
    target_content_types: &[FlattenedContentTypeWire],
    def: Option<&ContentTypeElementWire>,
    codename: &str,
    element: &MigrationElement,
    ctx: &ImportContext,
) -> Result<Value, MigrateError> {
    Ok(match element {
        MigrationElement::Text { value } | MigrationElement::Custom { value } => json!(value),
        MigrationElement::Number { value } => json!(value),
        MigrationElement::DateTime {
            value,
            display_timezone,
        } => serde_json::to_value(DateTimeValueOut {
            value,
            display_timezone,
        })
        .map_err(|e| MigrateError::transform(e.to_string()))?,
        MigrationElement::UrlSlug { value, mode } => {
            let mode_str = match mode {
                UrlSlugMode::Autogenerated => "autogenerated",
                UrlSlugMode::Custom => "custom",
            };
            json!({
                "value": value,
                "mode": mode_str,
            })
        }
        MigrationElement::Asset { value } => {
            let mut refs = Vec::with_capacity(value.len());
            for codename_ref in value {
                match ctx.resolved_asset_id(&codename_ref.codename)? {
                    Some(id) => refs.push(ReferenceWire::by_id(id)),
                    None => tracing::warn!(
                        codename = codename_ref.codename,
                        "target asset missing; dropping reference"
                    ),
                }
            }
            json!(refs)
        }
        MigrationElement::ModularContent { value } => {
            let mut refs = Vec::with_capacity(value.len());
            for codename_ref in value {
                match ctx.resolved_item_id(&codename_ref.codename)? {
                    Some(id) => refs.push(ReferenceWire::by_id(id)),
                    None => tracing::warn!(
                        codename = codename_ref.codename,
                        element = codename,
                        "target item missing; dropping reference"
                    ),
                }
            }
            json!(refs)
        }
        MigrationElement::Subpages { value } => {
            let mut refs = Vec::with_capacity(value.len());
            for codename_ref in value {
                let id = ctx.resolved_item_id(&codename_ref.codename)?.ok_or_else(|| {
                    MigrateError::transform(format!(
                        "element {codename} references unresolved target item {}",
                        codename_ref.codename
                    ))
                })?;
                refs.push(ReferenceWire::by_id(id));
            }
            json!(refs)
        }
        MigrationElement::Taxonomy { value } => {
            let group = def.and_then(|d| d.taxonomy_group.as_ref()).and_then(|reference| {
                resolve_taxonomy_group(&ctx.environment.taxonomies, reference)
            });
            let mut refs = Vec::with_capacity(value.len());
            for codename_ref in value {
                let id = match group {
                    Some(group) => dfs_term_by_codename(&group.terms, &codename_ref.codename).map(|t| t.id),
                    None => ctx
                        .environment
                        .taxonomies
                        .iter()
                        .find_map(|g| dfs_term_by_codename(&g.terms, &codename_ref.codename))
                        .map(|t| t.id),
                };
                let id = id.ok_or_else(|| {
                    MigrateError::lookup(format!(
                        "element {codename} references unresolvable taxonomy term {}",
                        codename_ref.codename
                    ))
                })?;
                refs.push(ReferenceWire::by_id(id));
            }
            json!(refs)
        }
        MigrationElement::MultipleChoice { value } => {
            let mut refs = Vec::with_capacity(value.len());
            for codename_ref in value {
                let option = def.and_then(|d| d.options.iter().find(|o| o.codename == codename_ref.codename));
                let id = option.map(|o| o.id).ok_or_else(|| {
                    MigrateError::lookup(format!(
                        "element {codename} references unresolvable choice option {}",
                        codename_ref.codename
                    ))
                })?;
                refs.push(ReferenceWire::by_id(id));
            }
            json!(refs)
        }
        MigrationElement::RichText { value, components } => {
            let mut wire_components = Vec::with_capacity(components.len());
            for component in components {
                let component_codename = component.id.to_string();
                let component_elements = import_elements_generic(target_content_types, &component.elements, ctx)?;
                wire_components.push(migrate_api::RichTextComponentWire {
                    id: component.id,
                    codename: component_codename,
                    component_type: ReferenceWire::default(),
                    elements: component_elements,
                });
            }
            let html = richtext::import_html(value, ctx);
            serde_json::to_value(RichTextValueWire {
                value: html,
                components: wire_components,
            })
            .map_err(|e| MigrateError::transform(e.to_string()))?
        }
    })
}

/// Imports a component's nested elements without a known target content
/// type (the migration data model doesn't carry a component's own type,
/// §3) — falls back to a codename-only lookup across every target content
/// type's element definitions.
fn import_elements_generic(
    target_content_types: &[FlattenedContentTypeWire],
    elements: &BTreeMap<String, MigrationElement>,
    ctx: &ImportContext,
) -> Result<Vec<ElementWire>, MigrateError> {
    let mut out = Vec::with_capacity(elements.len());
    for (codename, element) in elements {
        let def = target_content_types
            .iter()
            .find_map(|ct| ct.elements.iter().find(|e| &e.codename == codename));
        let value = import_element(target_content_types, def, codename, element, ctx)?;
        out.push(ElementWire {
            element: ReferenceWire::by_codename(codename.clone()),
            value,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_kind_round_trips_known_wire_types() {
        for (wire, expected) in [
            ("text", ElementKind::Text),
            ("number", ElementKind::Number),
            ("date_time", ElementKind::DateTime),
            ("rich_text", ElementKind::RichText),
            ("asset", ElementKind::Asset),
            ("taxonomy", ElementKind::Taxonomy),
            ("modular_content", ElementKind::ModularContent),
            ("custom", ElementKind::Custom),
            ("url_slug", ElementKind::UrlSlug),
            ("multiple_choice", ElementKind::MultipleChoice),
            ("subpages", ElementKind::Subpages),
        ] {
            assert_eq!(ElementKind::from_wire_type(wire), Some(expected));
        }
        assert_eq!(ElementKind::from_wire_type("unknown"), None);
    }
}

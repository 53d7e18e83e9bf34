//! Reference Extractor (C5). Walks a set of wire elements, still in
//! id-addressed form, and produces the closure of every item id and
//! asset id they reference — this seeds C6's fetch of referenced data
//! before any element is translated into migration form.

use std::collections::HashSet;

use migrate_api::ContentTypeElementWire;
use migrate_api::ElementWire;
use migrate_api::FlattenedContentTypeWire;
use migrate_api::ReferenceWire;
use migrate_api::RichTextValueWire;
use uuid::Uuid;

use crate::richtext;

#[derive(Debug, Default, Clone)]
pub struct ReferencedIds {
    pub item_ids: HashSet<Uuid>,
    pub asset_ids: HashSet<Uuid>,
}

impl ReferencedIds {
    pub fn merge(&mut self, other: ReferencedIds) {
        self.item_ids.extend(other.item_ids);
        self.asset_ids.extend(other.asset_ids);
    }
}

/// `content_types` is the flattened content model for the whole
/// environment, used to resolve each `rich_text` component's own type so
/// its nested elements can be walked too.
pub fn extract_from_elements(
    content_types: &[FlattenedContentTypeWire],
    content_type: &FlattenedContentTypeWire,
    elements: &[ElementWire],
) -> ReferencedIds {
    let mut refs = ReferencedIds::default();
    for element in elements {
        let Some(def) = find_element_def(content_type, &element.element) else {
            continue;
        };
        extract_from_element(content_types, def, element, &mut refs);
    }
    refs
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
    if let Some(codename) = &reference.codename {
        return content_type.elements.iter().find(|e| &e.codename == codename);
    }
    None
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
    if let Some(codename) = &reference.codename {
        return content_types.iter().find(|t| &t.codename == codename);
    }
    None
}

fn extract_from_element(
    content_types: &[FlattenedContentTypeWire],
    def: &ContentTypeElementWire,
    element: &ElementWire,
    refs: &mut ReferencedIds,
) {
    match def.element_type.as_str() {
        "asset" => collect_reference_ids(&element.value, &mut refs.asset_ids),
        "modular_content" | "subpages" => {
            collect_reference_ids(&element.value, &mut refs.item_ids)
        }
        "rich_text" => {
            let Ok(rich_text) = serde_json::from_value::<RichTextValueWire>(element.value.clone())
            else {
                return;
            };
            let (item_ids, asset_ids) =
                richtext::scan_referenced_ids(&rich_text.value, &rich_text.components);
            refs.item_ids.extend(item_ids);
            refs.asset_ids.extend(asset_ids);

            for component in &rich_text.components {
                if let Some(component_type) =
                    find_content_type_by_ref(content_types, &component.component_type)
                {
                    refs.merge(extract_from_elements(
                        content_types,
                        component_type,
                        &component.elements,
                    ));
                }
            }
        }
        // taxonomy / multiple_choice reference taxonomy terms / content-type
        // options, both already loaded with the environment data — no
        // remote fetch closure needed for them.
        _ => {}
    }
}

fn collect_reference_ids(value: &serde_json::Value, out: &mut HashSet<Uuid>) {
    if let Ok(refs) = serde_json::from_value::<Vec<ReferenceWire>>(value.clone()) {
        out.extend(refs.into_iter().filter_map(|r| r.id));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn content_type_with(element_type: &str) -> FlattenedContentTypeWire {
        FlattenedContentTypeWire {
            id: Uuid::from_u128(1),
            codename: "page".to_string(),
            name: "Page".to_string(),
            elements: vec![ContentTypeElementWire {
                id: Uuid::from_u128(2),
                codename: "field".to_string(),
                element_type: element_type.to_string(),
                taxonomy_group: None,
                options: vec![],
            }],
        }
    }

    #[test]
    fn collects_asset_ids() {
        let content_type = content_type_with("asset");
        let asset_id = Uuid::from_u128(42);
        let elements = vec![ElementWire {
            element: ReferenceWire::by_id(Uuid::from_u128(2)),
            value: json!([{"id": asset_id}]),
        }];
        let refs = extract_from_elements(&[content_type.clone()], &content_type, &elements);
        assert_eq!(refs.asset_ids, HashSet::from([asset_id]));
        assert!(refs.item_ids.is_empty());
    }

    #[test]
    fn collects_modular_content_item_ids() {
        let content_type = content_type_with("modular_content");
        let item_id = Uuid::from_u128(7);
        let elements = vec![ElementWire {
            element: ReferenceWire::by_id(Uuid::from_u128(2)),
            value: json!([{"id": item_id}]),
        }];
        let refs = extract_from_elements(&[content_type.clone()], &content_type, &elements);
        assert_eq!(refs.item_ids, HashSet::from([item_id]));
    }

    #[test]
    fn ignores_taxonomy_ids_since_no_remote_fetch_is_needed() {
        let content_type = content_type_with("taxonomy");
        let elements = vec![ElementWire {
            element: ReferenceWire::by_id(Uuid::from_u128(2)),
            value: json!([{"id": Uuid::from_u128(9)}]),
        }];
        let refs = extract_from_elements(&[content_type.clone()], &content_type, &elements);
        assert!(refs.item_ids.is_empty() && refs.asset_ids.is_empty());
    }
}

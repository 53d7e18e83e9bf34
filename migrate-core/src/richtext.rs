//! Rich-Text Processor (C4). Operates purely at the attribute-string
//! level (§9 design note: no full HTML parser, because the platform's
//! serialized rich text is a constrained subset). Every rewrite here is a
//! `regex` replacement over a narrowly delimited attribute pattern.

use std::sync::OnceLock;

use migrate_api::ReferenceWire;
use migrate_api::RichTextComponentWire;
use regex::Captures;
use regex::Regex;
use uuid::Uuid;

use crate::model::component_id_for_codename;

/// A raw inline component lifted out of a rich-text value during export,
/// before its elements have been translated by the element registry.
#[derive(Debug, Clone)]
pub struct RawComponent {
    pub id: Uuid,
    pub component_type: ReferenceWire,
    pub elements: Vec<migrate_api::ElementWire>,
}

/// Resolves ids to codenames (export direction).
pub trait ExportResolver {
    fn item_codename(&self, id: Uuid) -> Option<String>;
    fn asset_codename(&self, id: Uuid) -> Option<String>;
}

/// Resolves codenames to ids (import direction).
pub trait ImportResolver {
    fn item_id(&self, codename: &str) -> Option<Uuid>;
    fn asset_id(&self, codename: &str) -> Option<Uuid>;
}

#[derive(Debug, Default)]
pub struct ExportedRichText {
    pub html: String,
    pub components: Vec<RawComponent>,
}

/// Compiles a pattern that is fixed at the call site and covered by this
/// module's tests; a failure here means the literal itself is broken, not
/// a runtime condition, so it is not surfaced as a `Result`.
fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(err) => unreachable!("static regex pattern {pattern:?} is invalid: {err}"),
    }
}

fn anchor_item_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r#"(?s)<a\b([^>]*?)\bdata-item-id="([0-9a-fA-F-]+)"([^>]*?)>(.*?)</a>"#))
}

fn object_item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        compile(r#"<object\b([^>]*?)\bdata-type="item"([^>]*?)\bdata-codename="([^"]+)"([^>]*?)/?>(\s*</object>)?"#)
    })
}

fn object_component_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        compile(r#"<object\b([^>]*?)\bdata-type="component"([^>]*?)\bdata-id="([0-9a-fA-F-]+)"([^>]*?)/?>(\s*</object>)?"#)
    })
}

fn link_asset_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r#"data-asset-id="([0-9a-fA-F-]+)""#))
}

fn link_asset_codename_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r#"data-manager-asset-codename="([^"]+)""#))
}

fn link_item_codename_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r#"data-manager-link-codename="([^"]+)""#))
}

fn target_blank_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r#"\s*target="_blank""#))
}

fn rel_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r#"\s*rel="[^"]*""#))
}

fn empty_href_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r#"\s*href=""\s*"#))
}

fn img_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r#"(?s)<img\b[^>]*>"#))
}

fn data_image_id_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r#"\s*data-image-id="[^"]*""#))
}

/// Every `data-item-id`/`data-asset-id` occurrence referenced from this
/// HTML, plus (recursively) every occurrence inside embedded components —
/// seeds C5's reference closure before any rewriting happens.
pub fn scan_referenced_ids(
    html: &str,
    rt_components: &[RichTextComponentWire],
) -> (std::collections::HashSet<Uuid>, std::collections::HashSet<Uuid>) {
    let mut item_ids = std::collections::HashSet::new();
    let mut asset_ids = std::collections::HashSet::new();

    for captures in anchor_item_link_regex().captures_iter(html) {
        if let Ok(id) = Uuid::parse_str(&captures[2]) {
            item_ids.insert(id);
        }
    }
    for captures in link_asset_attr_regex().captures_iter(html) {
        if let Ok(id) = Uuid::parse_str(&captures[1]) {
            asset_ids.insert(id);
        }
    }
    // Plain `<object data-type="item">` references carry an already
    // resolved codename in the wire form (§4.4), so they contribute no id
    // to the closure; only nested components' own elements might.
    for component in rt_components {
        for element in &component.elements {
            if let Ok(nested) =
                serde_json::from_value::<migrate_api::RichTextValueWire>(element.value.clone())
            {
                let (nested_items, nested_assets) =
                    scan_referenced_ids(&nested.value, &nested.components);
                item_ids.extend(nested_items);
                asset_ids.extend(nested_assets);
            }
        }
    }

    (item_ids, asset_ids)
}

/// Export pass: id-addressed source HTML → codename-addressed snapshot
/// HTML, lifting inline components out as `RawComponent`s.
pub fn export_html(
    html: &str,
    rt_components: &[RichTextComponentWire],
    resolver: &dyn ExportResolver,
    replace_invalid_links: bool,
) -> ExportedRichText {
    let mut components = Vec::new();

    let rewritten = anchor_item_link_regex().replace_all(html, |caps: &Captures| {
        let before = &caps[1];
        let after = &caps[3];
        let inner = &caps[4];
        let Ok(id) = Uuid::parse_str(&caps[2]) else {
            return caps[0].to_string();
        };
        match resolver.item_codename(id) {
            Some(codename) => {
                format!(r#"<a{before}data-manager-link-codename="{codename}"{after}>{inner}</a>"#)
            }
            None if replace_invalid_links => inner.to_string(),
            None => {
                tracing::warn!(item_id = %id, "rich text references an unresolved item; leaving tag untouched");
                caps[0].to_string()
            }
        }
    });

    let rewritten = object_item_regex().replace_all(&rewritten, |caps: &Captures| {
        let whole = &caps[0];
        let codename = &caps[3];
        let is_component = whole.contains(r#"data-rel="component""#);
        if !is_component {
            return whole.to_string();
        }
        let Some(component) = rt_components.iter().find(|c| c.codename == *codename) else {
            tracing::warn!(codename, "rich text component not present in component list");
            return whole.to_string();
        };
        let component_id = component_id_for_codename(&component.codename);
        components.push(RawComponent {
            id: component_id,
            component_type: component.component_type.clone(),
            elements: component.elements.clone(),
        });
        format!(
            r#"<object type="application/kenticocloud" data-type="component" data-rel="component" data-id="{component_id}"></object>"#
        )
    });

    let rewritten = link_asset_attr_regex().replace_all(&rewritten, |caps: &Captures| {
        let Ok(id) = Uuid::parse_str(&caps[1]) else {
            return caps[0].to_string();
        };
        match resolver.asset_codename(id) {
            Some(codename) => format!(r#"data-manager-asset-codename="{codename}""#),
            None => {
                tracing::warn!(asset_id = %id, "rich text references an unresolved asset; leaving tag untouched");
                caps[0].to_string()
            }
        }
    });

    ExportedRichText {
        html: rewritten.into_owned(),
        components,
    }
}

/// Import pass: codename-addressed snapshot HTML → id-addressed target
/// HTML, re-embedding components and normalizing link attributes the
/// platform only accepts in their rendered (not authored) form.
pub fn import_html(html: &str, resolver: &dyn ImportResolver) -> String {
    let rewritten = link_item_codename_attr_regex().replace_all(html, |caps: &Captures| {
        let codename = &caps[1];
        match resolver.item_id(codename) {
            Some(id) => format!(r#"data-item-id="{id}""#),
            None => {
                tracing::warn!(codename, "target has no item for rich text link; dropping attribute");
                String::new()
            }
        }
    });

    let rewritten = link_asset_codename_attr_regex().replace_all(&rewritten, |caps: &Captures| {
        let codename = &caps[1];
        match resolver.asset_id(codename) {
            Some(id) => format!(r#"data-asset-id="{id}""#),
            None => {
                tracing::warn!(codename, "target has no asset for rich text link; dropping attribute");
                String::new()
            }
        }
    });

    let rewritten = object_component_regex().replace_all(&rewritten, |caps: &Captures| {
        let before = &caps[1];
        let after = &caps[2];
        let id = &caps[3];
        format!(
            r#"<object{before}data-type="item"{after}data-codename="{id}" data-rel="component"></object>"#
        )
    });

    let rewritten = target_blank_regex().replace_all(&rewritten, r#" data-new-window="true""#);
    let rewritten = rel_attr_regex().replace_all(&rewritten, "");
    let rewritten = empty_href_regex().replace_all(&rewritten, " ");
    let rewritten = img_tag_regex().replace_all(&rewritten, "");
    let rewritten = data_image_id_attr_regex().replace_all(&rewritten, "");

    rewritten.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeExportResolver;
    impl ExportResolver for FakeExportResolver {
        fn item_codename(&self, id: Uuid) -> Option<String> {
            if id == Uuid::parse_str("8fb31f41-0000-0000-0000-000000000001").ok()? {
                Some("faq".to_string())
            } else {
                None
            }
        }
        fn asset_codename(&self, _id: Uuid) -> Option<String> {
            None
        }
    }

    struct FakeImportResolver {
        target_faq_id: Uuid,
    }
    impl ImportResolver for FakeImportResolver {
        fn item_id(&self, codename: &str) -> Option<Uuid> {
            (codename == "faq").then_some(self.target_faq_id)
        }
        fn asset_id(&self, _codename: &str) -> Option<Uuid> {
            None
        }
    }

    #[test]
    fn export_rewrites_item_link_to_codename() {
        let html = r#"<a data-item-id="8fb31f41-0000-0000-0000-000000000001">X</a>"#;
        let exported = export_html(html, &[], &FakeExportResolver, false);
        assert_eq!(
            exported.html,
            r#"<a data-manager-link-codename="faq">X</a>"#
        );
    }

    #[test]
    fn export_strips_unresolved_link_when_replace_invalid_enabled() {
        let html = r#"<a data-item-id="00000000-0000-0000-0000-000000000099">gone</a>"#;
        let exported = export_html(html, &[], &FakeExportResolver, true);
        assert_eq!(exported.html, "gone");
    }

    #[test]
    fn export_leaves_unresolved_link_untouched_without_replace() {
        let html = r#"<a data-item-id="00000000-0000-0000-0000-000000000099">gone</a>"#;
        let exported = export_html(html, &[], &FakeExportResolver, false);
        assert_eq!(exported.html, html);
    }

    #[test]
    fn import_reverses_link_rewrite() {
        let target_id = Uuid::parse_str("11111111-1111-1111-1111-111111111111").expect("uuid");
        let html = r#"<a data-manager-link-codename="faq">X</a>"#;
        let resolver = FakeImportResolver { target_faq_id: target_id };
        let imported = import_html(html, &resolver);
        assert_eq!(imported, format!(r#"<a data-item-id="{target_id}">X</a>"#));
    }

    #[test]
    fn import_normalizes_target_blank_and_strips_rel() {
        let html = r#"<a href="https://example.com" target="_blank" rel="noopener">hi</a>"#;
        let resolver = FakeImportResolver { target_faq_id: Uuid::nil() };
        let imported = import_html(html, &resolver);
        assert_eq!(
            imported,
            r#"<a href="https://example.com" data-new-window="true">hi</a>"#
        );
    }

    #[test]
    fn import_removes_img_tags_and_image_id_attrs() {
        let html = r#"<p><img src="x.png" data-image-id="abc">text</p>"#;
        let resolver = FakeImportResolver { target_faq_id: Uuid::nil() };
        let imported = import_html(html, &resolver);
        assert_eq!(imported, "<p>text</p>");
    }
}

//! Import-pipeline adapter for the hierarchy builder.
//!
//! Validates that the refinery is bound to the collection-children import
//! target, pulls the `<dsc>` fragment out of the source document, and hands
//! it to [`HierarchyMapper`].

use serde::Serialize;
use tracing::{debug, error, instrument, warn};

use eadhier_markup::{DSC_PATH, MarkupDocument, MarkupReader, wrap_fragment};
use eadhier_shared::{
    DEFAULT_DESTINATION, EadHierError, LevelConfig, OutputRecord, ROOT_ENTITY_TABLE, RefineOutput,
    Result,
};

use crate::hierarchy::HierarchyMapper;

/// Name the refinery is registered under.
pub const REFINERY_NAME: &str = "EADCollectionHierarchyBuilder";

/// Setting key holding the per-level mappings.
pub const LEVELS_SETTING: &str = "EADCollectionHierarchyBuilder_levels";

// ---------------------------------------------------------------------------
// Registration metadata
// ---------------------------------------------------------------------------

/// Static description of the refinery for the host's registry.
#[derive(Debug, Clone, Serialize)]
pub struct RefineryInfo {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub returns_multiple_values: bool,
    pub supports_relationships: bool,
}

/// Availability report shown by the host.
#[derive(Debug, Clone, Serialize)]
pub struct RefineryStatus {
    pub description: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatType {
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayType {
    Field,
}

/// One entry of the settings schema consumed by the host's configuration UI.
#[derive(Debug, Clone, Serialize)]
pub struct SettingDescriptor {
    pub key: &'static str,
    pub format_type: FormatType,
    pub display_type: DisplayType,
    pub width: u32,
    pub height: u32,
    pub takes_locale: bool,
    pub default: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

// ---------------------------------------------------------------------------
// Invocation context
// ---------------------------------------------------------------------------

/// Everything the host supplies for one refinery invocation.
#[derive(Clone, Copy)]
pub struct RefineContext<'r> {
    /// Destination element the refinery is attached to.
    pub destination: &'r str,
    /// Entity table of the bound import mapping, when there is one.
    pub bound_table: Option<&'r str>,
    pub reader: Option<&'r dyn MarkupReader>,
    pub levels: Option<&'r LevelConfig>,
}

impl<'r> RefineContext<'r> {
    pub fn new(destination: &'r str) -> Self {
        Self {
            destination,
            bound_table: None,
            reader: None,
            levels: None,
        }
    }

    pub fn bound_to(mut self, table: &'r str) -> Self {
        self.bound_table = Some(table);
        self
    }

    pub fn with_reader(mut self, reader: &'r dyn MarkupReader) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn with_levels(mut self, levels: &'r LevelConfig) -> Self {
        self.levels = Some(levels);
        self
    }
}

/// Check the invocation targets `ca_collections._children` of a collection import.
pub fn validate_context(ctx: &RefineContext<'_>) -> Result<()> {
    if let Some(table) = ctx.bound_table {
        if table != ROOT_ENTITY_TABLE {
            return Err(EadHierError::context(format!(
                "{REFINERY_NAME} refinery may only be used in imports to {ROOT_ENTITY_TABLE} (bound to {table})"
            )));
        }
    }
    if ctx.destination != DEFAULT_DESTINATION {
        return Err(EadHierError::context(format!(
            "target element for {REFINERY_NAME} must be {DEFAULT_DESTINATION} (got {})",
            ctx.destination
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Refinery
// ---------------------------------------------------------------------------

/// Builds a collection hierarchy from an EAD `<dsc>` block.
#[derive(Debug, Clone, Copy, Default)]
pub struct EadHierarchyRefinery;

impl EadHierarchyRefinery {
    pub fn info(&self) -> RefineryInfo {
        RefineryInfo {
            name: REFINERY_NAME,
            title: "EAD Collection hierarchy builder",
            description: "Builds a collection hierarchy from an EAD <dsc> block.",
            returns_multiple_values: true,
            supports_relationships: true,
        }
    }

    /// Always available: the refinery has no external requirements.
    pub fn check_status(&self) -> RefineryStatus {
        RefineryStatus {
            description: self.info().description.to_string(),
            errors: Vec::new(),
            warnings: Vec::new(),
            available: true,
        }
    }

    pub fn settings_schema(&self) -> Vec<SettingDescriptor> {
        vec![SettingDescriptor {
            key: LEVELS_SETTING,
            format_type: FormatType::Text,
            display_type: DisplayType::Field,
            width: 10,
            height: 1,
            takes_locale: false,
            default: "",
            label: "Level mappings",
            description: "Mappings for each level in the hierarchy",
        }]
    }

    /// Map the source's `<dsc>` block into `{ children: [...] }`.
    ///
    /// Returns `None` (after logging) when invoked for the wrong target.
    /// Missing input is not an error and yields an empty `children` list.
    #[instrument(skip_all, fields(destination = ctx.destination))]
    pub fn refine(&self, ctx: &RefineContext<'_>) -> Option<RefineOutput> {
        if let Err(e) = validate_context(ctx) {
            error!(error = %e, "refinery invoked outside its import target");
            return None;
        }

        Some(RefineOutput {
            children: build_children(ctx),
        })
    }
}

fn build_children(ctx: &RefineContext<'_>) -> Vec<OutputRecord> {
    let (Some(reader), Some(levels)) = (ctx.reader, ctx.levels) else {
        debug!(
            has_reader = ctx.reader.is_some(),
            has_levels = ctx.levels.is_some(),
            "nothing to map"
        );
        return Vec::new();
    };

    let Some((fragment, namespaces)) = reader
        .fragment(DSC_PATH)
        .filter(|(markup, _)| !markup.trim().is_empty())
    else {
        debug!(path = DSC_PATH, "no component list in source");
        return Vec::new();
    };

    let wrapped = wrap_fragment(&fragment, &namespaces);
    let doc = match MarkupDocument::parse(&wrapped) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(error = %e, "component list is not well-formed, skipping");
            return Vec::new();
        }
    };

    HierarchyMapper::new(levels).map_forest(doc.root())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eadhier_markup::EadReader;
    use eadhier_shared::{LevelMapping, load_levels_from};
    use serde_json::json;
    use std::path::Path;

    const EAD: &str = r#"<ead><archdesc level="collection"><dsc>
        <c01 level="series"><unittitle>Series 1</unittitle>
            <c02 level="file"><unittitle>File A</unittitle></c02>
        </c01>
    </dsc></archdesc></ead>"#;

    fn levels() -> LevelConfig {
        let entry = |type_: &str| LevelMapping {
            table: "collections".into(),
            type_: type_.into(),
            preferred_label: Some("^/unittitle".into()),
            attributes: Default::default(),
        };
        LevelConfig::from([
            ("series".to_string(), entry("series")),
            ("file".to_string(), entry("file")),
        ])
    }

    #[test]
    fn refines_dsc_into_children() {
        let reader = EadReader::new(EAD);
        let levels = levels();
        let ctx = RefineContext::new(DEFAULT_DESTINATION)
            .with_reader(&reader)
            .with_levels(&levels);

        let out = EadHierarchyRefinery.refine(&ctx).expect("valid context");
        assert_eq!(
            serde_json::to_value(&out).expect("serialize"),
            json!({
                "children": [{
                    "table": "collections",
                    "type": "series",
                    "preferred_labels": { "name": "Series 1" },
                    "children": [{
                        "table": "collections",
                        "type": "file",
                        "preferred_labels": { "name": "File A" },
                        "children": []
                    }]
                }]
            })
        );
    }

    #[test]
    fn wrong_destination_is_rejected() {
        let reader = EadReader::new(EAD);
        let levels = levels();
        let ctx = RefineContext::new("ca_collections.preferred_labels")
            .with_reader(&reader)
            .with_levels(&levels);
        assert!(EadHierarchyRefinery.refine(&ctx).is_none());
        assert!(matches!(
            validate_context(&ctx),
            Err(EadHierError::Context { .. })
        ));
    }

    #[test]
    fn wrong_bound_table_is_rejected() {
        let ctx = RefineContext::new(DEFAULT_DESTINATION).bound_to("ca_objects");
        let err = validate_context(&ctx).unwrap_err();
        assert!(err.to_string().contains("ca_objects"));
        assert!(EadHierarchyRefinery.refine(&ctx).is_none());

        let ctx = RefineContext::new(DEFAULT_DESTINATION).bound_to(ROOT_ENTITY_TABLE);
        assert!(validate_context(&ctx).is_ok());
    }

    #[test]
    fn missing_input_yields_empty_children() {
        let levels = levels();
        let reader = EadReader::new(EAD);

        let no_reader = RefineContext::new(DEFAULT_DESTINATION).with_levels(&levels);
        assert_eq!(EadHierarchyRefinery.refine(&no_reader), Some(RefineOutput::default()));

        let no_levels = RefineContext::new(DEFAULT_DESTINATION).with_reader(&reader);
        assert_eq!(EadHierarchyRefinery.refine(&no_levels), Some(RefineOutput::default()));

        let no_dsc = EadReader::new("<ead><archdesc level=\"collection\"/></ead>");
        let ctx = RefineContext::new(DEFAULT_DESTINATION)
            .with_reader(&no_dsc)
            .with_levels(&levels);
        let out = EadHierarchyRefinery.refine(&ctx).expect("valid context");
        assert_eq!(serde_json::to_value(&out).expect("serialize"), json!({ "children": [] }));

        let empty_dsc = EadReader::new("<ead><archdesc><dsc>  </dsc></archdesc></ead>");
        let ctx = RefineContext::new(DEFAULT_DESTINATION)
            .with_reader(&empty_dsc)
            .with_levels(&levels);
        assert_eq!(EadHierarchyRefinery.refine(&ctx), Some(RefineOutput::default()));
    }

    /// Reader that hands back a fixed fragment for every path.
    struct FixedReader(&'static str);

    impl MarkupReader for FixedReader {
        fn get(&self, _path: &str) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    #[test]
    fn malformed_fragment_yields_empty_children() {
        let reader = FixedReader(r#"<c01 level="series"><unittitle>Series 1</c01>"#);
        let levels = levels();
        let ctx = RefineContext::new(DEFAULT_DESTINATION)
            .with_reader(&reader)
            .with_levels(&levels);
        assert_eq!(EadHierarchyRefinery.refine(&ctx), Some(RefineOutput::default()));
    }

    #[test]
    fn fragment_from_custom_reader_is_mapped() {
        let reader = FixedReader(r#"<c01 level="file"><unittitle>File A</unittitle></c01>"#);
        let levels = levels();
        let ctx = RefineContext::new(DEFAULT_DESTINATION)
            .with_reader(&reader)
            .with_levels(&levels);
        let out = EadHierarchyRefinery.refine(&ctx).expect("valid context");
        assert_eq!(out.children.len(), 1);
        assert_eq!(out.children[0].preferred_label(), Some("File A"));
    }

    #[test]
    fn namespaced_ead_is_mapped() {
        let reader = EadReader::new(
            r#"<ead xmlns="urn:isbn:1-931666-22-9"><archdesc level="collection"><dsc><c01 level="series"><unittitle>Series 1</unittitle></c01></dsc></archdesc></ead>"#,
        );
        let levels = levels();
        let ctx = RefineContext::new(DEFAULT_DESTINATION)
            .with_reader(&reader)
            .with_levels(&levels);
        let out = EadHierarchyRefinery.refine(&ctx).expect("valid context");
        assert_eq!(out.children.len(), 1);
        assert_eq!(out.children[0].preferred_label(), Some("Series 1"));
    }

    #[test]
    fn status_and_schema() {
        let refinery = EadHierarchyRefinery;
        let status = refinery.check_status();
        assert!(status.available);
        assert!(status.errors.is_empty());
        assert_eq!(status.description, refinery.info().description);

        let schema = serde_json::to_value(refinery.settings_schema()).expect("serialize");
        assert_eq!(schema[0]["key"], LEVELS_SETTING);
        assert_eq!(schema[0]["format_type"], "text");
        assert_eq!(schema[0]["display_type"], "field");
        assert_eq!(schema[0]["label"], "Level mappings");
    }

    #[test]
    fn finding_aid_fixture_matches_expected_output() {
        let reader = EadReader::from_file(Path::new("../../../fixtures/ead/finding_aid.xml"))
            .expect("read EAD fixture");
        let levels = load_levels_from(Path::new("../../../fixtures/levels/levels.toml"))
            .expect("load levels fixture");
        let expected: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string("../../../fixtures/json/finding_aid.expected.json")
                .expect("read expected output"),
        )
        .expect("parse expected output");

        let ctx = RefineContext::new(DEFAULT_DESTINATION)
            .bound_to(ROOT_ENTITY_TABLE)
            .with_reader(&reader)
            .with_levels(&levels);
        let out = EadHierarchyRefinery.refine(&ctx).expect("valid context");
        assert_eq!(serde_json::to_value(&out).expect("serialize"), expected);
    }
}

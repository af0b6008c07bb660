//! Ocean adapter: field elements in the NEMO XIOS request tree.
//!
//! A field is output at a frequency when it sits in a `file` under the
//! `file_group` carrying that `output_freq`. Files are matched by their
//! `name_suffix`, which names the grid the field lives on.

use super::MergeAdapter;
use crate::tables;
use diagmerge_store::{NodeId, NodeKind, XmlTree};
use diagmerge_types::{Attributes, DiagnosticRequest, MergeOutcome, ResolveError, ResolveResult, Subsystem};
use tracing::{debug, info, warn};

const CELL_MEASURES: &str = "cell_measures";

pub struct OceanAdapter<'a> {
    tree: XmlTree,
    catalog: &'a XmlTree,
    /// Fragments parsed from comments in the request tree.
    disabled: Vec<XmlTree>,
}

impl<'a> OceanAdapter<'a> {
    pub fn new(tree: XmlTree, catalog: &'a XmlTree) -> Self {
        let disabled = tree
            .comments()
            .into_iter()
            .filter(|text| text.contains("<field"))
            .filter_map(|text| {
                let wrapped = format!("<disabled>{}</disabled>", text);
                match XmlTree::parse("comment", &wrapped) {
                    Ok(fragment) => Some(fragment),
                    Err(e) => {
                        debug!(error = %e, "skipping comment that is not XML");
                        None
                    }
                }
            })
            .collect();
        Self {
            tree,
            catalog,
            disabled,
        }
    }

    pub fn tree(&self) -> &XmlTree {
        &self.tree
    }

    pub fn into_tree(self) -> XmlTree {
        self.tree
    }

    /// Whether the tree or the field catalog defines `name`.
    pub fn knows(&self, name: &str) -> bool {
        !self.active_fields(name).is_empty() || self.catalog_definition(name).is_some()
    }

    fn active_fields(&self, name: &str) -> Vec<NodeId> {
        self.tree
            .find_all(self.tree.document(), "field", Some(("name", name)))
    }

    // ---- Fields already in the tree ----

    fn extend_active(&mut self, name: &str, frequency: &str, fields: &[NodeId]) -> ResolveResult<MergeOutcome> {
        if fields
            .iter()
            .any(|&field| output_frequency(&self.tree, field) == Some(frequency))
        {
            debug!(field = name, frequency, "ocean field already output");
            return Ok(MergeOutcome::AlreadyPresent);
        }

        let field = fields[0];
        let file = self.tree.parent(field).ok_or_else(|| ResolveError::MissingTemplate {
            what: format!("file around field {}", name),
        })?;
        let suffix = self
            .tree
            .attr(file, "name_suffix")
            .ok_or_else(|| ResolveError::MissingTemplate {
                what: format!("name_suffix on the file holding {}", name),
            })?
            .to_string();
        let template = self.tree.attributes(file).cloned();

        let (fragment, node) = detach(&self.tree, field);
        let group = self.file_group(frequency)?;
        let target = self.target_file(group, frequency, &suffix, template)?;
        self.tree.graft(target, &fragment, node);
        info!(field = name, frequency, suffix = %suffix, "added ocean field output");
        Ok(MergeOutcome::Inserted)
    }

    // ---- Fields pulled from the catalog ----

    /// Catalog definition for `name`: the field it references, or the field itself.
    fn catalog_definition(&self, name: &str) -> Option<NodeId> {
        let doc = self.catalog.document();
        match self.catalog.find_first(doc, "field", Some(("name", name))) {
            Some(named) => match self.catalog.attr(named, "field_ref") {
                Some(reference) => self.catalog.find_first(doc, "field", Some(("id", reference))),
                None => Some(named),
            },
            None => self.catalog.find_first(doc, "field", Some(("id", name))),
        }
    }

    /// Grid suffix of a catalog definition, from its enclosing group.
    fn catalog_suffix(&self, definition: NodeId) -> Option<String> {
        let group = self.catalog.parent(definition)?;
        match self.catalog.attr(group, "grid_ref") {
            Some("scalar") => Some("_scalar".to_string()),
            Some(grid) => {
                let cut = grid.len().saturating_sub(3);
                Some(format!("_{}", grid.get(..cut).unwrap_or(grid)))
            }
            None => self.catalog.attr(group, "id").map(|id| format!("_{}", id)),
        }
    }

    fn add_from_catalog(&mut self, name: &str, frequency: &str, definition: NodeId) -> ResolveResult<MergeOutcome> {
        let suffix = self
            .catalog_suffix(definition)
            .ok_or_else(|| ResolveError::MissingTemplate {
                what: format!("grid for catalog field {}", name),
            })?;

        let (mut fragment, node) = detach(self.catalog, definition);
        fragment.set_attr(node, "name", name);
        if let Some(id) = fragment.remove_attr(node, "id") {
            fragment.set_attr(node, "field_ref", &id);
        }
        let doc = self.tree.document();
        if let Some(measures) = self
            .tree
            .find_first(doc, "variable", Some(("name", CELL_MEASURES)))
        {
            fragment.graft(node, &self.tree, measures);
        }

        let group = self.file_group(frequency)?;
        let target = self.target_file(group, frequency, &suffix, None)?;
        self.tree.graft(target, &fragment, node);
        info!(field = name, frequency, suffix = %suffix, "added ocean field from catalog");
        Ok(MergeOutcome::Inserted)
    }

    // ---- Fields switched off in comments ----

    /// First commented-out field `name` that sits inside a `file`.
    fn find_disabled(&self, name: &str) -> Option<(usize, NodeId, NodeId)> {
        let mut found = None;
        for (index, fragment) in self.disabled.iter().enumerate() {
            for field in fragment.find_all(fragment.document(), "field", Some(("name", name))) {
                let Some(file) = fragment.parent(field) else {
                    continue;
                };
                if fragment.name(file) != Some("file") {
                    continue;
                }
                if found.is_some() {
                    warn!(field = name, "field is commented out more than once; using the first");
                    return found;
                }
                found = Some((index, file, field));
            }
        }
        found
    }

    fn promote_disabled(&mut self, name: &str, frequency: &str) -> ResolveResult<Option<MergeOutcome>> {
        let Some((index, file, field)) = self.find_disabled(name) else {
            return Ok(None);
        };
        let fragment = self.disabled[index].clone();
        let suffix = fragment
            .attr(file, "name_suffix")
            .ok_or_else(|| ResolveError::MissingTemplate {
                what: format!("name_suffix on the commented file holding {}", name),
            })?
            .to_string();

        let mut template = fragment.attributes(file).cloned().unwrap_or_default();
        let taken = template
            .get("id")
            .map(|id| self.id_in_use(id))
            .unwrap_or(false);
        if taken {
            template.insert("id", self.next_file_id());
        }
        let group = self.file_group(frequency)?;
        let target = self.target_file(group, frequency, &suffix, Some(template))?;
        let (detached, node) = detach(&fragment, field);
        self.tree.graft(target, &detached, node);
        info!(field = name, frequency, suffix = %suffix, "enabled commented ocean field");
        Ok(Some(MergeOutcome::Inserted))
    }

    // ---- Files and groups ----

    /// The `file_group` writing at `frequency`, created when absent.
    fn file_group(&mut self, frequency: &str) -> ResolveResult<NodeId> {
        let doc = self.tree.document();
        let groups = self
            .tree
            .find_all(doc, "file_group", Some(("output_freq", frequency)));
        if let Some(&group) = groups.first() {
            if groups.len() > 1 {
                warn!(frequency, count = groups.len(), "several file groups share a frequency; using the first");
            }
            return Ok(group);
        }

        let definition = self
            .tree
            .find_first(doc, "file_definition", None)
            .ok_or_else(|| ResolveError::MissingTemplate {
                what: "file_definition".to_string(),
            })?;
        let mut attributes = Attributes::new();
        if !self.id_in_use(frequency) {
            attributes.insert("id", frequency);
        }
        attributes.insert("output_freq", frequency);
        attributes.insert("enabled", ".TRUE.");
        let group = self.tree.append_element(definition, "file_group", attributes);
        self.tree.append_text(group, "\n");
        info!(frequency, "added file group");
        Ok(group)
    }

    /// File in `group` for grid `suffix`, cloned from a template when absent.
    fn target_file(
        &mut self,
        group: NodeId,
        frequency: &str,
        suffix: &str,
        template: Option<Attributes>,
    ) -> ResolveResult<NodeId> {
        if let Some(file) = self
            .tree
            .find_first(group, "file", Some(("name_suffix", suffix)))
        {
            return Ok(file);
        }

        let doc = self.tree.document();
        let mut attributes = template
            .or_else(|| {
                self.tree
                    .find_first(doc, "file", Some(("name_suffix", suffix)))
                    .and_then(|file| self.tree.attributes(file).cloned())
            })
            .ok_or_else(|| ResolveError::MissingTemplate {
                what: format!("file with name_suffix=\"{}\"", suffix),
            })?;

        let needs_id = attributes
            .get("id")
            .map(|id| self.id_in_use(id))
            .unwrap_or(true);
        if needs_id {
            attributes.insert("id", self.next_file_id());
        }
        attributes.insert("name", format!("@expname@_{}", frequency));
        attributes.insert("output_freq", frequency);

        let file = self.tree.append_element(group, "file", attributes);
        self.tree.append_text(file, "\n");
        info!(frequency, suffix, "added output file");
        Ok(file)
    }

    fn id_in_use(&self, id: &str) -> bool {
        let doc = self.tree.document();
        self.tree
            .descendants(doc)
            .into_iter()
            .any(|node| self.tree.attr(node, "id") == Some(id))
    }

    /// `file<N>` one past the largest numbered file id in the tree.
    fn next_file_id(&self) -> String {
        let doc = self.tree.document();
        let largest = self
            .tree
            .descendants(doc)
            .into_iter()
            .filter_map(|node| self.tree.attr(node, "id"))
            .filter_map(|id| id.strip_prefix("file"))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        format!("file{}", largest + 1)
    }
}

impl MergeAdapter for OceanAdapter<'_> {
    type Code = str;

    fn subsystem(&self) -> Subsystem {
        Subsystem::Ocean
    }

    fn ensure_present(&mut self, name: &str, request: &DiagnosticRequest) -> ResolveResult<MergeOutcome> {
        let frequency = tables::ocean_frequency(request.frequency.as_str()).ok_or_else(|| {
            ResolveError::UnknownFrequency {
                frequency: request.frequency.to_string(),
                context: "ocean output".to_string(),
            }
        })?;

        let active = self.active_fields(name);
        if !active.is_empty() {
            return self.extend_active(name, frequency, &active);
        }
        if let Some(definition) = self.catalog_definition(name) {
            return self.add_from_catalog(name, frequency, definition);
        }
        if let Some(outcome) = self.promote_disabled(name, frequency)? {
            return Ok(outcome);
        }
        Ok(MergeOutcome::Missing)
    }
}

/// Output frequency in force at `node`: its own or the nearest ancestor's.
fn output_frequency(tree: &XmlTree, node: NodeId) -> Option<&str> {
    let mut current = tree.parent(node);
    while let Some(id) = current {
        if let Some(frequency) = tree.attr(id, "output_freq") {
            return Some(frequency);
        }
        current = tree.parent(id);
    }
    None
}

/// Copies the subtree at `node` into a tree of its own.
fn detach(source: &XmlTree, node: NodeId) -> (XmlTree, NodeId) {
    let mut fragment = XmlTree::new(source.origin());
    let copy = fragment.graft(fragment.document(), source, node);
    debug_assert!(matches!(fragment.kind(copy), NodeKind::Element { .. }));
    (fragment, copy)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: &str = r#"<?xml version="1.0"?>
<context id="nemo">
  <file_definition type="multiple_file" name="@expname@_@freq@" sync_freq="1d" min_digits="4">
    <file_group id="1m" output_freq="1mo" output_level="10" enabled=".TRUE.">
      <file id="file1" name_suffix="_grid_T" description="ocean T grid variables">
        <field field_ref="toce" name="thetao"/>
        <field field_ref="sst" name="tos"/>
        <variable name="cell_measures" type="string">area: area</variable>
      </file>
      <file id="file7" name_suffix="_scalar" description="scalar variables">
        <field field_ref="voltot" name="volo"/>
      </file>
      <!--
      <file id="file3" name_suffix="_grid_U" description="ocean U grid variables">
        <field field_ref="uoce" name="uo"/>
      </file>
      -->
    </file_group>
    <file_group id="1d" output_freq="1d" output_level="10" enabled=".TRUE."/>
  </file_definition>
</context>
"#;

    const CATALOG: &str = r#"<field_definition>
  <field_group id="grid_T" grid_ref="grid_T_2D">
    <field id="sst" long_name="sea surface temperature" unit="degC"/>
    <field id="sss" long_name="sea surface salinity" unit="1e-3"/>
  </field_group>
  <field_group id="cmip" >
    <field field_ref="sss" name="sos"/>
  </field_group>
  <field_group id="scalar" grid_ref="scalar">
    <field id="masso" long_name="sea water mass" unit="kg"/>
  </field_group>
</field_definition>
"#;

    fn parts() -> (XmlTree, XmlTree) {
        (
            XmlTree::parse("iodef_nemo.xml", REQUEST).unwrap(),
            XmlTree::parse("field_def_nemo-oce.xml", CATALOG).unwrap(),
        )
    }

    fn request(variable: &str, frequency: &str) -> DiagnosticRequest {
        DiagnosticRequest::new(variable, frequency, "longitude latitude time")
    }

    fn group_fields(tree: &XmlTree, frequency: &str, name: &str) -> Vec<NodeId> {
        let group = tree
            .find_first(tree.document(), "file_group", Some(("output_freq", frequency)))
            .unwrap();
        tree.find_all(group, "field", Some(("name", name)))
    }

    #[test]
    fn test_field_already_output_is_a_no_op() {
        let (tree, catalog) = parts();
        let mut adapter = OceanAdapter::new(tree, &catalog);
        let before = adapter.tree().render();
        let outcome = adapter.ensure_present("tos", &request("tos", "mon")).unwrap();
        assert_eq!(outcome, MergeOutcome::AlreadyPresent);
        assert_eq!(adapter.tree().render(), before);
    }

    #[test]
    fn test_active_field_copied_to_a_new_daily_file() {
        let (tree, catalog) = parts();
        let mut adapter = OceanAdapter::new(tree, &catalog);
        let outcome = adapter.ensure_present("tos", &request("tos", "day")).unwrap();
        assert_eq!(outcome, MergeOutcome::Inserted);

        let tree = adapter.tree();
        let fields = group_fields(tree, "1d", "tos");
        assert_eq!(fields.len(), 1);
        let file = tree.parent(fields[0]).unwrap();
        assert_eq!(tree.attr(file, "name_suffix"), Some("_grid_T"));
        assert_eq!(tree.attr(file, "name"), Some("@expname@_1d"));
        assert_eq!(tree.attr(file, "id"), Some("file8"));

        // a second grid_T field joins the same file
        adapter.ensure_present("thetao", &request("thetao", "day")).unwrap();
        let tree = adapter.tree();
        let fields = group_fields(tree, "1d", "thetao");
        assert_eq!(tree.parent(fields[0]), Some(file));
    }

    #[test]
    fn test_catalog_field_is_pulled_in() {
        let (tree, catalog) = parts();
        let mut adapter = OceanAdapter::new(tree, &catalog);
        let outcome = adapter.ensure_present("sos", &request("sos", "mon")).unwrap();
        assert_eq!(outcome, MergeOutcome::Inserted);

        let tree = adapter.tree();
        let fields = group_fields(tree, "1mo", "sos");
        assert_eq!(fields.len(), 1);
        let field = fields[0];
        assert_eq!(tree.attr(field, "field_ref"), Some("sss"));
        assert_eq!(tree.attr(field, "id"), None);
        assert_eq!(tree.attr(field, "long_name"), Some("sea surface salinity"));
        assert!(tree
            .find_first(field, "variable", Some(("name", CELL_MEASURES)))
            .is_some());
        let file = tree.parent(field).unwrap();
        assert_eq!(tree.attr(file, "id"), Some("file1"));
    }

    #[test]
    fn test_scalar_catalog_field_uses_scalar_file() {
        let (tree, catalog) = parts();
        let mut adapter = OceanAdapter::new(tree, &catalog);
        adapter.ensure_present("masso", &request("masso", "mon")).unwrap();
        let tree = adapter.tree();
        let field = group_fields(tree, "1mo", "masso")[0];
        let file = tree.parent(field).unwrap();
        assert_eq!(tree.attr(file, "name_suffix"), Some("_scalar"));
    }

    #[test]
    fn test_commented_field_is_promoted() {
        let (tree, catalog) = parts();
        let mut adapter = OceanAdapter::new(tree, &catalog);
        let outcome = adapter.ensure_present("uo", &request("uo", "mon")).unwrap();
        assert_eq!(outcome, MergeOutcome::Inserted);

        let tree = adapter.tree();
        let field = group_fields(tree, "1mo", "uo")[0];
        let file = tree.parent(field).unwrap();
        assert_eq!(tree.attr(file, "name_suffix"), Some("_grid_U"));
        assert_eq!(tree.attr(file, "id"), Some("file3"));
        assert!(adapter.tree().render().contains("name=\"uo\"/>"));
    }

    #[test]
    fn test_unknown_field_is_missing() {
        let (tree, catalog) = parts();
        let mut adapter = OceanAdapter::new(tree, &catalog);
        let outcome = adapter.ensure_present("nope", &request("nope", "mon")).unwrap();
        assert_eq!(outcome, MergeOutcome::Missing);
        assert!(!adapter.knows("nope"));
        assert!(adapter.knows("sos"));
    }

    #[test]
    fn test_unknown_frequency() {
        let (tree, catalog) = parts();
        let mut adapter = OceanAdapter::new(tree, &catalog);
        let err = adapter.ensure_present("tos", &request("tos", "3hr")).unwrap_err();
        assert!(matches!(err, ResolveError::UnknownFrequency { .. }));
    }

    #[test]
    fn test_missing_group_is_created() {
        let (tree, catalog) = parts();
        let text = tree.render().replace(
            r#"<file_group id="1d" output_freq="1d" output_level="10" enabled=".TRUE."/>"#,
            "",
        );
        let tree = XmlTree::parse("iodef_nemo.xml", &text).unwrap();
        let mut adapter = OceanAdapter::new(tree, &catalog);
        adapter.ensure_present("tos", &request("tos", "day")).unwrap();
        let tree = adapter.tree();
        let group = tree
            .find_first(tree.document(), "file_group", Some(("output_freq", "1d")))
            .unwrap();
        assert_eq!(tree.attr(group, "id"), Some("1d"));
    }
}

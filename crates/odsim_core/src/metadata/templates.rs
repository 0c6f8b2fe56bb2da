//! Metadata template fragments and placeholder injection.
//!
//! Fragments are JSON documents shipped with the crate (or overridden from a
//! directory). They are parsed first and merged, then placeholder tokens are
//! replaced inside string leaves only, so substituted values can never alter
//! the document structure or be re-substituted.

use std::fs;
use std::path::Path;

use serde_json::Value;

use super::document::MetadataDocument;
use super::merge::merge_all;
use super::{MetadataError, MetadataResult};

/// Named template fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fragment {
    /// JSON-LD `@context` shared by every document.
    CommonContext,
    /// Root catalog descriptor.
    Catalog,
    /// Activity window appended to the catalog at finalization.
    CatalogActivity,
    /// Fields common to every dataset.
    CommonDataset,
    /// Input echo dataset.
    InputDataset,
    /// Fields common to the simulation outputs.
    CommonOutputDataset,
    /// Binary output dataset.
    BinOutputDataset,
    /// Listing output dataset.
    ListingOutputDataset,
}

impl Fragment {
    /// Every fragment, in load order.
    pub const ALL: [Fragment; 8] = [
        Fragment::CommonContext,
        Fragment::Catalog,
        Fragment::CatalogActivity,
        Fragment::CommonDataset,
        Fragment::InputDataset,
        Fragment::CommonOutputDataset,
        Fragment::BinOutputDataset,
        Fragment::ListingOutputDataset,
    ];

    /// File name of the fragment inside a template directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Fragment::CommonContext => "common_context.json",
            Fragment::Catalog => "catalog.json",
            Fragment::CatalogActivity => "catalog_activity.json",
            Fragment::CommonDataset => "common_dataset.json",
            Fragment::InputDataset => "dataset_input.json",
            Fragment::CommonOutputDataset => "common_dataset_output.json",
            Fragment::BinOutputDataset => "dataset_bin_output.json",
            Fragment::ListingOutputDataset => "dataset_lst_output.json",
        }
    }

    fn embedded_source(self) -> &'static str {
        match self {
            Fragment::CommonContext => include_str!("../../templates/common_context.json"),
            Fragment::Catalog => include_str!("../../templates/catalog.json"),
            Fragment::CatalogActivity => include_str!("../../templates/catalog_activity.json"),
            Fragment::CommonDataset => include_str!("../../templates/common_dataset.json"),
            Fragment::InputDataset => include_str!("../../templates/dataset_input.json"),
            Fragment::CommonOutputDataset => {
                include_str!("../../templates/common_dataset_output.json")
            }
            Fragment::BinOutputDataset => include_str!("../../templates/dataset_bin_output.json"),
            Fragment::ListingOutputDataset => {
                include_str!("../../templates/dataset_lst_output.json")
            }
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Placeholder tokens recognised inside template strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    CatalogName,
    Orcid,
    ArtiCommit,
    OdsimCommit,
    HandleJsonApi,
    HandleCdmi,
    LandingPage,
    StartDate,
    EndDate,
    FileName,
    RunCode,
}

impl Placeholder {
    /// Literal token as written in the fragments.
    pub fn token(self) -> &'static str {
        match self {
            Placeholder::CatalogName => "CATCODENAME",
            Placeholder::Orcid => "ORCID",
            Placeholder::ArtiCommit => "COMMITSHAARTI",
            Placeholder::OdsimCommit => "COMMITSHAODSIM",
            Placeholder::HandleJsonApi => "HANDLEJSONAPI",
            Placeholder::HandleCdmi => "HANDLECDMI",
            Placeholder::LandingPage => "LANDINGPAGE",
            Placeholder::StartDate => "STARTDATE",
            Placeholder::EndDate => "ENDDATE",
            Placeholder::FileName => "FILENAME",
            Placeholder::RunCode => "NRUN",
        }
    }
}

/// Values bound to placeholder tokens.
#[derive(Debug, Clone, Default)]
pub struct Placeholders {
    values: Vec<(Placeholder, String)>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind (or rebind) a placeholder.
    pub fn set(&mut self, placeholder: Placeholder, value: impl Into<String>) {
        let value = value.into();
        match self.values.iter_mut().find(|(p, _)| *p == placeholder) {
            Some(slot) => slot.1 = value,
            None => self.values.push((placeholder, value)),
        }
    }

    /// Builder form of [`Placeholders::set`].
    pub fn with(mut self, placeholder: Placeholder, value: impl Into<String>) -> Self {
        self.set(placeholder, value);
        self
    }

    /// Value bound to `placeholder`, if any.
    pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
        self.values
            .iter()
            .find(|(p, _)| *p == placeholder)
            .map(|(_, v)| v.as_str())
    }

    /// Replace bound tokens in every string leaf of `value`.
    ///
    /// Mapping keys are left alone.
    pub fn apply(&self, value: &mut Value) {
        match value {
            Value::String(text) => {
                if let Some(replaced) = self.replace_tokens(text) {
                    *text = replaced;
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|item| self.apply(item)),
            Value::Object(map) => map.values_mut().for_each(|item| self.apply(item)),
            _ => {}
        }
    }

    /// Single left-to-right pass; inserted values are not scanned again.
    fn replace_tokens(&self, text: &str) -> Option<String> {
        if !self.values.iter().any(|(p, _)| text.contains(p.token())) {
            return None;
        }

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        'scan: while !rest.is_empty() {
            for (placeholder, value) in &self.values {
                if let Some(tail) = rest.strip_prefix(placeholder.token()) {
                    out.push_str(value);
                    rest = tail;
                    continue 'scan;
                }
            }
            let mut chars = rest.chars();
            if let Some(ch) = chars.next() {
                out.push(ch);
            }
            rest = chars.as_str();
        }
        Some(out)
    }
}

/// Parsed set of all template fragments.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    fragments: Vec<Value>,
}

impl TemplateSet {
    /// Load the fragments compiled into the crate.
    pub fn embedded() -> MetadataResult<Self> {
        let fragments = Fragment::ALL
            .iter()
            .map(|f| parse_fragment(*f, f.embedded_source()))
            .collect::<MetadataResult<Vec<_>>>()?;
        Ok(Self { fragments })
    }

    /// Load fragments from `dir`, falling back to the embedded copy for any
    /// file that is not present.
    pub fn from_dir(dir: &Path) -> MetadataResult<Self> {
        let mut fragments = Vec::with_capacity(Fragment::ALL.len());
        for fragment in Fragment::ALL {
            let path = dir.join(fragment.file_name());
            let value = if path.is_file() {
                let text = fs::read_to_string(&path).map_err(|source| MetadataError::Io {
                    path: path.clone(),
                    source,
                })?;
                tracing::debug!("Loaded template fragment {}", path.display());
                parse_fragment(fragment, &text)?
            } else {
                parse_fragment(fragment, fragment.embedded_source())?
            };
            fragments.push(value);
        }
        Ok(Self { fragments })
    }

    /// Raw (unsubstituted) fragment.
    pub fn fragment(&self, fragment: Fragment) -> &Value {
        &self.fragments[fragment.index()]
    }

    /// Merge `fragments` left to right, then inject `placeholders`.
    pub fn compose(&self, fragments: &[Fragment], placeholders: &Placeholders) -> MetadataDocument {
        let mut value = merge_all(fragments.iter().map(|f| self.fragment(*f).clone()));
        placeholders.apply(&mut value);
        MetadataDocument::new(value)
    }

    /// Root catalog descriptor before provenance is merged in.
    pub fn catalog_document(&self, placeholders: &Placeholders) -> MetadataDocument {
        self.compose(&[Fragment::CommonContext, Fragment::Catalog], placeholders)
    }

    /// Catalog activity window document.
    pub fn activity_document(
        &self,
        start: &str,
        end: &str,
        placeholders: &Placeholders,
    ) -> MetadataDocument {
        let placeholders = placeholders
            .clone()
            .with(Placeholder::StartDate, start)
            .with(Placeholder::EndDate, end);
        self.compose(&[Fragment::CatalogActivity], &placeholders)
    }
}

fn parse_fragment(fragment: Fragment, text: &str) -> MetadataResult<Value> {
    serde_json::from_str(text).map_err(|e| MetadataError::parse(fragment.file_name(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn run_placeholders() -> Placeholders {
        Placeholders::new()
            .with(Placeholder::CatalogName, "myrun")
            .with(Placeholder::Orcid, "0000-0001-6497-753X")
            .with(Placeholder::ArtiCommit, "abc123")
            .with(Placeholder::OdsimCommit, "def456")
            .with(Placeholder::HandleJsonApi, "https://api.example/h")
            .with(Placeholder::HandleCdmi, "https://cdmi.example/h")
            .with(Placeholder::LandingPage, "https://example.org/landing")
    }

    #[test]
    fn embedded_fragments_parse() {
        let set = TemplateSet::embedded().unwrap();
        for fragment in Fragment::ALL {
            assert!(set.fragment(fragment).is_object(), "{:?}", fragment);
        }
    }

    #[test]
    fn compose_layers_fragments_in_order() {
        let set = TemplateSet::embedded().unwrap();
        let placeholders = run_placeholders().with(Placeholder::FileName, "DAT3.bz2");
        let doc = set.compose(
            &[Fragment::CommonDataset, Fragment::BinOutputDataset],
            &placeholders,
        );

        assert_eq!(doc.id(), Some("/myrun/DAT3.bz2"));
        assert!(doc.get("title").is_some());
        assert_eq!(set.compose(&[], &placeholders).as_value(), &Value::Null);
    }

    #[test]
    fn catalog_document_is_fully_substituted() {
        let set = TemplateSet::embedded().unwrap();
        let doc = set.catalog_document(&run_placeholders());

        assert_eq!(doc.id(), Some("/myrun"));
        assert!(doc.get("@context").is_some());
        let text = doc.to_json_string().unwrap();
        for token in ["CATCODENAME", "ORCID", "COMMITSHAARTI", "COMMITSHAODSIM", "LANDINGPAGE"] {
            assert!(!text.contains(token), "{} left in {}", token, text);
        }
        assert!(text.contains("arti/tree/abc123"));
    }

    #[test]
    fn activity_document_carries_window() {
        let set = TemplateSet::embedded().unwrap();
        let doc = set.activity_document("2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z", &run_placeholders());
        let activity = doc.get("wasGeneratedBy").unwrap();
        assert_eq!(activity["startedAtTime"], json!("2024-01-01T00:00:00Z"));
        assert_eq!(activity["endedAtTime"], json!("2024-01-02T00:00:00Z"));
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        // A catalog name containing another token must survive verbatim.
        let placeholders = Placeholders::new()
            .with(Placeholder::CatalogName, "ORCID-run")
            .with(Placeholder::Orcid, "X");
        let mut value = json!({"@id": "/CATCODENAME", "who": "ORCID"});
        placeholders.apply(&mut value);
        assert_eq!(value, json!({"@id": "/ORCID-run", "who": "X"}));
    }

    #[test]
    fn keys_and_non_strings_untouched() {
        let placeholders = Placeholders::new().with(Placeholder::RunCode, "7");
        let mut value = json!({"NRUN": "DATNRUN", "n": 1, "list": ["NRUN", null]});
        placeholders.apply(&mut value);
        assert_eq!(value, json!({"NRUN": "DAT7", "n": 1, "list": ["7", null]}));
    }

    #[test]
    fn unbound_tokens_are_left_in_place() {
        let placeholders = Placeholders::new().with(Placeholder::CatalogName, "c");
        let mut value = json!("/CATCODENAME/FILENAME");
        placeholders.apply(&mut value);
        assert_eq!(value, json!("/c/FILENAME"));
    }

    #[test]
    fn rebinding_replaces_value() {
        let mut placeholders = Placeholders::new().with(Placeholder::StartDate, "a");
        placeholders.set(Placeholder::StartDate, "b");
        assert_eq!(placeholders.get(Placeholder::StartDate), Some("b"));
    }

    #[test]
    fn directory_overrides_single_fragment() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(Fragment::Catalog.file_name()),
            r#"{"@id": "/CATCODENAME", "custom": true}"#,
        )
        .unwrap();

        let set = TemplateSet::from_dir(dir.path()).unwrap();
        assert_eq!(set.fragment(Fragment::Catalog)["custom"], json!(true));
        // Other fragments fall back to the embedded copy
        assert!(set.fragment(Fragment::CommonContext).get("@context").is_some());
    }

    #[test]
    fn broken_override_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(Fragment::CatalogActivity.file_name()), "{").unwrap();
        let err = TemplateSet::from_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("catalog_activity.json"));
    }
}

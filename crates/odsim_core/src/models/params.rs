//! Run parameters supplied by the caller.

use serde::{Deserialize, Serialize};

use crate::metadata::{MetadataDocument, Placeholder, Placeholders};

/// Parameters of one catalog run.
///
/// Built by the parameter source (the CLI) and read by every stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunParameters {
    /// Catalog (run code) name, also the directory name in the store.
    pub catalog_name: String,
    /// Number of execution workers.
    pub processors: usize,
    /// ORCID-like identity of the operator.
    pub orcid: String,
    /// Commit of the simulation toolkit.
    pub arti_commit: String,
    /// Commit of this tool.
    pub odsim_commit: String,
    /// Handle of the catalog in the store's JSON API.
    pub handle_json_api: String,
    /// Handle of the catalog in the store's CDMI API.
    pub handle_cdmi: String,
    /// Landing page of the catalog.
    pub landing_page: String,
    /// Arguments forwarded to the simulation-driving tool.
    pub sim_args: Vec<String>,
    /// Provenance fragment merged into the root catalog document.
    pub provenance: MetadataDocument,
}

impl RunParameters {
    /// Create parameters with empty provenance strings.
    pub fn new(catalog_name: impl Into<String>, processors: usize) -> Self {
        Self {
            catalog_name: catalog_name.into(),
            processors: processors.max(1),
            orcid: String::new(),
            arti_commit: String::new(),
            odsim_commit: String::new(),
            handle_json_api: String::new(),
            handle_cdmi: String::new(),
            landing_page: String::new(),
            sim_args: Vec::new(),
            provenance: MetadataDocument::empty(),
        }
    }

    pub fn with_orcid(mut self, orcid: impl Into<String>) -> Self {
        self.orcid = orcid.into();
        self
    }

    pub fn with_commits(mut self, arti: impl Into<String>, odsim: impl Into<String>) -> Self {
        self.arti_commit = arti.into();
        self.odsim_commit = odsim.into();
        self
    }

    pub fn with_handles(
        mut self,
        json_api: impl Into<String>,
        cdmi: impl Into<String>,
        landing_page: impl Into<String>,
    ) -> Self {
        self.handle_json_api = json_api.into();
        self.handle_cdmi = cdmi.into();
        self.landing_page = landing_page.into();
        self
    }

    pub fn with_sim_args(mut self, args: Vec<String>) -> Self {
        self.sim_args = args;
        self
    }

    pub fn with_provenance(mut self, provenance: MetadataDocument) -> Self {
        self.provenance = provenance;
        self
    }

    /// Placeholder values shared by every document of this run.
    pub fn placeholders(&self) -> Placeholders {
        Placeholders::new()
            .with(Placeholder::CatalogName, &self.catalog_name)
            .with(Placeholder::Orcid, &self.orcid)
            .with(Placeholder::ArtiCommit, &self.arti_commit)
            .with(Placeholder::OdsimCommit, &self.odsim_commit)
            .with(Placeholder::HandleJsonApi, &self.handle_json_api)
            .with(Placeholder::HandleCdmi, &self.handle_cdmi)
            .with(Placeholder::LandingPage, &self.landing_page)
    }
}

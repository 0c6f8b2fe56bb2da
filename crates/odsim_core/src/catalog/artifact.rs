//! Output artifacts of a sub-job.

use std::fmt;

use super::{CatalogError, CatalogResult};
use crate::jobs::SubJob;
use crate::metadata::{Fragment, MetadataDocument};

/// The three files every sub-job publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Compressed binary particle output.
    BinOutput,
    /// Compressed listing output.
    ListingOutput,
    /// Echo of the steering input.
    InputEcho,
}

impl ArtifactKind {
    /// All kinds in publish order.
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::BinOutput,
        ArtifactKind::ListingOutput,
        ArtifactKind::InputEcho,
    ];

    /// File name of this artifact for `job`.
    pub fn file_name(self, job: &SubJob) -> String {
        match self {
            ArtifactKind::BinOutput => format!("DAT{}.bz2", job.run_number()),
            ArtifactKind::ListingOutput => format!("DAT{}.lst.bz2", job.file_code()),
            ArtifactKind::InputEcho => format!("DAT{}.input", job.file_code()),
        }
    }

    /// Fragments merged, in order, to describe this kind.
    pub fn fragments(self) -> &'static [Fragment] {
        match self {
            ArtifactKind::BinOutput => &[
                Fragment::CommonContext,
                Fragment::CommonDataset,
                Fragment::CommonOutputDataset,
                Fragment::BinOutputDataset,
            ],
            ArtifactKind::ListingOutput => &[
                Fragment::CommonContext,
                Fragment::CommonDataset,
                Fragment::CommonOutputDataset,
                Fragment::ListingOutputDataset,
            ],
            ArtifactKind::InputEcho => &[
                Fragment::CommonContext,
                Fragment::CommonDataset,
                Fragment::InputDataset,
            ],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ArtifactKind::BinOutput => "bin",
            ArtifactKind::ListingOutput => "lst",
            ArtifactKind::InputEcho => "input",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One output file waiting to be published, with its descriptor.
///
/// The store id is read from the document's `@id` when published.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactRecord {
    pub kind: ArtifactKind,
    pub file_code: String,
    pub metadata: MetadataDocument,
}

impl ArtifactRecord {
    pub fn new(kind: ArtifactKind, file_code: impl Into<String>, metadata: MetadataDocument) -> Self {
        Self {
            kind,
            file_code: file_code.into(),
            metadata,
        }
    }

    /// Store id from the descriptor.
    pub fn id(&self) -> Option<&str> {
        self.metadata.id()
    }

    /// Store id, or an error naming the artifact when the descriptor lacks one.
    pub fn require_id(&self) -> CatalogResult<&str> {
        self.id()
            .ok_or_else(|| CatalogError::MissingId(format!("{} {}", self.kind, self.file_code)))
    }
}

impl fmt::Display for ArtifactRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id() {
            Some(id) => f.write_str(id),
            None => write!(f, "{} {}", self.kind, self.file_code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_follow_kind() {
        let job = SubJob::parse("3:run myrun/DAT0003.run", "myrun").unwrap();
        assert_eq!(ArtifactKind::BinOutput.file_name(&job), "DAT3.bz2");
        assert_eq!(
            ArtifactKind::ListingOutput.file_name(&job),
            "DAT3-0003-DAT0003.lst.bz2"
        );
        assert_eq!(
            ArtifactKind::InputEcho.file_name(&job),
            "DAT3-0003-DAT0003.input"
        );
    }

    #[test]
    fn missing_id_names_the_artifact() {
        let record = ArtifactRecord::new(ArtifactKind::InputEcho, "3-0003-x", MetadataDocument::empty());
        let err = record.require_id().unwrap_err();
        assert!(err.to_string().contains("input 3-0003-x"));
        assert_eq!(record.to_string(), "input 3-0003-x");
    }

    #[test]
    fn every_kind_starts_with_context() {
        for kind in ArtifactKind::ALL {
            assert_eq!(kind.fragments()[0], Fragment::CommonContext);
        }
    }
}

//! Build stage domain model

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::GeneratorError;

/// One phase of the job lifecycle, mapped to exactly one generated script
///
/// Variants are declared in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStage {
    Prepare,
    GetSources,
    RestoreCache,
    DownloadArtifacts,
    UserScript,
    AfterScript,
    ArchiveCache,
    UploadArtifacts,
    CleanupFileVariables,
}

impl BuildStage {
    /// All stages in execution order
    pub const ALL: [BuildStage; 9] = [
        BuildStage::Prepare,
        BuildStage::GetSources,
        BuildStage::RestoreCache,
        BuildStage::DownloadArtifacts,
        BuildStage::UserScript,
        BuildStage::AfterScript,
        BuildStage::ArchiveCache,
        BuildStage::UploadArtifacts,
        BuildStage::CleanupFileVariables,
    ];

    /// Canonical stage name
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStage::Prepare => "prepare",
            BuildStage::GetSources => "get_sources",
            BuildStage::RestoreCache => "restore_cache",
            BuildStage::DownloadArtifacts => "download_artifacts",
            BuildStage::UserScript => "user_script",
            BuildStage::AfterScript => "after_script",
            BuildStage::ArchiveCache => "archive_cache",
            BuildStage::UploadArtifacts => "upload_artifacts",
            BuildStage::CleanupFileVariables => "cleanup_file_variables",
        }
    }

    /// Position of the stage in the execution order
    pub fn position(&self) -> usize {
        Self::ALL
            .iter()
            .position(|stage| stage == self)
            .unwrap_or_default()
    }

    /// The stage that follows this one, if any
    pub fn next(&self) -> Option<BuildStage> {
        Self::ALL.get(self.position() + 1).copied()
    }
}

impl FromStr for BuildStage {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|stage| stage.as_str() == s)
            .copied()
            .ok_or_else(|| GeneratorError::UnknownBuildStage(s.to_string()))
    }
}

impl std::fmt::Display for BuildStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

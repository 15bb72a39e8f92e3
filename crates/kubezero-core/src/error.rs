use crate::git::PushErrorKind;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Pipeline stage a fatal error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Selection,
    PackagePreparation,
    LocalMode,
    Prerequisites,
    ClusterCreation,
    ClusterReadiness,
    WorkloadReadiness,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Selection => "cloud provider selection",
            Stage::PackagePreparation => "package preparation",
            Stage::LocalMode => "local mode configuration",
            Stage::Prerequisites => "prerequisite check",
            Stage::ClusterCreation => "cluster creation",
            Stage::ClusterReadiness => "cluster readiness",
            Stage::WorkloadReadiness => "workload readiness",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum KubezeroError {
    #[error("unsupported cloud provider '{provider}'. Available: {}", available.join(", "))]
    UnsupportedProvider {
        provider: String,
        available: Vec<String>,
    },

    #[error("unsupported region '{region}' for {provider}. Available regions: {}", available.join(", "))]
    UnsupportedRegion {
        region: String,
        provider: String,
        available: Vec<String>,
    },

    #[error("local mode requires the GitHub owner of your fork")]
    MissingForkOwner,

    #[error("{0} is not installed or not in PATH")]
    ToolNotFound(String),

    #[error("configuration file not found: {}", .0.display())]
    ClusterConfigMissing(PathBuf),

    #[error("cluster tool failed: {0}")]
    ClusterToolFailed(String),

    #[error("timeout waiting for cluster API after {}s", .0.as_secs())]
    ControlPlaneTimeout(Duration),

    #[error("timeout waiting for workloads in namespace '{namespace}' to be ready (pending: {})", pending.join(", "))]
    WorkloadTimeout {
        namespace: String,
        pending: Vec<String>,
    },

    #[error("kubernetes client error: {0}")]
    Kube(String),

    #[error("git {command} failed: {message}")]
    Git { command: String, message: String },

    #[error("push of '{branch}' to '{remote}' failed ({kind}): {message}")]
    Push {
        remote: String,
        branch: String,
        kind: PushErrorKind,
        message: String,
    },

    /// The cause is part of the message and is not exposed via `source()`.
    #[error("{stage} failed: {cause}")]
    Stage {
        stage: Stage,
        cause: Box<KubezeroError>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl KubezeroError {
    /// Attribute this error to a pipeline stage. Already-attributed errors
    /// keep their original stage.
    pub fn at(self, stage: Stage) -> Self {
        match self {
            e @ KubezeroError::Stage { .. } => e,
            e => KubezeroError::Stage {
                stage,
                cause: Box::new(e),
            },
        }
    }

    /// The underlying error with any stage attribution removed.
    pub fn cause(&self) -> &KubezeroError {
        match self {
            KubezeroError::Stage { cause, .. } => cause,
            e => e,
        }
    }

    /// Stage this error was attributed to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            KubezeroError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, KubezeroError>;

/// Attach a stage to the error side of a result.
pub trait StageExt<T> {
    fn stage(self, stage: Stage) -> Result<T>;
}

impl<T> StageExt<T> for Result<T> {
    fn stage(self, stage: Stage) -> Result<T> {
        self.map_err(|e| e.at(stage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_prefixes_message() {
        let err = KubezeroError::ClusterToolFailed("exit status: 1".into()).at(Stage::ClusterCreation);
        assert_eq!(
            err.to_string(),
            "cluster creation failed: cluster tool failed: exit status: 1"
        );
        assert_eq!(err.stage(), Some(Stage::ClusterCreation));
    }

    #[test]
    fn stage_is_not_rewrapped() {
        let err = KubezeroError::MissingForkOwner
            .at(Stage::Selection)
            .at(Stage::LocalMode);
        assert_eq!(err.stage(), Some(Stage::Selection));
        assert!(matches!(err.cause(), KubezeroError::MissingForkOwner));
        assert!(std::error::Error::source(&err).is_none());
    }
}

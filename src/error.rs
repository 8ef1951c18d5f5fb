//! Error types for the conversion pipeline

use serde::Serialize;
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use thiserror::Error;

/// Errors raised while serving, launching, navigating or polling
#[derive(Error, Debug)]
pub enum ConverterError {
    #[error("Invalid conversion request: {0}")]
    InvalidRequest(String),

    #[error("Failed to bind content server on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Content server failed: {0}")]
    ServerFailed(String),

    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Page did not finish loading within {0:?}")]
    NavigationTimeout(Duration),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Conversion did not reach a terminal status within {0:?}")]
    ConversionTimeout(Duration),

    #[error("Conversion page reported an error: {0}")]
    ConversionReported(String),

    #[error("JavaScript evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Expected artifact was not written: {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of a failed run, stable enough to match on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidRequest,
    ResourceBind,
    Launch,
    NavigationTimeout,
    Navigation,
    ConversionTimeout,
    ConversionReported,
    ArtifactMissing,
    Internal,
}

impl ConverterError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidRequest(_) => FailureKind::InvalidRequest,
            Self::BindFailed { .. } => FailureKind::ResourceBind,
            Self::LaunchFailed(_) => FailureKind::Launch,
            Self::NavigationTimeout(_) => FailureKind::NavigationTimeout,
            Self::NavigationFailed(_) => FailureKind::Navigation,
            Self::ConversionTimeout(_) => FailureKind::ConversionTimeout,
            Self::ConversionReported(_) => FailureKind::ConversionReported,
            Self::ArtifactMissing(_) => FailureKind::ArtifactMissing,
            Self::ServerFailed(_) | Self::EvaluationFailed(_) | Self::Io(_) | Self::Json(_) => FailureKind::Internal,
        }
    }

    /// Whether the run gave up because a bound elapsed
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::NavigationTimeout(_) | Self::ConversionTimeout(_))
    }
}

/// Result type alias for conversion operations
pub type Result<T> = std::result::Result<T, ConverterError>;

// Copyright 2025 Lars Brubaker
// License: MIT

use glam::DVec3;
use thiserror::Error;

use crate::vertex::VertexId;

/// Every failure aborts the whole run for the footprint; no partial roof is returned.
#[derive(Debug, Error)]
pub enum SkeletonError {
    /// A required intersection or validity computation failed beyond tolerance.
    #[error("accuracy failure: {0}")]
    Accuracy(String),

    /// One reflex vertex splits two edges at the same point ("square case").
    #[error("degenerate topology: vertex {vertex} triggers more than one split at {point}")]
    DegenerateTopology { vertex: VertexId, point: DVec3 },

    #[error("invalid footprint: {0}")]
    Input(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SkeletonError {
    pub(crate) fn accuracy(msg: impl Into<String>) -> Self {
        SkeletonError::Accuracy(msg.into())
    }

    pub(crate) fn input(msg: impl Into<String>) -> Self {
        SkeletonError::Input(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SkeletonError>;

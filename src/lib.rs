// roof-skeleton: weighted straight skeleton roofs for building footprints
// Copyright 2025 Lars Brubaker
// License: MIT

pub mod config;
pub mod edge;
pub mod error;
pub mod event;
pub mod geom;
pub mod polygon;
pub mod skeleton;
pub mod tolerance;
pub mod vertex;
pub mod virtual_edge;
pub mod weights;

pub use config::{MansardConfig, SkeletonConfig};
pub use error::{Result, SkeletonError};
pub use event::{EventKind, EventRecord};
pub use skeleton::{Footprint, IterationRecord, RoofFace, RoofSkeleton, Skeleton};
pub use vertex::{Vertex, VertexArena, VertexId};
pub use virtual_edge::VirtualEdgeChain;
pub use weights::{EdgeWeight, SlopePhase, WeightClass};

//! Grasp point selection on a stem skeleton.
//!
//! The skeleton and its topological nodes come from an external
//! skeletonizer. [`GraspPointSelector`] clears a disk around every node,
//! turns the remaining stem segments into [`GraspCandidate`]s through a
//! [`CandidateExtractor`] and picks one according to a [`SelectionPolicy`].
//! The result is reported in both the local and the original frame.

mod candidates;
mod error;
mod policy;
mod selector;
mod skeleton;
mod suppress;

pub use candidates::{CandidateExtractor, GraspCandidate, SegmentExtractor};
pub use error::GraspError;
pub use policy::SelectionPolicy;
pub use selector::{GraspContext, GraspParams, GraspPointSelector, GraspResult};
pub use skeleton::{NodeKind, SkeletonNode, StemSkeleton};
pub use suppress::{suppress_nodes, suppression_radius};

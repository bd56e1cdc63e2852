//! # Bubble IST
//!
//! Bubble IST builds, for the bubble-sort network `B_n`, one rooted spanning
//! tree per generator by giving every vertex a parent pointer in each tree.
//! The vertices are split across compute units that each construct their own
//! share of the forest in parallel, after which the shares are merged into a
//! single table and written out as text.
//!
//! The stages, leaves first:
//!
//! *   [`permutation`] and [`graph`]: the vertices of `B_n` and their adjacency.
//! *   [`partition`]: the CSR encoding and the assignment of vertices to units.
//! *   [`tree`]: parent-selection strategies and the local tree builder.
//! *   [`comm`]: the collectives units use to meet.
//! *   [`aggregate`]: the gather that merges every unit's rows on the root.
//! *   [`output`]: the text format.
//! *   [`pipeline`]: a full run of one unit, or of an in-process world of units.
//!
//! Progress is reported through the [`observe`] module.

pub mod aggregate;
pub mod comm;
pub mod graph;
pub mod observe;
pub mod output;
pub mod partition;
pub mod permutation;
pub mod pipeline;
pub mod tree;

//! Solve graph state: wire types, per-vertex state, the trace engine and
//! its render projection.

pub mod graph;
pub mod projection;
pub mod trace;
pub mod vertex;

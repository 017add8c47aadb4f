//! Extraction pipeline
//!
//! Turns a mesh into GPU buffers: render data is prepared once per cache
//! variant, extractors registered per buffer iterate the mesh domains, and
//! the scheduler wires everything into a task graph run on the rayon pool.

pub mod types;
pub mod scratch;
pub mod extractor;
pub mod render_data;
pub mod runner;
pub mod stats;
pub mod graph;
pub mod extractors;
pub mod registry;
pub mod scheduler;

pub use types::{DataFlags, Domain, ExtractType, IterDomain};
pub use extractor::{DynExtract, ExtractContext, ExtractInfo, ExtractorRunData, MeshExtract};
pub use render_data::{MeshRenderData, RenderSource, extract_source};
pub use runner::{RunMode, run_extractors};
pub use stats::{BuildReport, ExtractStats, StatsSnapshot};
pub use graph::{NodeId, TaskGraph};
pub use registry::{ALL_EXTRACTORS, ExtractorOverrides, base_extractor, data_size_total, extractor_for};
pub use scheduler::{ExtractJob, extract_mesh_buffers, overrides_for, run_mode_for};

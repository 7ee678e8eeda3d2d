mod backend;
mod backends;
mod discovery;
mod filter;
mod registry;
mod result;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::{TractBackend, YoloLayout};
pub use discovery::{discover_model, ModelArtifact, TINY_YOLO_MODEL_FILE};
pub use filter::{filter_detections, FilterConfig};
pub use registry::BackendRegistry;
pub use result::{BoundingBox, Detection, FilteredDetections};

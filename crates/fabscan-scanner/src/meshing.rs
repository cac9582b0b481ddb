//! Background mesh generation
//!
//! MESHING is fire-and-forget: the controller hands the request to a
//! named thread and moves on. The outcome is only logged.

use fabscan_core::{Error, Result};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Which scan to mesh and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshRequest {
    pub scan_id: String,
    pub filter: String,
    pub format: String,
}

/// Runs the external meshing tool
pub trait MeshGenerator: Send + Sync {
    fn generate(&self, request: &MeshRequest) -> Result<()>;
}

/// Generator used when no meshing tool is installed
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredMeshGenerator;

impl MeshGenerator for UnconfiguredMeshGenerator {
    fn generate(&self, request: &MeshRequest) -> Result<()> {
        Err(Error::other(format!(
            "no mesh generator configured for scan {}",
            request.scan_id
        )))
    }
}

/// Starts mesh generation on its own thread
#[derive(Clone)]
pub struct MeshingLauncher {
    generator: Arc<dyn MeshGenerator>,
}

impl MeshingLauncher {
    pub fn new(generator: Arc<dyn MeshGenerator>) -> Self {
        Self { generator }
    }

    /// Spawn the generator; the returned handle may be dropped
    pub fn launch(&self, request: MeshRequest) -> Result<JoinHandle<()>> {
        let generator = Arc::clone(&self.generator);
        let handle = std::thread::Builder::new()
            .name(format!("meshing-{}", request.scan_id))
            .spawn(move || {
                tracing::info!(
                    "Meshing scan {} with filter {} as {}",
                    request.scan_id,
                    request.filter,
                    request.format
                );
                match generator.generate(&request) {
                    Ok(()) => tracing::info!("Meshing of scan {} finished", request.scan_id),
                    Err(e) => tracing::warn!("Meshing of scan {} failed: {}", request.scan_id, e),
                }
            })?;
        Ok(handle)
    }
}

impl Default for MeshingLauncher {
    fn default() -> Self {
        Self::new(Arc::new(UnconfiguredMeshGenerator))
    }
}

impl std::fmt::Debug for MeshingLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshingLauncher").finish_non_exhaustive()
    }
}

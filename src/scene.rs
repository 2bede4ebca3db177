use crate::mesh::MeshAsset;

/// The demo scene: the main model plus the unit cube reused as the floor.
pub struct Scene {
    pub object: MeshAsset,
    pub floor: MeshAsset,
}

//! Mutating Geometry nodes through the scene
//!
//! Successful edits publish `Dirty` on the Geometry node, which Objects
//! attached with `cascade_on_dirty` turn into boundary invalidation and an
//! appearance update.

use crate::error::SceneError;
use crate::events::{EventKind, EventPayload};
use crate::geometry::{GeometryArrays, GeometryBuffer, GeometryError, NormalData, PositionData, UvData};

use super::node::NodeId;
use super::Scene;

impl Scene {
    fn edit_geometry(
        &mut self,
        node: NodeId,
        edit: impl FnOnce(&mut GeometryBuffer) -> Result<(), GeometryError>,
    ) -> bool {
        let result = match self.geometry_mut(node) {
            Some(buffer) => edit(buffer),
            None => {
                let id = self.id_of(node).unwrap_or("?").to_string();
                self.report_error(None, SceneError::NotFound(format!("geometry '{id}'")));
                return false;
            }
        };
        match result {
            Ok(()) => {
                self.publish(node, EventKind::Dirty, EventPayload::None, false);
                true
            }
            Err(err) => {
                self.report_error(Some(node), err.into());
                false
            }
        }
    }

    /// Replace every array of a Geometry
    pub fn replace_geometry_arrays(&mut self, node: NodeId, arrays: GeometryArrays) -> bool {
        self.edit_geometry(node, |g| g.replace_arrays(arrays))
    }

    /// Replace positions of a Geometry
    pub fn set_geometry_positions(&mut self, node: NodeId, positions: PositionData) -> bool {
        self.edit_geometry(node, |g| g.set_positions(positions))
    }

    /// Replace normals of a Geometry
    pub fn set_geometry_normals(&mut self, node: NodeId, normals: Option<NormalData>) -> bool {
        self.edit_geometry(node, |g| g.set_normals(normals))
    }

    /// Replace uvs of a Geometry
    pub fn set_geometry_uvs(&mut self, node: NodeId, uvs: Option<UvData>) -> bool {
        self.edit_geometry(node, |g| g.set_uvs(uvs))
    }

    /// Replace indices of a Geometry
    pub fn set_geometry_indices(&mut self, node: NodeId, indices: Option<Vec<u32>>) -> bool {
        self.edit_geometry(node, |g| g.set_indices(indices))
    }
}

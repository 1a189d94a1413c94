//! The remote calls consumed by the migrator

use crate::error::RequestError;
use crate::model::{Position, ResourceId, Scene, SceneObject};

/// Access to the scene-management service
///
/// Every call is a single request/response round trip. Implementations do
/// not retry.
#[async_trait::async_trait]
pub trait SceneApi: Send + Sync {
    /// List every scene visible to the credential
    async fn list_scenes(&self) -> Result<Vec<Scene>, RequestError>;

    /// List the objects placed in one scene
    async fn list_scene_objects(
        &self,
        scene_id: &ResourceId,
    ) -> Result<Vec<SceneObject>, RequestError>;

    /// Overwrite the position of one object, returning the stored object
    async fn update_object_position(
        &self,
        object_id: &ResourceId,
        position: Position,
    ) -> Result<SceneObject, RequestError>;
}

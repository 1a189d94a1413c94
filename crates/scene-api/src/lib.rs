//! Scene API - typed access to the scene-management service
//!
//! Covers the three calls the maintenance tooling needs:
//! - Listing scenes
//! - Listing the objects placed in one scene
//! - Overwriting the position of one object
//!
//! Responses are decoded into typed records at this boundary, so a shape
//! mismatch surfaces as [`RequestError::Decode`] instead of a missing-field
//! lookup deep inside the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use scene_api::{ClientConfig, Credential, HttpSceneApi, SceneApi};
//!
//! # async fn example() -> Result<(), scene_api::RequestError> {
//! let config = ClientConfig::new("http://localhost:5000/api", Credential::new("token"));
//! let api = HttpSceneApi::new(&config)?;
//!
//! for scene in api.list_scenes().await? {
//!     println!("{} has {} objects", scene.name, api.list_scene_objects(&scene.id).await?.len());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod api;
pub mod error;
pub mod http;
pub mod model;

pub use api::SceneApi;
pub use error::RequestError;
pub use http::{ClientConfig, Credential, HttpSceneApi};
pub use model::{Position, PositionUpdate, ResourceId, Scene, SceneObject};
pub use reqwest::{Method, StatusCode};

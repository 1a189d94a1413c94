//! Records exchanged with the scene-management service
//!
//! Only the fields the tooling reads are modelled; anything else the
//! service sends is ignored on decode.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque identifier of a scene or scene object
///
/// The service hands out GUID strings, but integer ids decode as well.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Create an identifier from its textual form
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Textual form, used verbatim as a URL path segment
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Self(text),
            RawId::Signed(n) => Self(n.to_string()),
            RawId::Unsigned(n) => Self(n.to_string()),
        })
    }
}

/// A point in scene space: `[x, y, z]`
///
/// For geo-referenced scenes the components are longitude, latitude and
/// height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(pub [f64; 3]);

impl Position {
    /// The zero vector
    pub const ORIGIN: Self = Self([0.0; 3]);

    /// Create from components
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self([x, y, z])
    }

    /// X component
    #[inline]
    #[must_use]
    pub fn x(&self) -> f64 {
        self.0[0]
    }

    /// Y component
    #[inline]
    #[must_use]
    pub fn y(&self) -> f64 {
        self.0[1]
    }

    /// Z component
    #[inline]
    #[must_use]
    pub fn z(&self) -> f64 {
        self.0[2]
    }

    /// Every component is exactly zero; `-0.0` counts as zero
    #[inline]
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_origin(&self) -> bool {
        self.0.iter().all(|c| *c == 0.0)
    }

    /// No component is NaN or infinite
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|c| c.is_finite())
    }
}

impl From<[f64; 3]> for Position {
    fn from(components: [f64; 3]) -> Self {
        Self(components)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.0[0], self.0[1], self.0[2])
    }
}

/// A named collection of placed objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Service-assigned identifier
    pub id: ResourceId,
    /// Display name
    pub name: String,
}

/// An object placed in a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Service-assigned identifier
    pub id: ResourceId,
    /// Display name
    pub name: String,
    /// `None` when the service sent no position or `null`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// Body of the update call
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionUpdate {
    /// New position of the object
    pub position: Position,
}

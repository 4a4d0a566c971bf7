//! What the render surface is told to paint

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::cache::FrameResource;
use crate::catalog::MaterialId;
use crate::resolver::PriceInfo;
use crate::rotation::Mode;

/// Image to show for the current frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayedResource {
    /// The current frame itself
    Exact(FrameResource),
    /// Nearest loaded frame of the same material while the current one is
    /// loading or unavailable
    Nearest(FrameResource),
    /// Nothing of this material is loaded yet
    Placeholder,
}

impl DisplayedResource {
    pub fn resource(&self) -> Option<&FrameResource> {
        match self {
            DisplayedResource::Exact(r) | DisplayedResource::Nearest(r) => Some(r),
            DisplayedResource::Placeholder => None,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, DisplayedResource::Exact(_))
    }
}

impl Serialize for DisplayedResource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let kind = match self {
            DisplayedResource::Exact(_) => "exact",
            DisplayedResource::Nearest(_) => "nearest",
            DisplayedResource::Placeholder => "placeholder",
        };
        let resource = self.resource();

        let mut s = serializer.serialize_struct("DisplayedResource", 5)?;
        s.serialize_field("kind", kind)?;
        s.serialize_field("frame", &resource.map(|r| r.key.frame))?;
        s.serialize_field("encoding", &resource.map(|r| r.key.encoding))?;
        s.serialize_field("mimeType", &resource.map(|r| r.mime_type()))?;
        s.serialize_field("bytes", &resource.map(|r| r.bytes.len()))?;
        s.end()
    }
}

/// Everything the render surface needs for one paint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    pub resource: DisplayedResource,
    pub frame_index: usize,
    pub frame_count: usize,
    pub zoom: f32,
    pub is_auto_rotating: bool,
    pub material: MaterialId,
    pub price: PriceInfo,
    pub mode: Mode,
    /// Material whose priority frame is still loading
    pub pending_material: Option<MaterialId>,
    pub generation: u64,
}

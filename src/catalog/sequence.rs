//! Frame sequence descriptors and image encodings

use image::ImageFormat;
use serde::{Deserialize, Serialize};

use super::MaterialId;
use crate::error::ValidationError;

/// Image encodings a frame may be published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Avif,
    Webp,
    Jpeg,
    Png,
}

impl Encoding {
    /// File extension used in rendered paths
    pub fn extension(&self) -> &'static str {
        match self {
            Encoding::Avif => "avif",
            Encoding::Webp => "webp",
            Encoding::Jpeg => "jpg",
            Encoding::Png => "png",
        }
    }

    /// MIME type handed to the render surface
    pub fn mime_type(&self) -> &'static str {
        match self {
            Encoding::Avif => "image/avif",
            Encoding::Webp => "image/webp",
            Encoding::Jpeg => "image/jpeg",
            Encoding::Png => "image/png",
        }
    }

    /// Container format expected when sniffing fetched bytes
    pub fn image_format(&self) -> ImageFormat {
        match self {
            Encoding::Avif => ImageFormat::Avif,
            Encoding::Webp => ImageFormat::WebP,
            Encoding::Jpeg => ImageFormat::Jpeg,
            Encoding::Png => ImageFormat::Png,
        }
    }

    /// All encodings, most space-efficient first
    pub fn all() -> &'static [Encoding] {
        &[Encoding::Avif, Encoding::Webp, Encoding::Jpeg, Encoding::Png]
    }
}

/// Where and how the frames of one material's rotation live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSequenceDescriptor {
    /// Material this sequence renders
    pub material: MaterialId,

    /// Path template, e.g. `rings/{product}/{material}/{frame:03}.{ext}`
    #[serde(rename = "pathTemplate")]
    pub path_template: String,

    /// Number of frames in a full rotation
    #[serde(rename = "frameCount")]
    pub frame_count: usize,

    /// Supported encodings in preference order
    pub encodings: Vec<Encoding>,
}

impl FrameSequenceDescriptor {
    /// Structural checks applied before a descriptor is handed out
    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidSequence {
            material: self.material.clone(),
            reason: reason.to_string(),
        };

        if self.frame_count == 0 {
            return Err(invalid("frame count must be at least 1"));
        }
        if self.encodings.is_empty() {
            return Err(invalid("no supported encodings"));
        }
        if !self.path_template.contains("{frame") {
            return Err(invalid("path template has no {frame} placeholder"));
        }
        Ok(())
    }

    /// Whether `frame` addresses a frame of this sequence
    pub fn check_frame(&self, frame: usize) -> Result<(), ValidationError> {
        if frame < self.frame_count {
            Ok(())
        } else {
            Err(ValidationError::FrameOutOfRange {
                frame,
                count: self.frame_count,
            })
        }
    }

    /// Render the template for one frame/encoding.
    ///
    /// Supported placeholders: `{product}`, `{material}`, `{frame}`,
    /// `{frame:0W}` (zero padded to width W) and `{ext}`. Unknown
    /// placeholders are copied through untouched.
    pub fn frame_path(&self, product: &str, frame: usize, encoding: Encoding) -> String {
        let template = self.path_template.as_str();
        let mut out = String::with_capacity(template.len() + 16);
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                out.push_str(&rest[open..]);
                return out;
            };
            let token = &after[..close];
            match token {
                "product" => out.push_str(product),
                "material" => out.push_str(self.material.as_str()),
                "frame" => out.push_str(&frame.to_string()),
                "ext" => out.push_str(encoding.extension()),
                _ => match token.strip_prefix("frame:0").and_then(|w| w.parse::<usize>().ok()) {
                    Some(width) => out.push_str(&format!("{:0width$}", frame, width = width)),
                    None => {
                        out.push('{');
                        out.push_str(token);
                        out.push('}');
                    }
                },
            }
            rest = &after[close + 1..];
        }

        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(template: &str) -> FrameSequenceDescriptor {
        FrameSequenceDescriptor {
            material: MaterialId::from("rose"),
            path_template: template.to_string(),
            frame_count: 36,
            encodings: vec![Encoding::Webp, Encoding::Jpeg],
        }
    }

    #[test]
    fn test_frame_path_placeholders() {
        let d = descriptor("rings/{product}/{material}/{frame:03}.{ext}");
        assert_eq!(d.frame_path("solitaire", 7, Encoding::Webp), "rings/solitaire/rose/007.webp");
        assert_eq!(d.frame_path("solitaire", 35, Encoding::Jpeg), "rings/solitaire/rose/035.jpg");

        let plain = descriptor("{material}_{frame}.{ext}");
        assert_eq!(plain.frame_path("x", 12, Encoding::Png), "rose_12.png");
    }

    #[test]
    fn test_frame_path_keeps_unknown_tokens() {
        let d = descriptor("{cdn}/{frame}.{ext}{");
        assert_eq!(d.frame_path("p", 1, Encoding::Avif), "{cdn}/1.avif{");
    }

    #[test]
    fn test_validate_rejects_bad_descriptors() {
        let mut d = descriptor("{frame}.{ext}");
        assert!(d.validate().is_ok());

        d.frame_count = 0;
        assert!(d.validate().is_err());

        let mut d = descriptor("{frame}.{ext}");
        d.encodings.clear();
        assert!(d.validate().is_err());

        let d = descriptor("static.png");
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_check_frame() {
        let d = descriptor("{frame}");
        assert!(d.check_frame(35).is_ok());
        assert_eq!(
            d.check_frame(36),
            Err(ValidationError::FrameOutOfRange { frame: 36, count: 36 })
        );
    }
}

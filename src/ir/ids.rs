//! Image identifiers derived from IIIF canvas or image-service IDs.
//!
//! The image ID is the primary key shared by every output artifact: the saved
//! JPEG, the VOC XML file, the training list and the clipping file names. It
//! must therefore be derived the same way everywhere, which is why it is a
//! newtype that can only be built through [`ImageKey::derive`].

use std::fmt;

/// Extensions stripped from the last segment of a canvas or service ID.
const KNOWN_EXTENSIONS: &[&str] = &[".json", ".tiff", ".tif", ".png", ".jpeg", ".jpg"];

/// Extension appended to every derived image ID.
const IMAGE_ID_EXTENSION: &str = ".jpg";

/// A stable image identifier such as `ucla_bib1987273_no005_rs_001.jpg`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageKey(String);

impl ImageKey {
    /// Derives an image ID from a canvas `@id` or image-service `@id`.
    ///
    /// Takes the last `/`-separated segment, strips known image/JSON
    /// extensions from its end (repeatedly, so `x.tif.json` becomes `x`) and
    /// appends `.jpg`. Applying it to its own output is a no-op.
    pub fn derive(raw_id: &str) -> Self {
        let trimmed = raw_id.trim_end_matches('/');
        let segment = trimmed.rsplit('/').next().unwrap_or(trimmed);
        Self(format!("{}{}", strip_known_extensions(segment), IMAGE_ID_EXTENSION))
    }

    /// Returns the ID as a string slice (used as the saved image file name).
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the ID without its image extension.
    ///
    /// This is the name used for the XML file, its `<filename>` element and
    /// the training list entry.
    pub fn base_id(&self) -> &str {
        self.0.strip_suffix(IMAGE_ID_EXTENSION).unwrap_or(&self.0)
    }
}

/// Derives an image ID string; see [`ImageKey::derive`].
pub fn derive_image_id(raw_id: &str) -> String {
    ImageKey::derive(raw_id).0
}

fn strip_known_extensions(segment: &str) -> &str {
    let mut current = segment;
    loop {
        let stripped = KNOWN_EXTENSIONS
            .iter()
            .find_map(|ext| strip_suffix_ignore_case(current, ext));
        match stripped {
            Some(rest) if rest != current => current = rest,
            _ => return current,
        }
    }
}

fn strip_suffix_ignore_case<'a>(value: &'a str, suffix: &str) -> Option<&'a str> {
    if value.len() < suffix.len() || !value.is_char_boundary(value.len() - suffix.len()) {
        return None;
    }
    let (head, tail) = value.split_at(value.len() - suffix.len());
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}

impl fmt::Debug for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageKey({})", self.0)
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ImageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

//! Image dimension lookup.
//!
//! Fitting the viewport and exporting labels both need the decoded pixel
//! size of an image. An [`ImageSource`] provides it for an opaque image key;
//! [`CachedImageSource`] makes sure each image is measured at most once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::Size;

/// File extensions recognized as images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp"];

/// Errors from looking up image dimensions.
#[derive(Error, Debug)]
pub enum ImageSourceError {
    /// No image known under this key
    #[error("Image not found: {key}")]
    NotFound {
        /// The image key
        key: String,
    },

    /// The image exists but its header could not be read
    #[error("Failed to read dimensions of '{key}': {source}")]
    Decode {
        /// The image key
        key: String,
        /// Underlying decoder error
        #[source]
        source: image::ImageError,
    },

    /// The image reports a zero width or height
    #[error("Image '{key}' has unusable dimensions {width}x{height}")]
    EmptyImage {
        key: String,
        width: u32,
        height: u32,
    },

    /// Listing a directory failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that can report the pixel size of an image.
pub trait ImageSource {
    fn dimensions(&mut self, key: &str) -> Result<Size, ImageSourceError>;
}

impl<S: ImageSource + ?Sized> ImageSource for &mut S {
    fn dimensions(&mut self, key: &str) -> Result<Size, ImageSourceError> {
        (**self).dimensions(key)
    }
}

/// Known dimensions from a metadata record, no decoding.
impl ImageSource for HashMap<String, Size> {
    fn dimensions(&mut self, key: &str) -> Result<Size, ImageSourceError> {
        self.get(key).copied().ok_or_else(|| ImageSourceError::NotFound {
            key: key.to_string(),
        })
    }
}

/// Reads image headers from files under a root directory.
#[derive(Debug, Clone)]
pub struct FsImageSource {
    root: PathBuf,
}

impl FsImageSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Image file names directly under the root, sorted.
    pub fn list_images(&self) -> Result<Vec<String>, ImageSourceError> {
        let mut names: Vec<String> = std::fs::read_dir(&self.root)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_image_path(p))
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect();
        names.sort();
        log::debug!("Found {} images in {:?}", names.len(), self.root);
        Ok(names)
    }
}

impl ImageSource for FsImageSource {
    fn dimensions(&mut self, key: &str) -> Result<Size, ImageSourceError> {
        let path = self.root.join(key);
        if !path.is_file() {
            return Err(ImageSourceError::NotFound {
                key: key.to_string(),
            });
        }
        let (width, height) =
            image::image_dimensions(&path).map_err(|source| ImageSourceError::Decode {
                key: key.to_string(),
                source,
            })?;
        if width == 0 || height == 0 {
            return Err(ImageSourceError::EmptyImage {
                key: key.to_string(),
                width,
                height,
            });
        }
        Ok(Size::from((width, height)))
    }
}

/// Memoizes another source. Failures are not cached, so a missing image can
/// be retried once it appears.
#[derive(Debug, Clone)]
pub struct CachedImageSource<S> {
    inner: S,
    cache: HashMap<String, Size>,
}

impl<S: ImageSource> CachedImageSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: HashMap::new(),
        }
    }

    /// Seed the cache with dimensions already known from metadata.
    pub fn insert_known(&mut self, key: impl Into<String>, size: Size) {
        if size.is_usable() {
            self.cache.insert(key.into(), size);
        }
    }

    pub fn cached(&self, key: &str) -> Option<Size> {
        self.cache.get(key).copied()
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: ImageSource> ImageSource for CachedImageSource<S> {
    fn dimensions(&mut self, key: &str) -> Result<Size, ImageSourceError> {
        if let Some(size) = self.cache.get(key) {
            return Ok(*size);
        }
        let size = self.inner.dimensions(key)?;
        log::trace!("Measured {}: {}x{}", key, size.width, size.height);
        self.cache.insert(key.to_string(), size);
        Ok(size)
    }
}

/// Check the file extension against [`IMAGE_EXTENSIONS`].
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts lookups so caching can be observed.
    struct Counting {
        calls: usize,
    }

    impl ImageSource for Counting {
        fn dimensions(&mut self, key: &str) -> Result<Size, ImageSourceError> {
            self.calls += 1;
            if key == "missing" {
                return Err(ImageSourceError::NotFound {
                    key: key.to_string(),
                });
            }
            Ok(Size::new(640.0, 480.0))
        }
    }

    #[test]
    fn test_cache_measures_once() {
        let mut source = CachedImageSource::new(Counting { calls: 0 });
        assert_eq!(source.dimensions("a.png").ok(), Some(Size::new(640.0, 480.0)));
        assert_eq!(source.dimensions("a.png").ok(), Some(Size::new(640.0, 480.0)));
        assert_eq!(source.inner().calls, 1);
    }

    #[test]
    fn test_failures_not_cached() {
        let mut source = CachedImageSource::new(Counting { calls: 0 });
        assert!(source.dimensions("missing").is_err());
        assert!(source.dimensions("missing").is_err());
        assert_eq!(source.inner().calls, 2);
        assert!(source.cached("missing").is_none());
    }

    #[test]
    fn test_known_dimensions_skip_inner() {
        let mut source = CachedImageSource::new(Counting { calls: 0 });
        source.insert_known("b.jpg", Size::new(10.0, 20.0));
        source.insert_known("zero.jpg", Size::default());
        assert_eq!(source.dimensions("b.jpg").ok(), Some(Size::new(10.0, 20.0)));
        assert_eq!(source.inner().calls, 0);
        assert!(source.cached("zero.jpg").is_none());
    }

    #[test]
    fn test_map_source() {
        let mut map = HashMap::new();
        map.insert("x.png".to_string(), Size::new(3.0, 4.0));
        assert_eq!(map.dimensions("x.png").ok(), Some(Size::new(3.0, 4.0)));
        assert!(matches!(
            map.dimensions("y.png"),
            Err(ImageSourceError::NotFound { .. })
        ));
    }

    #[test]
    fn test_image_extensions() {
        assert!(is_image_path(Path::new("a/b/photo.JPG")));
        assert!(is_image_path(Path::new("scan.tif")));
        assert!(!is_image_path(Path::new("labels.txt")));
        assert!(!is_image_path(Path::new("noext")));
    }

    #[test]
    fn test_fs_source_reads_header() {
        let dir = std::env::temp_dir().join(format!("yolo_labeler_fs_{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        let img = image::RgbImage::new(12, 7);
        img.save(dir.join("tiny.png")).expect("save png");
        std::fs::write(dir.join("notes.txt"), "x").expect("write");

        let mut source = FsImageSource::new(&dir);
        assert_eq!(source.dimensions("tiny.png").ok(), Some(Size::new(12.0, 7.0)));
        assert!(matches!(
            source.dimensions("nope.png"),
            Err(ImageSourceError::NotFound { .. })
        ));
        assert_eq!(source.list_images().ok(), Some(vec!["tiny.png".to_string()]));

        std::fs::remove_dir_all(&dir).ok();
    }
}

//! Where raw address text comes from: manual entry or OCR over an image.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{Error, Result};
use crate::types::RawAddress;

/// Image extensions accepted for OCR.
pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Text recognition collaborator.
pub trait TextExtractor {
    /// Extract all text from a decoded, supported image file.
    fn extract_text(&self, image: &Path) -> Result<String>;
}

/// OCR through the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
    language: String,
}

impl TesseractOcr {
    /// Use `tesseract` from `PATH` with English models.
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: "eng".to_string(),
        }
    }

    /// Use a specific tesseract executable.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Set the tesseract language pack (e.g. "eng", "eng+tel").
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for TesseractOcr {
    fn extract_text(&self, image: &Path) -> Result<String> {
        debug!(image = %image.display(), lang = %self.language, "running tesseract");

        let output = Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| {
                Error::ocr(format!("Failed to run {}: {e}", self.binary.display()))
            })?;

        if !output.status.success() {
            return Err(Error::ocr(format!(
                "tesseract failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Input modality for an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressSource {
    /// Text typed by the user
    Manual(String),
    /// Uploaded image to run OCR over
    Image(PathBuf),
}

impl AddressSource {
    /// Produce the raw address for this source.
    ///
    /// Manual text is returned untouched. Images must carry a supported
    /// extension and decode cleanly before OCR runs; the OCR text itself is
    /// not validated.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedImage`], [`Error::ImageDecode`], or whatever the
    /// extractor reports.
    pub fn resolve<E: TextExtractor + ?Sized>(&self, ocr: &E) -> Result<RawAddress> {
        match self {
            AddressSource::Manual(text) => Ok(RawAddress::new(text.clone())),
            AddressSource::Image(path) => {
                check_image(path)?;
                let text = ocr.extract_text(path)?;
                debug!(chars = text.len(), "ocr finished");
                Ok(RawAddress::new(text))
            }
        }
    }
}

fn check_image(path: &Path) -> Result<()> {
    let supported = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_IMAGE_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false);
    if !supported {
        return Err(Error::UnsupportedImage {
            path: path.display().to_string(),
        });
    }

    let image = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| Error::ImageDecode {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    debug!(width = image.width(), height = image.height(), "decoded image");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::cell::Cell;
    use std::io::Write;

    struct FakeOcr {
        text: &'static str,
        calls: Cell<usize>,
    }

    impl FakeOcr {
        fn new(text: &'static str) -> Self {
            Self {
                text,
                calls: Cell::new(0),
            }
        }
    }

    impl TextExtractor for FakeOcr {
        fn extract_text(&self, _image: &Path) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.text.to_string())
        }
    }

    fn write_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::new(4, 4)
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();
        path
    }

    #[test]
    fn test_manual_source_is_verbatim() {
        let ocr = FakeOcr::new("unused");
        let raw = AddressSource::Manual("  Sontyam, Visakhapatnam ".to_string())
            .resolve(&ocr)
            .unwrap();
        assert_eq!(raw.as_str(), "  Sontyam, Visakhapatnam ");
        assert_eq!(ocr.calls.get(), 0);
    }

    #[test]
    fn test_image_source_runs_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "label.PNG");
        let ocr = FakeOcr::new("Gajuwaka, Visakhapatnam\n");

        let raw = AddressSource::Image(path).resolve(&ocr).unwrap();
        assert_eq!(raw.as_str(), "Gajuwaka, Visakhapatnam\n");
        assert_eq!(ocr.calls.get(), 1);
    }

    #[test]
    fn test_blank_ocr_text_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "blank.png");
        let raw = AddressSource::Image(path)
            .resolve(&FakeOcr::new("\x0c"))
            .unwrap();
        assert!(!raw.is_present());
    }

    #[test]
    fn test_unsupported_extension() {
        let ocr = FakeOcr::new("x");
        let result = AddressSource::Image(PathBuf::from("scan.gif")).resolve(&ocr);
        assert_matches!(result, Err(Error::UnsupportedImage { .. }));
        assert_eq!(ocr.calls.get(), 0);
    }

    #[test]
    fn test_undecodable_image_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"definitely not a jpeg")
            .unwrap();

        let ocr = FakeOcr::new("x");
        let result = AddressSource::Image(path).resolve(&ocr);
        assert_matches!(result, Err(Error::ImageDecode { .. }));
        assert_eq!(ocr.calls.get(), 0);
    }

    #[test]
    fn test_missing_tesseract_binary() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png");
        let ocr = TesseractOcr::new().with_binary(dir.path().join("no-such-tesseract"));
        assert_matches!(ocr.extract_text(&path), Err(Error::Ocr { .. }));
    }
}

//! Screenshot capture import
//!
//! Region selection and the actual capture live in the host UI; the engine
//! only receives the resulting image bytes plus whatever text an OCR
//! collaborator could extract from them.

/// Best-effort text extraction from a captured image.
///
/// Implementations return an empty string when nothing is recognized or the
/// engine fails; the caller treats empty as "no text".
pub trait TextRecognizer: Send + Sync {
    fn recognize_text(&self, image: &[u8]) -> String;
}

/// Recognizer used when no OCR backend is wired up.
#[derive(Default)]
pub struct NoRecognizer;

impl TextRecognizer for NoRecognizer {
    fn recognize_text(&self, _image: &[u8]) -> String {
        String::new()
    }
}

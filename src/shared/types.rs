use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persisted clipboard entry: a text or image payload owned by a folder.
///
/// `created_at` is assigned once and is the sole sort key (newest first).
/// Copy and monitor paths produce single-payload clips; the screenshot import
/// is the only producer of clips with both image and (OCR) text set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: String,
    pub folder_id: String,
    pub created_at: DateTime<Utc>,
    pub text: Option<String>,
    pub image: Option<Vec<u8>>,
}

impl Clip {
    pub fn new(folder_id: &str, text: Option<String>, image: Option<Vec<u8>>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            folder_id: folder_id.to_string(),
            created_at: Utc::now(),
            text,
            image,
        }
    }

    /// Create a new text clip
    pub fn new_text(folder_id: &str, text: String) -> Self {
        Self::new(folder_id, Some(text), None)
    }

    /// Create a new image clip from raw encoded bytes
    pub fn new_image(folder_id: &str, image: Vec<u8>) -> Self {
        Self::new(folder_id, None, Some(image))
    }

    /// Truncated single-line preview for list display
    pub fn preview(&self) -> String {
        match &self.text {
            Some(text) if !text.is_empty() => {
                let line = text.lines().next().unwrap_or("");
                if line.chars().count() > 100 {
                    let truncated: String = line.chars().take(100).collect();
                    format!("{}...", truncated)
                } else {
                    line.to_string()
                }
            }
            _ => match &self.image {
                Some(bytes) => format!("[image {} bytes]", bytes.len()),
                None => String::new(),
            },
        }
    }
}

/// A named, user-managed grouping of clips; the unit of cascade deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Folder {
    pub fn new(name: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_long_text() {
        let long = "a".repeat(150);
        let clip = Clip::new_text("f1", long);
        let preview = clip.preview();
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 103);
    }

    #[test]
    fn test_preview_uses_first_line() {
        let clip = Clip::new_text("f1", "first line\nsecond line".to_string());
        assert_eq!(clip.preview(), "first line");
    }

    #[test]
    fn test_preview_for_image_clip() {
        let clip = Clip::new_image("f1", vec![1, 2, 3]);
        assert_eq!(clip.preview(), "[image 3 bytes]");
    }
}

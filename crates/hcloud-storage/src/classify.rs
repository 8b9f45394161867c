//! Upload classification by file extension.
//!
//! Every upload is checked against a denylist of executable and script
//! extensions first, then assigned a category whose size limit applies.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use hcloud_core::error::AppError;
use hcloud_core::result::AppResult;

const MIB: u64 = 1024 * 1024;

/// Extensions rejected regardless of size.
pub const DENIED_EXTENSIONS: &[&str] = &[
    ".exe", ".bat", ".cmd", ".com", ".pif", ".scr", ".vbs", ".js", ".jar", ".sh", ".php",
    ".asp", ".aspx", ".jsp", ".py", ".rb", ".pl",
];

/// Broad content category of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Image,
    Document,
    Video,
    Audio,
    Archive,
    Code,
    Other,
}

impl FileCategory {
    /// Largest accepted upload for this category, in bytes.
    pub fn max_size(&self) -> u64 {
        match self {
            Self::Image => 10 * MIB,
            Self::Document => 50 * MIB,
            Self::Video => 500 * MIB,
            Self::Audio => 100 * MIB,
            Self::Archive => 100 * MIB,
            Self::Code => 5 * MIB,
            Self::Other => 20 * MIB,
        }
    }

    fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Image => &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".svg"],
            Self::Document => &[
                ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".txt", ".md", ".rtf",
            ],
            Self::Video => &[".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv", ".webm"],
            Self::Audio => &[".mp3", ".wav", ".flac", ".aac", ".ogg", ".wma"],
            Self::Archive => &[".zip", ".rar", ".7z", ".tar", ".gz", ".bz2"],
            Self::Code => &[
                ".go", ".js", ".html", ".css", ".json", ".xml", ".yaml", ".yml", ".sql",
            ],
            Self::Other => &[],
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Image => "image",
            Self::Document => "document",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Archive => "archive",
            Self::Code => "code",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

impl FromStr for FileCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "document" => Ok(Self::Document),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "archive" => Ok(Self::Archive),
            "code" => Ok(Self::Code),
            "other" => Ok(Self::Other),
            _ => Err(AppError::validation(format!("Unknown file category '{s}'"))),
        }
    }
}

static CATEGORY_BY_EXTENSION: LazyLock<HashMap<&'static str, FileCategory>> = LazyLock::new(|| {
    [
        FileCategory::Image,
        FileCategory::Document,
        FileCategory::Video,
        FileCategory::Audio,
        FileCategory::Archive,
        FileCategory::Code,
    ]
    .into_iter()
    .flat_map(|category| category.extensions().iter().map(move |ext| (*ext, category)))
    .collect()
});

/// Outcome of classifying an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Content category.
    pub category: FileCategory,
    /// Lowercase extension including the dot, if the name has one.
    pub extension: Option<String>,
    /// MIME type derived from the extension.
    pub content_type: String,
}

/// Lowercase extension of `filename` including the leading dot.
pub fn extension_of(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_lowercase()))
}

/// MIME type for `filename`, defaulting to `application/octet-stream`.
pub fn content_type_of(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Check an upload's type and size before any bytes are stored.
pub fn classify(filename: &str, size: u64) -> AppResult<Classification> {
    let extension = extension_of(filename);

    if let Some(ext) = extension.as_deref() {
        if DENIED_EXTENSIONS.contains(&ext) {
            return Err(AppError::validation(format!(
                "File type '{ext}' is not allowed"
            )));
        }
    }

    let category = extension
        .as_deref()
        .and_then(|ext| CATEGORY_BY_EXTENSION.get(ext).copied())
        .unwrap_or(FileCategory::Other);

    let limit = category.max_size();
    if size > limit {
        return Err(AppError::validation(format!(
            "File of {size} bytes exceeds the {} MiB limit for {category} files",
            limit / MIB
        )));
    }

    Ok(Classification {
        category,
        extension,
        content_type: content_type_of(filename),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcloud_core::ErrorKind;

    #[test]
    fn test_category_parses_its_display_name() {
        for category in [FileCategory::Image, FileCategory::Archive, FileCategory::Other] {
            assert_eq!(category.to_string().parse::<FileCategory>().expect("parse"), category);
        }
        assert_eq!("VIDEO".parse::<FileCategory>().expect("upper"), FileCategory::Video);
        assert!("spreadsheet".parse::<FileCategory>().is_err());
    }

    #[test]
    fn test_categories() {
        let cases = [
            ("photo.JPG", FileCategory::Image),
            ("report.pdf", FileCategory::Document),
            ("notes.md", FileCategory::Document),
            ("clip.mkv", FileCategory::Video),
            ("song.flac", FileCategory::Audio),
            ("backup.tar.gz", FileCategory::Archive),
            ("schema.sql", FileCategory::Code),
            ("model.stl", FileCategory::Other),
            ("README", FileCategory::Other),
        ];
        for (name, expected) in cases {
            assert_eq!(classify(name, 1).expect(name).category, expected, "{name}");
        }
    }

    #[test]
    fn test_denylist_wins_over_category() {
        for name in ["setup.exe", "app.JS", "run.sh", "index.php", "tool.py"] {
            let err = classify(name, 1).expect_err(name);
            assert_eq!(err.kind, ErrorKind::Validation);
        }
    }

    #[test]
    fn test_size_limits_are_inclusive() {
        assert!(classify("a.png", 10 * MIB).is_ok());
        assert!(classify("a.png", 10 * MIB + 1).is_err());
        assert!(classify("a.json", 5 * MIB + 1).is_err());
        assert!(classify("a.bin", 20 * MIB).is_ok());
        assert!(classify("a.bin", 20 * MIB + 1).is_err());
        assert!(classify("a.mp4", 500 * MIB).is_ok());
    }

    #[test]
    fn test_content_type() {
        assert_eq!(classify("report.pdf", 1).expect("pdf").content_type, "application/pdf");
        assert_eq!(classify("photo.png", 1).expect("png").content_type, "image/png");
        assert_eq!(
            classify("blob.unknownext", 1).expect("other").content_type,
            "application/octet-stream"
        );
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("A.TXT").as_deref(), Some(".txt"));
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some(".gz"));
        assert_eq!(extension_of("noext"), None);
        assert_eq!(extension_of("trailing."), None);
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "m2ts", "ts",
];

const SAMPLE_MARKERS: &[&str] = &[
    "sample",
    "trailer",
    "extra",
    "deleted scene",
    "behind the scenes",
    "making of",
    "interview",
    "featurette",
];

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Tv,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "movie"),
            MediaKind::Tv => write!(f, "tv"),
        }
    }
}

/// Resolution token detected in a file path. Ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "480p")]
    Sd480,
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    FullHd1080,
    #[serde(rename = "2160p")]
    Uhd2160,
}

impl Resolution {
    /// Score bonus used for keeper selection. `None` means the resolution is unrecognised.
    pub fn bonus(self) -> Option<f64> {
        match self {
            Resolution::Uhd2160 => Some(400.0),
            Resolution::FullHd1080 => Some(300.0),
            Resolution::Hd720 => Some(200.0),
            Resolution::Sd480 => Some(100.0),
            Resolution::Unknown => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::Uhd2160 => "2160p",
            Resolution::FullHd1080 => "1080p",
            Resolution::Hd720 => "720p",
            Resolution::Sd480 => "480p",
            Resolution::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Distribution source of a TV episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Remux,
    BluRay,
    WebDl,
    Web,
    Hdtv,
    DvdRip,
    Unknown,
}

impl Source {
    pub fn bonus(self) -> f64 {
        match self {
            Source::Remux => 50.0,
            Source::BluRay => 40.0,
            Source::WebDl => 30.0,
            Source::Web => 25.0,
            Source::Hdtv => 20.0,
            Source::DvdRip => 10.0,
            Source::Unknown => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Remux => "REMUX",
            Source::BluRay => "BluRay",
            Source::WebDl => "WEB-DL",
            Source::Web => "WEB",
            Source::Hdtv => "HDTV",
            Source::DvdRip => "DVDRip",
            Source::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scanned video file. Never mutated after the scan that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    pub path: PathBuf,
    pub size: u64,
    pub resolution: Resolution,
    /// Only detected for TV episodes.
    pub source: Option<Source>,
    pub is_empty: bool,
}

impl MediaFile {
    pub fn movie(path: impl Into<PathBuf>, size: u64) -> Self {
        let path = path.into();
        let resolution = crate::normalize::extract_resolution(&path.to_string_lossy());
        Self {
            path,
            size,
            resolution,
            source: None,
            is_empty: size == 0,
        }
    }

    pub fn episode(path: impl Into<PathBuf>, size: u64) -> Self {
        let mut file = Self::movie(path, size);
        file.source = Some(crate::normalize::extract_source(
            &file.path.to_string_lossy(),
        ));
        file
    }

    pub fn size_gb(&self) -> f64 {
        self.size as f64 / BYTES_PER_GB
    }
}

pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Samples, trailers and extras get deleted rather than renamed.
pub fn is_sample_file(path: &Path) -> bool {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy().to_lowercase(),
        None => return false,
    };
    let normalized = name.replace(['.', '_'], " ");
    SAMPLE_MARKERS
        .iter()
        .any(|marker| normalized.contains(marker))
}

/// Video files under `dir`, counting at most `limit` of them. Returns (count, bytes).
pub fn quick_count_videos(dir: &Path, limit: usize) -> (usize, u64) {
    let mut count = 0;
    let mut total = 0u64;
    for entry in walkdir::WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if count >= limit {
            break;
        }
        if entry.file_type().is_file() && is_video_file(entry.path()) {
            count += 1;
            total += fs::metadata(entry.path()).map(|m| m.len()).unwrap_or(0);
        }
    }
    (count, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_video_file() {
        assert!(is_video_file(Path::new("/lib/Movie (2024)/Movie (2024).mkv")));
        assert!(is_video_file(Path::new("/lib/a.M2TS")));
        assert!(!is_video_file(Path::new("/lib/Movie (2024)/movie.nfo")));
        assert!(!is_video_file(Path::new("/lib/no_extension")));
    }

    #[test]
    fn test_is_sample_file() {
        assert!(is_sample_file(Path::new("/lib/Movie/movie-sample.mkv")));
        assert!(is_sample_file(Path::new("/lib/Movie/Movie.Behind.The.Scenes.mkv")));
        assert!(is_sample_file(Path::new("/lib/Movie/Featurette_01.mp4")));
        assert!(!is_sample_file(Path::new("/lib/Movie (2024)/Movie (2024).mkv")));
    }

    #[test]
    fn test_resolution_ordering() {
        assert!(Resolution::Uhd2160 > Resolution::FullHd1080);
        assert!(Resolution::FullHd1080 > Resolution::Hd720);
        assert!(Resolution::Hd720 > Resolution::Sd480);
        assert_eq!(Resolution::Unknown.bonus(), None);
    }

    #[test]
    fn test_media_file_detects_tokens() {
        let file = MediaFile::episode("/tv/Show/Season 01/Show.S01E01.1080p.WEB-DL.mkv", 10);
        assert_eq!(file.resolution, Resolution::FullHd1080);
        assert_eq!(file.source, Some(Source::WebDl));
        assert!(!file.is_empty);

        let empty = MediaFile::movie("/movies/Movie (2024)/Movie (2024).mkv", 0);
        assert!(empty.is_empty);
        assert_eq!(empty.source, None);
    }
}

//! Naming-convention checks against the `Title (Year)/Title (Year)[ S01E02].ext` layout.

use ahash::{AHashMap, AHashSet};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::media::{is_sample_file, MediaKind};
use crate::normalize::{
    clean_movie_name, collapse_spaces, extract_episode_info, extract_year, remove_years,
    EpisodeInfo,
};
use crate::titles::verify::Verifier;
use crate::titles::{resolve_episode, TitleDecision, TitleResolution};

const RELEASE_FOLDER_MARKERS: &[&str] = &[
    "1080P", "720P", "2160P", "4K", "BLURAY", "BLU-RAY", "BDRIP", "REMUX", "WEB-DL", "WEBDL",
    "WEB-RIP", "WEBRIP", "HDTV", "X264", "X265", "HEVC",
];

lazy_static! {
    static ref PAREN_YEAR: Regex = Regex::new(r"\(\d{4}\)").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// New name, same directory.
    Rename,
    /// Move into a new directory structure.
    Reorganize,
    ManualReview,
}

impl fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestedAction::Rename => write!(f, "rename"),
            SuggestedAction::Reorganize => write!(f, "reorganize"),
            SuggestedAction::ManualReview => write!(f, "manual_review"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceIssue {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub problem: String,
    /// Always inside the library root the file was found in.
    pub suggested_path: PathBuf,
    pub action: SuggestedAction,
}

impl ComplianceIssue {
    fn new(
        path: &Path,
        kind: MediaKind,
        problem: impl Into<String>,
        suggested_path: PathBuf,
        action: SuggestedAction,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            kind,
            problem: problem.into(),
            suggested_path,
            action,
        }
    }
}

/// Release-style names: quality markers, a `-GROUP` suffix, or dots used as separators.
pub fn is_release_group_folder(name: &str) -> bool {
    let upper = name.to_uppercase();
    if RELEASE_FOLDER_MARKERS.iter().any(|m| upper.contains(m)) {
        return true;
    }
    if name.contains('-') && !name.contains(" - ") {
        return true;
    }
    name.matches('.').count() >= 3
}

fn has_paren_year(name: &str) -> bool {
    PAREN_YEAR.is_match(name)
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn with_extension(name: &str, path: &Path) -> String {
    match path.extension() {
        Some(ext) => format!("{name}.{}", ext.to_string_lossy()),
        None => name.to_string(),
    }
}

/// `<dir>/<name>/<name>.<ext>`
fn canonical_movie_target(dir: &Path, name: &str, path: &Path) -> PathBuf {
    dir.join(name).join(with_extension(name, path))
}

/// First rule that applies to a movie file, if any.
pub fn check_movie(path: &Path, library_root: &Path) -> Option<ComplianceIssue> {
    let parent = path.parent()?;
    let parent_name = name_of(parent);
    let stem = stem_of(path);
    let grandparent = parent.parent().unwrap_or(library_root);

    let issue = |problem: &str, target: PathBuf| {
        (target != path).then(|| {
            ComplianceIssue::new(path, MediaKind::Movie, problem, target, SuggestedAction::Reorganize)
        })
    };

    if parent != library_root && is_release_group_folder(&parent_name) {
        let clean = clean_movie_name(&parent_name);
        return issue(
            "Release group folder naming (contains resolution/codec/source markers)",
            canonical_movie_target(library_root, &clean, path),
        );
    }

    if parent == library_root {
        let clean = clean_movie_name(&name_of(path));
        return issue(
            "Movie file directly in library root (should be in subfolder)",
            canonical_movie_target(library_root, &clean, path),
        );
    }

    if parent_name != stem {
        if has_paren_year(&parent_name) {
            let clean = clean_movie_name(&parent_name);
            if clean_movie_name(&stem) != clean {
                return issue(
                    "Folder name doesn't match filename",
                    canonical_movie_target(grandparent, &clean, path),
                );
            }
        }
        if extract_year(&parent_name).is_some() && extract_year(&stem).is_some() {
            // Both carry a year: the file name tends to be the cleaner source.
            let clean = clean_movie_name(&stem);
            return issue(
                "Folder name doesn't match filename",
                canonical_movie_target(grandparent, &clean, path),
            );
        }
    }

    if !has_paren_year(&parent_name) {
        if let Some(year) = extract_year(&parent_name) {
            let clean = format!("{} ({year})", collapse_spaces(&remove_years(&parent_name)));
            return issue(
                "Year not in parentheses format",
                canonical_movie_target(grandparent, &clean, path),
            );
        }
    }

    None
}

/// First rule that applies to an episode, if any. `resolution` is the show title
/// resolution for this file.
pub fn check_episode(
    path: &Path,
    library_root: &Path,
    episode: EpisodeInfo,
    resolution: &TitleResolution,
) -> Option<ComplianceIssue> {
    let show = resolution.canonical_name()?;
    let parent = path.parent()?;
    let season_dir = name_of(parent);
    let expected_season = format!("Season {:02}", episode.season);
    let target_name = with_extension(&format!("{show} {}", episode.tag()), path);
    let canonical_path = library_root.join(&show).join(&expected_season).join(&target_name);
    let ambiguous_note = if resolution.needs_review() {
        format!(" [AMBIGUOUS: {}]", resolution.reason)
    } else {
        String::new()
    };

    if season_dir != expected_season {
        return Some(ComplianceIssue::new(
            path,
            MediaKind::Tv,
            format!("Not in proper '{expected_season}' folder (found: {season_dir}){ambiguous_note}"),
            canonical_path,
            SuggestedAction::Reorganize,
        ));
    }

    if resolution.decision != TitleDecision::None && path != canonical_path {
        return Some(ComplianceIssue::new(
            path,
            MediaKind::Tv,
            format!("Show title decided as '{show}'"),
            canonical_path,
            SuggestedAction::Reorganize,
        ));
    }

    if is_release_group_folder(&name_of(path)) {
        return Some(ComplianceIssue::new(
            path,
            MediaKind::Tv,
            format!("Release group naming in filename{ambiguous_note}"),
            parent.join(target_name),
            SuggestedAction::Rename,
        ));
    }

    if resolution.needs_review()
        && resolution.folder_match.title != resolution.filename_match.title
    {
        return Some(ComplianceIssue::new(
            path,
            MediaKind::Tv,
            format!("Title mismatch: {}", resolution.reason),
            parent.join(target_name),
            SuggestedAction::ManualReview,
        ));
    }

    None
}

/// Downgrades later issues that want a target path an earlier issue already claimed.
#[derive(Debug, Default)]
pub struct CollisionTracker {
    targets: AHashMap<PathBuf, PathBuf>,
}

impl CollisionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, issue: &mut ComplianceIssue) {
        if issue.action == SuggestedAction::ManualReview {
            return;
        }
        match self.targets.get(&issue.suggested_path) {
            Some(first) => {
                debug!(
                    "Collision on {}: {} and {}",
                    issue.suggested_path.display(),
                    first.display(),
                    issue.path.display()
                );
                issue.problem = format!(
                    "COLLISION: Multiple files want same target (also: {})",
                    name_of(first)
                );
                issue.action = SuggestedAction::ManualReview;
            }
            None => {
                self.targets
                    .insert(issue.suggested_path.clone(), issue.path.clone());
            }
        }
    }
}

/// A video file found during a walk, with the library root it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LibraryFile {
    pub root: PathBuf,
    pub path: PathBuf,
}

fn skip(file: &LibraryFile, exclude: &AHashSet<PathBuf>) -> bool {
    exclude.contains(&file.path) || is_sample_file(&file.path)
}

/// Checks movie files in order. Files in `exclude` (slated for deletion) and samples are
/// skipped.
pub fn check_movies(files: &[LibraryFile], exclude: &AHashSet<PathBuf>) -> Vec<ComplianceIssue> {
    let mut collisions = CollisionTracker::new();
    let mut issues = Vec::new();
    for file in files.iter().filter(|f| !skip(f, exclude)) {
        if let Some(mut issue) = check_movie(&file.path, &file.root) {
            collisions.register(&mut issue);
            issues.push(issue);
        }
    }
    issues
}

#[derive(Debug, Default)]
pub struct TvCompliance {
    pub issues: Vec<ComplianceIssue>,
    /// One entry per show folder, with every affected episode.
    pub ambiguous: Vec<TitleResolution>,
}

/// Checks episode files in order, resolving each show title and, when a verifier is
/// configured, settling ambiguous titles against it first.
pub fn check_episodes(
    files: &[LibraryFile],
    exclude: &AHashSet<PathBuf>,
    verifier: Option<&Verifier>,
) -> TvCompliance {
    let mut collisions = CollisionTracker::new();
    let mut result = TvCompliance::default();
    let mut seen: AHashMap<PathBuf, usize> = AHashMap::new();

    for file in files.iter().filter(|f| !skip(f, exclude)) {
        let Some(episode) = extract_episode_info(&name_of(&file.path)) else {
            continue;
        };

        let mut resolution = resolve_episode(&file.path, &file.root);
        if let Some(verifier) = verifier.filter(|v| v.is_configured()) {
            if resolution.ambiguous {
                // Failure leaves the resolution ambiguous.
                let _ = verifier.verify(&mut resolution);
            }
        }

        if resolution.ambiguous && !resolution.verified {
            let folder = resolution
                .folder_path
                .clone()
                .or_else(|| file.path.parent().map(Path::to_path_buf))
                .unwrap_or_default();
            match seen.get(&folder) {
                Some(&idx) => result.ambiguous[idx].affected_files.push(file.path.clone()),
                None => {
                    let mut show = resolution.clone();
                    show.folder_path = Some(folder.clone());
                    show.affected_files = vec![file.path.clone()];
                    seen.insert(folder, result.ambiguous.len());
                    result.ambiguous.push(show);
                }
            }
        }

        if let Some(mut issue) = check_episode(&file.path, &file.root, episode, &resolution) {
            collisions.register(&mut issue);
            result.issues.push(issue);
        }
    }
    result
}

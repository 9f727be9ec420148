//! Duplicate grouping and keeper selection.
//!
//! Files are grouped by a normalized name key, never by content. Within a group the
//! highest scoring file is the keeper and sits at index 0; everything else is a deletion
//! candidate.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::media::{MediaFile, MediaKind};
use crate::normalize::{
    extract_episode_info, extract_year, normalize_name, strip_video_extension, EpisodeInfo,
};
use crate::titles::{extract_show_title, show_folder};

pub const EMPTY_FILE_SCORE: f64 = -1000.0;
const MOVIE_SIZE_CAP_GB: f64 = 50.0;
const EPISODE_SIZE_CAP_GB: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub kind: MediaKind,
    /// `normalized title|year` for movies, `normalized show|S01E02` for episodes.
    pub key: String,
    pub title: String,
    pub year: Option<u16>,
    pub episode: Option<EpisodeInfo>,
    /// Index 0 is the keeper once [`select_keeper`] has run.
    pub files: Vec<MediaFile>,
}

impl DuplicateGroup {
    pub fn keeper(&self) -> Option<&MediaFile> {
        self.files.first()
    }

    pub fn deletions(&self) -> &[MediaFile] {
        self.files.get(1..).unwrap_or(&[])
    }

    pub fn reclaimable_bytes(&self) -> u64 {
        self.deletions().iter().map(|f| f.size).sum()
    }

    pub fn label(&self) -> String {
        match (&self.episode, self.year) {
            (Some(ep), _) => format!("{} {}", self.title, ep.tag()),
            (None, Some(year)) => format!("{} ({year})", self.title),
            (None, None) => self.title.clone(),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Grouping key for a movie: the parent folder name, or the file name when the file sits
/// directly in the library root.
pub fn movie_key(path: &Path, library_root: &Path) -> (String, String, Option<u16>) {
    let source = match path.parent() {
        Some(parent) if parent != library_root => parent
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name(path)),
        _ => strip_video_extension(&file_name(path)).to_string(),
    };
    let normalized = normalize_name(&source);
    let year = extract_year(&source);
    let key = format!(
        "{}|{}",
        normalized,
        year.map(|y| y.to_string()).unwrap_or_default()
    );
    (key, normalized, year)
}

/// Grouping key for an episode. `None` when the file name carries no episode marker.
///
/// The show name comes from the show folder; episodes without one fall back to the name
/// embedded in the file name.
pub fn episode_key(path: &Path, library_root: &Path) -> Option<(String, String, EpisodeInfo)> {
    let name = file_name(path);
    let episode = extract_episode_info(&name)?;
    let show = match show_folder(path, library_root) {
        Some(folder) => extract_show_title(&file_name(&folder)).0,
        None => extract_show_title(&name).0,
    };
    let normalized = normalize_name(&show);
    let key = format!("{}|{}", normalized, episode.tag());
    Some((key, normalized, episode))
}

fn base_score(file: &MediaFile, size_cap_gb: f64) -> f64 {
    let size = file.size_gb().min(size_cap_gb);
    // Unlabelled files are judged by size alone so a big untagged rip beats a small 1080p one.
    let quality = file.resolution.bonus().unwrap_or(size * 100.0);
    quality + size
}

pub fn score_movie(file: &MediaFile) -> f64 {
    if file.is_empty {
        return EMPTY_FILE_SCORE;
    }
    base_score(file, MOVIE_SIZE_CAP_GB)
}

pub fn score_episode(file: &MediaFile) -> f64 {
    if file.is_empty {
        return EMPTY_FILE_SCORE;
    }
    let source = file.source.map(|s| s.bonus()).unwrap_or(0.0);
    base_score(file, EPISODE_SIZE_CAP_GB) + source
}

pub fn score(kind: MediaKind, file: &MediaFile) -> f64 {
    match kind {
        MediaKind::Movie => score_movie(file),
        MediaKind::Tv => score_episode(file),
    }
}

/// Moves the best file to index 0. Ties keep the earlier file.
pub fn select_keeper(group: &mut DuplicateGroup) {
    let mut best = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (idx, file) in group.files.iter().enumerate() {
        let s = score(group.kind, file);
        if s > best_score {
            best = idx;
            best_score = s;
        }
    }
    group.files.swap(0, best);
}

pub fn mark_keepers(groups: &mut [DuplicateGroup]) {
    groups.iter_mut().for_each(select_keeper);
}

pub fn delete_list(groups: &[DuplicateGroup]) -> Vec<PathBuf> {
    groups
        .iter()
        .flat_map(|g| g.deletions().iter().map(|f| f.path.clone()))
        .collect()
}

pub fn space_to_free(groups: &[DuplicateGroup]) -> u64 {
    groups.iter().map(DuplicateGroup::reclaimable_bytes).sum()
}

/// Accumulates files into groups while a library is walked.
#[derive(Debug, Default)]
pub struct GroupMap {
    groups: AHashMap<String, DuplicateGroup>,
}

impl GroupMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn add_movie(&mut self, file: MediaFile, library_root: &Path) {
        let (key, title, year) = movie_key(&file.path, library_root);
        self.groups
            .entry(key.clone())
            .or_insert_with(|| DuplicateGroup {
                kind: MediaKind::Movie,
                key,
                title,
                year,
                episode: None,
                files: Vec::new(),
            })
            .files
            .push(file);
    }

    /// Returns false when the file is not an episode.
    pub fn add_episode(&mut self, file: MediaFile, library_root: &Path) -> bool {
        let Some((key, title, episode)) = episode_key(&file.path, library_root) else {
            return false;
        };
        self.groups
            .entry(key.clone())
            .or_insert_with(|| DuplicateGroup {
                kind: MediaKind::Tv,
                key,
                title,
                year: None,
                episode: Some(episode),
                files: Vec::new(),
            })
            .files
            .push(file);
        true
    }

    pub fn merge(&mut self, other: GroupMap) {
        for (key, group) in other.groups {
            match self.groups.get_mut(&key) {
                Some(existing) => existing.files.extend(group.files),
                None => {
                    self.groups.insert(key, group);
                }
            }
        }
    }

    /// Groups with at least two files, keepers selected, sorted by key.
    pub fn into_duplicates(self) -> Vec<DuplicateGroup> {
        let mut duplicates: Vec<DuplicateGroup> = self
            .groups
            .into_values()
            .filter(|g| g.files.len() > 1)
            .collect();
        for group in duplicates.iter_mut() {
            group.files.sort_by(|a, b| a.path.cmp(&b.path));
        }
        mark_keepers(&mut duplicates);
        duplicates.sort_by(|a, b| a.key.cmp(&b.key));
        duplicates
    }
}

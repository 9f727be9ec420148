use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::compliance::{check_episode, check_movie, CollisionTracker, ComplianceIssue};
use crate::duplicates::DuplicateGroup;
use crate::engine::ScanResult;
use crate::media::MediaKind;
use crate::normalize::extract_episode_info;
use crate::titles::{resolve_episode, TitleDecision, TitleResolution};

/// Choices made by the user between a scan and its cleanup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDecisions {
    /// Group key to the index of the file to keep instead of the scored keeper.
    pub keep_overrides: BTreeMap<String, usize>,
    /// Groups left untouched.
    pub skipped_groups: BTreeSet<String>,
    /// Show folder to the title decision for it.
    pub title_decisions: BTreeMap<PathBuf, TitleDecision>,
}

impl UserDecisions {
    pub fn is_empty(&self) -> bool {
        self.keep_overrides.is_empty()
            && self.skipped_groups.is_empty()
            && self.title_decisions.is_empty()
    }

    /// Applies every decision to `result` and brings its issues and totals back in line.
    pub fn apply(&self, result: &mut ScanResult) {
        let before: AHashSet<PathBuf> = result.delete_list().into_iter().collect();

        self.apply_to_groups(&mut result.movie_duplicates);
        self.apply_to_groups(&mut result.tv_duplicates);

        let after: AHashSet<PathBuf> = result.delete_list().into_iter().collect();
        let revived: Vec<PathBuf> = before.difference(&after).cloned().collect();

        let mut replaced: AHashSet<PathBuf> = AHashSet::new();
        let mut fresh: Vec<ComplianceIssue> = Vec::new();

        for resolution in result.ambiguous_titles.iter_mut() {
            let Some(decision) = resolution
                .folder_path
                .as_ref()
                .and_then(|folder| self.title_decisions.get(folder))
            else {
                continue;
            };
            resolution.decision = decision.clone();
            debug!(
                "Title decision for {:?}: {:?}",
                resolution.folder_path, resolution.decision
            );
            for file in &resolution.affected_files {
                replaced.insert(file.clone());
                if let Some(issue) = episode_issue(file, &result.tv_roots, resolution) {
                    fresh.push(issue);
                }
            }
        }

        for file in revived.iter().filter(|f| !replaced.contains(*f)) {
            if let Some(issue) = revived_issue(file, result) {
                fresh.push(issue);
            }
        }

        result
            .compliance_issues
            .retain(|issue| !replaced.contains(&issue.path) && !after.contains(&issue.path));

        let mut collisions = CollisionTracker::new();
        for issue in result.compliance_issues.iter_mut() {
            collisions.register(issue);
        }
        for mut issue in fresh {
            collisions.register(&mut issue);
            result.compliance_issues.push(issue);
        }

        result.recompute_totals();
    }

    fn apply_to_groups(&self, groups: &mut Vec<DuplicateGroup>) {
        groups.retain(|group| !self.skipped_groups.contains(&group.key));
        for group in groups.iter_mut() {
            let Some(&index) = self.keep_overrides.get(&group.key) else {
                continue;
            };
            if index >= group.files.len() {
                warn!(
                    "Ignoring keep override {} for {}: group has {} files",
                    index,
                    group.key,
                    group.files.len()
                );
                continue;
            }
            group.files.swap(0, index);
        }
    }
}

fn root_of<'a>(file: &Path, roots: &'a [PathBuf]) -> Option<&'a Path> {
    roots
        .iter()
        .filter(|root| file.starts_with(root))
        .max_by_key(|root| root.components().count())
        .map(PathBuf::as_path)
}

fn episode_issue(
    file: &Path,
    tv_roots: &[PathBuf],
    resolution: &TitleResolution,
) -> Option<ComplianceIssue> {
    let root = root_of(file, tv_roots)?;
    let episode = extract_episode_info(&file.file_name()?.to_string_lossy())?;
    check_episode(file, root, episode, resolution)
}

/// Naming issue for a file that was slated for deletion and is now kept.
fn revived_issue(file: &Path, result: &ScanResult) -> Option<ComplianceIssue> {
    let kind = if result
        .tv_duplicates
        .iter()
        .any(|g| g.files.iter().any(|f| f.path == file))
    {
        MediaKind::Tv
    } else {
        MediaKind::Movie
    };
    match kind {
        MediaKind::Movie => check_movie(file, root_of(file, &result.movie_roots)?),
        MediaKind::Tv => {
            let root = root_of(file, &result.tv_roots)?;
            episode_issue(file, &result.tv_roots, &resolve_episode(file, root))
        }
    }
}

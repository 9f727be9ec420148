//! TV show title resolution.
//!
//! Every episode carries two opinions about its show name: the show folder and the file
//! name. [`resolve`] compares them and either settles on one or flags the pair as
//! ambiguous, in which case [`verify::Verifier`] can ask an external metadata service.

pub mod providers;
pub mod verify;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::normalize::{
    collapse_spaces, episode_marker_start, is_garbage_title, remove_episode_markers,
    strip_release_tokens, strip_video_extension, title_case,
};

const SUBTITLE_PHRASES: &[&str] = &[
    "the series",
    "the animated series",
    "the next generation",
    "the original series",
    "deep space nine",
    "voyager",
    "enterprise",
];

const QUALITY_MARKERS: &[&str] = &["1080p", "720p", "x264", "x265", "bluray", "web-dl"];

lazy_static! {
    static ref PAREN_YEAR: Regex = Regex::new(r"[.\s]*\((\d{4})\)").unwrap();
    static ref SPACED_PAREN_YEAR: Regex = Regex::new(r"\s*\((\d{4})\)").unwrap();
    static ref SEASON_DIR: Regex = Regex::new(r"(?i)^(season\s*\d+|s\d{1,3}|specials)$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Folder,
    Filename,
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchSource::Folder => write!(f, "folder"),
            MatchSource::Filename => write!(f, "filename"),
        }
    }
}

/// A title pulled out of one name, with how much we trust it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleMatch {
    pub title: String,
    pub source: MatchSource,
    pub year: Option<u16>,
    pub confidence: f64,
}

impl TitleMatch {
    /// Extracts the show title from `raw` (a folder or file name) and scores it.
    pub fn extract(raw: &str, source: MatchSource) -> Self {
        let (title, year) = extract_show_title(raw);
        let confidence = title_confidence(&title, raw);
        Self {
            title,
            source,
            year,
            confidence,
        }
    }
}

/// What the user decided for an ambiguous show.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "title", rename_all = "snake_case")]
pub enum TitleDecision {
    #[default]
    None,
    FolderTitle,
    FilenameTitle,
    CustomTitle(String),
    Skipped,
}

/// A series an external provider returned for one of the two titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesCandidate {
    pub provider: String,
    pub id: String,
    pub name: String,
    pub year: Option<String>,
    pub matched: MatchSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleResolution {
    pub resolved_title: String,
    pub folder_match: TitleMatch,
    pub filename_match: TitleMatch,
    pub outcome: ResolutionOutcome,
    pub ambiguous: bool,
    pub confidence: f64,
    pub verified: bool,
    pub reason: String,
    #[serde(default)]
    pub decision: TitleDecision,
    #[serde(default)]
    pub candidates: Vec<SeriesCandidate>,
    /// Show folder the resolution was derived from, if the episode sits in one.
    #[serde(default)]
    pub folder_path: Option<PathBuf>,
    #[serde(default)]
    pub affected_files: Vec<PathBuf>,
}

impl TitleResolution {
    /// True when the resolution still needs a human.
    pub fn needs_review(&self) -> bool {
        self.ambiguous && !self.verified && self.decision == TitleDecision::None
    }

    /// Title after applying the user's decision. `None` when the show was skipped.
    pub fn effective_title(&self) -> Option<&str> {
        match &self.decision {
            TitleDecision::None => Some(&self.resolved_title),
            TitleDecision::FolderTitle => Some(&self.folder_match.title),
            TitleDecision::FilenameTitle => Some(&self.filename_match.title),
            TitleDecision::CustomTitle(title) => Some(title),
            TitleDecision::Skipped => None,
        }
    }

    pub fn year(&self) -> Option<u16> {
        self.folder_match.year.or(self.filename_match.year)
    }

    /// `"Title (Year)"`, or the bare title when no year is known.
    pub fn canonical_name(&self) -> Option<String> {
        let title = self.effective_title()?;
        Some(match self.year() {
            Some(year) => format!("{title} ({year})"),
            None => title.to_string(),
        })
    }
}

/// How the folder and filename titles relate when the filename is much longer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Divergence {
    /// The folder title is under five characters and probably truncated.
    ShortFolder,
    /// The filename is the folder title plus a known show subtitle.
    FilenameSubtitle,
    /// The filename is the folder title plus a leftover episode title.
    TrailingEpisodeTitle,
    /// The filename is longer for no recognisable reason.
    FilenameLonger,
    /// The folder title is much longer than the filename's.
    FolderLonger,
}

/// The branch of the resolution rules a title pair landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "divergence", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    ExactMatch,
    FragmentMatch,
    SubtitleExtension,
    LengthDivergent(Divergence),
    NormalizedMatch,
    Conflicting,
}

impl ResolutionOutcome {
    pub fn prefers(self) -> MatchSource {
        match self {
            ResolutionOutcome::LengthDivergent(
                Divergence::ShortFolder | Divergence::FilenameSubtitle | Divergence::FilenameLonger,
            ) => MatchSource::Filename,
            _ => MatchSource::Folder,
        }
    }

    pub fn is_ambiguous(self) -> bool {
        matches!(
            self,
            ResolutionOutcome::LengthDivergent(
                Divergence::ShortFolder
                    | Divergence::FilenameSubtitle
                    | Divergence::FilenameLonger
                    | Divergence::FolderLonger
            ) | ResolutionOutcome::Conflicting
        )
    }

    fn confidence(self, folder: &TitleMatch, filename: &TitleMatch) -> f64 {
        match self {
            ResolutionOutcome::LengthDivergent(Divergence::FolderLonger) => {
                folder.confidence * 0.85
            }
            ResolutionOutcome::LengthDivergent(Divergence::TrailingEpisodeTitle) => {
                folder.confidence
            }
            ResolutionOutcome::LengthDivergent(_) => filename.confidence * 0.8,
            ResolutionOutcome::Conflicting => 0.5,
            _ => folder.confidence,
        }
    }

    fn reason(self, folder: &str, filename: &str) -> String {
        match self {
            ResolutionOutcome::ExactMatch => "Folder and filename titles match".to_string(),
            ResolutionOutcome::FragmentMatch => {
                "Filename is incomplete fragment of folder title".to_string()
            }
            ResolutionOutcome::SubtitleExtension => {
                "Folder contains complete show title with host/subtitle".to_string()
            }
            ResolutionOutcome::LengthDivergent(Divergence::ShortFolder) => {
                "Folder title is very short, filename provides more complete title".to_string()
            }
            ResolutionOutcome::LengthDivergent(Divergence::FilenameSubtitle) => {
                "Filename contains show subtitle not in folder name".to_string()
            }
            ResolutionOutcome::LengthDivergent(Divergence::TrailingEpisodeTitle) => {
                "Filename includes episode title after show name".to_string()
            }
            ResolutionOutcome::LengthDivergent(Divergence::FilenameLonger) => {
                "Filename has significantly longer title".to_string()
            }
            ResolutionOutcome::LengthDivergent(Divergence::FolderLonger) => {
                "Folder has significantly longer title than filename".to_string()
            }
            ResolutionOutcome::NormalizedMatch => {
                "Titles are essentially the same (minor formatting differences)".to_string()
            }
            ResolutionOutcome::Conflicting => format!(
                "Conflicting titles: '{folder}' (folder) vs '{filename}' (filename)"
            ),
        }
    }
}

/// Year written as `(YYYY)` somewhere in `name`, within [1900, 2099].
fn paren_year(name: &str) -> Option<u16> {
    let caps = PAREN_YEAR.captures(name)?;
    let year: u16 = caps[1].parse().ok()?;
    (1900..=2099).contains(&year).then_some(year)
}

/// Shortens `name` to the show part: everything before the first `S##E##`, or, failing
/// that, everything before a trailing ` - Episode Title`.
fn remove_episode_titles(name: &str) -> String {
    if let Some(start) = episode_marker_start(name) {
        return name[..start].trim().to_string();
    }
    if let Some(idx) = name.rfind(" - ") {
        if !looks_like_show_subtitle(&name[idx + 3..]) {
            return name[..idx].trim().to_string();
        }
    }
    name.trim().to_string()
}

/// Show subtitles ("The Next Generation") as opposed to episode titles ("Live To Tell").
pub fn looks_like_show_subtitle(s: &str) -> bool {
    let lower = s.to_lowercase();
    if SUBTITLE_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        return true;
    }
    let words: Vec<&str> = lower.split_whitespace().collect();
    (2..=3).contains(&words.len()) && words[0] == "the"
}

/// Pulls a show title and parenthesised year out of a folder or episode file name.
pub fn extract_show_title(name: &str) -> (String, Option<u16>) {
    let mut name = strip_video_extension(name.trim()).to_string();

    let year = paren_year(&name);
    if let Some(year) = year {
        let year = year.to_string();
        name = SPACED_PAREN_YEAR
            .replace_all(&name, |caps: &Captures| {
                if caps[1] == year {
                    " ".to_string()
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned();
    }

    let name = remove_episode_titles(&name);
    let name = remove_episode_markers(&name);
    let name = strip_release_tokens(&name);
    let name = name.trim_matches(|c: char| c == '-' || c.is_whitespace());
    (title_case(&collapse_spaces(name)), year)
}

/// Confidence in an extracted title, in [0, 1]. `original` is the raw name it came from.
pub fn title_confidence(title: &str, original: &str) -> f64 {
    let mut confidence = 1.0;
    if is_garbage_title(title) {
        confidence -= 0.8;
    }
    if title.chars().count() < 3 {
        confidence -= 0.5;
    }
    if !title.contains(' ') {
        confidence -= 0.3;
    }
    if original.contains('(') && original.contains(')') {
        confidence += 0.1;
    }
    let lower = original.to_lowercase();
    if QUALITY_MARKERS.iter().any(|marker| lower.contains(marker)) {
        confidence -= 0.1;
    }
    f64::clamp(confidence, 0.0, 1.0)
}

fn length_threshold(len: usize) -> usize {
    (len * 30 / 100).max(5)
}

/// Decides how a folder title and a filename title relate.
///
/// Lengths are byte lengths. The branches are checked in a fixed order and the first
/// that applies wins.
pub fn classify(folder: &str, filename: &str) -> ResolutionOutcome {
    let folder_lower = folder.to_lowercase();
    let filename_lower = filename.to_lowercase();

    if folder_lower == filename_lower {
        return ResolutionOutcome::ExactMatch;
    }

    if filename.len() + 2 < folder.len()
        && folder_lower.split_whitespace().any(|word| word == filename_lower)
    {
        return ResolutionOutcome::FragmentMatch;
    }

    if folder_lower.starts_with(&filename_lower) && folder_lower.len() > filename_lower.len() + 1 {
        if let Some(extra) = folder.get(filename.len()..) {
            let extra = extra.trim();
            let extra_lower = extra.to_lowercase();
            if extra_lower.starts_with("with ")
                || extra_lower.starts_with("the ")
                || looks_like_show_subtitle(extra)
            {
                return ResolutionOutcome::SubtitleExtension;
            }
        }
    }

    if filename.len() > folder.len() + length_threshold(folder.len()) {
        if folder.len() < 5 {
            return ResolutionOutcome::LengthDivergent(Divergence::ShortFolder);
        }
        let prefixed = filename_lower.starts_with(&folder_lower)
            && filename_lower.as_bytes().get(folder_lower.len()) == Some(&b' ');
        if prefixed {
            let extra = filename.get(folder.len() + 1..).unwrap_or_default();
            return if looks_like_show_subtitle(extra) {
                ResolutionOutcome::LengthDivergent(Divergence::FilenameSubtitle)
            } else {
                ResolutionOutcome::LengthDivergent(Divergence::TrailingEpisodeTitle)
            };
        }
        return ResolutionOutcome::LengthDivergent(Divergence::FilenameLonger);
    }

    if folder.len() > filename.len() + length_threshold(filename.len()) {
        return ResolutionOutcome::LengthDivergent(Divergence::FolderLonger);
    }

    let squash = |s: &str| s.replace(' ', "").to_lowercase();
    if squash(folder) == squash(filename) {
        return ResolutionOutcome::NormalizedMatch;
    }

    ResolutionOutcome::Conflicting
}

/// Combines a folder match and a filename match into a resolution.
pub fn resolve(folder: TitleMatch, filename: TitleMatch) -> TitleResolution {
    let outcome = classify(&folder.title, &filename.title);
    let resolved_title = match outcome.prefers() {
        MatchSource::Folder => folder.title.clone(),
        MatchSource::Filename => filename.title.clone(),
    };
    TitleResolution {
        resolved_title,
        confidence: outcome.confidence(&folder, &filename),
        ambiguous: outcome.is_ambiguous(),
        reason: outcome.reason(&folder.title, &filename.title),
        outcome,
        verified: false,
        decision: TitleDecision::None,
        candidates: Vec::new(),
        folder_path: None,
        affected_files: Vec::new(),
        folder_match: folder,
        filename_match: filename,
    }
}

pub fn is_season_dir(name: &str) -> bool {
    SEASON_DIR.is_match(name.trim())
}

/// The folder naming the show for an episode under `library_root`.
///
/// That is the grandparent when the episode sits in a season folder, otherwise the
/// parent. Episodes lying directly in the library root have no show folder.
pub fn show_folder(episode: &Path, library_root: &Path) -> Option<PathBuf> {
    let parent = episode.parent()?;
    if parent == library_root {
        return None;
    }
    let parent_name = parent.file_name()?.to_string_lossy();
    if is_season_dir(&parent_name) {
        let grandparent = parent.parent()?;
        if grandparent == library_root || !grandparent.starts_with(library_root) {
            return None;
        }
        return Some(grandparent.to_path_buf());
    }
    Some(parent.to_path_buf())
}

/// Resolves the show title of one episode file.
pub fn resolve_episode(episode: &Path, library_root: &Path) -> TitleResolution {
    let file_name = episode
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let filename_match = TitleMatch::extract(&file_name, MatchSource::Filename);

    let folder = show_folder(episode, library_root);
    let folder_match = match folder.as_deref().and_then(Path::file_name) {
        Some(name) => TitleMatch::extract(&name.to_string_lossy(), MatchSource::Folder),
        None => TitleMatch {
            source: MatchSource::Folder,
            ..filename_match.clone()
        },
    };

    let mut resolution = resolve(folder_match, filename_match);
    resolution.folder_path = folder;
    resolution
}

/// Resolutions that are ambiguous and were not settled by a metadata provider.
pub fn ambiguous_unverified(resolutions: &[TitleResolution]) -> Vec<&TitleResolution> {
    resolutions
        .iter()
        .filter(|r| r.ambiguous && !r.verified)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_names(folder: &str, file: &str) -> TitleResolution {
        resolve(
            TitleMatch::extract(folder, MatchSource::Folder),
            TitleMatch::extract(file, MatchSource::Filename),
        )
    }

    #[test]
    fn test_extract_show_title() {
        assert_eq!(
            extract_show_title("Degrassi (2001)"),
            ("Degrassi".to_string(), Some(2001))
        );
        assert_eq!(
            extract_show_title("Degrassi The Next Generation_S07E12_Live To Tell.mkv").0,
            "Degrassi The Next Generation"
        );
        assert_eq!(
            extract_show_title("Star.Trek.TNG.S01E01.720p.BluRay.x264-GROUP.mkv").0,
            "Star Trek TNG"
        );
        assert_eq!(
            extract_show_title("Friends (1994)"),
            ("Friends".to_string(), Some(1994))
        );
        assert_eq!(extract_show_title("Breaking Bad - Pilot.mkv").0, "Breaking Bad");
        assert_eq!(
            extract_show_title("Star Trek - The Next Generation (1987)"),
            ("Star Trek - The Next Generation".to_string(), Some(1987))
        );
        assert_eq!(
            extract_show_title("S.H.I.E.L.D. (2013)"),
            ("S.H.I.E.L.D.".to_string(), Some(2013))
        );
    }

    #[test]
    fn test_paren_year_only() {
        assert_eq!(paren_year("Show Name 2001"), None);
        assert_eq!(paren_year("Show Name [2001]"), None);
        assert_eq!(paren_year("Show (999)"), None);
        assert_eq!(paren_year("Show (3000)"), None);
        assert_eq!(paren_year("S.H.I.E.L.D. (2013)"), Some(2013));
    }

    #[test]
    fn test_looks_like_show_subtitle() {
        assert!(looks_like_show_subtitle("The Next Generation"));
        assert!(looks_like_show_subtitle("The Animated Series"));
        assert!(looks_like_show_subtitle("The Pilot"));
        assert!(!looks_like_show_subtitle("Live To Tell"));
        assert!(!looks_like_show_subtitle("Part 1"));
        assert!(!looks_like_show_subtitle("Episode Title"));
    }

    #[test]
    fn test_title_confidence() {
        let c = title_confidence("Breaking Bad", "Breaking Bad");
        assert!((0.9..=1.0).contains(&c));
        let c = title_confidence("Breaking Bad", "Breaking Bad (2008)");
        assert!((0.9..=1.0).contains(&c));
        assert!(title_confidence("X", "X") <= 0.5);
        let c = title_confidence("Game Of Thrones", "Game.of.Thrones.S01E01.1080p.BluRay.x264");
        assert!((0.8..=1.0).contains(&c));
        let c = title_confidence("The Wire", "The Wire");
        assert!((0.8..=1.0).contains(&c));
        assert!(title_confidence("RARBG", "RARBG") < 0.1);
    }

    #[test]
    fn test_classify_outcomes() {
        assert_eq!(classify("Friends", "friends"), ResolutionOutcome::ExactMatch);
        assert_eq!(classify("Star Trek", "Star"), ResolutionOutcome::FragmentMatch);
        assert_eq!(
            classify("Last Week Tonight With John Oliver", "Last Week Tonight"),
            ResolutionOutcome::SubtitleExtension
        );
        assert_eq!(
            classify("X", "X Files"),
            ResolutionOutcome::LengthDivergent(Divergence::ShortFolder)
        );
        assert_eq!(
            classify("Degrassi", "Degrassi The Next Generation"),
            ResolutionOutcome::LengthDivergent(Divergence::FilenameSubtitle)
        );
        assert_eq!(
            classify("Doctor Who", "Doctor Who Blink Again Tonight"),
            ResolutionOutcome::LengthDivergent(Divergence::TrailingEpisodeTitle)
        );
        assert_eq!(
            classify("Shield", "Agents Of SHIELD"),
            ResolutionOutcome::LengthDivergent(Divergence::FilenameLonger)
        );
        assert_eq!(
            classify("Star Trek - The Next Generation", "Star Trek TNG"),
            ResolutionOutcome::LengthDivergent(Divergence::FolderLonger)
        );
        assert_eq!(
            classify("Grey's Anatomy", "Greys Anatomy"),
            ResolutionOutcome::Conflicting
        );
        assert_eq!(
            classify("Spider Man", "SpiderMan"),
            ResolutionOutcome::NormalizedMatch
        );
    }

    #[test]
    fn test_degrassi_is_ambiguous_and_prefers_longer() {
        let r = resolve_names(
            "Degrassi (2001)",
            "Degrassi The Next Generation_S07E12_Live To Tell.mkv",
        );
        assert!(r.ambiguous);
        assert_eq!(r.resolved_title, "Degrassi The Next Generation");
        assert_eq!(r.year(), Some(2001));
    }

    #[test]
    fn test_matching_titles_are_not_ambiguous() {
        let r = resolve_names("Friends (1994)", "Friends (1994) S01E01.mkv");
        assert!(!r.ambiguous);
        assert_eq!(r.resolved_title, "Friends");
        assert_eq!(r.confidence, r.folder_match.confidence);

        let r = resolve_names(
            "Breaking Bad (2008)",
            "Breaking.Bad.S01E01.720p.BluRay.x264-GROUP.mkv",
        );
        assert!(!r.ambiguous);
        assert_eq!(r.resolved_title, "Breaking Bad");

        let r = resolve_names("Show (2020)", "Show.S01E01.1080p.WEB-DL.x264-GROUP.mkv");
        assert!(!r.ambiguous);
        assert_eq!(r.resolved_title, "Show");

        let r = resolve_names("Show", "Show_S01E01_The Beginning.mkv");
        assert!(!r.ambiguous);
        assert_eq!(r.resolved_title, "Show");
    }

    #[test]
    fn test_short_and_acronym_folders_are_ambiguous() {
        let r = resolve_names("X (2022)", "X Files S01E01.mkv");
        assert!(r.ambiguous);
        assert_eq!(r.resolved_title, "X Files");

        let r = resolve_names("SHIELD (2013)", "Agents of SHIELD S01E01.mkv");
        assert!(r.ambiguous);
        assert_eq!(r.resolved_title, "Agents Of SHIELD");

        let r = resolve_names("Star Trek - The Next Generation (1987)", "Star Trek TNG S01E01.mkv");
        assert!(r.ambiguous);
        assert_eq!(r.resolved_title, "Star Trek - The Next Generation");
    }

    #[test]
    fn test_conflicting_reason() {
        let r = resolve_names("Grey's Anatomy", "Greys Anatomy S01E01.mkv");
        assert!(r.ambiguous);
        assert_eq!(r.confidence, 0.5);
        assert_eq!(r.resolved_title, "Grey's Anatomy");
        assert_eq!(
            r.reason,
            "Conflicting titles: 'Grey's Anatomy' (folder) vs 'Greys Anatomy' (filename)"
        );
    }

    #[test]
    fn test_show_folder_layouts() {
        let root = Path::new("/tv");
        assert_eq!(
            show_folder(Path::new("/tv/Show (2020)/Season 01/Show S01E01.mkv"), root),
            Some(PathBuf::from("/tv/Show (2020)"))
        );
        assert_eq!(
            show_folder(Path::new("/tv/Show (2020)/Show S01E01.mkv"), root),
            Some(PathBuf::from("/tv/Show (2020)"))
        );
        assert_eq!(show_folder(Path::new("/tv/Show S01E01.mkv"), root), None);
        assert_eq!(show_folder(Path::new("/tv/Season 01/Show S01E01.mkv"), root), None);
    }

    #[test]
    fn test_resolve_episode_without_show_folder() {
        let r = resolve_episode(Path::new("/tv/Show.Name.S01E01.mkv"), Path::new("/tv"));
        assert_eq!(r.outcome, ResolutionOutcome::ExactMatch);
        assert_eq!(r.resolved_title, "Show Name");
        assert_eq!(r.folder_path, None);
    }

    #[test]
    fn test_decisions() {
        let mut r = resolve_names("Degrassi (2001)", "Degrassi The Next Generation S01E01.mkv");
        assert!(r.needs_review());
        r.decision = TitleDecision::FolderTitle;
        assert!(!r.needs_review());
        assert_eq!(r.canonical_name().as_deref(), Some("Degrassi (2001)"));
        r.decision = TitleDecision::CustomTitle("Degrassi TNG".to_string());
        assert_eq!(r.effective_title(), Some("Degrassi TNG"));
        r.decision = TitleDecision::Skipped;
        assert_eq!(r.canonical_name(), None);
    }

    #[test]
    fn test_ambiguous_unverified() {
        let a = resolve_names("Degrassi (2001)", "Degrassi The Next Generation S01E01.mkv");
        let mut b = a.clone();
        b.verified = true;
        let c = resolve_names("Friends (1994)", "Friends S01E01.mkv");
        let all = vec![a, b, c];
        assert_eq!(ambiguous_unverified(&all).len(), 1);
    }
}

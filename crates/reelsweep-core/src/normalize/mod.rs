//! Name normalisation for release-style folder and file names.
//!
//! Everything here is pure string processing. The pipelines are driven by the
//! precompiled regex tables below; order matters, since later patterns rely on the
//! tokens earlier ones have already removed.

pub mod blacklist;
pub mod casing;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::media::{Resolution, Source, VIDEO_EXTENSIONS};
use blacklist::{
    is_all_caps_legit_title, is_known_release_group, is_preserved_acronym, is_roman_numeral,
    mixes_letters_and_digits,
};

pub use blacklist::is_garbage_title;
pub use casing::title_case;

/// Quality and release tokens, applied in order to dot/underscore/hyphen-free text.
const RELEASE_PATTERNS: &[&str] = &[
    // resolution
    r"\b\d{3,4}[pi]\b",
    r"\b(4K|UHD)\b",
    // hdr, specific variants first
    r"\b(HDR10\+?|HDR10Plus|Dolby\s?Vision|DoVi|DV|HDR|HLG|PQ|SDR)\b",
    // audio
    r"\bDTS\s?HD(\s?(MA|HRA))?\b",
    r"\bDTS\s?(X|ES)\b",
    r"\b(DD\+?|DDP|E?AC3|AAC|AC3)\d\s\d\b",
    r"\b(DD\+?|DDP|E?AC3|AAC|AC3)\b",
    r"\b(TrueHD|Atmos|FLAC|PCM|Opus|MP3|DTS)\b",
    r"\d+Audio",
    r"MA\d+\s\d+",
    r"\bHD\b",
    r"\b(CBR|CRF)\b",
    r"\b\d\s\d\b",
    r"\b(Stereo|Mono)\b",
    r"\b(Extended Commentary|Plus Commentary|Audio Commentary|Commentary)\b",
    r"\bNORDiC\b",
    // source
    r"\b(BluRay|Blu\s?ray|BDRip|BRRip|REMUX|WEB\s?DL|WEBRip)\b",
    r"\b(HDTV|PDTV|SDTV|DVDRip|DVD|DVDSCR)\b",
    r"\b(HDTS|R5)\b",
    // streaming platforms
    r"\b(AMZN|NF|DSNP|HMAX|HULU|ATVP|PCOK|PMTP)\b",
    // language and subtitle tags
    r"\b(ITA|FRE|FRA|ENG|EN|ESP|ES|SPA|SUB|SUBS|SUBBED|DUB|DUBBED|MULTI)\b",
    // video codecs
    r"\bH\s?26[456]\b",
    r"\b(x264|x265|x266|HEVC|AVC|AV1)\b",
    r"\b(XviD|DivX|MPEG2|VC\s?1|VP9)\b",
    // editions
    r"\b(IMAX\s?Enhanced|IMAX|Remastered)\b",
    r"\b(Directors\s?Cut|DC|Theatrical|UNCUT|Criterion)\b",
    r"\b(DL|MSubs)\b",
    // release tags
    r"\b(PROPER|REPACK|INTERNAL|LIMITED|UNRATED|EXTENDED)\b",
    r"\bv\d+\b",
    r"\((?:iso|rip|cd\d|disc\d|disk\d)\)",
    // trailing "~ Group" suffix
    r"\s?~\s?[A-Za-z0-9]+(\s[A-Za-z0-9]+)*$",
    r"\b(PSYCHD|MAG|CHAMELE0N|MIRCREW|MIRC|WILL1869|ASPiDe|CI?NEMIX)\b",
    r"\[.*?\]",
    r"\b(8bit|10bit|12bit)\b",
];

/// Source tokens that are also ordinary words ("Charlotte's Web"). Matched only as
/// written, in capitals.
const UPPERCASE_ONLY_PATTERNS: &[&str] = &[r"\b(WEB|CAM|TS|TC|SCR|DUAL)\b"];

/// Language tags that survive as trailing words.
const LANGUAGE_TAGS: &[&str] = &["ita", "fre", "fra", "eng", "en", "esp", "spa"];

/// Years that are really resolution widths.
const RESOLUTION_WIDTHS: &[u16] = &[2160, 1920, 1440, 1280];

lazy_static! {
    static ref RELEASE_REGEXES: Vec<Regex> = RELEASE_PATTERNS
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
        .chain(UPPERCASE_ONLY_PATTERNS.iter().map(|p| Regex::new(p).unwrap()))
        .collect();
    static ref CANONICAL_TITLE: Regex = Regex::new(r"^\S.* \((\d{4})\)$").unwrap();
    static ref ABBREVIATION: Regex = Regex::new(r"\b(?:[A-Za-z]\.){2,}(?:[A-Za-z]\b)?").unwrap();
    static ref TRAILING_ABBREVIATION: Regex = Regex::new(r"(?:\b[A-Za-z]\.){2,}$").unwrap();
    static ref COLLAPSE_SPACES: Regex = Regex::new(r"\s+").unwrap();
    static ref PUNCTUATION: Regex = Regex::new(r"[^\w\s]").unwrap();
    static ref FOUR_DIGITS: Regex = Regex::new(r"\b(\d{4})\b").unwrap();
    static ref YEAR_REMOVALS: Vec<Regex> = [
        r"\(\d{4}\)",
        r"\[\d{4}\]",
        r"\.\d{4}\.",
        r"\s\d{4}\s",
        r"^\d{4}\s",
        r"\s\d{4}$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();
    static ref ANY_YEAR_FORM: Regex =
        Regex::new(r"\((\d{4})\)|\[(\d{4})\]|\.(\d{4})\.|\s(\d{4})(?:\s|$)").unwrap();
    static ref EPISODE_SE: Regex = Regex::new(r"[Ss](\d{1,2})[Ee](\d{1,2})").unwrap();
    static ref EPISODE_X: Regex = Regex::new(r"(\d{1,2})x(\d{1,2})").unwrap();
}

/// Season/episode numbers parsed from a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeInfo {
    pub season: u32,
    pub episode: u32,
}

impl EpisodeInfo {
    /// `S01E02` style tag.
    pub fn tag(&self) -> String {
        format!("S{:02}E{:02}", self.season, self.episode)
    }
}

pub fn extract_episode_info(name: &str) -> Option<EpisodeInfo> {
    let caps = EPISODE_SE
        .captures(name)
        .or_else(|| EPISODE_X.captures(name))?;
    Some(EpisodeInfo {
        season: caps[1].parse().ok()?,
        episode: caps[2].parse().ok()?,
    })
}

/// Byte offset of the first episode marker, if any.
pub(crate) fn episode_marker_start(name: &str) -> Option<usize> {
    EPISODE_SE
        .find(name)
        .or_else(|| EPISODE_X.find(name))
        .map(|m| m.start())
}

pub(crate) fn remove_episode_markers(name: &str) -> String {
    let name = EPISODE_SE.replace_all(name, " ");
    EPISODE_X.replace_all(&name, " ").into_owned()
}

pub fn extract_resolution(name: &str) -> Resolution {
    let upper = name.to_uppercase();
    if upper.contains("2160P") || upper.contains("4K") || upper.contains("UHD") {
        Resolution::Uhd2160
    } else if upper.contains("1080P") {
        Resolution::FullHd1080
    } else if upper.contains("720P") {
        Resolution::Hd720
    } else if upper.contains("480P") {
        Resolution::Sd480
    } else {
        Resolution::Unknown
    }
}

pub fn extract_source(name: &str) -> Source {
    let upper = name.to_uppercase();
    if upper.contains("REMUX") {
        Source::Remux
    } else if upper.contains("BLURAY") || upper.contains("BLU-RAY") || upper.contains("BDRIP") {
        Source::BluRay
    } else if upper.contains("WEB-DL") || upper.contains("WEBDL") {
        Source::WebDl
    } else if upper.contains("WEB") {
        Source::Web
    } else if upper.contains("HDTV") {
        Source::Hdtv
    } else if upper.contains("DVDRIP") {
        Source::DvdRip
    } else {
        Source::Unknown
    }
}

/// Drops a trailing known video extension, leaving other dotted suffixes alone.
pub fn strip_video_extension(name: &str) -> &str {
    if let Some((stem, ext)) = name.rsplit_once('.') {
        if VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            return stem;
        }
    }
    name
}

/// The last plausible release year in `name`.
///
/// Only `[1900, 2099]` counts and resolution widths (2160, 1920, 1440, 1280) are skipped.
/// The last match wins because titles like "Blade Runner 2049" carry their own numbers.
pub fn extract_year(name: &str) -> Option<u16> {
    FOUR_DIGITS
        .captures_iter(name)
        .filter_map(|caps| caps[1].parse::<u16>().ok())
        .filter(|year| (1900..=2099).contains(year) && !RESOLUTION_WIDTHS.contains(year))
        .last()
}

fn strip_chunk(chunk: &str) -> String {
    let mut text = chunk.replace(['.', '_', '-'], " ");
    for re in RELEASE_REGEXES.iter() {
        text = re.replace_all(&text, " ").into_owned();
    }
    text
}

fn strip_segment(segment: &str) -> String {
    // Dotted abbreviations pass through untouched so "S.H.I.E.L.D." keeps its dots.
    let mut pieces = Vec::new();
    let mut last = 0;
    for m in ABBREVIATION.find_iter(segment) {
        pieces.push(strip_chunk(&segment[last..m.start()]));
        pieces.push(m.as_str().to_string());
        last = m.end();
    }
    pieces.push(strip_chunk(&segment[last..]));
    collapse_spaces(&pieces.join(" "))
}

/// Removes resolution, codec, source, language and group tokens from a release name.
///
/// Dots, underscores and hyphens become spaces, except inside dotted abbreviations and
/// spaced ` - ` separators, which are kept as written.
pub fn strip_release_tokens(name: &str) -> String {
    name.split(" - ")
        .map(strip_segment)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(" - ")
}

pub(crate) fn collapse_spaces(s: &str) -> String {
    COLLAPSE_SPACES.replace_all(s, " ").trim().to_string()
}

pub(crate) fn remove_years(name: &str) -> String {
    let mut out = name.to_string();
    for re in YEAR_REMOVALS.iter() {
        out = re.replace_all(&out, " ").into_owned();
    }
    out
}

/// Removes only `year`, leaving other four digit numbers that belong to the title.
fn remove_specific_year(name: &str, year: u16) -> String {
    let year = year.to_string();
    ANY_YEAR_FORM
        .replace_all(name, |caps: &Captures| {
            let matched = (1..=4).find_map(|i| caps.get(i)).map(|m| m.as_str());
            if matched == Some(year.as_str()) {
                " ".to_string()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

fn looks_like_orphan_group(word: &str, heuristic: bool) -> bool {
    let lower = word.to_lowercase();
    if is_known_release_group(&lower) || LANGUAGE_TAGS.contains(&lower.as_str()) {
        return true;
    }
    if !heuristic
        || word.chars().count() == 1
        || is_roman_numeral(word)
        || ABBREVIATION.is_match(word)
        || is_preserved_acronym(word)
        || is_all_caps_legit_title(word)
    {
        return false;
    }
    let has_upper = word.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = word.chars().any(|c| c.is_ascii_lowercase());
    (has_upper && !has_lower && word.len() <= 4)
        || (mixes_letters_and_digits(word) && !blacklist::is_ordinal(word))
}

/// Drops trailing words that look like release groups. The first word always stays.
///
/// Without `heuristic` only known groups and language tags are dropped.
fn strip_orphaned_release_groups(name: &str, heuristic: bool) -> String {
    let mut words: Vec<&str> = name.split_whitespace().collect();
    while words.len() > 1 {
        match words.last() {
            Some(last) if looks_like_orphan_group(last, heuristic) => {
                words.pop();
            }
            _ => break,
        }
    }
    words.join(" ")
}

/// Turns a release-style name into `"Title (Year)"`, or just `"Title"` without a year.
///
/// Everything after the year is dropped first, unless a dotted abbreviation sits right
/// before it, in which case the abbreviation's trailing dot is kept.
pub fn clean_movie_name(name: &str) -> String {
    let mut name = strip_video_extension(name.trim()).to_string();
    let year = extract_year(&name);
    // Names already in "Title (Year)" form only lose words that are known tags.
    let canonical = CANONICAL_TITLE.is_match(&name);

    if let Some(year) = year {
        if let Some(idx) = name.rfind(&year.to_string()) {
            let head = name[..idx].trim_end_matches(['(', '[', ' ', '_', '-']);
            let head = if TRAILING_ABBREVIATION.is_match(head) {
                head
            } else {
                head.trim_end_matches(['(', '[', ' ', '_', '-', '.'])
            };
            name = head.trim().to_string();
        }
    }

    let mut title = strip_release_tokens(&name);
    if let Some(year) = year {
        title = remove_specific_year(&title, year);
    }
    let title = strip_orphaned_release_groups(&collapse_spaces(&title), !canonical);
    let title = title_case(&title);

    match year {
        Some(year) if title.is_empty() => format!("({year})"),
        Some(year) => format!("{title} ({year})"),
        None => title,
    }
}

/// Lowercase grouping key for fuzzy duplicate matching. Years are removed.
pub fn normalize_name(name: &str) -> String {
    let stripped = strip_release_tokens(name);
    let mut name = format!(" {} ", remove_years(&stripped).to_lowercase());

    for (from, to) in [
        (" ii ", " 2 "),
        (" iii ", " 3 "),
        (" iv ", " 4 "),
        (" vi ", " 6 "),
        (" vii ", " 7 "),
        (" viii ", " 8 "),
        (" ix ", " 9 "),
        (" and ", " & "),
        (" versus ", " vs "),
        (" vs. ", " vs "),
        (" part ", " pt "),
        (" pt. ", " pt "),
    ] {
        name = name.replace(from, to);
    }

    collapse_spaces(&PUNCTUATION.replace_all(&name, " "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("Movie.Name.2024.1080p"), Some(2024));
        assert_eq!(extract_year("Blade Runner 2049 2017"), Some(2017));
        assert_eq!(extract_year("Movie 1899"), None);
        assert_eq!(extract_year("Movie 2100"), None);
        assert_eq!(extract_year("No year here"), None);
    }

    #[test]
    fn test_extract_year_skips_resolution_widths() {
        assert_eq!(extract_year("Clip 1920 1080"), None);
        assert_eq!(extract_year("Clip 2160"), None);
        assert_eq!(extract_year("Clip 1440 1280"), None);
        assert_eq!(extract_year("Film 1999 1920"), Some(1999));
    }

    #[test]
    fn test_strip_release_tokens() {
        assert_eq!(strip_release_tokens("Movie.Name.2024.WEB-DL.AAC"), "Movie Name 2024");
        assert_eq!(strip_release_tokens("Movie_Name_2024"), "Movie Name 2024");
        assert_eq!(strip_release_tokens("S.H.I.E.L.D."), "S.H.I.E.L.D.");
        assert_eq!(
            strip_release_tokens("Star Trek - The Next Generation"),
            "Star Trek - The Next Generation"
        );
    }

    #[test]
    fn test_clean_movie_name_basic() {
        assert_eq!(
            clean_movie_name("Movie.Name.2024.1080p.BluRay.x264-GROUP"),
            "Movie Name (2024)"
        );
        assert_eq!(clean_movie_name("Movie.Name.(2024)"), "Movie Name (2024)");
        assert_eq!(clean_movie_name("Movie_Name_(2024)"), "Movie Name (2024)");
        assert_eq!(clean_movie_name("21st Century"), "21st Century");
    }

    #[test]
    fn test_clean_movie_name_release_folders() {
        assert_eq!(
            clean_movie_name("25th.Hour.2002.1080p.BluRay.H264.AC3.DD5.1.mp4"),
            "25th Hour (2002)"
        );
        assert_eq!(
            clean_movie_name(
                "Shrek 2 (2004) 1080p 10bit Bluray x265 HEVC [Org BD 2.0 Hindi + DD 5.1 English] MSubs ~ TombDoc.mkv"
            ),
            "Shrek 2 (2004)"
        );
        assert_eq!(
            clean_movie_name("The Matrix 1999 2160p UHD BluRay x265 HDR10"),
            "The Matrix (1999)"
        );
        assert_eq!(
            clean_movie_name("Inception.2010.1080p.BluRay.x264.DTS-HD.MA.5.1"),
            "Inception (2010)"
        );
        assert_eq!(
            clean_movie_name("The Man Who Fell to Earth 1976 HEVC D3FiL3R (iso)"),
            "The Man Who Fell To Earth (1976)"
        );
        assert_eq!(
            clean_movie_name(
                "Blade.Runner.2049.2017.2160p.BluRay.REMUX.HEVC.DTS-HD.MA.TrueHD.7.1.Atmos-FGT"
            ),
            "Blade Runner 2049 (2017)"
        );
        assert_eq!(
            clean_movie_name("Pinocchio.1940.1080p.BluRay.H264.AC3.DD5.1.Will1869"),
            "Pinocchio (1940)"
        );
    }

    #[test]
    fn test_clean_movie_name_pentagon_wars() {
        for input in [
            "The Pentagon Wars 1998 1080p WEBRip X264 Ac3 SNAKE",
            "The Pentagon Wars 1998 1080p WEBRip X264 Ac3 SNAKE.mkv",
            "The.Pentagon.Wars.1998.1080p.WEBRip.X264.Ac3-SNAKE",
        ] {
            assert_eq!(clean_movie_name(input), "The Pentagon Wars (1998)", "{input}");
        }
    }

    #[test]
    fn test_clean_movie_name_idempotent() {
        for canonical in [
            "The Matrix (1999)",
            "Blade Runner 2049 (2017)",
            "25th Hour (2002)",
            "Shrek 2 (2004)",
            "Rocky III (1982)",
            "Malcolm X (1992)",
            "Fast X (2023)",
            "The Godfather Part II (1974)",
            "Charlotte's Web (1973)",
        ] {
            assert_eq!(clean_movie_name(canonical), canonical);
            assert_eq!(clean_movie_name(&clean_movie_name(canonical)), canonical);
        }
    }

    #[test]
    fn test_clean_movie_name_keeps_numerals_in_release_names() {
        assert_eq!(
            clean_movie_name("Rocky.III.1982.1080p.BluRay.x264-SPARKS"),
            "Rocky III (1982)"
        );
        assert_eq!(clean_movie_name("Malcolm.X.1992.720p.WEB.h264"), "Malcolm X (1992)");
        assert_eq!(clean_movie_name("Charlottes.Web.1973.DVDRip"), "Charlottes Web (1973)");
        assert_eq!(clean_movie_name("Heat.WEB.1995.x264"), "Heat (1995)");
    }

    #[test]
    fn test_clean_movie_name_keeps_abbreviation_before_year() {
        assert_eq!(clean_movie_name("D.E.B.S.2004.1080p.WEB-DL"), "D.E.B.S. (2004)");
        assert_eq!(clean_movie_name("D.E.B.S. (2004)"), "D.E.B.S. (2004)");
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("The Nun II (2023)"), "the nun 2");
        assert_eq!(normalize_name("Movie & The Other (2024)"), "movie the other");
        assert_eq!(normalize_name("Movie and The Other (2024)"), "movie the other");
        assert_eq!(normalize_name("Movie.Name.2024.1080p"), "movie name");
        assert_eq!(normalize_name("Lost in Translation (2003)"), "lost in translation");
    }

    #[test]
    fn test_extract_resolution() {
        assert_eq!(extract_resolution("Movie.2160p.mkv"), Resolution::Uhd2160);
        assert_eq!(extract_resolution("Movie 4K HDR"), Resolution::Uhd2160);
        assert_eq!(extract_resolution("movie.1080P"), Resolution::FullHd1080);
        assert_eq!(extract_resolution("movie.720p"), Resolution::Hd720);
        assert_eq!(extract_resolution("movie.480p"), Resolution::Sd480);
        assert_eq!(extract_resolution("movie.576p"), Resolution::Unknown);
        assert_eq!(extract_resolution("movie.480i"), Resolution::Unknown);
    }

    #[test]
    fn test_extract_source_priority() {
        assert_eq!(extract_source("Show.S01E01.BluRay.REMUX"), Source::Remux);
        assert_eq!(extract_source("Show.S01E01.Blu-ray"), Source::BluRay);
        assert_eq!(extract_source("Show.S01E01.WEB-DL"), Source::WebDl);
        assert_eq!(extract_source("Show.S01E01.WEBRip"), Source::Web);
        assert_eq!(extract_source("Show.S01E01.HDTV"), Source::Hdtv);
        assert_eq!(extract_source("Show.S01E01.DVDRip"), Source::DvdRip);
        assert_eq!(extract_source("Show.S01E01"), Source::Unknown);
    }

    #[test]
    fn test_extract_episode_info() {
        assert_eq!(
            extract_episode_info("Show.S02E05.mkv"),
            Some(EpisodeInfo { season: 2, episode: 5 })
        );
        assert_eq!(
            extract_episode_info("Show 1x03.mkv"),
            Some(EpisodeInfo { season: 1, episode: 3 })
        );
        assert_eq!(extract_episode_info("Movie (2024).mkv"), None);
        assert_eq!(EpisodeInfo { season: 1, episode: 9 }.tag(), "S01E09");
    }

    #[test]
    fn test_strip_video_extension() {
        assert_eq!(strip_video_extension("Movie (2024).mkv"), "Movie (2024)");
        assert_eq!(strip_video_extension("Movie (2024).MP4"), "Movie (2024)");
        assert_eq!(strip_video_extension("Mr. Robot"), "Mr. Robot");
    }
}

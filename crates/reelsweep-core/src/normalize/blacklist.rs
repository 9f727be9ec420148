use ahash::AHashSet;
use lazy_static::lazy_static;

/// Release groups and encoders whose tags survive token stripping and end up
/// masquerading as show titles. Lowercase.
pub const KNOWN_RELEASE_GROUPS: &[&str] = &[
    // scene / p2p movie groups
    "rarbg", "yts", "yify", "etrg", "fgt", "mkvcage", "sparks", "rovers", "phoenix", "cmrg",
    "evo", "ion10", "psa", "afg", "sampa", "tgx", "snake", "d3fil3r", "fistworld", "crys",
    "rightsize", "getit", "pignus", "btn", "don", "ctrlhd", "mag", "psychd", "mirc",
    "mircrew", "chameleon", "chamele0n", "cinemix", "will1869", "aspide", "nueng", "framestor",
    "viethd", "tombdoc", "geckos", "drones", "amiable", "decibel", "epsilon", "fxg",
    "galaxyrg", "hdchina", "hdex", "hifi", "ift", "jyk", "lol", "ntb", "ntg", "nogrp",
    "playweb", "qxr", "ralphy", "smurf", "sujaidr", "tepes", "tigole", "usury", "vxt",
    "w4f", "xlf", "ettv", "eztv", "hone", "hdmaniacs", "kogi", "monkee", "nahom",
    // tv groups
    "airtv", "veto", "dimension", "asap", "avs", "batv", "bamboozle", "deflate", "fum",
    "ggez", "ggwp", "hdtvrip", "immerse", "minx", "mtb", "ntbweb", "plutonium", "ptv",
    "qoq", "rbb", "rtn", "sva", "syncopy", "tvsmash", "uav", "visum", "web2hd", "xsp",
    "yestv", "tla", "fov", "orenji", "knifesharp", "cookiemonster", "megusta",
    // anime fansub groups
    "horriblesubs", "erai-raws", "subsplease", "commie", "asw", "doki", "gg",
];

/// Quality and codec tokens. Lowercase.
pub const CODEC_MARKERS: &[&str] = &[
    "x264", "x265", "x266", "h264", "h265", "h266", "hevc", "avc", "av1", "xvid", "divx",
    "aac", "ac3", "eac3", "dts", "truehd", "atmos", "flac", "ddp", "ddp5", "dd5",
    "480p", "576p", "720p", "1080p", "1080i", "2160p", "4k", "uhd", "hdr", "hdr10", "dv",
    "bluray", "bdrip", "brrip", "remux", "webrip", "webdl", "web-dl", "hdtv", "dvdrip",
    "10bit", "8bit", "12bit",
];

/// Short uppercase tokens that are real parts of show titles.
pub const PRESERVED_ACRONYMS: &[&str] = &[
    "tng", "ds9", "ncis", "fbi", "cia", "csi", "svu", "got", "usa", "uk", "us", "nyc", "la",
    "snl", "wwe", "nba", "nfl", "bbc", "mtv", "hbo", "ufo", "ai", "tv",
];

/// All-caps titles that look like release tags but are genuine shows.
pub const ALL_CAPS_LEGIT_TITLES: &[&str] = &[
    "it", "fbi", "ncis", "rome", "lost", "house", "heroes", "fringe", "bones", "monk", "cops",
    "reno", "mash", "jag", "alf", "archer", "smash",
];

lazy_static! {
    static ref RELEASE_GROUP_SET: AHashSet<&'static str> = KNOWN_RELEASE_GROUPS
        .iter()
        .chain(CODEC_MARKERS.iter())
        .copied()
        .collect();
    static ref CODEC_SET: AHashSet<&'static str> = CODEC_MARKERS.iter().copied().collect();
    static ref ACRONYM_SET: AHashSet<&'static str> = PRESERVED_ACRONYMS.iter().copied().collect();
    static ref LEGIT_SET: AHashSet<&'static str> =
        ALL_CAPS_LEGIT_TITLES.iter().copied().collect();
}

/// True for release groups and codec markers. Case-insensitive.
pub fn is_known_release_group(word: &str) -> bool {
    RELEASE_GROUP_SET.contains(word.to_lowercase().as_str())
}

pub fn is_codec_marker(word: &str) -> bool {
    CODEC_SET.contains(word.to_lowercase().as_str())
}

pub fn is_preserved_acronym(word: &str) -> bool {
    ACRONYM_SET.contains(word.to_lowercase().as_str())
}

pub fn is_all_caps_legit_title(word: &str) -> bool {
    LEGIT_SET.contains(word.to_lowercase().as_str())
}

/// Roman numerals one through twenty, as used in sequel titles. Case-insensitive.
pub fn is_roman_numeral(word: &str) -> bool {
    const NUMERALS: &[&str] = &[
        "i", "ii", "iii", "iv", "v", "vi", "vii", "viii", "ix", "x", "xi", "xii", "xiii", "xiv",
        "xv", "xvi", "xvii", "xviii", "xix", "xx",
    ];
    NUMERALS.contains(&word.to_lowercase().as_str())
}

pub(crate) fn is_ordinal(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    let digits = lower.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    let suffix = &lower[digits.len()..];
    !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
        && matches!(suffix, "st" | "nd" | "rd" | "th")
}

pub(crate) fn mixes_letters_and_digits(word: &str) -> bool {
    word.chars().any(|c| c.is_alphabetic()) && word.chars().any(|c| c.is_ascii_digit())
}

fn is_garbage_word(word: &str) -> bool {
    if is_preserved_acronym(word) || is_all_caps_legit_title(word) {
        return false;
    }
    if is_known_release_group(word) {
        return true;
    }
    mixes_letters_and_digits(word) && !is_ordinal(word)
}

/// A title is garbage when at least half of its words are release artifacts.
pub fn is_garbage_title(title: &str) -> bool {
    let words: Vec<&str> = title.split_whitespace().collect();
    if words.is_empty() {
        return true;
    }
    let garbage = words.iter().filter(|w| is_garbage_word(w)).count();
    garbage * 2 >= words.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_sizes() {
        assert!(KNOWN_RELEASE_GROUPS.len() >= 100);
        assert!(CODEC_MARKERS.len() >= 20);
        assert!(PRESERVED_ACRONYMS.len() >= 10);
        assert!(ALL_CAPS_LEGIT_TITLES.len() >= 10);
    }

    #[test]
    fn test_lists_do_not_overlap() {
        for marker in CODEC_MARKERS {
            assert!(!is_preserved_acronym(marker), "{marker} is also an acronym");
            assert!(!is_all_caps_legit_title(marker), "{marker} is also a title");
        }
    }

    #[test]
    fn test_common_title_words_are_not_groups() {
        for word in [
            "star", "trek", "breaking", "bad", "wire", "the", "lost", "rome", "welcome",
            "derry", "friends", "degrassi", "next", "generation",
        ] {
            assert!(!is_known_release_group(word), "{word} should not be a group");
        }
    }

    #[test]
    fn test_lookups() {
        assert!(is_known_release_group("RARBG"));
        assert!(is_known_release_group("AirTV"));
        assert!(is_known_release_group("x264"));
        assert!(is_known_release_group("1080p"));
        assert!(is_codec_marker("HEVC"));
        assert!(is_preserved_acronym("TNG"));
        assert!(is_all_caps_legit_title("ROME"));
        assert!(!is_all_caps_legit_title("xyz"));
        assert!(!is_all_caps_legit_title("airtv"));
    }

    #[test]
    fn test_garbage_titles() {
        for title in [
            "Airtv Rome",
            "NTb PlayWeb",
            "Dimension NTb",
            "Airtv",
            "RARBG",
            "x264",
            "x264 RARBG",
            "D3FiL3R",
            "H264",
            "",
        ] {
            assert!(is_garbage_title(title), "{title:?} should be garbage");
        }
    }

    #[test]
    fn test_legit_titles() {
        for title in [
            "Rome",
            "Lost",
            "Star Trek",
            "Last Week Tonight",
            "Breaking Bad",
            "The Wire",
            "IT Welcome To Derry",
            "IT",
            "FBI",
            "25th Hour",
        ] {
            assert!(!is_garbage_title(title), "{title:?} should not be garbage");
        }
    }

    #[test]
    fn test_ordinal() {
        assert!(is_ordinal("21st"));
        assert!(is_ordinal("2ND"));
        assert!(!is_ordinal("x264"));
        assert!(!is_ordinal("st"));
    }

    #[test]
    fn test_roman_numeral() {
        assert!(is_roman_numeral("III"));
        assert!(is_roman_numeral("xiv"));
        assert!(is_roman_numeral("XX"));
        assert!(!is_roman_numeral("XXI"));
        assert!(!is_roman_numeral("MIX"));
    }
}

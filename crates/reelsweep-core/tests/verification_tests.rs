use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use ahash::AHashSet;
use reelsweep_core::compliance::{check_episodes, LibraryFile};
use reelsweep_core::titles::verify::{
    LookupError, MetadataProvider, RetryPolicy, SeriesMatch, Verifier,
};
use reelsweep_core::titles::{resolve, MatchSource, TitleMatch, TitleResolution};

type Answer = Result<Option<SeriesMatch>, LookupError>;

/// In-memory provider. Titles without a scripted answer come back as "not found".
struct FakeProvider {
    name: &'static str,
    answers: Mutex<HashMap<String, Vec<Answer>>>,
    calls: AtomicUsize,
    reauths: AtomicUsize,
}

impl FakeProvider {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            answers: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            reauths: AtomicUsize::new(0),
        }
    }

    /// Answers are handed out in order; the last one repeats.
    fn script(self, title: &str, answers: Vec<Answer>) -> Self {
        self.answers
            .lock()
            .unwrap()
            .insert(title.to_string(), answers);
        self
    }
}

impl MetadataProvider for &'static FakeProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn search_series(&self, title: &str) -> Answer {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut answers = self.answers.lock().unwrap();
        match answers.get_mut(title) {
            Some(queue) if queue.len() > 1 => queue.remove(0),
            Some(queue) => queue[0].clone(),
            None => Ok(None),
        }
    }

    fn reauthenticate(&self) {
        self.reauths.fetch_add(1, Ordering::SeqCst);
    }
}

fn leak(provider: FakeProvider) -> &'static FakeProvider {
    Box::leak(Box::new(provider))
}

fn series(id: &str, name: &str) -> Answer {
    Ok(Some(SeriesMatch {
        id: id.to_string(),
        name: name.to_string(),
        year: Some("2001".to_string()),
    }))
}

fn no_delay() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        base_delay: Duration::ZERO,
    }
}

fn degrassi() -> TitleResolution {
    resolve(
        TitleMatch::extract("Degrassi (2001)", MatchSource::Folder),
        TitleMatch::extract("Degrassi The Next Generation S01E01.mkv", MatchSource::Filename),
    )
}

fn verifier(primary: &'static FakeProvider, secondary: Option<&'static FakeProvider>) -> Verifier {
    Verifier::new(
        Some(Box::new(primary)),
        secondary.map(|s| Box::new(s) as Box<dyn MetadataProvider>),
    )
    .with_retry_policy(no_delay())
}

#[test]
fn test_both_titles_same_series() {
    let tvdb = leak(
        FakeProvider::new("tvdb")
            .script("Degrassi", vec![series("71", "Degrassi: The Next Generation")])
            .script(
                "Degrassi The Next Generation",
                vec![series("71", "Degrassi: The Next Generation")],
            ),
    );
    let verifier = verifier(tvdb, None);

    let mut resolution = degrassi();
    assert!(resolution.ambiguous);
    verifier.verify(&mut resolution).unwrap();

    assert!(!resolution.ambiguous);
    assert!(resolution.verified);
    assert_eq!(resolution.confidence, 1.0);
    assert_eq!(resolution.resolved_title, "Degrassi: The Next Generation");
    assert!(resolution.reason.contains("both match same series"));
}

#[test]
fn test_single_match_is_accepted() {
    let tvdb = leak(FakeProvider::new("tvdb").script(
        "Degrassi The Next Generation",
        vec![series("71", "Degrassi: The Next Generation")],
    ));
    let verifier = verifier(tvdb, None);

    let mut resolution = degrassi();
    verifier.verify(&mut resolution).unwrap();
    assert!(resolution.verified);
    assert_eq!(resolution.confidence, 0.95);
    assert!(resolution.reason.contains("filename match"));
}

#[test]
fn test_conflict_stays_ambiguous_with_candidates() {
    let tvdb = leak(
        FakeProvider::new("tvdb")
            .script("Degrassi", vec![series("10", "Degrassi Junior High")])
            .script(
                "Degrassi The Next Generation",
                vec![series("71", "Degrassi: The Next Generation")],
            ),
    );
    let verifier = verifier(tvdb, None);

    let mut resolution = degrassi();
    verifier.verify(&mut resolution).unwrap();
    assert!(resolution.ambiguous);
    assert!(!resolution.verified);
    assert!(resolution.needs_review());
    assert_eq!(resolution.candidates.len(), 2);
    assert_eq!(resolution.candidates[0].matched, MatchSource::Folder);
    assert_eq!(resolution.candidates[1].id, "71");
}

#[test]
fn test_lookups_are_cached_per_session() {
    let tvdb = leak(FakeProvider::new("tvdb").script(
        "Degrassi The Next Generation",
        vec![series("71", "Degrassi: The Next Generation")],
    ));
    let verifier = verifier(tvdb, None);

    let mut first = degrassi();
    let mut second = degrassi();
    verifier.verify(&mut first).unwrap();
    verifier.verify(&mut second).unwrap();

    // One search per title, including the one that found nothing.
    assert_eq!(tvdb.calls.load(Ordering::SeqCst), 2);
    assert_eq!(verifier.cache().len(), 2);
    assert!(verifier.cache().contains("tvdb", "Degrassi"));
}

#[test]
fn test_expired_auth_reauthenticates_and_retries() {
    let tvdb = leak(
        FakeProvider::new("tvdb")
            .script(
                "Degrassi",
                vec![
                    Err(LookupError::AuthExpired),
                    series("71", "Degrassi: The Next Generation"),
                ],
            )
            .script(
                "Degrassi The Next Generation",
                vec![series("71", "Degrassi: The Next Generation")],
            ),
    );
    let verifier = verifier(tvdb, None);

    let mut resolution = degrassi();
    verifier.verify(&mut resolution).unwrap();
    assert!(resolution.verified);
    assert_eq!(tvdb.reauths.load(Ordering::SeqCst), 1);
    assert_eq!(tvdb.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_rate_limit_gives_up_after_max_retries() {
    let tvdb = leak(
        FakeProvider::new("tvdb")
            .script("Degrassi", vec![Err(LookupError::RateLimited)])
            .script(
                "Degrassi The Next Generation",
                vec![Err(LookupError::RateLimited)],
            ),
    );
    let verifier = verifier(tvdb, None);

    let mut resolution = degrassi();
    assert!(verifier.verify(&mut resolution).is_err());
    assert!(resolution.ambiguous);
    assert!(!resolution.verified);
    // One attempt plus two retries for each title.
    assert_eq!(tvdb.calls.load(Ordering::SeqCst), 6);
}

#[test]
fn test_secondary_used_when_primary_fails() {
    let tvdb = leak(
        FakeProvider::new("tvdb")
            .script("Degrassi", vec![Err(LookupError::Rejected("bad key".into()))])
            .script(
                "Degrassi The Next Generation",
                vec![Err(LookupError::Rejected("bad key".into()))],
            ),
    );
    let omdb = leak(FakeProvider::new("omdb").script(
        "Degrassi The Next Generation",
        vec![series("tt0288937", "Degrassi: The Next Generation")],
    ));
    let verifier = verifier(tvdb, Some(omdb));

    let mut resolution = degrassi();
    verifier.verify(&mut resolution).unwrap();
    assert!(resolution.verified);
    assert!(resolution.reason.starts_with("omdb verified"));
    // Rejections are not retried.
    assert_eq!(tvdb.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_verified_show_leaves_no_ambiguous_titles() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("tv");
    let episode = root.join("Degrassi (2001)/Season 01/Degrassi The Next Generation S01E01.mkv");
    fs::create_dir_all(episode.parent().unwrap()).unwrap();
    fs::write(&episode, b"x").unwrap();

    let files = vec![LibraryFile {
        root: root.clone(),
        path: episode.clone(),
    }];

    let unverified = check_episodes(&files, &AHashSet::new(), None);
    assert_eq!(unverified.ambiguous.len(), 1);
    assert_eq!(unverified.ambiguous[0].affected_files, vec![episode.clone()]);

    let tvdb = leak(
        FakeProvider::new("tvdb")
            .script("Degrassi", vec![series("71", "Degrassi The Next Generation")])
            .script(
                "Degrassi The Next Generation",
                vec![series("71", "Degrassi The Next Generation")],
            ),
    );
    let verifier = verifier(tvdb, None);
    let verified = check_episodes(&files, &AHashSet::new(), Some(&verifier));
    assert!(verified.ambiguous.is_empty());
    assert!(verified
        .issues
        .iter()
        .all(|issue| !issue.problem.contains("AMBIGUOUS")));
}

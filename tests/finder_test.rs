//! Ortholog search against in-memory genomes, hits and distances.

mod common;

use anyhow::Result;
use common::{genome, genome_of, hits, DistanceTable, EmptyAligner, PaddingAligner, TableAligner};
use pretty_assertions::assert_eq;
use rsd_rs::{
    Config, FastaRecord, Genome, OrthologFinder, OrthologRecord, OrthologSet, RsdError,
    SavedHits, Threshold,
};
use std::sync::atomic::Ordering;
use std::time::Duration;

/// Six of ten positions gapped, whichever side is less gapped.
const DIVERGED: (&str, &str) = ("M---A---QR", "-K-T-Y-I--");

fn finder(config: Config, distances: DistanceTable) -> OrthologFinder {
    OrthologFinder::new(config, Box::new(PaddingAligner), Box::new(distances))
}

fn config(threads: usize) -> Config {
    Config::builder()
        .num_threads(threads)
        .align_retry_delay(Duration::ZERO)
        .build()
}

fn records(set: &OrthologSet, threshold: Threshold) -> Vec<OrthologRecord> {
    set.get(&threshold).expect("threshold group").to_vec()
}

fn sorted(mut records: Vec<OrthologRecord>) -> Vec<OrthologRecord> {
    records.sort_by(|a, b| {
        (&a.query_id, &a.subject_id).cmp(&(&b.query_id, &b.subject_id))
    });
    records
}

#[test]
fn test_single_reciprocal_pair() -> Result<()> {
    let query = Genome::from_records(
        "query",
        [
            FastaRecord::new("q1", "MKTAYIAKQRQISFVKSHFSRQ"),
            FastaRecord::new("q2", "MALWMRLLPLLALLALWGPDPA"),
        ],
    )?;
    let subject = Genome::from_records(
        "subject",
        [
            FastaRecord::new("s1", "MKSAYIAKQRQISFVKSHFSRQ"),
            FastaRecord::new("s2", "MADWMRLLPLLALLALWGPDPA"),
        ],
    )?;
    let forward = hits(&[("q1", vec![("s1", 1e-30)])]);
    let reverse = hits(&[("s1", vec![("q1", 1e-30)])]);
    let threshold = Threshold::new(0.2, 1e-10);

    let finder = finder(config(2), DistanceTable::new(&[("q1", "s1", 0.15)]));
    let orthologs =
        finder.compute_orthologs(&query, &subject, &[threshold], &forward, &reverse, None)?;

    assert_eq!(orthologs.len(), 1);
    assert_eq!(
        records(&orthologs, threshold),
        vec![OrthologRecord::new("q1", "s1", 0.15)]
    );
    Ok(())
}

#[test]
fn test_evalue_bound_is_strict() -> Result<()> {
    let query = genome("query", &["q1"]);
    let subject = genome("subject", &["s1"]);
    let reverse = hits(&[("s1", vec![("q1", 1e-30)])]);
    let threshold = Threshold::new(0.2, 1e-10);
    let finder = finder(config(1), DistanceTable::new(&[("q1", "s1", 0.15)]));

    let on_bound = hits(&[("q1", vec![("s1", 1e-10)])]);
    let orthologs =
        finder.compute_orthologs(&query, &subject, &[threshold], &on_bound, &reverse, None)?;
    assert!(records(&orthologs, threshold).is_empty());

    let below = hits(&[("q1", vec![("s1", 9.9e-11)])]);
    let orthologs =
        finder.compute_orthologs(&query, &subject, &[threshold], &below, &reverse, None)?;
    assert_eq!(records(&orthologs, threshold).len(), 1);
    Ok(())
}

#[test]
fn test_tied_hits_are_separate_records() -> Result<()> {
    let query = genome("query", &["q1"]);
    let subject = genome("subject", &["s1", "s2"]);
    let forward = hits(&[("q1", vec![("s1", 1e-30), ("s2", 1e-25)])]);
    let reverse = hits(&[
        ("s1", vec![("q1", 1e-30)]),
        ("s2", vec![("q1", 1e-25)]),
    ]);
    let threshold = Threshold::new(0.5, 1e-5);
    let distances = DistanceTable::new(&[("q1", "s1", 0.1), ("q1", "s2", 0.1)]);

    let orthologs = finder(config(1), distances).compute_orthologs(
        &query,
        &subject,
        &[threshold],
        &forward,
        &reverse,
        None,
    )?;
    assert_eq!(
        records(&orthologs, threshold),
        vec![
            OrthologRecord::new("q1", "s1", 0.1),
            OrthologRecord::new("q1", "s2", 0.1)
        ]
    );
    Ok(())
}

/// Q = {q1, q2, q3}, S = {s1, s2}; q3's best hit s1 prefers q1.
fn swap_fixture() -> (Genome, Genome, SavedHits, SavedHits, DistanceTable) {
    let query = genome("query", &["q1", "q2", "q3"]);
    let subject = genome("subject", &["s1", "s2"]);
    let forward = hits(&[
        ("q1", vec![("s1", 1e-30)]),
        ("q2", vec![("s2", 1e-30), ("s1", 1e-20)]),
        ("q3", vec![("s1", 1e-30)]),
    ]);
    let reverse = hits(&[
        ("s1", vec![("q1", 1e-30), ("q3", 1e-30), ("q2", 1e-20)]),
        ("s2", vec![("q2", 1e-30)]),
    ]);
    let distances = DistanceTable::new(&[
        ("q1", "s1", 0.1),
        ("q2", "s2", 0.2),
        ("q2", "s1", 0.5),
        ("q3", "s1", 0.3),
    ]);
    (query, subject, forward, reverse, distances)
}

#[test]
fn test_genome_swap_gives_same_orthologs() -> Result<()> {
    let threshold = Threshold::new(0.5, 1e-5);
    let expected = vec![
        OrthologRecord::new("q1", "s1", 0.1),
        OrthologRecord::new("q2", "s2", 0.2),
    ];

    let mut results = Vec::new();
    for swap in [false, true] {
        let (query, subject, forward, reverse, distances) = swap_fixture();
        let config = Config::builder()
            .num_threads(2)
            .genome_swap(swap)
            .align_retry_delay(Duration::ZERO)
            .build();
        let orthologs = finder(config, distances).compute_orthologs(
            &query,
            &subject,
            &[threshold],
            &forward,
            &reverse,
            None,
        )?;
        results.push(sorted(records(&orthologs, threshold)));
    }

    assert_eq!(results[0], expected);
    assert_eq!(results[1], expected);
    Ok(())
}

#[test]
fn test_reciprocity_checked_per_threshold() -> Result<()> {
    let query = genome("query", &["q1", "q2"]);
    let subject = genome("subject", &["s1", "s2"]);
    // s2 only passes the lax e-value and is closer, but prefers q2
    let forward = hits(&[("q1", vec![("s1", 1e-30), ("s2", 1e-8)])]);
    let reverse = hits(&[
        ("s1", vec![("q1", 1e-30)]),
        ("s2", vec![("q2", 1e-30), ("q1", 1e-8)]),
    ]);
    let distances = DistanceTable::new(&[
        ("q1", "s1", 0.3),
        ("q1", "s2", 0.1),
        ("q2", "s2", 0.05),
    ]);
    let strict = Threshold::new(0.5, 1e-20);
    let lax = Threshold::new(0.5, 1e-5);

    let orthologs = finder(config(1), distances).compute_orthologs(
        &query,
        &subject,
        &[strict, lax],
        &forward,
        &reverse,
        None,
    )?;

    assert_eq!(
        records(&orthologs, strict),
        vec![OrthologRecord::new("q1", "s1", 0.3)]
    );
    assert!(records(&orthologs, lax).is_empty());
    Ok(())
}

#[test]
fn test_unavailable_distance_skips_candidate() -> Result<()> {
    let query = genome("query", &["q1"]);
    let subject = genome("subject", &["s1", "s2"]);
    let forward = hits(&[("q1", vec![("s1", 1e-30), ("s2", 1e-20)])]);
    let reverse = hits(&[("s2", vec![("q1", 1e-20)])]);
    // no distance for q1/s1
    let distances = DistanceTable::new(&[("q1", "s2", 0.4)]);
    let threshold = Threshold::new(0.5, 1e-5);

    let orthologs = finder(config(1), distances).compute_orthologs(
        &query,
        &subject,
        &[threshold],
        &forward,
        &reverse,
        None,
    )?;
    assert_eq!(
        records(&orthologs, threshold),
        vec![OrthologRecord::new("q1", "s2", 0.4)]
    );
    Ok(())
}

#[test]
fn test_failed_alignment_aborts_run() {
    let query = genome("query", &["q1"]);
    let subject = genome("subject", &["s1"]);
    let forward = hits(&[("q1", vec![("s1", 1e-30)])]);
    let reverse = hits(&[("s1", vec![("q1", 1e-30)])]);

    let finder = OrthologFinder::new(
        config(1),
        Box::new(EmptyAligner::new()),
        Box::new(DistanceTable::new(&[("q1", "s1", 0.1)])),
    );
    let result = finder.compute_orthologs(
        &query,
        &subject,
        &[Threshold::new(0.5, 1e-5)],
        &forward,
        &reverse,
        None,
    );
    assert!(matches!(result, Err(RsdError::AlignmentFailed(_))));
}

#[test]
fn test_failure_stops_remaining_queries() {
    let ids: Vec<String> = (0..50).map(|i| format!("q{i:02}")).collect();
    let query = genome("query", &as_strs(&ids));
    let subject = genome("subject", &["s1"]);
    let forward: Vec<(&str, Vec<(&str, f64)>)> =
        ids.iter().map(|id| (id.as_str(), vec![("s1", 1e-30)])).collect();
    let forward = hits(&forward);
    let reverse = hits(&[]);

    let aligner = EmptyAligner::new();
    let calls = aligner.calls.clone();
    let config = Config::builder()
        .num_threads(1)
        .genome_swap(false)
        .align_retry_delay(Duration::ZERO)
        .build();
    let finder = OrthologFinder::new(config, Box::new(aligner), Box::new(DistanceTable::default()));
    let result = finder.compute_orthologs(
        &query,
        &subject,
        &[Threshold::new(0.5, 1e-5)],
        &forward,
        &reverse,
        None,
    );

    assert!(matches!(result, Err(RsdError::AlignmentFailed(_))));
    // the first query's attempt and its retry
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_divergence_selects_per_threshold() -> Result<()> {
    let query = genome_of("query", &[("q1", "MKTAYIAKQRQISFVKSHFSRQLEERLGLI")]);
    // s1 aligns with ten trailing gaps that get trimmed away
    let subject = genome_of(
        "subject",
        &[
            ("s1", "MKTAYIAKQRQISFVKSHFS"),
            ("s2", "MKSAYIAKQRQISFVKSHFSRQLEERLGLV"),
        ],
    );
    let forward = hits(&[("q1", vec![("s1", 1e-30), ("s2", 1e-30)])]);
    let reverse = hits(&[("s1", vec![("q1", 1e-30)]), ("s2", vec![("q1", 1e-30)])]);
    let distances = DistanceTable::new(&[("q1", "s1", 0.1), ("q1", "s2", 0.3)]);
    let exact = Threshold::new(0.0, 1e-5);
    let loose = Threshold::new(0.5, 1e-5);

    let orthologs = finder(config(1), distances).compute_orthologs(
        &query,
        &subject,
        &[exact, loose],
        &forward,
        &reverse,
        None,
    )?;

    assert_eq!(
        records(&orthologs, exact),
        vec![OrthologRecord::new("q1", "s2", 0.3)]
    );
    assert_eq!(
        records(&orthologs, loose),
        vec![OrthologRecord::new("q1", "s1", 0.1)]
    );
    Ok(())
}

#[test]
fn test_diverged_forward_hit_never_estimated() -> Result<()> {
    let query = genome("query", &["q1"]);
    let subject = genome("subject", &["s1", "s2"]);
    let forward = hits(&[("q1", vec![("s1", 1e-30), ("s2", 1e-30)])]);
    let reverse = hits(&[("s2", vec![("q1", 1e-30)])]);
    let distances = DistanceTable::new(&[("q1", "s1", 0.01), ("q1", "s2", 0.3)]);
    let requests = distances.requests();
    let aligner = TableAligner::new(&[("q1", "s1", DIVERGED.0, DIVERGED.1)]);
    let threshold = Threshold::new(0.5, 1e-5);

    let finder = OrthologFinder::new(config(1), Box::new(aligner), Box::new(distances));
    let orthologs =
        finder.compute_orthologs(&query, &subject, &[threshold], &forward, &reverse, None)?;

    assert_eq!(
        records(&orthologs, threshold),
        vec![OrthologRecord::new("q1", "s2", 0.3)]
    );
    let requests = requests.lock().unwrap();
    assert!(!requests.contains(&("q1".to_string(), "s1".to_string())));
    assert!(requests.contains(&("q1".to_string(), "s2".to_string())));
    Ok(())
}

#[test]
fn test_diverged_reverse_alignment_drops_winner() -> Result<()> {
    let query = genome("query", &["q1"]);
    let subject = genome("subject", &["s1"]);
    let forward = hits(&[("q1", vec![("s1", 1e-30)])]);
    let reverse = hits(&[("s1", vec![("q1", 1e-30)])]);
    let distances = DistanceTable::new(&[("q1", "s1", 0.1)]);
    let requests = distances.requests();
    // the forward alignment is clean, the reverse one is not
    let aligner = TableAligner::new(&[("s1", "q1", DIVERGED.0, DIVERGED.1)]);
    let threshold = Threshold::new(0.5, 1e-5);

    let finder = OrthologFinder::new(config(1), Box::new(aligner), Box::new(distances));
    let orthologs =
        finder.compute_orthologs(&query, &subject, &[threshold], &forward, &reverse, None)?;

    assert!(records(&orthologs, threshold).is_empty());
    assert_eq!(
        *requests.lock().unwrap(),
        vec![("q1".to_string(), "s1".to_string())]
    );
    Ok(())
}

#[test]
fn test_reverse_search_uses_loosest_evalue_won() -> Result<()> {
    let query = genome("query", &["q1", "q2"]);
    let subject = genome("subject", &["s1", "s2"]);
    let forward = hits(&[("q1", vec![("s1", 1e-30)])]);
    // q1 comes back only under the lax e-value, q2 under both
    let reverse = hits(&[("s1", vec![("q2", 1e-30), ("q1", 1e-10)])]);
    let distances = DistanceTable::new(&[("q1", "s1", 0.1), ("q2", "s1", 0.4)]);
    let strict = Threshold::new(0.5, 1e-20);
    let lax = Threshold::new(0.5, 1e-5);

    let orthologs = finder(config(1), distances).compute_orthologs(
        &query,
        &subject,
        &[strict, lax],
        &forward,
        &reverse,
        None,
    )?;

    assert!(records(&orthologs, strict).is_empty());
    assert_eq!(
        records(&orthologs, lax),
        vec![OrthologRecord::new("q1", "s1", 0.1)]
    );
    Ok(())
}

#[test]
fn test_reverse_search_uses_loosest_divergence_won() -> Result<()> {
    let query = genome("query", &["q1"]);
    let subject = genome("subject", &["s1"]);
    let forward = hits(&[("q1", vec![("s1", 1e-30)])]);
    let reverse = hits(&[("s1", vec![("q1", 1e-30)])]);
    // one gap in ten on each side of the reverse alignment
    let aligner = TableAligner::new(&[("s1", "q1", "MK-TAYIAKQ", "MKT-AYIAKQ")]);
    let tight = Threshold::new(0.05, 1e-5);
    let loose = Threshold::new(0.5, 1e-5);

    let finder = OrthologFinder::new(
        config(1),
        Box::new(aligner),
        Box::new(DistanceTable::new(&[("q1", "s1", 0.1)])),
    );
    let orthologs =
        finder.compute_orthologs(&query, &subject, &[tight, loose], &forward, &reverse, None)?;

    assert!(records(&orthologs, tight).is_empty());
    assert_eq!(
        records(&orthologs, loose),
        vec![OrthologRecord::new("q1", "s1", 0.1)]
    );
    Ok(())
}

#[test]
fn test_output_order_independent_of_threads() -> Result<()> {
    let ids: Vec<String> = (0..24).map(|i| format!("{i:02}")).collect();
    let query_ids: Vec<String> = ids.iter().map(|i| format!("q{i}")).collect();
    let subject_ids: Vec<String> = ids.iter().map(|i| format!("s{i}")).collect();

    let query = genome("query", &as_strs(&query_ids));
    let subject = genome("subject", &as_strs(&subject_ids));

    let mut forward = Vec::new();
    let mut reverse = Vec::new();
    let mut distances = Vec::new();
    for (i, (q, s)) in query_ids.iter().zip(&subject_ids).enumerate() {
        forward.push((q.as_str(), vec![(s.as_str(), 1e-30)]));
        reverse.push((s.as_str(), vec![(q.as_str(), 1e-30)]));
        distances.push((q.as_str(), s.as_str(), 0.01 * (i + 1) as f64));
    }
    let (forward, reverse) = (hits(&forward), hits(&reverse));
    let thresholds = [Threshold::new(0.2, 1e-20), Threshold::new(0.8, 1e-5)];

    let sequential = finder(config(1), DistanceTable::new(&distances))
        .compute_orthologs(&query, &subject, &thresholds, &forward, &reverse, None)?;
    let parallel = finder(config(4), DistanceTable::new(&distances))
        .compute_orthologs(&query, &subject, &thresholds, &forward, &reverse, None)?;

    for threshold in thresholds {
        let found = records(&parallel, threshold);
        assert_eq!(found, records(&sequential, threshold));
        assert_eq!(found.len(), 24);
        assert_eq!(found[0].query_id, "q00");
        assert_eq!(found[23].query_id, "q23");
    }
    Ok(())
}

#[test]
fn test_one_scratch_directory_per_thread() -> Result<()> {
    let ids: Vec<String> = (0..40).map(|i| format!("q{i:02}")).collect();
    let query = genome("query", &as_strs(&ids));
    let subject = genome("subject", &["s1"]);
    let forward: Vec<(&str, Vec<(&str, f64)>)> =
        ids.iter().map(|id| (id.as_str(), vec![("s1", 1e-30)])).collect();
    let forward = hits(&forward);
    let reverse = hits(&[("s1", vec![("q00", 1e-30)])]);
    let distances = DistanceTable::new(&[("q00", "s1", 0.1)]);
    let prepared = distances.prepared();
    let config = Config::builder()
        .num_threads(3)
        .genome_swap(false)
        .align_retry_delay(Duration::ZERO)
        .build();

    let threshold = Threshold::new(0.5, 1e-5);
    let orthologs = finder(config, distances).compute_orthologs(
        &query,
        &subject,
        &[threshold],
        &forward,
        &reverse,
        None,
    )?;

    assert_eq!(
        records(&orthologs, threshold),
        vec![OrthologRecord::new("q00", "s1", 0.1)]
    );
    assert_eq!(prepared.load(Ordering::SeqCst), 3);
    Ok(())
}

fn as_strs(ids: &[String]) -> Vec<&str> {
    ids.iter().map(String::as_str).collect()
}

#[test]
fn test_query_subset() -> Result<()> {
    let (query, subject, forward, reverse, distances) = swap_fixture();
    let threshold = Threshold::new(0.5, 1e-5);
    let finder = finder(config(2), distances);

    let only_q2 = vec!["q2".to_string()];
    let orthologs = finder.compute_orthologs(
        &query,
        &subject,
        &[threshold],
        &forward,
        &reverse,
        Some(only_q2.as_slice()),
    )?;
    assert_eq!(
        records(&orthologs, threshold),
        vec![OrthologRecord::new("q2", "s2", 0.2)]
    );

    // an empty subset searches everything
    let none: Vec<String> = Vec::new();
    let orthologs =
        finder.compute_orthologs(&query, &subject, &[threshold], &forward, &reverse, Some(none.as_slice()))?;
    assert_eq!(
        sorted(records(&orthologs, threshold)),
        vec![
            OrthologRecord::new("q1", "s1", 0.1),
            OrthologRecord::new("q2", "s2", 0.2)
        ]
    );
    Ok(())
}

#[test]
fn test_invalid_input_rejected() {
    let (query, subject, forward, reverse, distances) = swap_fixture();
    let finder = finder(config(1), distances);
    let threshold = Threshold::new(0.5, 1e-5);

    let unknown = vec!["q9".to_string()];
    let result = finder.compute_orthologs(
        &query,
        &subject,
        &[threshold],
        &forward,
        &reverse,
        Some(unknown.as_slice()),
    );
    assert!(matches!(result, Err(RsdError::UnknownSequence { .. })));

    let result = finder.compute_orthologs(&query, &subject, &[], &forward, &reverse, None);
    assert!(matches!(result, Err(RsdError::InvalidConfig(_))));
}

#[test]
fn test_duplicate_thresholds_collapse() -> Result<()> {
    let (query, subject, forward, reverse, distances) = swap_fixture();
    let threshold = Threshold::new(0.5, 1e-5);
    let orthologs = finder(config(1), distances).compute_orthologs(
        &query,
        &subject,
        &[threshold, threshold],
        &forward,
        &reverse,
        None,
    )?;
    assert_eq!(orthologs.len(), 1);
    assert_eq!(orthologs.record_count(), 2);
    Ok(())
}

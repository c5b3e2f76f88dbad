//! Ortholog result files.

mod common;

use anyhow::Result;
use common::{genome, hits, DistanceTable, PaddingAligner};
use pretty_assertions::assert_eq;
use rsd_rs::orthdata::{
    append_orthdatas_file, read_orthdatas_file, read_orthdatas_files, write_orthdatas_file,
};
use rsd_rs::{Config, OrthData, OrthParams, OrthologFinder, OrthologRecord, OrthologSet, Threshold};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_search_results_survive_a_file() -> Result<()> {
    let query = genome("Homo_sapiens", &["q1", "q2"]);
    let subject = genome("Mus_musculus", &["s1", "s2"]);
    let forward = hits(&[("q1", vec![("s1", 1e-30)])]);
    let reverse = hits(&[("s1", vec![("q1", 1e-30)])]);
    // the second threshold is too strict for the only hit
    let thresholds = [Threshold::new(0.2, 1e-20), Threshold::new(0.2, 1e-40)];

    let finder = OrthologFinder::new(
        Config::sequential(),
        Box::new(PaddingAligner),
        Box::new(DistanceTable::new(&[("q1", "s1", 0.15)])),
    );
    let orthologs =
        finder.compute_orthologs(&query, &subject, &thresholds, &forward, &reverse, None)?;

    let dir = tempdir()?;
    let path = dir.path().join("orthologs.txt");
    write_orthdatas_file(&path, &orthologs.to_orthdatas(query.name(), subject.name()))?;

    let text = fs::read_to_string(&path)?;
    assert_eq!(
        text,
        "PA\tHomo_sapiens\tMus_musculus\t0.2\t1e-20\n\
         OR\tq1\ts1\t0.15\n\
         //\n\
         PA\tHomo_sapiens\tMus_musculus\t0.2\t1e-40\n\
         //\n"
    );

    let reloaded = OrthologSet::from_orthdatas(read_orthdatas_file(&path)?);
    assert_eq!(reloaded, orthologs);
    assert_eq!(reloaded.get(&thresholds[1]), Some(&[][..]));
    Ok(())
}

#[test]
fn test_append_and_read_many_files() -> Result<()> {
    let dir = tempdir()?;
    let first = dir.path().join("a.txt");
    let second = dir.path().join("b.txt");
    let group = |query: &str, subject: &str, records: Vec<OrthologRecord>| OrthData {
        params: OrthParams::new(query, subject, Threshold::new(0.5, 1e-10)),
        orthologs: records,
    };

    write_orthdatas_file(&first, &[group("A", "B", vec![OrthologRecord::new("a1", "b1", 0.3)])])?;
    append_orthdatas_file(&first, &[group("A", "C", Vec::new())])?;
    append_orthdatas_file(&second, &[group("B", "C", vec![OrthologRecord::new("b1", "c1", 2.5)])])?;

    let all = read_orthdatas_files(&[&first, &second])?;
    let pairs: Vec<(&str, &str, usize)> = all
        .iter()
        .map(|d| {
            (
                d.params.query_genome.as_str(),
                d.params.subject_genome.as_str(),
                d.orthologs.len(),
            )
        })
        .collect();
    assert_eq!(pairs, vec![("A", "B", 1), ("A", "C", 0), ("B", "C", 1)]);
    Ok(())
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    assert!(read_orthdatas_file(&dir.path().join("absent.txt")).is_err());
}

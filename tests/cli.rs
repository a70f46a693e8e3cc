//! Tests for the `kmr` binary.
//!
//! Each test runs the built executable on scratch files and checks its
//! output and exit status.

use kmr::prelude::*;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::{NamedTempFile, TempDir};

fn kmr(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kmr"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to run kmr")
}

fn path_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

fn kmer33(c: char) -> String {
    std::iter::repeat_n(c, 33).collect()
}

fn counts_file(rows: &[(&str, u64)]) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    for (k, c) in rows {
        writeln!(f, "{}\t{}", k, c).unwrap();
    }
    f.flush().unwrap();
    f
}

#[test]
fn test_count_merge_view() {
    let dir = TempDir::new().unwrap();
    let a = counts_file(&[(&kmer33('C'), 2), (&kmer33('A'), 1)]);
    let b = counts_file(&[(&kmer33('C'), 5)]);
    let a_out = dir.path().join("a.cnt");
    let b_out = dir.path().join("b.cnt.gz");
    let merged = dir.path().join("merged.cnt");

    for (input, output) in [(a.path(), &a_out), (b.path(), &b_out)] {
        let out = kmr(&["count", "-o", path_str(output), path_str(input)]);
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    }

    let out = kmr(&[
        "merge",
        "-t",
        "cnt",
        "-o",
        path_str(&merged),
        path_str(&a_out),
        path_str(&b_out),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let out = kmr(&["view", "-t", "cnt", path_str(&merged)]);
    assert!(out.status.success());
    let text = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            format!("{}\t1", "A".repeat(32)),
            format!("{}\t7", "C".repeat(32)),
        ]
    );
}

#[test]
fn test_merge_stats_and_file_list() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.cnt");
    let mut buf = Vec::new();
    CountTuple::new(Kmer::MIN, CountData { count: 1 })
        .encode(&mut buf)
        .unwrap();
    std::fs::write(&a, &buf).unwrap();

    let list = dir.path().join("inputs.txt");
    std::fs::write(&list, format!("{}\n{}\n", path_str(&a), path_str(&a))).unwrap();
    let merged = dir.path().join("m.cnt");

    let out = kmr(&[
        "merge",
        "-t",
        "cnt",
        "--stats",
        "-f",
        path_str(&list),
        "-o",
        path_str(&merged),
    ]);
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Merge stats: Inputs: 2"), "{}", stderr);

    let got: Vec<CountTuple> = TupleReader::<_, CountHandler>::open(&merged)
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].data.count, 2);
}

#[test]
fn test_merge_unsorted_input_fails() {
    let dir = TempDir::new().unwrap();
    let bad = dir.path().join("bad.cnt");
    let mut buf = Vec::new();
    CountTuple::new(Kmer::MAX, CountData { count: 1 })
        .encode(&mut buf)
        .unwrap();
    CountTuple::new(Kmer::MIN, CountData { count: 1 })
        .encode(&mut buf)
        .unwrap();
    std::fs::write(&bad, &buf).unwrap();
    let merged = dir.path().join("m.cnt");

    let out = kmr(&["merge", "-t", "cnt", "-o", path_str(&merged), path_str(&bad)]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Error:"), "{}", stderr);
    assert!(stderr.contains("not sorted"), "{}", stderr);
    assert!(!merged.exists());
}

#[test]
fn test_truncated_input_fails() {
    let dir = TempDir::new().unwrap();
    let bad = dir.path().join("bad.cnt");
    std::fs::write(&bad, [8u8, 1, 2, 3]).unwrap();

    let out = kmr(&["view", "-t", "cnt", path_str(&bad)]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("unexpected end of input"));
}

#[test]
fn test_unknown_payload_rejected() {
    let out = kmr(&["view", "-t", "maf", "whatever"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown payload type"));
}

#[test]
fn test_keys_round_trip() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.cnt");
    let mut buf = Vec::new();
    for k in [Kmer::MIN, Kmer([0, 0, 0, 0, 0, 0, 1, 0]), Kmer::MAX] {
        CountTuple::new(k, CountData { count: 1 })
            .encode(&mut buf)
            .unwrap();
    }
    std::fs::write(&input, &buf).unwrap();
    let keys = dir.path().join("keys.bin");

    let out = kmr(&["keys", "-t", "cnt", "-o", path_str(&keys), path_str(&input)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let out = kmr(&["keys", "--print", path_str(&keys)]);
    assert!(out.status.success());
    let text = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "A".repeat(32));
    assert_eq!(lines[2], "T".repeat(32));
}

#[test]
fn test_checkpoints() {
    let out = kmr(&["checkpoints", "-n", "4", "--seed", "3"]);
    assert!(out.status.success());
    let text = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(lines[3], "T".repeat(32));

    let again = kmr(&["checkpoints", "-n", "4", "--seed", "3"]);
    assert_eq!(again.stdout, text.as_bytes());
}

#[test]
fn test_bad_part_number() {
    let f = counts_file(&[(&kmer33('A'), 1)]);
    let dir = TempDir::new().unwrap();
    let out = kmr(&[
        "count",
        "--part",
        "3",
        "--nparts",
        "2",
        "-o",
        path_str(&dir.path().join("x.cnt")),
        path_str(f.path()),
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("part must be between 1 and 2"));
}

#[test]
fn test_filter_then_has() {
    let dir = TempDir::new().unwrap();
    let counts = dir.path().join("all.cnt");
    let mut buf = Vec::new();
    for (c, n) in [('A', 1), ('C', 3), ('G', 2)] {
        let key = Kmer::from_dna(kmer33(c).as_bytes()).unwrap();
        CountTuple::new(key, CountData { count: n })
            .encode(&mut buf)
            .unwrap();
    }
    std::fs::write(&counts, &buf).unwrap();

    let whitelist = dir.path().join("wl.cnt");
    let out = kmr(&[
        "filter",
        "--min",
        "2",
        "--stats",
        "-o",
        path_str(&whitelist),
        path_str(&counts),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Filter stats: Read: 3, Kept: 2"));

    let s0 = counts_file(&[(&kmer33('A'), 1), (&kmer33('C'), 1)]);
    let s1 = counts_file(&[(&kmer33('C'), 4), (&kmer33('G'), 1)]);
    let has = dir.path().join("out.has");
    let out = kmr(&[
        "has",
        "-w",
        path_str(&whitelist),
        "-o",
        path_str(&has),
        path_str(s0.path()),
        path_str(s1.path()),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let out = kmr(&["view", "-t", "has", path_str(&has)]);
    assert!(out.status.success());
    let text = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with(&"C".repeat(32)));
    assert!(lines[1].starts_with(&"G".repeat(32)));
}

#[test]
fn test_filter_rejects_repeated_keys() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("dup.cnt");
    let mut buf = Vec::new();
    for _ in 0..2 {
        CountTuple::new(Kmer::MIN, CountData { count: 5 })
            .encode(&mut buf)
            .unwrap();
    }
    std::fs::write(&input, &buf).unwrap();
    let output = dir.path().join("out.cnt");

    let out = kmr(&["filter", "-o", path_str(&output), path_str(&input)]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("not sorted"));
    assert!(!output.exists());
}

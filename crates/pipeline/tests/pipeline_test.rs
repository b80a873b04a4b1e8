//! End-to-end runs over temporary input directories.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sift_clean::{normalize, Deduplicator, OracleRegistry};
use sift_core::{CleanerConfig, DedupScope, PipelineStats};
use sift_pipeline::{Cleaner, Orchestrator, RunReport};

fn write_file(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}

/// Every shard line of a run, counted, ignoring order.
fn shard_lines(report: &RunReport) -> BTreeMap<String, usize> {
    let mut lines = BTreeMap::new();
    for partition in &report.partitions {
        let content = std::fs::read_to_string(&partition.shard).unwrap();
        for line in content.lines() {
            *lines.entry(line.to_string()).or_insert(0) += 1;
        }
    }
    lines
}

async fn run(config: CleanerConfig, files: Vec<PathBuf>) -> (RunReport, tempfile::TempDir) {
    let output = tempfile::tempdir().unwrap();
    let registry = OracleRegistry::from_config(&config);
    let report = Orchestrator::from_config(config, registry)
        .unwrap()
        .run(files, output.path())
        .await
        .unwrap();
    (report, output)
}

/// Lines for input file `i`: unique prose, an in-file duplicate, and one
/// line for each drop category. No line repeats across files, so the default
/// partition-local dedup scope gives the same decisions for any partition
/// count.
fn corpus_file(i: usize) -> Vec<String> {
    let prose = format!("File {i} opens with a plain sentence about rivers. It continues for a while.");
    vec![
        prose.clone(),
        format!("Write to user{i}@example.com for a copy of report {i}."),
        prose.to_uppercase(),
        format!("ok{i}"),
        format!("!!!...???,,,;;;:::{i}"),
        format!("Record {i} describes hate in plain terms."),
        format!("第{i}号文件讨论了 ab 城市交通和IT产业的发展。"),
        String::new(),
    ]
}

#[tokio::test]
async fn basic_cleaning_scenario() {
    let config = CleanerConfig {
        min_length: 5,
        ..CleanerConfig::default()
    };
    let registry = OracleRegistry::from_config(&config);
    let cleaner = Cleaner::new(config, registry).unwrap();

    let input = ["Hello world!", "Hello world!", "Hi", "Visit http://x.com now for info"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let (chunks, stats) = cleaner.process_texts(input).await;

    assert_eq!(stats.original_count, 4);
    assert_eq!(stats.duplicates_removed, 1);
    assert_eq!(stats.short_texts_removed, 1);
    assert_eq!(stats.final_count, 2);
    assert!(stats.is_balanced());
    assert_eq!(chunks, vec!["Hello world!", "Visit now for info"]);
}

#[tokio::test]
async fn email_redaction_scenario() {
    let cleaner = Cleaner::new(CleanerConfig::default(), OracleRegistry::new()).unwrap();
    let (chunks, _) = cleaner.process_texts(vec!["Contact me at a@b.com".to_string()]).await;
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].contains("[email_REDACTED]"));
    assert!(!chunks[0].contains("a@b.com"));
}

#[tokio::test]
async fn case_folding_and_stopword_removal_are_opt_in() {
    let text = "The Quick brown fox jumps over the lazy dog.".to_string();

    let plain = Cleaner::new(CleanerConfig::default(), OracleRegistry::from_config(&CleanerConfig::default())).unwrap();
    let (chunks, _) = plain.process_texts(vec![text.clone()]).await;
    assert_eq!(chunks, vec![text.clone()]);

    let config = CleanerConfig {
        lowercase: true,
        remove_stopwords: true,
        ..CleanerConfig::default()
    };
    let registry = OracleRegistry::from_config(&config);
    let cleaner = Cleaner::new(config, registry).unwrap();
    let (chunks, stats) = cleaner.process_texts(vec![text]).await;
    assert_eq!(chunks, vec!["quick brown fox jumps lazy dog."]);
    assert_eq!(stats.final_count, 1);
}

#[tokio::test]
async fn harmful_keyword_vetoes_whole_document() {
    let cleaner = Cleaner::new(CleanerConfig::default(), OracleRegistry::new()).unwrap();
    let (chunks, stats) = cleaner
        .process_texts(vec![
            "A long and otherwise pleasant text that mentions TERRORISM once.".to_string(),
            "An ordinary paragraph about gardening and weather.".to_string(),
        ])
        .await;
    assert_eq!(chunks, vec!["An ordinary paragraph about gardening and weather."]);
    assert_eq!(stats.redaction_removed, 1);
    assert_eq!(stats.other_removed, 1);
}

#[tokio::test]
async fn eight_partitions_match_one_partition() {
    let input = tempfile::tempdir().unwrap();
    let files: Vec<PathBuf> = (0..100)
        .map(|i| write_file(input.path(), &format!("part_{i:03}.txt"), &corpus_file(i)))
        .collect();

    let (single, _out1) = run(CleanerConfig { partitions: 1, ..CleanerConfig::default() }, files.clone()).await;
    let (eight, _out8) = run(CleanerConfig { partitions: 8, ..CleanerConfig::default() }, files).await;

    assert_eq!(single.partitions.len(), 1);
    assert_eq!(eight.partitions.len(), 8);
    assert_eq!(single.stats, eight.stats);
    assert_eq!(shard_lines(&single), shard_lines(&eight));

    let stats = &eight.stats;
    assert!(stats.is_balanced());
    assert_eq!(stats.files_read, 100);
    assert_eq!(stats.original_count, 700);
    assert_eq!(stats.duplicates_removed, 100);
    assert_eq!(stats.short_texts_removed, 100);
    assert_eq!(stats.low_quality_removed, 100);
    assert_eq!(stats.redaction_removed, 100);
    assert_eq!(stats.final_count, 300);

    let lines = shard_lines(&eight);
    assert!(lines.keys().all(|l| !l.contains("@example.com")));
    assert!(lines.keys().any(|l| l.contains("[email_REDACTED]")));
    assert!(lines.keys().any(|l| l.starts_with("第7号文件讨论了 城市交通和IT产业的发展")));
}

#[tokio::test]
async fn global_scope_matches_one_partition_with_cross_file_duplicates() {
    let input = tempfile::tempdir().unwrap();
    let files: Vec<PathBuf> = (0..100)
        .map(|i| {
            let mut lines = corpus_file(i);
            lines.push(format!("Shared notice {}: the archive moves next week.", i % 10));
            write_file(input.path(), &format!("part_{i:03}.txt"), &lines)
        })
        .collect();

    let global = |partitions| CleanerConfig {
        partitions,
        dedup_scope: DedupScope::Global,
        ..CleanerConfig::default()
    };
    let (single, _out1) = run(global(1), files.clone()).await;
    let (eight, _out8) = run(global(8), files).await;

    assert_eq!(single.stats, eight.stats);
    assert_eq!(shard_lines(&single), shard_lines(&eight));
    assert_eq!(eight.stats.original_count, 800);
    assert_eq!(eight.stats.duplicates_removed, 190);
    assert_eq!(eight.stats.final_count, 310);
}

#[tokio::test]
async fn global_dedup_matches_across_partition_counts() {
    let input = tempfile::tempdir().unwrap();
    let shared = "Every file repeats this exact boilerplate footer line.".to_string();
    let files: Vec<PathBuf> = (0..20)
        .map(|i| {
            let lines = vec![format!("Body text for document {i} with enough words."), shared.clone()];
            write_file(input.path(), &format!("doc_{i}.txt"), &lines)
        })
        .collect();

    let global = |partitions| CleanerConfig {
        partitions,
        dedup_scope: DedupScope::Global,
        ..CleanerConfig::default()
    };
    let (one, _o1) = run(global(1), files.clone()).await;
    let (four, _o4) = run(global(4), files).await;

    assert_eq!(one.stats.duplicates_removed, 19);
    assert_eq!(four.stats.duplicates_removed, 19);
    assert_eq!(shard_lines(&one), shard_lines(&four));
}

#[tokio::test]
async fn unreadable_files_are_counted_and_skipped() {
    let input = tempfile::tempdir().unwrap();
    let good = write_file(
        input.path(),
        "good.txt",
        &["A readable line with plenty of characters.".to_string()],
    );
    let missing = input.path().join("missing.txt");
    let directory = input.path().join("nested");
    std::fs::create_dir(&directory).unwrap();

    let (report, _out) = run(
        CleanerConfig { partitions: 2, ..CleanerConfig::default() },
        vec![good, missing, directory],
    )
    .await;

    assert_eq!(report.stats.files_read, 1);
    assert_eq!(report.stats.files_failed, 2);
    assert_eq!(report.stats.final_count, 1);
    assert!(report.partitions.iter().all(|p| p.error.is_none()));
}

#[tokio::test]
async fn invalid_utf8_is_replaced_not_fatal() {
    let input = tempfile::tempdir().unwrap();
    let path = input.path().join("latin1.txt");
    let mut bytes = b"Caf\xe9 culture is a long standing tradition here.\n".to_vec();
    bytes.extend_from_slice(b"Second line is perfectly valid UTF-8 text.\n");
    std::fs::write(&path, bytes).unwrap();

    let (report, _out) = run(CleanerConfig { partitions: 1, ..CleanerConfig::default() }, vec![path]).await;
    assert_eq!(report.stats.original_count, 2);
    assert_eq!(report.stats.final_count, 2);
    assert!(shard_lines(&report).keys().any(|l| l.contains('\u{FFFD}')));
}

#[tokio::test]
async fn run_report_round_trips_as_json() {
    let input = tempfile::tempdir().unwrap();
    let file = write_file(input.path(), "a.txt", &corpus_file(1));
    let (report, out) = run(CleanerConfig::default(), vec![file]).await;

    let path = out.path().join("run_report.json");
    report.write_json(&path).unwrap();
    let parsed: RunReport = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed.run_id, report.run_id);
    assert_eq!(parsed.stats, report.stats);
    assert_eq!(parsed.partitions.len(), 1);
}

#[test]
fn normalization_and_dedup_are_idempotent_on_corpus() {
    let texts: Vec<String> = (0..30).flat_map(corpus_file).collect();
    for text in &texts {
        let once = normalize(text);
        assert_eq!(normalize(&once), once);
    }
    let (once, _) = Deduplicator::new().deduplicate(texts);
    let (_, removed) = Deduplicator::new().deduplicate(once);
    assert_eq!(removed, 0);
}

#[tokio::test]
async fn stats_balance_for_mixed_inputs() {
    let cleaner = Cleaner::new(CleanerConfig::default(), OracleRegistry::new()).unwrap();
    for seed in 0..5 {
        let texts: Vec<String> = (0..40).map(|i| corpus_file((i * 7 + seed) % 9)[i % 8].clone()).collect();
        let (_, stats): (_, PipelineStats) = cleaner.process_texts(texts).await;
        assert!(stats.is_balanced(), "unbalanced stats for seed {seed}: {stats:?}");
    }
}

//! End-to-end scenarios from the testable-properties list: ranking,
//! snippets, encoding boundaries, and file-size boundaries.

use localindex_core::{Core, ServerConfig};
use tempfile::tempdir;

fn config(source: &std::path::Path, index: &std::path::Path, max_mb: u64) -> ServerConfig {
    ServerConfig {
        source_directory: source.to_path_buf(),
        index_output_directory: index.to_path_buf(),
        included_extensions: vec![".txt".into(), ".md".into()],
        excluded_extensions: vec![],
        scan_interval_seconds: 300,
        max_file_size_mb: max_mb,
    }
}

#[tokio::test]
async fn test_search_surfaces_highlighted_snippet() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("src");
    let index = dir.path().join("idx");
    std::fs::create_dir_all(&source).unwrap();
    std::fs::create_dir_all(&index).unwrap();
    std::fs::write(source.join("a.txt"), "Python programming tutorial").unwrap();
    std::fs::write(source.join("b.md"), "Java guide").unwrap();

    let core = Core::initialize(config(&source, &index, 10), false).await.unwrap();

    let stats = core.get_index_stats().await;
    assert!(stats.contains("Indexed Files: 2"));

    let results = core.search("Python", 5).await;
    assert!(results.contains("a.txt"));
    assert!(results.contains("<mark>Python</mark>"));

    core.shutdown().await;
}

#[tokio::test]
async fn test_repeated_term_ranks_above_single_mention() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("src");
    let index = dir.path().join("idx");
    std::fs::create_dir_all(&source).unwrap();
    std::fs::create_dir_all(&index).unwrap();
    std::fs::write(source.join("dense.txt"), "Python Python Python").unwrap();
    std::fs::write(source.join("sparse.txt"), "Python is great").unwrap();

    let core = Core::initialize(config(&source, &index, 10), false).await.unwrap();
    let results = core.search("Python", 10).await;
    let dense_pos = results.find("dense.txt").unwrap();
    let sparse_pos = results.find("sparse.txt").unwrap();
    assert!(dense_pos < sparse_pos, "higher-scoring hit should be listed first");

    core.shutdown().await;
}

#[tokio::test]
async fn test_file_over_size_limit_is_excluded() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("src");
    let index = dir.path().join("idx");
    std::fs::create_dir_all(&source).unwrap();
    std::fs::create_dir_all(&index).unwrap();

    // max_file_size_mb = 0 is rejected by config validation, so use the
    // smallest valid limit and a file one byte over it.
    let one_mb = 1024 * 1024;
    std::fs::write(source.join("big.txt"), vec![b'a'; one_mb + 1]).unwrap();
    std::fs::write(source.join("small.txt"), vec![b'a'; one_mb - 1]).unwrap();

    let core = Core::initialize(config(&source, &index, 1), false).await.unwrap();
    let stats = core.get_index_stats().await;
    assert!(stats.contains("Indexed Files: 1"));

    core.shutdown().await;
}

#[tokio::test]
async fn test_binary_content_with_text_extension_is_skipped() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("src");
    let index = dir.path().join("idx");
    std::fs::create_dir_all(&source).unwrap();
    std::fs::create_dir_all(&index).unwrap();
    std::fs::write(source.join("sneaky.txt"), [0x00, 0x01, 0x02, 0x03]).unwrap();
    std::fs::write(source.join("real.txt"), "plain text").unwrap();

    let core = Core::initialize(config(&source, &index, 10), false).await.unwrap();
    let stats = core.get_index_stats().await;
    assert!(stats.contains("Indexed Files: 1"));

    core.shutdown().await;
}

#[tokio::test]
async fn test_utf8_bom_file_is_indexed_and_searchable() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("src");
    let index = dir.path().join("idx");
    std::fs::create_dir_all(&source).unwrap();
    std::fs::create_dir_all(&index).unwrap();
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(b"bom_marker_token");
    std::fs::write(source.join("bom.txt"), bytes).unwrap();

    let core = Core::initialize(config(&source, &index, 10), false).await.unwrap();
    let results = core.search("bom_marker_token", 10).await;
    assert!(results.contains("bom.txt"));

    core.shutdown().await;
}

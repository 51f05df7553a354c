//! End-to-end tests for the local pipeline over an on-disk snapshot.

use std::sync::Arc;
use tempfile::TempDir;
use vvsearch::{
    EpisodeLinkMap, LinkResolver, LocalOutcome, LocalPage, LocalSearch, Paginator, ResultFormatter, SearchConfig,
    SearchError, SubtitleDatabase, SubtitleRecord,
};

fn snapshot(rows: &[(&str, &str, &str)]) -> (SubtitleDatabase, TempDir) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("subtitles.db");
    let records: Vec<SubtitleRecord> = rows
        .iter()
        .map(|(title, timestamp, text)| SubtitleRecord::new(*title, *timestamp, 0.5, *text))
        .collect();
    SubtitleDatabase::create(&path).unwrap().insert_records(&records).unwrap();
    (SubtitleDatabase::open_snapshot(&path).unwrap(), dir)
}

fn local_search(db: SubtitleDatabase, links: EpisodeLinkMap, page_size: usize) -> LocalSearch<SubtitleDatabase> {
    let config = SearchConfig {
        page_size,
        ..SearchConfig::default()
    };
    let resolver = LinkResolver::new(Arc::new(links), config.local_link_style());
    LocalSearch::new(
        Arc::new(db),
        ResultFormatter::new(resolver, config.frames_dir.clone()),
        Paginator::new(config.page_size),
    )
}

fn expect_page(outcome: LocalOutcome) -> LocalPage {
    match outcome {
        LocalOutcome::Page(page) => page,
        other => panic!("expected a page, got {other:?}"),
    }
}

fn texts(page: &LocalPage) -> Vec<&str> {
    page.results.iter().map(|c| c.text.as_str()).collect()
}

// ============================================================
// Ranking
// ============================================================

#[tokio::test]
async fn equal_scores_keep_storage_order() {
    let (db, _dir) = snapshot(&[
        ("[P01] a", "1s", "abx"),
        ("[P01] a", "2s", "ab"),
        ("[P01] a", "3s", "xxab"),
        ("[P01] a", "4s", "zzzz"),
    ]);
    let search = local_search(db, EpisodeLinkMap::default(), 20);

    let page = expect_page(search.search("ab", 50).await.unwrap());
    // every hit contains "ab" so all are exact; storage order breaks the tie
    assert_eq!(texts(&page), vec!["abx", "ab", "xxab"]);
    assert!(page.results.iter().all(|c| c.exact_match));
}

#[tokio::test]
async fn fuzzy_hits_are_ordered_by_ratio() {
    let (db, _dir) = snapshot(&[
        ("[P01] a", "1s", "天气好的啊哈"),
        ("[P01] a", "2s", "天气很错啊"),
        ("[P01] a", "3s", "今天天气不错"),
    ]);
    let search = local_search(db, EpisodeLinkMap::default(), 20);

    let page = expect_page(search.search("天气不错", 50).await.unwrap());
    assert_eq!(texts(&page), vec!["今天天气不错", "天气很错啊", "天气好的啊哈"]);
    let labels: Vec<&str> = page.results.iter().map(|c| c.match_label.as_str()).collect();
    assert_eq!(labels, vec!["100.0%", "75.0%", "50.0%"]);
    assert!(page.results[0].exact_match);
    assert!(!page.results[1].exact_match);
}

#[tokio::test]
async fn threshold_filters_low_scores() {
    let (db, _dir) = snapshot(&[("[P01] a", "1s", "天气好的啊哈"), ("[P01] a", "2s", "天气很错啊")]);
    let search = local_search(db, EpisodeLinkMap::default(), 20);

    let page = expect_page(search.search("天气不错", 70).await.unwrap());
    assert_eq!(texts(&page), vec!["天气很错啊"]);
}

// ============================================================
// Strict mode
// ============================================================

#[tokio::test]
async fn whitespace_query_requires_every_keyword() {
    let (db, _dir) = snapshot(&[
        ("[P01] a", "1s", "我们 开始"),
        ("[P01] a", "2s", "开始了我们"),
        ("[P01] a", "3s", "我们走吧"),
    ]);
    let search = local_search(db, EpisodeLinkMap::default(), 20);

    let page = expect_page(search.search("我们 开始", 100).await.unwrap());
    // literal phrase first, then keyword-only match
    assert_eq!(texts(&page), vec!["我们 开始", "开始了我们"]);
    assert!(page.results[0].exact_match);
    assert!(!page.results[1].exact_match);
    assert!(page.results.iter().all(|c| c.match_label == "100.0%"));
}

#[tokio::test]
async fn strict_mode_is_case_sensitive() {
    let (db, _dir) = snapshot(&[("[P01] a", "1s", "Hello World"), ("[P01] a", "2s", "hello world")]);
    let search = local_search(db, EpisodeLinkMap::default(), 20);

    let page = expect_page(search.search("hello world", 0).await.unwrap());
    assert_eq!(texts(&page), vec!["hello world"]);
}

// ============================================================
// Pagination
// ============================================================

#[tokio::test]
async fn pages_partition_the_ranked_results() {
    let rows: Vec<(String, String, String)> = (0..45)
        .map(|i| ("[P02] b".to_string(), format!("{i}s"), format!("hit {i}")))
        .collect();
    let borrowed: Vec<(&str, &str, &str)> = rows.iter().map(|(a, b, c)| (a.as_str(), b.as_str(), c.as_str())).collect();
    let (db, _dir) = snapshot(&borrowed);
    let search = local_search(db, EpisodeLinkMap::default(), 20);

    let first = expect_page(search.search("hit", 100).await.unwrap());
    assert_eq!(first.total_pages, 3);
    assert_eq!(first.total_results, 45);

    let mut seen: Vec<String> = first.results.iter().map(|c| c.text.clone()).collect();
    for _ in 2..=3 {
        let page = expect_page(search.next_page().await.unwrap());
        seen.extend(page.results.iter().map(|c| c.text.clone()));
    }
    let expected: Vec<String> = (0..45).map(|i| format!("hit {i}")).collect();
    assert_eq!(seen, expected);

    let session = search.session().unwrap();
    assert_eq!(session.current_page, 3);
    assert!(!session.has_next());
    assert!(matches!(
        search.go_to_page(4).await,
        Err(SearchError::PageOutOfRange { requested: 4, total: 3 })
    ));
}

#[tokio::test]
async fn single_page_hides_pagination() {
    let (db, _dir) = snapshot(&[("[P01] a", "1s", "hit")]);
    let search = local_search(db, EpisodeLinkMap::default(), 20);
    search.search("hit", 50).await.unwrap();
    assert!(!search.session().unwrap().shows_pagination());
}

#[tokio::test]
async fn new_search_resets_to_first_page() {
    let rows: Vec<(String, String, String)> = (0..5)
        .map(|i| ("[P02] b".to_string(), format!("{i}s"), format!("hit {i}")))
        .collect();
    let borrowed: Vec<(&str, &str, &str)> = rows.iter().map(|(a, b, c)| (a.as_str(), b.as_str(), c.as_str())).collect();
    let (db, _dir) = snapshot(&borrowed);
    let search = local_search(db, EpisodeLinkMap::default(), 2);

    search.search("hit", 100).await.unwrap();
    search.go_to_page(3).await.unwrap();
    let page = expect_page(search.search("hit 1", 100).await.unwrap());
    assert_eq!(page.page, 1);
    assert_eq!(search.session().unwrap().query, "hit 1");
}

// ============================================================
// Links
// ============================================================

#[tokio::test]
async fn results_link_to_the_spoken_moment() {
    let dir = TempDir::new().unwrap();
    let links_path = dir.path().join("links.json");
    std::fs::write(
        &links_path,
        r#"{"https://www.bilibili.com/video/BV1xx": "7", "/video/BV2yy": "8"}"#,
    )
    .unwrap();
    let links = EpisodeLinkMap::load(&links_path).unwrap();

    let (db, _snap) = snapshot(&[
        ("[P07] 第七集", "5m30s", "你好"),
        ("[P08] 第八集", "0m12s", "你好啊"),
        ("[P09] 第九集", "1m0s", "你好呀"),
    ]);
    let search = local_search(db, links, 20);

    let page = expect_page(search.search("你好", 50).await.unwrap());
    let links: Vec<Option<&str>> = page.results.iter().map(|c| c.link.as_deref()).collect();
    assert_eq!(
        links,
        vec![
            Some("https://www.bilibili.com/video/BV1xx?share_source=copy_web&t=330"),
            Some("https://www.bilibili.com/video/BV2yy?share_source=copy_web&t=12"),
            None,
        ]
    );
}

#[tokio::test]
async fn no_results_echoes_query_and_threshold() {
    let (db, _dir) = snapshot(&[("[P01] a", "1s", "abc")]);
    let search = local_search(db, EpisodeLinkMap::default(), 20);

    let outcome = search.search("xyz", 60).await.unwrap();
    assert_eq!(
        outcome,
        LocalOutcome::NoResults {
            query: "xyz".to_string(),
            min_ratio: 60
        }
    );
}

#[tokio::test]
async fn outcome_serializes_with_status_tag() {
    let (db, _dir) = snapshot(&[("[P01] a", "1s", "abc")]);
    let search = local_search(db, EpisodeLinkMap::default(), 20);

    let json = serde_json::to_value(search.search("abc", 50).await.unwrap()).unwrap();
    assert_eq!(json["status"], "page");
    assert_eq!(json["results"][0]["text"], "abc");
}

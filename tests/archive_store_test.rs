//! Integration tests for the week-partitioned archive on disk.

use chrono::{NaiveDate, NaiveDateTime};
use dc_gallery_archiver::archive::{
    partition, ArchiveStore, AuthorType, PostFields, PostRecord, StoreError, WeekFile, WeekInfo,
};
use tempfile::TempDir;

const UPDATED: &str = "2024-03-20T09:00:00+09:00";

fn at(d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn post(id: &str, posted_at: NaiveDateTime) -> PostRecord {
    PostRecord::new(
        PostFields {
            post_id: id.to_string(),
            title: format!("글 {id}"),
            url: format!("https://gall.dcinside.com/view/{id}"),
            author: "ㅇㅇ".to_string(),
            author_ip: "1.234".to_string(),
            author_type: AuthorType::SemiAnonymous,
            views: 3,
            likes: 0,
            comments: 1,
        },
        posted_at,
    )
}

fn setup() -> (ArchiveStore, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = ArchiveStore::new(temp_dir.path().join("data"), "testgall", "테스트 갤러리");
    (store, temp_dir)
}

async fn persist_all(store: &ArchiveStore, posts: Vec<PostRecord>) {
    for bucket in partition(posts).values() {
        store
            .merge_and_persist(bucket, UPDATED)
            .await
            .expect("merge failed");
    }
}

#[tokio::test]
async fn test_missing_directory_is_empty_archive() {
    let (store, _temp_dir) = setup();
    let ids = store.build_id_index().await.unwrap();
    assert!(ids.is_empty());
    assert!(store.load_week("2024_W11").await.unwrap().is_none());
}

#[tokio::test]
async fn test_creates_week_file_with_expected_shape() {
    let (store, _temp_dir) = setup();
    persist_all(&store, vec![post("11", at(12, 9)), post("12", at(13, 9))]).await;

    let raw = std::fs::read_to_string(store.week_path("2024_W11")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(value["gallery_id"], "testgall");
    assert_eq!(value["gallery_name"], "테스트 갤러리");
    assert_eq!(value["week"], "2024_W11");
    assert_eq!(value["week_start"], "2024-03-11");
    assert_eq!(value["week_end"], "2024-03-17");
    assert_eq!(value["last_updated"], UPDATED);
    assert_eq!(value["total_posts"], 2);
    assert_eq!(value["posts"][0]["post_id"], "12");
    assert_eq!(value["posts"][0]["datetime"], "2024-03-13T09:00:00");
    assert_eq!(value["posts"][0]["date"], "2024-03-13");
    assert_eq!(value["posts"][0]["time"], "09:00:00");

    // Pretty-printed, with Korean text kept literal
    assert!(raw.contains("\n  \"gallery_id\""));
    assert!(raw.contains("테스트 갤러리"));
    assert!(!store.dir().join("2024_W11.json.tmp").exists());
}

#[tokio::test]
async fn test_merge_twice_is_idempotent() {
    let (store, _temp_dir) = setup();
    let batch = vec![post("1", at(12, 8)), post("2", at(12, 10)), post("3", at(14, 7))];

    persist_all(&store, batch.clone()).await;
    let first = store.load_week("2024_W11").await.unwrap().unwrap();

    let bucket = partition(batch).remove("2024_W11").unwrap();
    let report = store.merge_and_persist(&bucket, UPDATED).await.unwrap();
    let second = store.load_week("2024_W11").await.unwrap().unwrap();

    assert_eq!(report.added, 0);
    assert_eq!(report.existing, 3);
    assert!(!report.created);
    assert_eq!(first.posts, second.posts);
    assert_eq!(first.total_posts, second.total_posts);
}

#[tokio::test]
async fn test_merge_appends_and_sorts_newest_first() {
    let (store, _temp_dir) = setup();
    persist_all(&store, vec![post("1", at(11, 8)), post("3", at(15, 8))]).await;
    persist_all(&store, vec![post("4", at(17, 23)), post("2", at(13, 8)), post("3", at(15, 8))]).await;

    let file = store.load_week("2024_W11").await.unwrap().unwrap();
    let ids: Vec<&str> = file.posts.iter().map(|p| p.post_id.as_str()).collect();

    assert_eq!(ids, vec!["4", "3", "2", "1"]);
    assert_eq!(file.total_posts, 4);
    assert!(file.posts.windows(2).all(|w| w[0].datetime >= w[1].datetime));
}

#[tokio::test]
async fn test_posts_land_in_their_own_week() {
    let (store, _temp_dir) = setup();
    let posts: Vec<PostRecord> = (1..=20)
        .map(|d| post(&format!("{d}"), at(d, 12)))
        .collect();
    persist_all(&store, posts).await;

    let mut seen = std::collections::HashSet::new();
    for week in ["2024_W09", "2024_W10", "2024_W11", "2024_W12"] {
        let file: WeekFile = store.load_week(week).await.unwrap().unwrap();
        assert_eq!(file.total_posts, file.posts.len());
        for p in &file.posts {
            assert_eq!(WeekInfo::for_date(p.datetime.date()).week_id, file.week);
            assert!(seen.insert(p.post_id.clone()), "duplicate id {}", p.post_id);
        }
    }
    assert_eq!(seen.len(), 20);

    let index = store.build_id_index().await.unwrap();
    assert_eq!(index, seen);
}

#[tokio::test]
async fn test_index_ignores_other_files() {
    let (store, _temp_dir) = setup();
    persist_all(&store, vec![post("1", at(12, 8))]).await;
    std::fs::write(store.dir().join("notes.txt"), "not json").unwrap();
    std::fs::write(store.dir().join("2024_W12.json.tmp"), "{").unwrap();

    let index = store.build_id_index().await.unwrap();
    assert_eq!(index.len(), 1);
    assert!(index.contains("1"));
}

#[tokio::test]
async fn test_corrupt_week_file_is_an_error() {
    let (store, _temp_dir) = setup();
    std::fs::create_dir_all(store.dir()).unwrap();
    std::fs::write(store.week_path("2024_W11"), "{ not json").unwrap();

    assert!(matches!(
        store.build_id_index().await,
        Err(StoreError::Decode { .. })
    ));

    let bucket = partition(vec![post("1", at(12, 8))]).remove("2024_W11").unwrap();
    assert!(store.merge_and_persist(&bucket, UPDATED).await.is_err());
}

#[tokio::test]
async fn test_reads_files_written_by_earlier_versions() {
    let (store, _temp_dir) = setup();
    std::fs::create_dir_all(store.dir()).unwrap();
    let legacy = r#"{
      "gallery_id": "testgall",
      "gallery_name": "테스트 갤러리",
      "week": "2024_W11",
      "week_start": "2024-03-11",
      "week_end": "2024-03-17",
      "last_updated": "2024-03-12T10:00:00+09:00",
      "posts": [
        {
          "post_id": "500",
          "title": "old",
          "author": "member1",
          "author_ip": "",
          "author_type": "member",
          "date": "2024-03-12",
          "time": "09:30:00",
          "datetime": "2024-03-12T09:30:00",
          "views": 1,
          "likes": 0,
          "comments": 0,
          "url": "https://gall.dcinside.com/view/500"
        }
      ],
      "total_posts": 1
    }"#;
    std::fs::write(store.week_path("2024_W11"), legacy).unwrap();

    persist_all(&store, vec![post("501", at(12, 10))]).await;

    let file = store.load_week("2024_W11").await.unwrap().unwrap();
    assert_eq!(file.total_posts, 2);
    assert_eq!(file.posts[0].post_id, "501");
    assert_eq!(file.posts[1].author_type, AuthorType::Member);
}

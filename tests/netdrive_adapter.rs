//! Cloud-drive adapter against a local stub of the drive API.

mod common;

use common::{serve, Route, StubServer};
use reelgate::{AuthBlock, BackendConfig, Error, Extension, HttpClient, QuarkAdapter, SourceAdapter, SourceType};
use serde_json::json;

const SHARE: &str = "/1/clouddrive/share/sharepage/detail";
const SORT: &str = "/1/clouddrive/file/sort";
const DOWNLOAD: &str = "/1/clouddrive/file/download";

fn ok(data: serde_json::Value) -> serde_json::Value {
    json!({"status": 200, "code": 0, "message": "ok", "data": data})
}

fn file(fid: &str, name: &str, format_type: &str, dir: bool) -> serde_json::Value {
    json!({
        "fid": fid,
        "file_name": name,
        "size": 734_003_200_u64,
        "format_type": format_type,
        "created_at": 1_672_531_200_000_i64,
        "dir": dir
    })
}

async fn drive_stub() -> StubServer {
    serve(vec![
        Route::json(
            SHARE,
            ok(json!({"list": [
                file("c1", "E01.mp4", "video/mp4", false),
                file("c2", "E02.mp4", "video/mp4", false),
                file("n1", "notes.txt", "text/plain", false),
            ]})),
        )
        .when_query("pdir_fid=d1"),
        Route::json(
            SHARE,
            ok(json!({"list": [
                file("d1", "Harbor Series", "", true),
                file("f1", "Harbor.Movie.mkv", "video/x-matroska", false),
                file("t1", "harbor.txt", "text/plain", false),
                file("o1", "Other.mp4", "video/mp4", false),
            ]})),
        )
        .when_query("pwd_id=sh1"),
        Route::json(
            SORT,
            ok(json!({"list": [
                file("p1", "harbor personal.mp4", "video/mp4", false),
                file("p2", "harbor.srt", "text/plain", false),
            ]})),
        )
        .when_query("keyword="),
        Route::json(
            SORT,
            ok(json!({"list": [], "metadata": {"title": "harbor personal"}})),
        )
        .when_query("pdir_fid=p1"),
        Route::json(SORT, ok(json!({"list": []}))),
        Route::json(DOWNLOAD, ok(json!([{"download_url": "https://dl.example/c1?sig=abc"}])))
            .when_query("fids=c1"),
        Route::json(DOWNLOAD, ok(json!([{"download_url": "https://dl.example/p1?sig=def"}])))
            .when_query("fids=p1"),
    ])
    .await
}

fn adapter(server: &StubServer, cookie: Option<&str>) -> QuarkAdapter {
    let mut config = BackendConfig::catalog("drive", "Drive", &server.base);
    config.source_type = SourceType::Quark;
    config.ext = Some(Extension::Text("https://pan.quark.cn/s/sh1#/list/share".into()));
    config.auth = cookie.map(|c| AuthBlock {
        cookie: Some(c.to_string()),
        ..AuthBlock::default()
    });
    QuarkAdapter::new(config, HttpClient::new().unwrap())
}

fn ids(results: &[reelgate::SearchResult]) -> Vec<&str> {
    results.iter().map(|r| r.id.as_str()).collect()
}

#[tokio::test]
async fn search_concatenates_share_and_personal_surfaces() {
    let server = drive_stub().await;
    let adapter = adapter(&server, Some("sid=1"));

    let results = adapter.search("HARBOR").await;
    assert_eq!(ids(&results), vec!["sh1:d1", "sh1:f1", "p1"]);
    assert!(results[0].episodes.is_empty());
    assert_eq!(results[1].title, "Harbor.Movie");
    assert_eq!(results[1].episodes, vec!["quark:f1"]);
    assert_eq!(results[1].year, "2023");
}

#[tokio::test]
async fn anonymous_search_uses_shares_only() {
    let server = drive_stub().await;
    let adapter = adapter(&server, None);

    let results = adapter.search("harbor").await;
    assert_eq!(ids(&results), vec!["sh1:d1", "sh1:f1"]);
    assert!(server.hits().iter().all(|h| !h.starts_with(SORT)));
    assert!(!adapter.is_authenticated().await);
}

#[tokio::test]
async fn share_folder_detail_materialises_video_children() {
    let server = drive_stub().await;
    let adapter = adapter(&server, None);

    let detail = adapter.get_detail("sh1:d1").await.unwrap();
    assert_eq!(detail.episodes, vec!["quark:c1", "quark:c2"]);
    assert_eq!(detail.episode_titles, vec!["E01.mp4", "E02.mp4"]);
}

#[tokio::test]
async fn play_url_is_fetched_fresh_every_time() {
    let server = drive_stub().await;
    let adapter = adapter(&server, Some("sid=1"));

    for _ in 0..2 {
        assert_eq!(
            adapter.get_play_url("sh1:d1", 0).await.unwrap(),
            "https://dl.example/c1?sig=abc"
        );
    }
    let downloads = server.hits().iter().filter(|h| h.starts_with(DOWNLOAD)).count();
    assert_eq!(downloads, 2);

    assert!(matches!(
        adapter.get_play_url("sh1:d1", 5).await,
        Err(Error::EpisodeIndexOutOfRange { index: 5, len: 2 })
    ));
}

#[tokio::test]
async fn play_url_without_cookie_is_credential_missing() {
    let server = drive_stub().await;
    let adapter = adapter(&server, None);
    assert!(matches!(
        adapter.get_play_url("sh1:d1", 0).await,
        Err(Error::CredentialMissing(_))
    ));
}

#[tokio::test]
async fn personal_leaf_is_its_own_episode() {
    let server = drive_stub().await;
    let adapter = adapter(&server, Some("sid=1"));

    let detail = adapter.get_detail("p1").await.unwrap();
    assert_eq!(detail.title, "harbor personal");
    assert_eq!(detail.episodes, vec!["quark:p1"]);
    assert_eq!(
        adapter.get_play_url("p1", 0).await.unwrap(),
        "https://dl.example/p1?sig=def"
    );
}

#[tokio::test]
async fn rejected_session_is_not_authenticated() {
    let server = serve(vec![Route::json(
        SORT,
        json!({"status": 401, "code": 31001, "message": "require login"}),
    )])
    .await;
    let adapter = adapter(&server, Some("sid=expired"));

    assert!(!adapter.is_authenticated().await);
    assert!(adapter.refresh_auth().await.is_err());
}

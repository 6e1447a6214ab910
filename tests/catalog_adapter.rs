//! Catalog adapter against a local stub backend.

mod common;

use common::{serve, Route};
use reelgate::{BackendConfig, CatalogAdapter, Error, HttpClient, SourceAdapter};
use serde_json::json;

const API: &str = "/api.php/provide/vod";

fn adapter(api: String) -> CatalogAdapter {
    CatalogAdapter::new(
        BackendConfig::catalog("cat", "Catalog", &api),
        HttpClient::new().unwrap(),
    )
}

fn listing() -> serde_json::Value {
    json!({
        "code": 1,
        "list": [
            {
                "vod_id": 101,
                "vod_name": "  Night   Harbor ",
                "vod_pic": "https://img.example/101.jpg",
                "vod_play_url": "E1$https://a.example/1.m3u8#E2$https://a.example/2.m3u8$$$E1$https://b.example/1.m3u8#E2$https://b.example/2.m3u8#E3$https://b.example/3.m3u8",
                "vod_class": "Drama",
                "vod_year": "2021",
                "vod_content": "<p>A <b>harbor</b> mystery.</p>",
                "type_name": "TV"
            },
            {
                "vod_id": "102",
                "vod_name": "Downloads Only",
                "vod_play_url": "E1$https://a.example/1.mp4"
            },
            {
                "vod_id": 103,
                "vod_name": "Content Links",
                "vod_play_url": "",
                "vod_content": "watch https://c.example/x/1.m3u8 and https://c.example/x/2.m3u8"
            },
            { "vod_name": "no id at all" }
        ]
    })
}

#[tokio::test]
async fn search_keeps_largest_group_and_drops_empty_records() {
    let server = serve(vec![Route::json(API, listing())]).await;
    let adapter = adapter(server.url(API));

    let results = adapter.search("harbor").await;
    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["101", "103"]);

    let first = &results[0];
    assert_eq!(first.title, "Night Harbor");
    assert_eq!(first.episodes.len(), 3);
    assert!(first.episodes.iter().all(|e| e.starts_with("https://b.example/")));
    assert_eq!(first.desc, "A harbor mystery.");
    assert_eq!(first.year, "2021");
    assert_eq!(first.source, "cat");

    assert_eq!(results[1].episode_titles, vec!["1", "2"]);
    assert_eq!(results[1].year, "unknown");

    let hits = server.hits();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].contains("ac=videolist"));
    assert!(hits[0].contains("wd=harbor"));
}

#[tokio::test]
async fn detail_and_play_url_by_id() {
    let server = serve(vec![Route::json(API, listing()).when_query("ids=101")]).await;
    let adapter = adapter(server.url(API));

    let detail = adapter.get_detail("101").await.unwrap();
    assert_eq!(detail.id, "101");
    assert_eq!(detail.episodes.len(), 3);

    assert_eq!(
        adapter.get_play_url("101", 2).await.unwrap(),
        "https://b.example/3.m3u8"
    );
    assert!(matches!(
        adapter.get_play_url("101", 3).await,
        Err(Error::EpisodeIndexOutOfRange { index: 3, len: 3 })
    ));
}

#[tokio::test]
async fn payload_without_list_is_empty_search_and_malformed_detail() {
    let server = serve(vec![Route::json(API, json!({"code": 0, "msg": "closed"}))]).await;
    let adapter = adapter(server.url(API));

    assert!(adapter.search("x").await.is_empty());
    assert!(matches!(
        adapter.get_detail("1").await,
        Err(Error::MalformedPayload(_))
    ));
}

#[tokio::test]
async fn html_error_page_is_absorbed_by_search() {
    let server = serve(vec![Route::raw(API, "text/html", "<html>maintenance</html>")]).await;
    let adapter = adapter(server.url(API));
    assert!(adapter.search("x").await.is_empty());
    assert!(matches!(
        adapter.get_detail("1").await,
        Err(Error::MalformedPayload(_))
    ));
}

#[tokio::test]
async fn server_error_is_transport_failure() {
    let server = serve(vec![Route::json(API, json!({})).with_status(500)]).await;
    let adapter = adapter(server.url(API));

    assert!(adapter.search("x").await.is_empty());
    assert!(matches!(
        adapter.get_detail("1").await,
        Err(Error::Transport(_))
    ));
}

#[tokio::test]
async fn detail_page_base_switches_to_scraping() {
    let page = r#"<html><body>
<img src="https://img.example/poster.jpg">
<h1>Scraped Title</h1><span>2019</span>
<div class="sketch">Plot <em>here</em></div>
<a>第1集$https://v.example/s/1.m3u8</a>
<a>第2集$https://v.example/s/2.m3u8</a>
</body></html>"#;
    let server = serve(vec![Route::raw(
        "/index.php/vod/detail/id/7.html",
        "text/html; charset=utf-8",
        page,
    )])
    .await;

    let mut config = BackendConfig::catalog("site", "Site", &server.url(API));
    config.detail = Some(server.base.clone());
    let adapter = CatalogAdapter::new(config, HttpClient::new().unwrap());

    let detail = adapter.get_detail("7").await.unwrap();
    assert_eq!(detail.title, "Scraped Title");
    assert_eq!(detail.year, "2019");
    assert_eq!(detail.poster, "https://img.example/poster.jpg");
    assert_eq!(detail.desc, "Plot here");
    assert_eq!(detail.episode_titles, vec!["1", "2"]);
    assert_eq!(
        adapter.get_play_url("7", 1).await.unwrap(),
        "https://v.example/s/2.m3u8"
    );
}

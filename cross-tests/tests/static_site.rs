use config::E2eTestOptions;
use fixtures::{FixtureHost, StaticSiteServerFixture, find_sample_or_test_site_path};

fn sample_app() -> FixtureHost<StaticSiteServerFixture> {
    fixtures::init_tracing();
    FixtureHost::with_options(
        StaticSiteServerFixture::new("SampleApp"),
        E2eTestOptions::default(),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn sample_app_is_served_from_its_registered_directory() {
    let host = sample_app();
    let root = host.root_uri().expect("SampleApp should start").clone();

    let index = reqwest::get(root.join("index.html").unwrap())
        .await
        .unwrap();
    assert!(index.status().is_success());
    assert!(index.text().await.unwrap().contains("Hello from SampleApp"));

    let css = reqwest::get(root.join("css/site.css").unwrap()).await.unwrap();
    assert!(css.status().is_success());

    let missing = reqwest::get(root.join("nope.html").unwrap()).await.unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

    tokio::task::spawn_blocking(move || host.dispose())
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn root_directory_serves_index() {
    let host = sample_app();
    let root = host.root_uri().unwrap().clone();

    let body = reqwest::get(root).await.unwrap().text().await.unwrap();
    assert!(body.contains("<title>SampleApp</title>"));

    tokio::task::spawn_blocking(move || drop(host)).await.unwrap();
}

#[test]
fn registered_site_directory_exists() {
    let path = find_sample_or_test_site_path("StandaloneApp").unwrap();
    assert!(path.join("index.html").is_file());
}

#[test]
fn remote_mode_rewrites_only_the_host() {
    let mut options = E2eTestOptions {
        sauce_test: true,
        ..E2eTestOptions::default()
    };
    options.sauce.host_name = "sauce-host".to_string();

    let host = FixtureHost::with_options(StaticSiteServerFixture::new("SampleApp"), options);
    let root = host.root_uri().unwrap();
    let local = host.fixture().local_addr().unwrap();

    assert_eq!(root.scheme(), "http");
    assert_eq!(root.host_str(), Some("sauce-host"));
    assert_eq!(root.port(), Some(local.port()));
}

use mockito::Matcher;
use recipe_gateway::config::FetchConfig;
use recipe_gateway::{FetchError, PageFetcher, RequestFetcher};
use reqwest::StatusCode;

fn fetcher() -> RequestFetcher {
    RequestFetcher::new(&FetchConfig::default()).unwrap()
}

#[tokio::test]
async fn test_fetch_sends_browser_headers() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/recipe")
        .match_header("user-agent", Matcher::Regex("Mozilla/5.0".to_string()))
        .match_header("accept", Matcher::Regex("text/html".to_string()))
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html><body>Soup</body></html>")
        .create_async()
        .await;

    let url = format!("{}/recipe", server.url());
    let page = fetcher().fetch(&url).await.unwrap();

    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body, "<html><body>Soup</body></html>");
}

#[tokio::test]
async fn test_fetch_passes_error_status_through() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/gone")
        .with_status(404)
        .with_body("Not here")
        .create_async()
        .await;

    let url = format!("{}/gone", server.url());
    let page = fetcher().fetch(&url).await.unwrap();

    assert_eq!(page.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fetch_refuses_redirect_to_unsafe_url() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/moved")
        .with_status(302)
        .with_header("location", "http://169.254.169.254/latest/meta-data")
        .create_async()
        .await;

    let url = format!("{}/moved", server.url());
    let result = fetcher().fetch(&url).await;

    assert!(matches!(result, Err(FetchError::Redirect(_))));
}

#[tokio::test]
async fn test_fetch_connection_failure_is_transport_error() {
    // Nothing listens on the discard port locally
    let result = fetcher().fetch("http://127.0.0.1:9/recipe").await;

    assert!(matches!(result, Err(FetchError::Transport(_))));
}

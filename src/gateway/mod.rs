//! The font download pipeline and its routes.
//!
//! ```text
//! GET /[<fontType>]/css?family=…
//!   → FontRequest::parse            400 Invalid request: <path>
//!   → user_agent::resolve           400 Could not resolve font type
//!   → Fetch(stylesheet)             502 Could not connect / Download cancelled
//!   → ArchiveSession::rewrite       spawns one fetch task per font file
//!   → 200 + streamed body           (status committed from here on)
//!   → add <name>.css, join, finalize
//! ```

mod counter;
mod font_request;
pub mod user_agent;

pub use counter::RequestCounter;
pub use font_request::{DEFAULT_FONT_TYPE, FontRequest, sanitize};

use std::sync::Arc;

use http::Method;
use tracing::{Instrument, Span, info, info_span, warn};

use crate::archive::{self, ArchiveSession};
use crate::config::Config;
use crate::error::Error;
use crate::health;
use crate::request::Request;
use crate::response::{ContentType, Response};
use crate::router::Router;
use crate::upstream::Fetch;

/// Shared state behind every route.
pub struct Gateway<F> {
    fetcher: Arc<F>,
    upstream: String,
    docs_url: String,
    max_concurrent_fetches: usize,
    requests: RequestCounter,
}

impl<F: Fetch> Gateway<F> {
    pub fn new(fetcher: F, config: &Config) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            upstream: config.upstream_base().to_owned(),
            docs_url: config.docs_url.clone(),
            max_concurrent_fetches: usize::try_from(config.max_concurrent_fetches)
                .unwrap_or(usize::MAX),
            requests: RequestCounter::new(),
        }
    }

    /// All routes; anything else is answered `400 Invalid request: <path>`.
    ///
    /// `/` and `/ping` match only without a query string.
    pub fn router(self) -> Router {
        let gateway = Arc::new(self);

        let index = {
            let gateway = Arc::clone(&gateway);
            move |req: Request| {
                let location = gateway.docs_url.clone();
                async move {
                    without_query(&req)?;
                    Ok::<_, Error>(Response::redirect(&location))
                }
            }
        };

        let ping = |req: Request| async move {
            without_query(&req)?;
            Ok::<_, Error>(health::ping(req).await)
        };

        let fonts = move |req: Request| {
            let gateway = Arc::clone(&gateway);
            async move { gateway.fonts(req).await }
        };

        let invalid = |req: Request| async move {
            Error::InvalidRequest(req.path_and_query().to_owned())
        };

        Router::new()
            .on(Method::GET, "/", index)
            .on(Method::GET, "/ping", ping)
            .on(Method::GET, "/css", fonts.clone())
            .on(Method::GET, "/{font_type}/css", fonts)
            .fallback(invalid)
    }

    /// Fetches and rewrites the stylesheet, then answers with an archive
    /// that keeps filling while the font files arrive.
    async fn fonts(&self, req: Request) -> Result<Response, Error> {
        let font = FontRequest::parse(req.path_and_query())?;
        let id = self.requests.next();

        async {
            let user_agent = user_agent::resolve(&font.font_type, req.header("user-agent"))?;

            let url = format!("{}{}", self.upstream, font.query);
            let css = self.fetcher.fetch(&user_agent, &url).await?;

            info!(archive = %font.archive_name, query = %font.query, "creating archive");
            let (writer, body) = archive::channel();
            let mut session = ArchiveSession::new(
                writer,
                Arc::clone(&self.fetcher),
                user_agent,
                self.max_concurrent_fetches,
            );
            let css = session.rewrite(&String::from_utf8_lossy(&css), &font.archive_name);

            tokio::spawn(
                complete_archive(session, font.stylesheet_name(), css).instrument(Span::current()),
            );

            Ok::<_, Error>(
                Response::builder()
                    .header(
                        "content-disposition",
                        &format!("attachment; filename={};", font.archive_file_name()),
                    )
                    .stream(ContentType::Zip, body),
            )
        }
        .instrument(info_span!("request", id))
        .await
    }
}

fn without_query(req: &Request) -> Result<(), Error> {
    match req.query() {
        Some(_) => Err(Error::InvalidRequest(req.path_and_query().to_owned())),
        None => Ok(()),
    }
}

/// Adds the stylesheet, waits for every font file, then finalizes. Runs after
/// the status line is out, so failures are only logged.
async fn complete_archive<F: Fetch>(session: ArchiveSession<F>, css_name: String, css: String) {
    if let Err(e) = session.add_entry(&css_name, css.as_bytes()) {
        warn!(file = %css_name, "could not archive stylesheet: {e}");
    }

    info!(pending = session.pending(), "waiting for font files");
    match session.finish().await {
        Ok(entries) => info!(entries, "archive finalized"),
        Err(e) => warn!("archive not finalized: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::BodyExt;

    use super::*;
    use crate::archive::tests::entries;
    use crate::response::Body;
    use crate::upstream::mock::MockFetch;

    const UPSTREAM: &str = "http://upstream.test";

    const ROBOTO_CSS: &[u8] = b"@font-face { src: url(https://host/a.woff2) format('woff2'); }\n\
                                @font-face { src: url(https://host/b.woff2) format('woff2'); }\n";

    fn router(fetcher: MockFetch) -> Router {
        let config = Config { upstream: format!("{UPSTREAM}/"), ..Config::default() };
        Gateway::new(fetcher, &config).router()
    }

    async fn get(router: &Router, uri: &str) -> http::Response<Body> {
        router.handle(http::Request::get(uri).body(()).unwrap()).await
    }

    async fn body(res: http::Response<Body>) -> Bytes {
        res.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn index_redirects_to_docs() {
        let res = get(&router(MockFetch::default()), "/").await;
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(res.headers()["location"], crate::config::DEFAULT_DOCS_URL);
    }

    #[tokio::test]
    async fn ping_pongs() {
        let res = get(&router(MockFetch::default()), "/ping").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(res).await, "Pong");
    }

    #[tokio::test]
    async fn unknown_path_is_invalid() {
        let router = router(MockFetch::default());
        for path in ["/bogus", "/css", "/WOFF/css?family=Roboto", "/ping?x=1", "/?x"] {
            let res = get(&router, path).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body(res).await, format!("Invalid request: {path}"));
        }
    }

    #[tokio::test]
    async fn unknown_font_type_is_unresolved() {
        let fetcher = MockFetch::default();
        let res = get(&router(fetcher), "/otf/css?family=Roboto").await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(res).await, "Could not resolve font type");
    }

    #[tokio::test]
    async fn detect_without_user_agent_is_unresolved() {
        let res = get(&router(MockFetch::default()), "/detect/css?family=Roboto").await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stylesheet_failure_is_bad_gateway() {
        let res = get(&router(MockFetch::default()), "/woff2/css?family=Roboto").await;
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body(res).await, "Could not connect to h");
    }

    #[tokio::test]
    async fn streams_rewritten_stylesheet_and_font_files() {
        let fetcher = MockFetch::default()
            .with("http://upstream.test/css?family=Roboto", ROBOTO_CSS)
            .with("https://host/a.woff2", b"font-a")
            .with("https://host/b.woff2", b"font-b")
            .delayed("https://host/a.woff2", Duration::from_millis(40));

        let res = get(&router(fetcher), "/woff2/css?family=Roboto").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()["content-disposition"],
            "attachment; filename=Roboto.zip;"
        );
        assert_eq!(res.headers()["content-type"], "application/zip");

        let mut found = entries(&body(res).await);
        found.sort();
        let names: Vec<_> = found.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["Roboto-1.woff2", "Roboto-2.woff2", "Roboto.css"]);
        assert_eq!(found[0].1, b"font-a");
        assert_eq!(found[1].1, b"font-b");

        let css = String::from_utf8(found[2].1.clone()).unwrap();
        assert!(css.contains("url(./Roboto-1.woff2)"));
        assert!(css.contains("url(./Roboto-2.woff2)"));
        assert!(!css.contains("https://"));
    }

    #[tokio::test]
    async fn detect_forwards_the_caller_user_agent_to_every_fetch() {
        let fetcher = Arc::new(
            MockFetch::default()
                .with("http://upstream.test/css?family=Roboto", b"url(https://host/a.ttf)")
                .with("https://host/a.ttf", b"A"),
        );
        let gateway = Arc::new(Gateway {
            fetcher: Arc::clone(&fetcher),
            upstream: UPSTREAM.to_owned(),
            docs_url: String::new(),
            max_concurrent_fetches: 4,
            requests: RequestCounter::new(),
        });

        let (parts, ()) = http::Request::get("/detect/css?family=Roboto")
            .header("user-agent", "Caller/1.0")
            .body(())
            .unwrap()
            .into_parts();
        let res = gateway.fonts(Request::from_parts(parts)).await.unwrap();
        let bytes = body(res.into_http()).await;

        assert_eq!(entries(&bytes).len(), 2);
        assert_eq!(*fetcher.user_agents.lock().unwrap(), ["Caller/1.0", "Caller/1.0"]);
    }

    #[tokio::test]
    async fn missing_font_file_leaves_dangling_reference() {
        let fetcher = MockFetch::default()
            .with("http://upstream.test/css?family=Roboto", ROBOTO_CSS)
            .with("https://host/b.woff2", b"font-b");

        let res = get(&router(fetcher), "/woff2/css?family=Roboto").await;
        assert_eq!(res.status(), StatusCode::OK);

        let found = entries(&body(res).await);
        let names: Vec<_> = found.iter().map(|(name, _)| name.as_str()).collect();
        assert!(names.contains(&"Roboto.css"));
        assert!(names.contains(&"Roboto-2.woff2"));
        assert!(!names.contains(&"Roboto-1.woff2"));
    }

    #[tokio::test]
    async fn detect_forwards_non_ascii_user_agent_bytes() {
        let fetcher = Arc::new(
            MockFetch::default().with("http://upstream.test/css?family=Roboto", b"body{}"),
        );
        let gateway = Arc::new(Gateway {
            fetcher: Arc::clone(&fetcher),
            upstream: UPSTREAM.to_owned(),
            docs_url: String::new(),
            max_concurrent_fetches: 4,
            requests: RequestCounter::new(),
        });

        let caller = http::HeaderValue::from_bytes(b"Mozilla/5.0 (\xe9)").unwrap();
        let (parts, ()) = http::Request::get("/detect/css?family=Roboto")
            .header("user-agent", caller.clone())
            .body(())
            .unwrap()
            .into_parts();
        let res = gateway.fonts(Request::from_parts(parts)).await.unwrap();
        assert_eq!(res.status_code(), StatusCode::OK);
        body(res.into_http()).await;

        let seen = fetcher.user_agents.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].as_bytes(), caller.as_bytes());
    }
}

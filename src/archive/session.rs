//! Per-request archive session: one writer, a set of font-file fetch tasks
//! and the barrier that joins them before the archive is finalized.

use std::io;
use std::sync::Arc;

use http::HeaderValue;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, Span, info, warn};

use super::ArchiveWriter;
use crate::error::Error;
use crate::rewrite::{FontFileReference, rewrite};
use crate::upstream::Fetch;

/// Owns everything one archive response needs.
///
/// Font-file fetches run as tasks in a [`JoinSet`] owned by the session;
/// dropping the session aborts whatever is still in flight, so no task
/// outlives the archive it writes into. [`finish`](Self::finish) does the
/// same as soon as the client stops listening.
pub struct ArchiveSession<F> {
    archive: Arc<ArchiveWriter>,
    fetcher: Arc<F>,
    user_agent: HeaderValue,
    permits: Arc<Semaphore>,
    pending: JoinSet<()>,
}

impl<F: Fetch> ArchiveSession<F> {
    /// `max_in_flight` caps how many font files are downloaded at once
    /// (at least one).
    pub fn new(
        archive: ArchiveWriter,
        fetcher: Arc<F>,
        user_agent: HeaderValue,
        max_in_flight: usize,
    ) -> Self {
        Self {
            archive: Arc::new(archive),
            fetcher,
            user_agent,
            permits: Arc::new(Semaphore::new(max_in_flight.clamp(1, Semaphore::MAX_PERMITS))),
            pending: JoinSet::new(),
        }
    }

    /// Rewrites `css` for archive `archive_name` and starts one fetch task per
    /// font file it references, in document order.
    ///
    /// Returns as soon as the scan is done; the fetches keep running until
    /// [`finish`](Self::finish). A fetch that fails leaves its
    /// `url(./<name>)` in the returned text with no matching entry.
    pub fn rewrite(&mut self, css: &str, archive_name: &str) -> String {
        let rewritten = rewrite(css, archive_name);
        for reference in rewritten.references {
            self.spawn_fetch(reference);
        }
        rewritten.css
    }

    /// Appends an entry from the session's own task.
    pub fn add_entry(&self, name: &str, data: &[u8]) -> Result<(), Error> {
        self.archive.add_entry(name, data)
    }

    /// Font-file tasks not yet joined.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Waits for every fetch task to end, successfully or not, then finalizes
    /// the archive. Returns the number of entries written.
    ///
    /// # Errors
    ///
    /// An [`io::ErrorKind::BrokenPipe`] error if the response body is dropped
    /// first. The remaining fetches are aborted.
    pub async fn finish(mut self) -> Result<usize, Error> {
        let archive = Arc::clone(&self.archive);
        let closed = archive.closed();
        tokio::pin!(closed);

        loop {
            tokio::select! {
                res = self.pending.join_next() => match res {
                    Some(Ok(())) => {}
                    Some(Err(e)) => warn!("font fetch task ended abnormally: {e}"),
                    None => break,
                },
                () = &mut closed => {
                    info!(aborted = self.pending.len(), "client went away, abandoning font files");
                    self.pending.shutdown().await;
                    return Err(io::Error::new(io::ErrorKind::BrokenPipe, "response body dropped").into());
                }
            }
        }
        self.archive.finalize()
    }

    fn spawn_fetch(&mut self, reference: FontFileReference) {
        let archive = Arc::clone(&self.archive);
        let fetcher = Arc::clone(&self.fetcher);
        let user_agent = self.user_agent.clone();
        let permits = Arc::clone(&self.permits);

        let task = async move {
            // The semaphore is never closed; without a permit we fetch anyway.
            let _permit = permits.acquire_owned().await.ok();

            let FontFileReference { remote_url, local_name, .. } = reference;
            let data = match fetcher.fetch(&user_agent, &remote_url).await {
                Ok(data) => data,
                Err(e) => {
                    warn!(url = %remote_url, file = %local_name, "dropping font file: {e}");
                    return;
                }
            };

            info!(url = %remote_url, bytes = data.len(), "fetched");
            if let Err(e) = archive.add_entry(&local_name, &data) {
                warn!(file = %local_name, "could not archive font file: {e}");
            }
        };

        self.pending.spawn(task.instrument(Span::current()));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use http_body_util::BodyExt;

    use super::*;
    use crate::archive::channel;
    use crate::archive::tests::entries;
    use crate::upstream::mock::MockFetch;

    fn ua(value: &'static str) -> HeaderValue {
        HeaderValue::from_static(value)
    }

    const CSS: &str = "a{src:url(https://h/a.woff2)} b{src:url(https://h/b.woff2)} \
                       c{src:url(https://h/c.woff2)}";

    #[tokio::test]
    async fn join_waits_for_every_fetch() {
        let fetcher = Arc::new(
            MockFetch::default()
                .with("https://h/a.woff2", b"A")
                .with("https://h/b.woff2", b"B")
                .with("https://h/c.woff2", b"C")
                .delayed("https://h/a.woff2", Duration::from_millis(60))
                .delayed("https://h/c.woff2", Duration::from_millis(30)),
        );
        let (writer, body) = channel();
        let mut session = ArchiveSession::new(writer, Arc::clone(&fetcher), ua("ua"), 8);

        let css = session.rewrite(CSS, "F");
        assert_eq!(session.pending(), 3);
        session.add_entry("F.css", css.as_bytes()).unwrap();

        assert_eq!(session.finish().await.unwrap(), 4);
        assert_eq!(fetcher.completed().len(), 3);

        let bytes = body.collect().await.unwrap().to_bytes();
        let mut found = entries(&bytes);
        found.sort();
        assert_eq!(
            found,
            [
                ("F-1.woff2".to_owned(), b"A".to_vec()),
                ("F-2.woff2".to_owned(), b"B".to_vec()),
                ("F-3.woff2".to_owned(), b"C".to_vec()),
                ("F.css".to_owned(), css.into_bytes()),
            ]
        );
    }

    #[tokio::test]
    async fn failed_fetch_is_dropped_and_others_complete() {
        let fetcher = Arc::new(
            MockFetch::default()
                .with("https://h/a.woff2", b"A")
                .with("https://h/c.woff2", b"C"),
        );
        let (writer, body) = channel();
        let mut session = ArchiveSession::new(writer, Arc::clone(&fetcher), ua("ua"), 8);

        let css = session.rewrite(CSS, "F");
        session.add_entry("F.css", css.as_bytes()).unwrap();
        assert_eq!(session.finish().await.unwrap(), 3);

        let bytes = body.collect().await.unwrap().to_bytes();
        let names: Vec<_> = entries(&bytes).into_iter().map(|(name, _)| name).collect();
        assert!(names.contains(&"F.css".to_owned()));
        assert!(names.contains(&"F-1.woff2".to_owned()));
        assert!(names.contains(&"F-3.woff2".to_owned()));
        assert!(!names.contains(&"F-2.woff2".to_owned()));
        // The stylesheet still points at the missing file.
        assert!(css.contains("url(./F-2.woff2)"));
    }

    #[tokio::test]
    async fn fetches_reuse_the_stylesheet_user_agent() {
        let fetcher = Arc::new(MockFetch::default().with("https://h/a.woff2", b"A"));
        let (writer, _body) = channel();
        let mut session = ArchiveSession::new(writer, Arc::clone(&fetcher), ua("Chrome/37"), 8);

        session.rewrite("url(https://h/a.woff2)", "F");
        session.finish().await.unwrap();

        assert_eq!(*fetcher.user_agents.lock().unwrap(), ["Chrome/37"]);
    }

    #[tokio::test]
    async fn in_flight_fetches_are_capped() {
        let css: String = (0..10).map(|i| format!("url(https://h/{i}.ttf)")).collect();
        let fetcher = Arc::new(MockFetch::default());
        let (writer, _body) = channel();
        let mut session = ArchiveSession::new(writer, Arc::clone(&fetcher), ua("ua"), 2);

        session.rewrite(&css, "F");
        assert_eq!(session.pending(), 10);
        session.finish().await.unwrap();

        assert_eq!(fetcher.completed().len(), 10);
        assert!(fetcher.peak_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn no_references_finishes_immediately() {
        let fetcher = Arc::new(MockFetch::default());
        let (writer, body) = channel();
        let mut session = ArchiveSession::new(writer, fetcher, ua("ua"), 8);

        let css = session.rewrite("body{}", "F");
        session.add_entry("F.css", css.as_bytes()).unwrap();
        assert_eq!(session.finish().await.unwrap(), 1);

        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(entries(&bytes), [("F.css".to_owned(), b"body{}".to_vec())]);
    }

    #[tokio::test]
    async fn dropped_body_aborts_outstanding_fetches() {
        let fetcher = Arc::new(
            MockFetch::default()
                .with("https://h/a.woff2", b"A")
                .delayed("https://h/a.woff2", Duration::from_secs(30)),
        );
        let (writer, body) = channel();
        let mut session = ArchiveSession::new(writer, Arc::clone(&fetcher), ua("ua"), 8);
        session.rewrite("url(https://h/a.woff2)", "F");

        drop(body);
        let finished = tokio::time::timeout(Duration::from_secs(1), session.finish())
            .await
            .expect("join should stop once the body is gone");

        assert!(matches!(finished, Err(Error::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe));
        assert!(fetcher.completed().is_empty());
    }
}

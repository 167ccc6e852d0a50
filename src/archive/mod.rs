//! Streaming ZIP archive.
//!
//! [`channel`] splits an archive into two halves:
//!
//! - [`ArchiveWriter`]: append-only, `Sync`. Entries are deflated and written
//!   one at a time under a mutex; concurrent callers queue on the lock.
//! - [`ArchiveBody`]: the HTTP response body. Every byte the ZIP encoder
//!   writes becomes a body frame immediately, so the client starts receiving
//!   the archive while later entries are still being fetched.
//!
//! The body ends when the writer is finalized (or dropped, in which case the
//! client sees a truncated archive). When the body is dropped first, because
//! the client went away, [`ArchiveWriter::closed`] resolves.

mod session;

pub use session::ArchiveSession;

use std::convert::Infallible;
use std::io::{self, Write};
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};

use bytes::Bytes;
use flate2::Compression;
use flate2::write::DeflateEncoder;
use hyper::body::Frame;
use tokio::sync::{mpsc, watch};

use crate::error::Error;

/// Creates a connected writer/body pair.
pub fn channel() -> (ArchiveWriter, ArchiveBody) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (hangup, reader) = watch::channel(());
    let zip = rawzip::ZipArchiveWriter::new(ChannelWriter { tx });
    let writer = ArchiveWriter {
        inner: Mutex::new(Some(Inner { zip, entries: 0 })),
        reader,
    };
    (writer, ArchiveBody { rx, _hangup: hangup })
}

// ── Writer half ───────────────────────────────────────────────────────────────

/// Append-only handle to a streaming archive.
pub struct ArchiveWriter {
    /// `None` once finalized.
    inner: Mutex<Option<Inner>>,
    /// Never sent on; closes when the body is dropped.
    reader: watch::Receiver<()>,
}

struct Inner {
    zip: rawzip::ZipArchiveWriter<ChannelWriter>,
    entries: usize,
}

impl ArchiveWriter {
    /// Appends one deflated entry named `name`.
    ///
    /// Safe to call from many tasks at once; entries land in lock order.
    ///
    /// # Errors
    ///
    /// [`Error::ArchiveFinalized`] after [`finalize`](Self::finalize); an
    /// I/O or archive error once the client has gone away.
    pub fn add_entry(&self, name: &str, data: &[u8]) -> Result<(), Error> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let inner = guard.as_mut().ok_or(Error::ArchiveFinalized)?;
        write_entry(&mut inner.zip, name, data)?;
        inner.entries += 1;
        Ok(())
    }

    /// Resolves once the body half has been dropped.
    pub async fn closed(&self) {
        let mut reader = self.reader.clone();
        while reader.changed().await.is_ok() {}
    }

    /// Writes the central directory and closes the body stream. Returns the
    /// number of entries written.
    ///
    /// Must only be called once every [`add_entry`](Self::add_entry) has
    /// returned; later calls fail with [`Error::ArchiveFinalized`].
    pub fn finalize(&self) -> Result<usize, Error> {
        let inner = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(Error::ArchiveFinalized)?;
        // Dropping the returned ChannelWriter ends the body.
        inner.zip.finish()?;
        Ok(inner.entries)
    }
}

fn write_entry<W: Write>(
    zip: &mut rawzip::ZipArchiveWriter<W>,
    name: &str,
    data: &[u8],
) -> Result<(), Error> {
    let mut file = zip
        .new_file(name)
        .compression_method(rawzip::CompressionMethod::Deflate)
        .create()?;

    let encoder = DeflateEncoder::new(&mut file, Compression::default());
    let mut writer = rawzip::ZipDataWriter::new(encoder);
    writer.write_all(data)?;
    let (encoder, descriptor) = writer.finish()?;
    encoder.finish()?;
    file.finish(descriptor)?;
    Ok(())
}

/// `io::Write` sink that forwards every write to the body channel.
struct ChannelWriter {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx
            .send(Bytes::copy_from_slice(buf))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response body dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ── Body half ─────────────────────────────────────────────────────────────────

/// Response body yielding archive bytes as they are written.
pub struct ArchiveBody {
    rx: mpsc::UnboundedReceiver<Bytes>,
    _hangup: watch::Sender<()>,
}

impl hyper::body::Body for ArchiveBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
        self.rx.poll_recv(cx).map(|chunk| chunk.map(|bytes| Ok(Frame::data(bytes))))
    }
}

// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Merged stdout/stderr log stream.
//!
//! Each source is drained by its own task into a bounded channel. Both tasks
//! own a sender, so the channel (and therefore the stream) closes exactly when
//! the second source reaches end-of-stream. Bytes from one source keep their
//! order; there is no ordering between the two sources.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio::sync::mpsc;

const READ_CHUNK: usize = 8 * 1024;

/// Read-once byte stream combining two sources.
#[derive(Debug)]
pub struct LogStream {
    rx: mpsc::Receiver<Bytes>,
    pending: Bytes,
    finished: bool,
}

impl LogStream {
    /// True once both sources have closed and every byte has been read.
    pub fn is_finished(&self) -> bool {
        self.finished && self.pending.is_empty()
    }
}

impl AsyncRead for LogStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        loop {
            if !this.pending.is_empty() {
                let n = buf.remaining().min(this.pending.len());
                buf.put_slice(&this.pending.split_to(n));
                return Poll::Ready(Ok(()));
            }
            if this.finished {
                return Poll::Ready(Ok(()));
            }
            match ready!(this.rx.poll_recv(cx)) {
                Some(chunk) => this.pending = chunk,
                None => this.finished = true,
            }
        }
    }
}

/// Merge two readers into one [`LogStream`].
///
/// Must be called from within a tokio runtime.
pub fn merge<A, B>(stdout: A, stderr: B, capacity: usize) -> LogStream
where
    A: AsyncRead + Send + Unpin + 'static,
    B: AsyncRead + Send + Unpin + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    tokio::spawn(drain("stdout", stdout, tx.clone()));
    tokio::spawn(drain("stderr", stderr, tx));
    LogStream {
        rx,
        pending: Bytes::new(),
        finished: false,
    }
}

async fn drain<R>(source: &'static str, mut reader: R, tx: mpsc::Sender<Bytes>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    let mut forwarding = true;

    loop {
        buf.reserve(READ_CHUNK);
        match reader.read_buf(&mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let chunk = buf.split().freeze();
                // Keep reading after the consumer goes away so the child
                // never blocks on a full pipe.
                if forwarding && tx.send(chunk).await.is_err() {
                    tracing::debug!("Log reader dropped, discarding further {} output", source);
                    forwarding = false;
                }
            }
            Err(e) => {
                tracing::debug!("Stopped draining {}: {}", source, e);
                break;
            }
        }
    }
}

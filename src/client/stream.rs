//! Streaming lookups: chunking, worker pool, buffer recycling, error collection.
//!
//! ```text
//! reader ──lines──> feeder ──chunks──> worker × N ──records──> dest
//!                     ^                    │  │
//!                     └──── free list <────┘  └──errors──> collector
//! ```

use std::sync::Arc;

use futures::future::join_all;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, warn};

use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::types::TaxRecord;

use super::NavClient;

type Chunk = Vec<String>;

/// Parameters for spawning a lookup worker
struct WorkerParams {
    /// Worker index (for logging)
    worker: usize,
    /// Client handle shared with the other workers
    client: NavClient,
    /// Call context (cancellation and deadline)
    ctx: CallContext,
    /// Shared receiving end of the chunk queue
    chunks: Arc<Mutex<mpsc::Receiver<Chunk>>>,
    /// Drained buffers go back to the feeder through here
    free_tx: mpsc::Sender<Chunk>,
    /// Caller's result channel
    dest: mpsc::Sender<Vec<TaxRecord>>,
    /// Error collector
    err_tx: mpsc::Sender<Error>,
}

/// Spawn a worker that runs upload → download for one chunk at a time until the queue closes.
fn spawn_worker(params: WorkerParams) -> JoinHandle<()> {
    let WorkerParams {
        worker,
        client,
        ctx,
        chunks,
        free_tx,
        dest,
        err_tx,
    } = params;
    tokio::spawn(
        async move {
            loop {
                let next = chunks.lock().await.recv().await;
                let Some(mut chunk) = next else {
                    break;
                };

                let span = tracing::debug_span!("chunk", worker, size = chunk.len());
                let outcome = client.query(&ctx, chunk.as_slice()).instrument(span).await;

                // Recycling is best effort; a full free list just drops the buffer
                chunk.clear();
                free_tx.try_send(chunk).ok();

                match outcome {
                    Ok(records) if records.is_empty() => {}
                    Ok(records) => {
                        if dest.send(records).await.is_err() {
                            warn!(worker, "Result receiver dropped, stopping worker");
                            err_tx.send(Error::ResultChannelClosed).await.ok();
                            break;
                        }
                    }
                    Err(failure) => {
                        warn!(worker, error = %failure.error, "Chunk lookup failed");
                        err_tx.send(failure.error).await.ok();
                    }
                }
            }
        }
        .in_current_span(),
    )
}

/// Spawn the task that keeps every error, in arrival order
fn spawn_error_collector(mut err_rx: mpsc::Receiver<Error>) -> JoinHandle<Vec<Error>> {
    tokio::spawn(async move {
        let mut errors = Vec::new();
        while let Some(err) = err_rx.recv().await {
            errors.push(err);
        }
        errors
    })
}

/// One input line without its `\n` or `\r\n`.
///
/// Bytes that are not UTF-8 become U+FFFD, so such a line fails the checksum
/// instead of ending the input.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// A recycled buffer if one is waiting, a fresh one otherwise
fn take_buffer(free_rx: &mut mpsc::Receiver<Chunk>, batch_size: usize) -> Chunk {
    match free_rx.try_recv() {
        Ok(mut chunk) => {
            chunk.clear();
            chunk
        }
        Err(_) => Vec::with_capacity(batch_size),
    }
}

impl NavClient {
    /// Look up every tax number read from `reader`, one per line
    ///
    /// Lines are grouped into chunks of [`batch_size`](Self::batch_size) and
    /// handed to a pool of workers; the pool has one worker per slot of
    /// `dest`'s capacity. Each successful chunk is sent to `dest` as one
    /// `Vec<TaxRecord>`, in completion order rather than input order.
    ///
    /// `dest` is closed when this call returns. Start draining its receiver
    /// before calling, otherwise the workers stall once the channel is full.
    ///
    /// # Errors
    ///
    /// A failing chunk does not stop the others. After all input is consumed
    /// and every worker has finished, the first error seen is returned; the
    /// records already delivered stay valid. The failed chunk's identifiers
    /// produce no records at all.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use nav_query::{CallContext, Config, NavClient};
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = NavClient::new(Config::default())?;
    ///     let (tx, mut rx) = tokio::sync::mpsc::channel(4);
    ///     let printer = tokio::spawn(async move {
    ///         while let Some(records) = rx.recv().await {
    ///             for record in records {
    ///                 println!("{record}");
    ///             }
    ///         }
    ///     });
    ///
    ///     let input = tokio::io::BufReader::new(tokio::io::stdin());
    ///     let ctx = CallContext::with_timeout(Duration::from_secs(300));
    ///     let outcome = client.lookup_stream(&ctx, tx, input).await;
    ///     printer.await?;
    ///     outcome?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn lookup_stream<R>(
        &self,
        ctx: &CallContext,
        dest: mpsc::Sender<Vec<TaxRecord>>,
        reader: R,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let workers = dest.max_capacity().max(1);
        let span = tracing::info_span!(
            parent: &self.span,
            "nav_lookup_stream",
            workers,
            batch_size = self.batch_size()
        );
        self.run_stream(ctx, dest, reader, workers)
            .instrument(span)
            .await
    }

    async fn run_stream<R>(
        &self,
        ctx: &CallContext,
        dest: mpsc::Sender<Vec<TaxRecord>>,
        reader: R,
        workers: usize,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let (err_tx, err_rx) = mpsc::channel(workers);
        let collector = spawn_error_collector(err_rx);

        let (chunk_tx, chunk_rx) = mpsc::channel(workers);
        let (free_tx, mut free_rx) = mpsc::channel(workers);

        // Workers hold the only handles to the queue's receiving end, so
        // the feeder notices when all of them have stopped.
        let chunk_rx = Arc::new(Mutex::new(chunk_rx));
        let handles: Vec<JoinHandle<()>> = (0..workers)
            .map(|worker| {
                spawn_worker(WorkerParams {
                    worker,
                    client: self.clone(),
                    ctx: ctx.clone(),
                    chunks: Arc::clone(&chunk_rx),
                    free_tx: free_tx.clone(),
                    dest: dest.clone(),
                    err_tx: err_tx.clone(),
                })
            })
            .collect();
        drop(chunk_rx);
        drop(free_tx);
        drop(dest);

        let fed = self
            .feed_chunks(ctx, reader, &chunk_tx, &mut free_rx)
            .await;
        drop(chunk_tx);
        if let Err(e) = fed {
            warn!(error = %e, "Stopped reading input");
            err_tx.send(e).await.ok();
        }

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                err_tx.send(Error::Worker(e.to_string())).await.ok();
            }
        }
        drop(err_tx);

        let errors = collector.await.map_err(|e| Error::Worker(e.to_string()))?;
        match errors.into_iter().next() {
            Some(first) => Err(first),
            None => {
                debug!("Stream lookup finished");
                Ok(())
            }
        }
    }

    /// Read lines into chunks and queue them; the last partial chunk is queued even after a read error
    async fn feed_chunks<R>(
        &self,
        ctx: &CallContext,
        reader: R,
        chunk_tx: &mpsc::Sender<Chunk>,
        free_rx: &mut mpsc::Receiver<Chunk>,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let batch_size = self.batch_size();
        let mut reader = reader;
        let mut line = Vec::new();
        let mut chunk = Vec::with_capacity(batch_size);
        let mut dispatched = 0usize;

        let read = loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break Ok(()),
                Ok(_) => {}
                Err(e) => break Err(Error::Io(e)),
            }
            chunk.push(decode_line(&line));
            if chunk.len() < batch_size {
                continue;
            }
            if let Err(e) = ctx.checkpoint() {
                break Err(e);
            }
            let next = take_buffer(free_rx, batch_size);
            if chunk_tx.send(std::mem::replace(&mut chunk, next)).await.is_err() {
                debug!("All workers stopped, no longer reading input");
                return Ok(());
            }
            dispatched += 1;
        };

        if !chunk.is_empty() && chunk_tx.send(chunk).await.is_ok() {
            dispatched += 1;
        }
        debug!(chunks = dispatched, "Input consumed");
        read
    }
}

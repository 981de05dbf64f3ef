// SPDX-License-Identifier: MIT OR Apache-2.0

//! The chunked file reader (component B): splits a file into N byte ranges
//! and streams [`Sample`]s from each range to its own outbound queue,
//! honoring the chunk-boundary handoff protocol so that every ride is
//! emitted to exactly one queue even though chunk boundaries fall mid-line.

use crate::cancel::CancelToken;
use crate::row::{parse_row, Sample};
use base::{Error, ErrorKind, ResultExt};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// A contiguous, non-overlapping byte range of the input file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub start: u64,
    pub size: u64,
}

/// Splits `file_size` bytes into `n` contiguous chunks whose sizes differ
/// by at most one byte: the first `file_size % n` chunks get `base + 1`
/// bytes, the rest get `base` bytes, where `base = file_size / n`.
pub fn split_file(file_size: u64, n: u64) -> Vec<Chunk> {
    assert!(n > 0, "split_file requires n >= 1");
    let base = file_size / n;
    let rem = file_size % n;
    let mut chunks = Vec::with_capacity(n as usize);
    let mut start = 0;
    for i in 0..n {
        let size = if i < rem { base + 1 } else { base };
        chunks.push(Chunk { start, size });
        start += size;
    }
    chunks
}

/// Reads successive lines of a file opened at an arbitrary offset, using
/// `memchr` to find `\n` within the buffered window rather than handing the
/// scan to a general-purpose CSV crate (this format has no quoting).
struct LineReader<R> {
    inner: BufReader<R>,
}

impl<R: Read> LineReader<R> {
    fn new(inner: R) -> Self {
        LineReader {
            inner: BufReader::new(inner),
        }
    }

    /// Returns the next line (without its trailing `\n`), the number of
    /// bytes consumed from the underlying reader to produce it (including
    /// the `\n`, if present), and whether a `\n` actually terminated it
    /// (false for a trailing partial line at true EOF). Returns `None` at
    /// EOF with no further bytes at all.
    fn next_line(&mut self) -> std::io::Result<Option<(String, u64, bool)>> {
        let mut out = Vec::new();
        let mut consumed = 0u64;
        let mut newline_terminated = false;
        loop {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                break;
            }
            match memchr::memchr(b'\n', buf) {
                Some(pos) => {
                    out.extend_from_slice(&buf[..=pos]);
                    consumed += (pos + 1) as u64;
                    self.inner.consume(pos + 1);
                    newline_terminated = true;
                    break;
                }
                None => {
                    let len = buf.len();
                    out.extend_from_slice(buf);
                    consumed += len as u64;
                    self.inner.consume(len);
                }
            }
        }
        if out.is_empty() {
            return Ok(None);
        }
        let line = String::from_utf8(out)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(Some((
            line.trim_end_matches(['\n', '\r']).to_string(),
            consumed,
            newline_terminated,
        )))
    }
}

/// Runs one chunk worker to completion, synchronously. Intended to be
/// driven from a blocking-pool task (see [`read_file`]); `tx.blocking_send`
/// provides the same backpressure a bounded async channel would, without
/// requiring this function itself to be async.
fn run_chunk_worker(
    path: &Path,
    chunk: Chunk,
    tx: mpsc::Sender<Sample>,
    cancel: &CancelToken,
) -> Result<(), Error> {
    let is_first = chunk.start == 0;
    let file = std::fs::File::open(path).context(ErrorKind::Io, "can't open input csv file")?;
    let mut reader = LineReader::new(file);
    reader
        .inner
        .seek(SeekFrom::Start(chunk.start))
        .context(ErrorKind::Io, "can't seek input csv file")?;

    let mut bytes_read: u64 = 0;
    let mut sequence_started = is_first;

    if !is_first {
        match reader
            .next_line()
            .context(ErrorKind::Io, "can't read input csv file")?
        {
            Some((_discarded, n, true)) => bytes_read += n,
            // EOF reached before any `\n`: no ride boundary falls in this
            // chunk at all, so this worker emits nothing.
            Some((_, _, false)) | None => return Ok(()),
        }
    }

    // `current`/`next` carry the already-parsed sample alongside the byte
    // length of its source line, so each line is parsed exactly once.
    let mut current = match read_and_parse(&mut reader)? {
        Some(c) => c,
        None => return Ok(()),
    };

    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }
        let (current_sample, current_len) = current;
        let chunk_size_exceeded = bytes_read > chunk.size;
        if !sequence_started && chunk_size_exceeded {
            // This chunk's interior never saw a ride boundary; some other
            // chunk owns every ride touching this range.
            return Ok(());
        }

        if sequence_started && tx.blocking_send(current_sample).is_err() {
            // The receiving folder is gone. That only happens once some
            // other component has already failed and cancelled the
            // pipeline, in which case there's nothing left to report.
            return Ok(());
        }

        let next = read_and_parse(&mut reader)?;
        let finish = match &next {
            None => true,
            Some((next_sample, _)) => {
                chunk_size_exceeded && next_sample.ride_id != current_sample.ride_id
            }
        };
        if !finish && !sequence_started {
            if let Some((next_sample, _)) = &next {
                if next_sample.ride_id != current_sample.ride_id {
                    sequence_started = true;
                }
            }
        }

        bytes_read += current_len;
        match next {
            None => return Ok(()),
            Some(n) => current = n,
        }
        if finish {
            return Ok(());
        }
    }
}

/// Reads the next line and parses it into a `Sample`, pairing it with the
/// number of bytes the line occupied (including its `\n`).
fn read_and_parse<R: Read>(
    reader: &mut LineReader<R>,
) -> Result<Option<(Sample, u64)>, Error> {
    match reader
        .next_line()
        .context(ErrorKind::Io, "can't read input csv file")?
    {
        None => Ok(None),
        Some((line, len, _newline_terminated)) => Ok(Some((parse_row(&line)?, len))),
    }
}

/// Opens `path` once per queue (each worker gets its own independent file
/// handle and seek position — no shared cursor) and streams every ride in
/// the file to exactly one of `queues`, in file order within each queue.
///
/// Returns once every worker has finished. On the first fatal I/O or parse
/// error, `cancel` is set so the remaining workers and any downstream
/// consumers wind down promptly, and that error is returned.
pub async fn read_file(
    path: PathBuf,
    queues: Vec<mpsc::Sender<Sample>>,
    cancel: CancelToken,
) -> Result<(), Error> {
    let n = queues.len() as u64;
    let stat_path = path.clone();
    let file_size = tokio::task::spawn_blocking(move || std::fs::metadata(&stat_path))
        .await
        .context(ErrorKind::Internal, "reader task panicked")?
        .context(ErrorKind::Io, "can't stat input csv file")?
        .len();

    let chunks = split_file(file_size, n);

    let mut handles = Vec::with_capacity(queues.len());
    for (chunk, tx) in chunks.into_iter().zip(queues) {
        let path = path.clone();
        let cancel = cancel.clone();
        handles.push(
            tokio::task::Builder::new()
                .name(&format!("reader-chunk-{}", chunk.start))
                .spawn_blocking(move || run_chunk_worker(&path, chunk, tx, &cancel))
                .expect("spawning reader task"),
        );
    }

    let mut first_err: Option<Error> = None;
    for h in handles {
        let result = h.await.context(ErrorKind::Internal, "reader task panicked");
        let result = match result {
            Ok(inner) => inner,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            cancel.cancel();
            if first_err.is_none() {
                first_err = Some(e);
            }
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

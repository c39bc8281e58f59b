//! Parallel database scan
//!
//! Workers on a rayon pool pull records one at a time from a shared cursor
//! and push rows into a shared sink. Patterns are shared read-only; template
//! windows live inside each worker's call to the record handler.

use std::io::BufRead;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Mutex;

use super::seqdb::{SequenceDatabase, SequenceRecord, SharedCursor};
use super::types::{ProgressUpdate, ScanSummary, ThreadCount};
use crate::error::Result;

/// Send a progress update every this many records
const PROGRESS_INTERVAL: usize = 1000;

/// Rows collected by all workers, in completion order
pub struct ResultSink<T> {
    rows: Mutex<Vec<T>>,
}

impl<T> ResultSink<T> {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, row: T) {
        match self.rows.lock() {
            Ok(mut rows) => rows.push(row),
            Err(poisoned) => poisoned.into_inner().push(row),
        }
    }

    pub fn extend<I: IntoIterator<Item = T>>(&self, rows: I) {
        match self.rows.lock() {
            Ok(mut guard) => guard.extend(rows),
            Err(poisoned) => poisoned.into_inner().extend(rows),
        }
    }

    pub fn into_inner(self) -> Vec<T> {
        match self.rows.into_inner() {
            Ok(rows) => rows,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<T> Default for ResultSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `handle` on every record of `database`.
///
/// `handle` pushes its rows into the sink and returns whether the record
/// was amplified; skipped records simply return `false`. Rows come back in
/// no particular order.
pub fn scan_database<R, T, F>(
    database: SequenceDatabase<R>,
    threads: ThreadCount,
    progress_tx: Option<Sender<ProgressUpdate>>,
    handle: F,
) -> Result<(Vec<T>, ScanSummary)>
where
    R: BufRead + Send,
    T: Send,
    F: Fn(&SequenceRecord, &ResultSink<T>) -> bool + Sync,
{
    let num_threads = threads.get_count();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()?;

    let cursor = SharedCursor::new(database);
    let sink = ResultSink::new();
    let scanned = AtomicUsize::new(0);
    let amplified = AtomicUsize::new(0);

    log::info!("scanning database with {} workers", num_threads);

    pool.scope(|scope| {
        for _ in 0..num_threads {
            let progress_tx = progress_tx.clone();
            let (cursor, sink, handle) = (&cursor, &sink, &handle);
            let (scanned, amplified) = (&scanned, &amplified);

            scope.spawn(move |_| {
                while let Some(record) = cursor.next_record() {
                    if handle(&record, sink) {
                        amplified.fetch_add(1, Ordering::Relaxed);
                    } else {
                        log::trace!("record {} skipped", record.accession);
                    }

                    let done = scanned.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % PROGRESS_INTERVAL == 0 {
                        let hits = amplified.load(Ordering::Relaxed);
                        log::debug!("{} records scanned, {} amplified", done, hits);
                        // Only send periodic updates to avoid flooding the channel
                        if let Some(tx) = &progress_tx {
                            let _ = tx.send(ProgressUpdate {
                                records_scanned: done,
                                records_amplified: hits,
                                message: format!("{} records scanned", done),
                            });
                        }
                    }
                }
            });
        }
    });

    let records = cursor.finish()?;
    let summary = ScanSummary {
        records_scanned: records,
        records_amplified: amplified.into_inner(),
    };
    log::info!(
        "scanned {} records, {} amplified",
        summary.records_scanned,
        summary.records_amplified
    );

    if let Some(tx) = &progress_tx {
        let _ = tx.send(ProgressUpdate {
            records_scanned: summary.records_scanned,
            records_amplified: summary.records_amplified,
            message: "Scan complete".to_string(),
        });
    }

    Ok((sink.into_inner(), summary))
}

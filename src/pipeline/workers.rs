//! Worker pool for concurrent ingestion.
//!
//! Each worker owns its own store connection and processes whole
//! submissions; the database is the only thing workers share.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use crate::config::{StoreConfig, WorkerConfig};
use crate::error::IngestError;
use crate::storage::store::ReportStore;

use super::context::SubmissionContext;
use super::ingestion::ingest_json;

/// One request as handed over by the boundary layer.
#[derive(Debug, Clone)]
pub struct Submission {
    pub body: String,
    pub request_ip: String,
    pub user_agent: String,
}

impl Submission {
    pub fn new(body: impl Into<String>, request_ip: &str, user_agent: &str) -> Self {
        Self {
            body: body.into(),
            request_ip: request_ip.to_string(),
            user_agent: user_agent.to_string(),
        }
    }
}

/// Ingest `submissions` on a pool of worker threads.
///
/// Results come back in submission order.
pub fn run_workers(
    store_config: &StoreConfig,
    worker_config: &WorkerConfig,
    submissions: Vec<Submission>,
) -> Vec<Result<i64, IngestError>> {
    let total = submissions.len();
    let workers = worker_config.workers.clamp(1, total.max(1));
    let next = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel();

    log::info!("WORKERS_START workers={} submissions={}", workers, total);

    thread::scope(|scope| {
        for worker in 0..workers {
            let tx = tx.clone();
            let next = &next;
            let submissions = &submissions;

            scope.spawn(move || {
                let mut store: Option<ReportStore> = None;
                loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(submission) = submissions.get(index) else {
                        break;
                    };
                    let result = process(store_config, &mut store, submission);
                    if let Err(e) = &result {
                        log::warn!("WORKER_SUBMISSION_FAILED worker={} index={} error={}", worker, index, e);
                    }
                    if tx.send((index, result)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(tx);

    let mut results: Vec<Option<Result<i64, IngestError>>> = (0..total).map(|_| None).collect();
    for (index, result) in rx {
        results[index] = Some(result);
    }

    results.into_iter().flatten().collect()
}

/// Open the worker's connection on first use, then ingest.
fn process(
    config: &StoreConfig,
    store: &mut Option<ReportStore>,
    submission: &Submission,
) -> Result<i64, IngestError> {
    let store = match store {
        Some(store) => store,
        None => store.insert(ReportStore::open(config)?),
    };
    let ctx = SubmissionContext::new(&submission.request_ip, &submission.user_agent);
    ingest_json(store, &ctx, &submission.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{pin_directive, ZERO_PIN};

    fn body(hostname: &str, pins: &[String]) -> String {
        serde_json::json!({
            "date-time": "2024-01-01T00:00:00Z",
            "effective-expiration-date": "2024-02-01T00:00:00Z",
            "hostname": hostname,
            "noted-hostname": hostname,
            "port": 443,
            "include-subdomains": false,
            "served-certificate-chain": [],
            "validated-certificate-chain": [],
            "known-pins": pins,
        })
        .to_string()
    }

    fn store_config(dir: &tempfile::TempDir) -> StoreConfig {
        StoreConfig::new(dir.path().join("reports.db"))
    }

    #[test]
    fn test_concurrent_new_pin_stored_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = store_config(&dir);
        let new_pin = "UFBQUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFA=";
        let pins = vec![pin_directive(new_pin)];

        let submissions = vec![
            Submission::new(body("a.example", &pins), "192.0.2.1", "ua-a"),
            Submission::new(body("b.example", &pins), "192.0.2.2", "ua-b"),
        ];
        let results = run_workers(&config, &WorkerConfig { workers: 2 }, submissions);
        let ids: Vec<i64> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);

        let store = ReportStore::open(&config).unwrap();
        let counts = store.counts().unwrap();
        assert_eq!(counts.reports, 2);
        assert_eq!(counts.pins, 1);
        assert_eq!(counts.report_pins, 2);
        for id in ids {
            assert_eq!(store.report_pins(id).unwrap(), vec![new_pin.to_string()]);
        }
    }

    #[test]
    fn test_results_in_submission_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = store_config(&dir);
        let good = vec![pin_directive(ZERO_PIN)];

        let mut submissions: Vec<Submission> = (0..8)
            .map(|i| Submission::new(body(&format!("h{}.example", i), &good), "", ""))
            .collect();
        submissions[3] = Submission::new(body("bad.example", &["pin-sha256=AAAA".to_string()]), "", "");
        submissions[5] = Submission::new("not json", "", "");

        let results = run_workers(&config, &WorkerConfig { workers: 3 }, submissions);
        assert_eq!(results.len(), 8);
        assert!(matches!(results[3], Err(IngestError::Format(_))));
        assert!(matches!(results[5], Err(IngestError::Decode(_))));
        let ok = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok, 6);

        let store = ReportStore::open(&config).unwrap();
        let counts = store.counts().unwrap();
        assert_eq!(counts.reports, 6);
        assert_eq!(counts.pins, 1);
        assert_eq!(counts.report_pins, 6);
    }

    #[test]
    fn test_empty_batch() {
        let dir = tempfile::tempdir().unwrap();
        let results = run_workers(&store_config(&dir), &WorkerConfig::default(), Vec::new());
        assert!(results.is_empty());
    }
}

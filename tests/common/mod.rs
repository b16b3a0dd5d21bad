//! Shared fixtures for the integration tests

// not every test binary uses every fixture
#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use txcoord::{ResourceError, ResourceFactory, TransactionOptions, TransactionResource};

/// What happened to one recorded resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fate {
    Committed,
    RolledBack,
}

/// Log of every resource the factory produced, in completion order.
#[derive(Default, Clone)]
pub struct FateLog {
    entries: Arc<Mutex<Vec<(String, Fate)>>>,
    completions: Arc<AtomicUsize>,
}

impl FateLog {
    pub fn fates(&self) -> Vec<Fate> {
        self.entries.lock().iter().map(|(_, f)| f.clone()).collect()
    }

    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    pub fn committed(&self) -> bool {
        self.fates() == vec![Fate::Committed]
    }

    pub fn rolled_back(&self) -> bool {
        self.fates() == vec![Fate::RolledBack]
    }
}

/// Resource factory recording the fate of everything it begins.
#[derive(Default)]
pub struct RecordingFactory {
    log: FateLog,
}

impl RecordingFactory {
    pub fn log(&self) -> FateLog {
        self.log.clone()
    }
}

impl ResourceFactory for RecordingFactory {
    fn begin(
        &self,
        _options: &TransactionOptions,
    ) -> Result<Box<dyn TransactionResource>, ResourceError> {
        Ok(Box::new(RecordingResource {
            id: uuid::Uuid::new_v4().to_string(),
            log: self.log.clone(),
        }))
    }
}

struct RecordingResource {
    id: String,
    log: FateLog,
}

impl TransactionResource for RecordingResource {
    fn local_id(&self) -> &str {
        &self.id
    }

    fn commit(&self) -> Result<(), ResourceError> {
        self.log.completions.fetch_add(1, Ordering::SeqCst);
        self.log
            .entries
            .lock()
            .push((self.id.clone(), Fate::Committed));
        Ok(())
    }

    fn rollback(&self) -> Result<(), ResourceError> {
        self.log.completions.fetch_add(1, Ordering::SeqCst);
        self.log
            .entries
            .lock()
            .push((self.id.clone(), Fate::RolledBack));
        Ok(())
    }
}

/// Install a subscriber so anomaly logs are visible under `--nocapture`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

use std::sync::{Arc, Mutex};

use specdag::errors::Result;
use specdag::operators::OperatorFactory;
use specdag::types::SpecMap;

/// Shared record of every `(task_id, params)` pair a [`RecordingOperator`]
/// was asked to build, in build order.
pub type BuildLog = Arc<Mutex<Vec<(String, SpecMap)>>>;

pub fn build_log() -> BuildLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// A fake operator factory that:
/// - records which tasks were built and with which parameters
/// - passes the parameters through unchanged.
pub struct RecordingOperator {
    accepted: Vec<&'static str>,
    log: BuildLog,
}

impl RecordingOperator {
    pub fn new(accepted: &[&'static str], log: BuildLog) -> Self {
        Self {
            accepted: accepted.to_vec(),
            log,
        }
    }
}

impl OperatorFactory for RecordingOperator {
    fn accepted_params(&self) -> &[&str] {
        &self.accepted
    }

    fn build(&self, task_id: &str, params: SpecMap) -> Result<SpecMap> {
        let mut guard = self.log.lock().unwrap();
        guard.push((task_id.to_string(), params.clone()));
        Ok(params)
    }
}

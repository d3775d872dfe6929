use jobtrack::board::{InMemoryBoardStore, JobBoardService};
use jobtrack::config::BoardConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type BoardService = JobBoardService<InMemoryBoardStore>;

/// Board service backed by a process-local store.
pub(crate) fn in_memory_board_service(config: BoardConfig) -> Arc<BoardService> {
    let store = Arc::new(InMemoryBoardStore::new());
    Arc::new(JobBoardService::new(store, config))
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Rewards(#[from] rewards_types::RewardsError),

    #[error("store error: {0}")]
    Store(#[from] rewards_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] rewards_store_lmdb::LmdbError),

    #[error("import error: {0}")]
    Ingest(#[from] rewards_store::ingest::IngestError),

    #[error("notification error: {0}")]
    Notify(#[from] rewards_notify::NotifyError),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use rewards_store::StoreError;

use crate::meta::{self, SCHEMA_VERSION};
use crate::LmdbError;

const MAX_DBS: u32 = 4;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    pub(crate) env: Env,
    pub(crate) tasks: Database<Bytes, Bytes>,
    pub(crate) users: Database<Bytes, Bytes>,
    pub(crate) withdrawals: Database<Bytes, Bytes>,
    pub(crate) meta: Database<Bytes, Bytes>,
    path: PathBuf,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given directory.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per process and the
        // data directory is not shared with another opener of the same file.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let tasks = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("tasks"))?;
        let users = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("users"))?;
        let withdrawals = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("withdrawals"))?;
        let meta_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("meta"))?;

        match meta::read_schema_version(&meta_db, &wtxn)? {
            None => meta::write_schema_version(&meta_db, &mut wtxn)?,
            Some(found) if found == SCHEMA_VERSION => {}
            Some(found) => {
                return Err(LmdbError::SchemaMismatch {
                    found,
                    expected: SCHEMA_VERSION,
                })
            }
        }
        wtxn.commit()?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(Self {
            env,
            tasks,
            users,
            withdrawals,
            meta: meta_db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// The LMDB-backed store handed to the engines.
///
/// LMDB calls block, so each trait method runs its transaction on tokio's
/// blocking pool.
#[derive(Clone)]
pub struct LmdbStore {
    env: Arc<LmdbEnvironment>,
}

impl LmdbStore {
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        Ok(Self {
            env: Arc::new(LmdbEnvironment::open(path, map_size)?),
        })
    }

    pub fn environment(&self) -> &LmdbEnvironment {
        &self.env
    }

    pub(crate) async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&LmdbEnvironment) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let env = Arc::clone(&self.env);
        tokio::task::spawn_blocking(move || f(&env))
            .await
            .map_err(|e| StoreError::Backend(format!("storage task failed: {e}")))?
    }
}

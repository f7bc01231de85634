//! JSON pool file.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::account::{Account, KeyError, KeyPair};
use crate::flow::transport::Transport;
use crate::flow::types::Address;
use crate::manager::PoolError;

/// Errors reading or writing the pool file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Pool file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed pool file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid key in pool file: {0}")]
    Key(#[from] KeyError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// One persisted account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub address: Address,
    pub key_pair: KeyPair,
    #[serde(default)]
    pub key_id: u32,
    /// Next sequence number. Absent means "ask the chain".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u64>,
}

impl From<&Account> for AccountRecord {
    fn from(account: &Account) -> Self {
        Self {
            address: account.address(),
            key_pair: account.key_pair().clone(),
            key_id: account.key_id(),
            sequence_number: Some(account.sequence_number()),
        }
    }
}

/// Read raw records. A missing file is an empty pool.
pub fn read_records(path: &Path) -> Result<Vec<AccountRecord>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Rebuild the pool saved at `path`, in its saved order.
pub async fn load_pool(path: &Path, transport: &dyn Transport) -> Result<Vec<Account>, StoreError> {
    let records = read_records(path)?;
    let mut accounts = Vec::with_capacity(records.len());

    for record in records {
        let account = match record.sequence_number {
            Some(sequence_number) => {
                Account::new(record.address, record.key_pair, record.key_id, sequence_number)?
            }
            None => {
                Account::from_chain(record.address, record.key_pair, record.key_id, transport)
                    .await?
            }
        };
        accounts.push(account);
    }

    tracing::info!(path = %path.display(), accounts = accounts.len(), "Loaded account pool");
    Ok(accounts)
}

/// Write the pool to `path`, replacing the previous file atomically.
///
/// Every call writes its own temporary file next to `path`, so concurrent
/// saves never interleave; the last rename wins.
pub fn save_pool(path: &Path, accounts: &[Arc<Account>]) -> Result<(), StoreError> {
    let records: Vec<AccountRecord> = accounts.iter().map(|a| AccountRecord::from(a.as_ref())).collect();

    let mut tmp = NamedTempFile::new_in(parent_dir(path))?;
    {
        let mut writer = BufWriter::new(&mut tmp);
        serde_json::to_writer_pretty(&mut writer, &records)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    tracing::debug!(path = %path.display(), accounts = records.len(), "Saved account pool");
    Ok(())
}

/// Observer that saves the pool after every submission.
///
/// Saves through one hook run one at a time. Write failures are logged,
/// never propagated into the submission.
pub fn save_hook(path: PathBuf) -> impl Fn(&[Arc<Account>]) + Send + Sync + 'static {
    let saving = Mutex::new(());
    move |accounts: &[Arc<Account>]| {
        let _saving = saving.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = save_pool(&path, accounts) {
            tracing::error!(path = %path.display(), error = %e, "Failed to save account pool");
        }
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;

    fn pool_of(size: usize) -> Vec<Arc<Account>> {
        (0..size)
            .map(|i| {
                let address = format!("{:x}", i + 1).parse().unwrap();
                Arc::new(Account::new(address, KeyPair::generate(), 0, i as u64).unwrap())
            })
            .collect()
    }

    #[test]
    fn test_missing_file_is_empty_pool() {
        let dir = tempfile::tempdir().unwrap();
        let records = read_records(&dir.path().join("absent.json")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_record_without_sequence_number() {
        let keys = KeyPair::generate();
        let json = serde_json::json!([{
            "address": "0x01cf0e2f2f715450",
            "key_pair": { "public": keys.public, "private": keys.private },
        }]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        fs::write(&path, json.to_string()).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key_id, 0);
        assert_eq!(records[0].sequence_number, None);
        assert_eq!(records[0].key_pair, keys);
    }

    #[test]
    fn test_save_replaces_file_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        fs::write(&path, "garbage").unwrap();

        let account = Arc::new(
            Account::new("0x01".parse().unwrap(), KeyPair::generate(), 0, 7).unwrap(),
        );
        save_pool(&path, &[account.clone()]).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records, vec![AccountRecord::from(account.as_ref())]);
        assert_eq!(records[0].sequence_number, Some(7));

        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_concurrent_saves_never_corrupt_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        let large = pool_of(40);
        let small = pool_of(1);

        for _ in 0..50 {
            let path = path.as_path();
            thread::scope(|scope| {
                let writers: Vec<_> = [&large, &small, &large, &small]
                    .into_iter()
                    .map(|pool| scope.spawn(move || save_pool(path, pool)))
                    .collect();
                for writer in writers {
                    writer.join().unwrap().unwrap();
                }
            });

            let records = read_records(&path).unwrap();
            assert!(records.len() == 40 || records.len() == 1);
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_save_hook_from_many_threads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        let hook = save_hook(path.clone());
        let pool = pool_of(20);

        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..10 {
                        hook(&pool[..]);
                    }
                });
            }
        });

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 20);
        assert_eq!(records[19].sequence_number, Some(19));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(read_records(&path), Err(StoreError::Json(_))));
    }

    #[test]
    fn test_save_hook_swallows_errors() {
        let dir = tempfile::tempdir().unwrap();
        let hook = save_hook(dir.path().join("missing-dir").join("pool.json"));
        hook(&[]);
    }
}

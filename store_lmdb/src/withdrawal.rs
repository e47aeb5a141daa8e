//! LMDB implementation of WithdrawalStore.
//!
//! Ids come from a counter in the meta database, bumped in the same write
//! transaction that stores the request.

use async_trait::async_trait;
use rewards_store::withdrawal::transition;
use rewards_store::{NewWithdrawal, StoreError, WithdrawalStore};
use rewards_types::{Timestamp, UserId, WithdrawalId, WithdrawalRequest, WithdrawalStatus};

use crate::codec::{decode, encode};
use crate::meta::{read_withdrawal_seq, write_withdrawal_seq};
use crate::{LmdbEnvironment, LmdbError, LmdbStore};

impl LmdbEnvironment {
    fn insert_withdrawal(&self, new: NewWithdrawal) -> Result<WithdrawalRequest, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let seq = read_withdrawal_seq(&self.meta, &wtxn)? + 1;
        let request = new.into_request(WithdrawalId::from_sequence(seq));
        self.withdrawals
            .put(&mut wtxn, request.id.as_str().as_bytes(), &encode(&request)?)
            .map_err(LmdbError::from)?;
        write_withdrawal_seq(&self.meta, &mut wtxn, seq)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(request)
    }

    fn get_withdrawal(&self, id: &WithdrawalId) -> Result<WithdrawalRequest, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let bytes = self
            .withdrawals
            .get(&rtxn, id.as_str().as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| StoreError::NotFound(format!("withdrawal {id}")))?;
        Ok(decode(id.as_str(), bytes)?)
    }

    fn transition_withdrawal(
        &self,
        id: &WithdrawalId,
        expected: WithdrawalStatus,
        next: WithdrawalStatus,
        decided_at: Timestamp,
    ) -> Result<WithdrawalRequest, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let key = id.as_str().as_bytes();
        let mut record: WithdrawalRequest =
            match self.withdrawals.get(&wtxn, key).map_err(LmdbError::from)? {
                Some(bytes) => decode(id.as_str(), bytes)?,
                None => return Err(StoreError::NotFound(format!("withdrawal {id}"))),
            };
        transition(&mut record, expected, next, decided_at)?;
        self.withdrawals
            .put(&mut wtxn, key, &encode(&record)?)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(record)
    }

    fn scan_withdrawals(
        &self,
        keep: impl Fn(&WithdrawalRequest) -> bool,
    ) -> Result<Vec<WithdrawalRequest>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut out = Vec::new();
        for entry in self.withdrawals.iter(&rtxn).map_err(LmdbError::from)? {
            let (key, bytes) = entry.map_err(LmdbError::from)?;
            let record: WithdrawalRequest = decode(&String::from_utf8_lossy(key), bytes)?;
            if keep(&record) {
                out.push(record);
            }
        }
        Ok(out)
    }

    fn import_withdrawal(&self, request: &WithdrawalRequest) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.withdrawals
            .put(&mut wtxn, request.id.as_str().as_bytes(), &encode(request)?)
            .map_err(LmdbError::from)?;
        // Keep freshly issued ids clear of imported ones.
        if let Some(seq) = request
            .id
            .as_str()
            .strip_prefix("wd-")
            .and_then(|s| s.parse::<u64>().ok())
        {
            if seq > read_withdrawal_seq(&self.meta, &wtxn)? {
                write_withdrawal_seq(&self.meta, &mut wtxn, seq)?;
            }
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

#[async_trait]
impl WithdrawalStore for LmdbStore {
    async fn insert_withdrawal(&self, new: NewWithdrawal) -> Result<WithdrawalRequest, StoreError> {
        self.blocking(move |env| env.insert_withdrawal(new)).await
    }

    async fn get_withdrawal(&self, id: &WithdrawalId) -> Result<WithdrawalRequest, StoreError> {
        let id = id.clone();
        self.blocking(move |env| env.get_withdrawal(&id)).await
    }

    async fn transition_withdrawal(
        &self,
        id: &WithdrawalId,
        expected: WithdrawalStatus,
        next: WithdrawalStatus,
        decided_at: Timestamp,
    ) -> Result<WithdrawalRequest, StoreError> {
        let id = id.clone();
        self.blocking(move |env| env.transition_withdrawal(&id, expected, next, decided_at))
            .await
    }

    async fn withdrawals_for_user(
        &self,
        user: &UserId,
    ) -> Result<Vec<WithdrawalRequest>, StoreError> {
        let user = user.clone();
        self.blocking(move |env| env.scan_withdrawals(|w| w.user_id == user))
            .await
    }

    async fn withdrawals_with_status(
        &self,
        status: WithdrawalStatus,
    ) -> Result<Vec<WithdrawalRequest>, StoreError> {
        self.blocking(move |env| env.scan_withdrawals(|w| w.status == status))
            .await
    }

    async fn import_withdrawal(&self, request: &WithdrawalRequest) -> Result<(), StoreError> {
        let request = request.clone();
        self.blocking(move |env| env.import_withdrawal(&request)).await
    }
}

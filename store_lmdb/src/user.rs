//! LMDB implementation of UserStore.

use async_trait::async_trait;
use rewards_store::{StoreError, UserStore, UserUpdate};
use rewards_types::{UserAccount, UserId};

use crate::codec::{decode, encode};
use crate::{LmdbEnvironment, LmdbError, LmdbStore};

impl LmdbEnvironment {
    fn create_user_if_absent(&self, account: &UserAccount) -> Result<UserAccount, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let key = account.id.as_str().as_bytes();
        if let Some(bytes) = self.users.get(&wtxn, key).map_err(LmdbError::from)? {
            return Ok(decode(account.id.as_str(), bytes)?);
        }
        self.users
            .put(&mut wtxn, key, &encode(account)?)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(account.clone())
    }

    fn get_user(&self, id: &UserId) -> Result<UserAccount, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let bytes = self
            .users
            .get(&rtxn, id.as_str().as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        Ok(decode(id.as_str(), bytes)?)
    }

    /// Read, check guards, apply ops and write back inside one write
    /// transaction. Dropping the transaction on any error aborts it.
    fn apply_user_update(
        &self,
        id: &UserId,
        update: &UserUpdate,
    ) -> Result<UserAccount, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let key = id.as_str().as_bytes();
        let mut account: UserAccount = match self.users.get(&wtxn, key).map_err(LmdbError::from)? {
            Some(bytes) => decode(id.as_str(), bytes)?,
            None => return Err(StoreError::NotFound(format!("user {id}"))),
        };
        update.apply(&mut account)?;
        self.users
            .put(&mut wtxn, key, &encode(&account)?)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(account)
    }

    fn list_users(&self) -> Result<Vec<UserAccount>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut users = Vec::new();
        for entry in self.users.iter(&rtxn).map_err(LmdbError::from)? {
            let (key, bytes) = entry.map_err(LmdbError::from)?;
            users.push(decode(&String::from_utf8_lossy(key), bytes)?);
        }
        Ok(users)
    }

    fn import_user(&self, account: &UserAccount) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.users
            .put(&mut wtxn, account.id.as_str().as_bytes(), &encode(account)?)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for LmdbStore {
    async fn create_user_if_absent(&self, account: UserAccount) -> Result<UserAccount, StoreError> {
        self.blocking(move |env| env.create_user_if_absent(&account)).await
    }

    async fn get_user(&self, id: &UserId) -> Result<UserAccount, StoreError> {
        let id = id.clone();
        self.blocking(move |env| env.get_user(&id)).await
    }

    async fn apply_user_update(
        &self,
        id: &UserId,
        update: &UserUpdate,
    ) -> Result<UserAccount, StoreError> {
        let (id, update) = (id.clone(), update.clone());
        self.blocking(move |env| env.apply_user_update(&id, &update)).await
    }

    async fn list_users(&self) -> Result<Vec<UserAccount>, StoreError> {
        self.blocking(|env| env.list_users()).await
    }

    async fn import_user(&self, account: &UserAccount) -> Result<(), StoreError> {
        let account = account.clone();
        self.blocking(move |env| env.import_user(&account)).await
    }
}

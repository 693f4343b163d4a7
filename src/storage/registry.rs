// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Master data: customers, miner actors, and the accounts the desk is
//! allowed to touch.
//!
//! Registration is idempotent: re-adding an existing customer, miner, or
//! account returns the stored row instead of failing, so bootstrap scripts
//! can run repeatedly.

use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::db::{
    all_json, get_json, put_json, CustodyDb, StoreError, StoreResult, ACCOUNTS, CUSTOMERS,
    CUSTOMER_NAMES, MINERS, TRANSFER_TARGETS,
};

/// Account classes the registry accepts.
pub const WALLET_TYPES: &[&str] = &["accounting", "miner"];

/// Sub-types for miner-class accounts.
pub const MINER_WALLET_TYPES: &[&str] = &["owner", "worker", "post"];

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Miner {
    pub id: String,
    pub customer_id: String,
    pub miner_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Account {
    pub id: String,
    pub address: String,
    /// One of [`WALLET_TYPES`].
    pub wallet_type: String,
    pub customer_id: String,
    /// Set for miner-class accounts, empty otherwise.
    pub miner_id: String,
    /// One of [`MINER_WALLET_TYPES`] for miner-class accounts, empty otherwise.
    pub miner_wallet_type: String,
    /// Whether the node keystore holds the signing key for this address.
    pub have_private_key: bool,
}

impl CustodyDb {
    /// Register a customer by name. Returns the existing row when the name
    /// is already registered.
    pub fn upsert_customer(&self, name: &str) -> StoreResult<Customer> {
        let txn = self.db.begin_write()?;
        let customer = {
            let mut names = txn.open_table(CUSTOMER_NAMES)?;
            let existing_id = names.get(name)?.map(|g| g.value().to_string());
            let mut customers = txn.open_table(CUSTOMERS)?;
            match existing_id {
                Some(id) => get_json(&customers, &id)?
                    .ok_or_else(|| StoreError::NotFound(format!("customer {id}")))?,
                None => {
                    let customer = Customer {
                        id: Uuid::new_v4().to_string(),
                        name: name.to_string(),
                    };
                    put_json(&mut customers, &customer.id, &customer)?;
                    names.insert(name, customer.id.as_str())?;
                    customer
                }
            }
        };
        txn.commit()?;
        Ok(customer)
    }

    pub fn customer(&self, id: &str) -> StoreResult<Customer> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CUSTOMERS)?;
        get_json(&table, id)
            .and_then(|c| c.ok_or_else(|| StoreError::NotFound(format!("customer {id}"))))
    }

    pub fn customer_by_name(&self, name: &str) -> StoreResult<Customer> {
        let txn = self.db.begin_read()?;
        let names = txn.open_table(CUSTOMER_NAMES)?;
        let id = names
            .get(name)?
            .map(|g| g.value().to_string())
            .ok_or_else(|| StoreError::NotFound(format!("customer {name}")))?;
        let table = txn.open_table(CUSTOMERS)?;
        get_json(&table, &id)
            .and_then(|c| c.ok_or_else(|| StoreError::NotFound(format!("customer {id}"))))
    }

    pub fn list_customers(&self) -> StoreResult<Vec<Customer>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CUSTOMERS)?;
        all_json(&table)
    }

    /// Register a miner actor for a customer. Idempotent by miner id.
    pub fn upsert_miner(&self, miner_id: &str, customer_id: &str) -> StoreResult<Miner> {
        let txn = self.db.begin_write()?;
        let miner = {
            let mut miners = txn.open_table(MINERS)?;
            match get_json::<Miner, _>(&miners, miner_id)? {
                Some(existing) => existing,
                None => {
                    let miner = Miner {
                        id: Uuid::new_v4().to_string(),
                        customer_id: customer_id.to_string(),
                        miner_id: miner_id.to_string(),
                    };
                    put_json(&mut miners, miner_id, &miner)?;
                    miner
                }
            }
        };
        txn.commit()?;
        Ok(miner)
    }

    pub fn miner(&self, miner_id: &str) -> StoreResult<Miner> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(MINERS)?;
        get_json(&table, miner_id)
            .and_then(|m| m.ok_or_else(|| StoreError::NotFound(format!("miner {miner_id}"))))
    }

    pub fn list_miners(&self) -> StoreResult<Vec<Miner>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(MINERS)?;
        all_json(&table)
    }

    /// Register an account. Idempotent by address: the stored row wins.
    ///
    /// At most one `owner`-type account may exist per miner; a second one
    /// at a different address fails with [`StoreError::AlreadyExists`]. The
    /// check and the insert share the write transaction.
    pub fn upsert_account(&self, account: &Account) -> StoreResult<Account> {
        let txn = self.db.begin_write()?;
        let stored = {
            let mut accounts = txn.open_table(ACCOUNTS)?;
            match get_json::<Account, _>(&accounts, &account.address)? {
                Some(existing) => existing,
                None => {
                    if account.miner_wallet_type == "owner" {
                        let taken = all_json::<Account, _>(&accounts)?.into_iter().any(|a| {
                            a.miner_id == account.miner_id && a.miner_wallet_type == "owner"
                        });
                        if taken {
                            return Err(StoreError::AlreadyExists(format!(
                                "owner account for miner {}",
                                account.miner_id
                            )));
                        }
                    }
                    put_json(&mut accounts, &account.address, account)?;
                    account.clone()
                }
            }
        };
        txn.commit()?;
        Ok(stored)
    }

    pub fn account(&self, address: &str) -> StoreResult<Account> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ACCOUNTS)?;
        get_json(&table, address)
            .and_then(|a| a.ok_or_else(|| StoreError::NotFound(format!("account {address}"))))
    }

    pub fn account_exists(&self, address: &str) -> StoreResult<bool> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ACCOUNTS)?;
        Ok(table.get(address)?.is_some())
    }

    pub fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ACCOUNTS)?;
        all_json(&table)
    }

    pub fn accounts_for_miner(&self, miner_id: &str) -> StoreResult<Vec<Account>> {
        Ok(self
            .list_accounts()?
            .into_iter()
            .filter(|a| a.miner_id == miner_id)
            .collect())
    }

    /// Replace the allow-list of destinations for a source address.
    pub fn set_transfer_targets(&self, address: &str, targets: &[String]) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(TRANSFER_TARGETS)?;
            put_json(&mut table, address, &targets.to_vec())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn transfer_targets(&self, address: &str) -> StoreResult<Vec<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(TRANSFER_TARGETS)?;
        Ok(get_json(&table, address)?.unwrap_or_default())
    }
}

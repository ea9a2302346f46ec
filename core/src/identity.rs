/*
 * identity.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Missiva, a mail and news compose pipeline.
 *
 * Missiva is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Missiva is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Missiva.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Sending identities and the accounts that own them.

use crate::store::StoreError;
use std::sync::RwLock;

/// A sending identity (From address plus per-identity compose preferences).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable key (e.g. "id1").
    pub key: String,
    pub email: String,
    pub full_name: Option<String>,
    /// Compose in HTML by default.
    pub compose_html: bool,
}

impl Identity {
    pub fn new(key: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            email: email.into(),
            full_name: None,
            compose_html: true,
        }
    }
}

/// Account key (e.g. "account1").
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct AccountKey(pub String);

/// Incoming server key; filters run against a server, which belongs to exactly one account.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct ServerKey(pub String);

/// Account and identity configuration.
pub trait IdentityStore: Send + Sync {
    /// Default identity of the default account. `Ok(None)` when no account is configured.
    fn default_identity(&self) -> Result<Option<Identity>, StoreError>;

    /// Account owning an incoming server.
    fn account_for_server(&self, server: &ServerKey) -> Result<AccountKey, StoreError>;

    /// Identities of an account, default identity first.
    fn identities_for_account(&self, account: &AccountKey) -> Result<Vec<Identity>, StoreError>;

    /// Default identity of an account (first identity).
    fn default_identity_for_account(&self, account: &AccountKey) -> Result<Option<Identity>, StoreError> {
        Ok(self.identities_for_account(account)?.into_iter().next())
    }
}

#[derive(Debug, Clone)]
struct AccountEntry {
    key: AccountKey,
    server: ServerKey,
    identities: Vec<Identity>,
}

/// In-memory account list. The first account added is the default account.
#[derive(Debug, Default)]
pub struct AccountList {
    accounts: RwLock<Vec<AccountEntry>>,
}

impl AccountList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account with its incoming server and identities (default identity first).
    pub fn add_account(&self, key: AccountKey, server: ServerKey, identities: Vec<Identity>) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().map_err(crate::store::poisoned)?;
        accounts.retain(|a| a.key != key);
        accounts.push(AccountEntry {
            key,
            server,
            identities,
        });
        Ok(())
    }
}

impl IdentityStore for AccountList {
    fn default_identity(&self) -> Result<Option<Identity>, StoreError> {
        let accounts = self.accounts.read().map_err(crate::store::poisoned)?;
        Ok(accounts.first().and_then(|a| a.identities.first().cloned()))
    }

    fn account_for_server(&self, server: &ServerKey) -> Result<AccountKey, StoreError> {
        let accounts = self.accounts.read().map_err(crate::store::poisoned)?;
        accounts
            .iter()
            .find(|a| &a.server == server)
            .map(|a| a.key.clone())
            .ok_or_else(|| StoreError::new(format!("no account for server {}", server.0)))
    }

    fn identities_for_account(&self, account: &AccountKey) -> Result<Vec<Identity>, StoreError> {
        let accounts = self.accounts.read().map_err(crate::store::poisoned)?;
        accounts
            .iter()
            .find(|a| &a.key == account)
            .map(|a| a.identities.clone())
            .ok_or_else(|| StoreError::new(format!("no such account {}", account.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_has_no_default_identity() {
        let list = AccountList::new();
        assert_eq!(list.default_identity().unwrap(), None);
    }

    #[test]
    fn first_account_is_default() {
        let list = AccountList::new();
        list.add_account(
            AccountKey("a1".into()),
            ServerKey("s1".into()),
            vec![Identity::new("id1", "me@example.com"), Identity::new("id2", "alias@example.com")],
        )
        .unwrap();
        list.add_account(AccountKey("a2".into()), ServerKey("s2".into()), vec![Identity::new("id3", "other@example.org")])
            .unwrap();
        assert_eq!(list.default_identity().unwrap().unwrap().key, "id1");
        let account = list.account_for_server(&ServerKey("s2".into())).unwrap();
        assert_eq!(account, AccountKey("a2".into()));
        assert_eq!(list.default_identity_for_account(&account).unwrap().unwrap().key, "id3");
        assert!(list.account_for_server(&ServerKey("nope".into())).is_err());
    }
}

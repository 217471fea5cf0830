//! The chain-keyed address book of deployed contracts
//!
//! Each chain's record lives in its own JSON file, `<dir>/<chain_id>.json`.
//! Records are only ever read and written whole; deployments update a record
//! through [`ConfigStore::update`], which serializes the read-modify-write for
//! a chain.

use std::{
    collections::{BTreeMap, HashMap},
    fmt::{self, Display},
    fs::{self, File},
    io::{ErrorKind, Write},
    path::PathBuf,
    sync::{Arc, Mutex},
};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{constants::ADDRESS_BOOK_EXTENSION, errors::ScriptError};

/// The categories into which logical contract names are partitioned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressCategory {
    /// ERC20 tokens, including the PLP token
    Tokens,
    /// Storage contracts
    Storages,
    /// Handler contracts
    Handlers,
    /// Vault strategies
    Strategies,
}

impl AddressCategory {
    /// The key of the category in the serialized address book
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressCategory::Tokens => "tokens",
            AddressCategory::Storages => "storages",
            AddressCategory::Handlers => "handlers",
            AddressCategory::Strategies => "strategies",
        }
    }
}

impl Display for AddressCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The deployed contract addresses of a single chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressBook {
    /// The multisig owning the protocol's contracts, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe: Option<Address>,
    /// Token addresses
    #[serde(default)]
    pub tokens: BTreeMap<String, Address>,
    /// Storage contract addresses
    #[serde(default)]
    pub storages: BTreeMap<String, Address>,
    /// Handler contract addresses
    #[serde(default)]
    pub handlers: BTreeMap<String, Address>,
    /// Strategy contract addresses
    #[serde(default)]
    pub strategies: BTreeMap<String, Address>,
}

impl AddressBook {
    /// The entries of a category
    fn category(&self, category: AddressCategory) -> &BTreeMap<String, Address> {
        match category {
            AddressCategory::Tokens => &self.tokens,
            AddressCategory::Storages => &self.storages,
            AddressCategory::Handlers => &self.handlers,
            AddressCategory::Strategies => &self.strategies,
        }
    }

    /// The mutable entries of a category
    fn category_mut(&mut self, category: AddressCategory) -> &mut BTreeMap<String, Address> {
        match category {
            AddressCategory::Tokens => &mut self.tokens,
            AddressCategory::Storages => &mut self.storages,
            AddressCategory::Handlers => &mut self.handlers,
            AddressCategory::Strategies => &mut self.strategies,
        }
    }

    /// Look up the address of a logical name
    pub fn get(&self, category: AddressCategory, name: &str) -> Result<Address, ScriptError> {
        self.category(category)
            .get(name)
            .copied()
            .ok_or_else(|| ScriptError::MissingAddress {
                category: category.as_str(),
                name: name.to_string(),
            })
    }

    /// Point a logical name at an address, returning the address it replaced
    pub fn set(
        &mut self,
        category: AddressCategory,
        name: &str,
        address: Address,
    ) -> Option<Address> {
        self.category_mut(category).insert(name.to_string(), address)
    }

    /// The address of a token
    pub fn token(&self, name: &str) -> Result<Address, ScriptError> {
        self.get(AddressCategory::Tokens, name)
    }

    /// The address of a storage contract
    pub fn storage(&self, name: &str) -> Result<Address, ScriptError> {
        self.get(AddressCategory::Storages, name)
    }

    /// The address of a handler contract
    pub fn handler(&self, name: &str) -> Result<Address, ScriptError> {
        self.get(AddressCategory::Handlers, name)
    }

    /// The address of a strategy contract
    pub fn strategy(&self, name: &str) -> Result<Address, ScriptError> {
        self.get(AddressCategory::Strategies, name)
    }
}

/// Reads and writes address books in a directory
#[derive(Debug)]
pub struct ConfigStore {
    /// The directory holding one file per chain
    dir: PathBuf,
    /// Per-chain locks held across a read-modify-write
    locks: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl ConfigStore {
    /// Create a store over the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The file holding the address book of a chain
    pub fn path_for(&self, chain_id: u64) -> PathBuf {
        self.dir
            .join(chain_id.to_string())
            .with_extension(ADDRESS_BOOK_EXTENSION)
    }

    /// Load the address book of a chain
    pub fn load(&self, chain_id: u64) -> Result<AddressBook, ScriptError> {
        let path = self.path_for(chain_id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ScriptError::ConfigNotFound(chain_id))
            }
            Err(e) => return Err(ScriptError::Persistence(e.to_string())),
        };

        serde_json::from_str(&contents).map_err(|e| {
            ScriptError::Persistence(format!("malformed address book {}: {}", path.display(), e))
        })
    }

    /// Persist the full address book of a chain
    ///
    /// The record is written to a sibling file, synced, then renamed over the
    /// previous record, so the write is durable once this returns.
    pub fn write(&self, chain_id: u64, book: &AddressBook) -> Result<(), ScriptError> {
        fs::create_dir_all(&self.dir).map_err(|e| ScriptError::Persistence(e.to_string()))?;

        let path = self.path_for(chain_id);
        let tmp_path = path.with_extension(format!("{ADDRESS_BOOK_EXTENSION}.tmp"));
        let serialized = serde_json::to_string_pretty(book)
            .map_err(|e| ScriptError::Persistence(e.to_string()))?;

        let mut file =
            File::create(&tmp_path).map_err(|e| ScriptError::Persistence(e.to_string()))?;
        file.write_all(serialized.as_bytes())
            .and_then(|_| file.write_all(b"\n"))
            .and_then(|_| file.sync_all())
            .map_err(|e| ScriptError::Persistence(e.to_string()))?;

        fs::rename(&tmp_path, &path).map_err(|e| ScriptError::Persistence(e.to_string()))
    }

    /// Read-modify-write the address book of a chain under the chain's lock
    ///
    /// A chain without a record starts from an empty book. Returns the
    /// persisted book.
    pub fn update<F>(&self, chain_id: u64, f: F) -> Result<AddressBook, ScriptError>
    where
        F: FnOnce(&mut AddressBook),
    {
        let lock = self.chain_lock(chain_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| ScriptError::Persistence("address book lock poisoned".to_string()))?;

        let mut book = match self.load(chain_id) {
            Ok(book) => book,
            Err(ScriptError::ConfigNotFound(_)) => AddressBook::default(),
            Err(e) => return Err(e),
        };
        f(&mut book);
        self.write(chain_id, &book)?;

        Ok(book)
    }

    /// The lock guarding a chain's record
    fn chain_lock(&self, chain_id: u64) -> Result<Arc<Mutex<()>>, ScriptError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| ScriptError::Persistence("address book lock poisoned".to_string()))?;
        Ok(locks.entry(chain_id).or_default().clone())
    }
}

//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `wallets` - Wallet records (key: wallet_id)
//! - `credit_lines` - Credit line records (key: credit_line_id)
//! - `transactions` - Append-only transaction log (key: wallet_id || inverted seq)
//! - `indices` - Owner lookups (owner -> wallet_id, owner -> credit_line_id)
//!
//! Domain checks run against freshly read records and commit in the same
//! `WriteBatch` as their effects, so a rejected mutation leaves no trace
//! and a committed one is all-or-nothing.

use crate::{
    error::{Error, Result},
    types::{CreditLine, CreditStatus, Currency, Transaction, TransactionKind, Wallet},
    Config, OwnerId,
};
use chrono::Utc;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, IteratorMode, Options, WriteBatch, DB,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_WALLETS: &str = "wallets";
const CF_CREDIT_LINES: &str = "credit_lines";
const CF_TRANSACTIONS: &str = "transactions";
const CF_INDICES: &str = "indices";

/// Storage wrapper for RocksDB
#[derive(Debug)]
pub struct Storage {
    db: Arc<DB>,
    // Column family handles are stored in DB, accessed by name
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        // Database options
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);
        db_opts.set_level_zero_file_num_compaction_trigger(
            config.rocksdb.level0_file_num_compaction_trigger,
        );

        // Universal compaction for write-heavy workload
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        // Enable statistics
        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        // Column family descriptors
        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_WALLETS, Self::cf_options_wallets()),
            ColumnFamilyDescriptor::new(CF_CREDIT_LINES, Self::cf_options_credit_lines()),
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_transactions()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
        ];

        // Open database
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(
            "Opened RocksDB at {:?} with {} column families",
            path,
            db.cf_handle(CF_WALLETS).is_some() as usize
                + db.cf_handle(CF_CREDIT_LINES).is_some() as usize
                + db.cf_handle(CF_TRANSACTIONS).is_some() as usize
                + db.cf_handle(CF_INDICES).is_some() as usize
        );

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_wallets() -> Options {
        let mut opts = Options::default();
        // Wallets are frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_credit_lines() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_transactions() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Indices benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false); // 10 bits per key
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Onboarding

    /// Create a wallet. One wallet per owner.
    pub fn create_wallet(&self, owner: &OwnerId, currency: Currency) -> Result<Wallet> {
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let idx_key = Self::index_key_owner_wallet(owner);

        if self.db.get_cf(cf_indices, &idx_key)?.is_some() {
            return Err(Error::Validation(format!(
                "Wallet already exists for owner {}",
                owner
            )));
        }

        let wallet = Wallet::new(owner.clone(), currency);

        let mut batch = WriteBatch::default();
        let cf_wallets = self.cf_handle(CF_WALLETS)?;
        batch.put_cf(cf_wallets, wallet.id.as_bytes(), bincode::serialize(&wallet)?);
        batch.put_cf(cf_indices, &idx_key, wallet.id.as_bytes());
        self.db.write(batch)?;

        tracing::info!(
            wallet_id = %wallet.id,
            owner_id = %owner,
            currency = %wallet.currency,
            "Wallet created"
        );

        Ok(wallet)
    }

    /// Create a credit line. At most one line per owner.
    pub fn create_credit_line(
        &self,
        owner: &OwnerId,
        limit_amount: Decimal,
        currency: Currency,
    ) -> Result<CreditLine> {
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let idx_key = Self::index_key_owner_credit_line(owner);

        if self.db.get_cf(cf_indices, &idx_key)?.is_some() {
            return Err(Error::Validation(format!(
                "Credit line already exists for owner {}",
                owner
            )));
        }

        let line = CreditLine::new(owner.clone(), limit_amount, currency);

        let mut batch = WriteBatch::default();
        let cf_lines = self.cf_handle(CF_CREDIT_LINES)?;
        batch.put_cf(cf_lines, line.id.as_bytes(), bincode::serialize(&line)?);
        batch.put_cf(cf_indices, &idx_key, line.id.as_bytes());
        self.db.write(batch)?;

        tracing::info!(
            credit_line_id = %line.id,
            owner_id = %owner,
            limit = %line.limit_amount,
            "Credit line created"
        );

        Ok(line)
    }

    // Reads

    /// Get wallet by owner (via index)
    pub fn get_wallet(&self, owner: &OwnerId) -> Result<Wallet> {
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let id_bytes = self
            .db
            .get_cf(cf_indices, Self::index_key_owner_wallet(owner))?
            .ok_or_else(|| Error::WalletNotFound(owner.to_string()))?;

        self.get_wallet_by_id(Self::uuid_from_index(&id_bytes)?)
    }

    /// Get wallet by id
    pub fn get_wallet_by_id(&self, wallet_id: Uuid) -> Result<Wallet> {
        let cf = self.cf_handle(CF_WALLETS)?;

        let value = self
            .db
            .get_cf(cf, wallet_id.as_bytes())?
            .ok_or_else(|| Error::WalletNotFound(wallet_id.to_string()))?;

        let wallet: Wallet = bincode::deserialize(&value)?;
        Ok(wallet)
    }

    /// Get credit line by owner (via index)
    pub fn get_credit_line(&self, owner: &OwnerId) -> Result<CreditLine> {
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let id_bytes = self
            .db
            .get_cf(cf_indices, Self::index_key_owner_credit_line(owner))?
            .ok_or_else(|| Error::CreditLineNotFound(owner.to_string()))?;

        let cf = self.cf_handle(CF_CREDIT_LINES)?;
        let value = self
            .db
            .get_cf(cf, &id_bytes)?
            .ok_or_else(|| Error::CreditLineNotFound(owner.to_string()))?;

        let line: CreditLine = bincode::deserialize(&value)?;
        Ok(line)
    }

    // Mutations (atomic)

    /// Apply a signed balance delta and record the transaction, in one batch.
    ///
    /// The wallet is re-read here so the sign check always runs against the
    /// committed balance. Returns the updated wallet and the new record.
    pub fn apply_wallet_mutation(
        &self,
        owner: &OwnerId,
        delta: Decimal,
        kind: TransactionKind,
        description: Option<String>,
        reference: Option<String>,
    ) -> Result<(Wallet, Transaction)> {
        let mut wallet = self.get_wallet(owner)?;
        wallet.apply_delta(delta)?;
        let tx = Self::next_transaction(&mut wallet, delta, kind, description, reference);

        let mut batch = WriteBatch::default();
        self.stage_wallet_and_transaction(&mut batch, &wallet, &tx)?;
        self.db.write(batch)?;

        tracing::debug!(
            wallet_id = %wallet.id,
            tx_id = %tx.id,
            seq = tx.seq,
            kind = ?tx.kind,
            amount = %tx.amount,
            "Wallet mutation committed"
        );

        Ok((wallet, tx))
    }

    /// Apply a used-amount delta to the owner's credit line.
    ///
    /// No transaction record; the wallet is untouched.
    pub fn apply_credit_line_mutation(
        &self,
        owner: &OwnerId,
        used_delta: Decimal,
    ) -> Result<CreditLine> {
        let mut line = self.get_credit_line(owner)?;
        line.apply_used_delta(used_delta)?;
        line.updated_at = Utc::now();

        let cf = self.cf_handle(CF_CREDIT_LINES)?;
        self.db
            .put_cf(cf, line.id.as_bytes(), bincode::serialize(&line)?)?;

        Ok(line)
    }

    /// Apply a credit draw or repayment: credit line, wallet, and transaction
    /// record commit in a **single** batch. Partial application is never
    /// observable.
    ///
    /// Draws require the line to be Active; repayments are accepted for any
    /// status so a suspended line can still be paid down.
    pub fn apply_credit_and_wallet_mutation(
        &self,
        owner: &OwnerId,
        used_delta: Decimal,
        balance_delta: Decimal,
        kind: TransactionKind,
        description: Option<String>,
    ) -> Result<(CreditLine, Wallet, Transaction)> {
        let mut line = self.get_credit_line(owner)?;

        if kind == TransactionKind::CreditDraw && line.status != CreditStatus::Active {
            return Err(Error::CreditLineInactive(line.status));
        }

        line.apply_used_delta(used_delta)?;
        line.updated_at = Utc::now();

        let mut wallet = self.get_wallet(owner)?;
        wallet.apply_delta(balance_delta)?;

        let reference = match kind {
            TransactionKind::CreditDraw => Some(format!("credit_draw_{}", line.id)),
            TransactionKind::CreditRepayment => Some(format!("credit_repayment_{}", line.id)),
            _ => None,
        };
        let tx = Self::next_transaction(&mut wallet, balance_delta, kind, description, reference);

        let mut batch = WriteBatch::default();
        let cf_lines = self.cf_handle(CF_CREDIT_LINES)?;
        batch.put_cf(cf_lines, line.id.as_bytes(), bincode::serialize(&line)?);
        self.stage_wallet_and_transaction(&mut batch, &wallet, &tx)?;
        self.db.write(batch)?;

        tracing::debug!(
            credit_line_id = %line.id,
            wallet_id = %wallet.id,
            tx_id = %tx.id,
            seq = tx.seq,
            kind = ?tx.kind,
            amount = %tx.amount,
            "Credit and wallet mutation committed"
        );

        Ok((line, wallet, tx))
    }

    /// Administrative status transition
    pub fn set_credit_line_status(
        &self,
        owner: &OwnerId,
        status: CreditStatus,
    ) -> Result<CreditLine> {
        let mut line = self.get_credit_line(owner)?;
        line.status = status;
        line.updated_at = Utc::now();

        let cf = self.cf_handle(CF_CREDIT_LINES)?;
        self.db
            .put_cf(cf, line.id.as_bytes(), bincode::serialize(&line)?)?;

        tracing::info!(
            credit_line_id = %line.id,
            owner_id = %owner,
            status = %status,
            "Credit line status changed"
        );

        Ok(line)
    }

    fn stage_wallet_and_transaction(
        &self,
        batch: &mut WriteBatch,
        wallet: &Wallet,
        tx: &Transaction,
    ) -> Result<()> {
        let cf_wallets = self.cf_handle(CF_WALLETS)?;
        batch.put_cf(cf_wallets, wallet.id.as_bytes(), bincode::serialize(wallet)?);

        let cf_txs = self.cf_handle(CF_TRANSACTIONS)?;
        batch.put_cf(
            cf_txs,
            Self::transaction_key(tx.wallet_id, tx.seq),
            bincode::serialize(tx)?,
        );

        Ok(())
    }

    /// Build the wallet's next transaction and advance its counters.
    ///
    /// `created_at` is clamped to the wallet's `updated_at` so a clock step
    /// backwards cannot reorder history; `seq` stays authoritative.
    fn next_transaction(
        wallet: &mut Wallet,
        amount: Decimal,
        kind: TransactionKind,
        description: Option<String>,
        reference: Option<String>,
    ) -> Transaction {
        let created_at = Utc::now().max(wallet.updated_at);
        let seq = wallet.tx_count;
        wallet.tx_count += 1;
        wallet.updated_at = created_at;

        Transaction {
            id: Uuid::now_v7(),
            wallet_id: wallet.id,
            seq,
            amount,
            kind,
            description,
            balance_after: wallet.balance,
            reference,
            created_at,
        }
    }

    // Transaction log reads

    /// Get a page of a wallet's transactions, newest first
    pub fn list_transactions(
        &self,
        wallet_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;

        let prefix = wallet_id.as_bytes();
        let iter = self.db.prefix_iterator_cf(cf, prefix);

        let mut txs = Vec::with_capacity(limit);
        let mut skipped = 0usize;
        for item in iter {
            let (key, value) = item?;

            // prefix_iterator can run past the prefix; stop at the boundary
            if !key.starts_with(prefix) {
                break;
            }

            if skipped < offset {
                skipped += 1;
                continue;
            }
            if txs.len() == limit {
                break;
            }

            let tx: Transaction = bincode::deserialize(&value)?;
            txs.push(tx);
        }

        Ok(txs)
    }

    // Key helpers

    /// Transaction key: wallet_id || (u64::MAX - seq), big endian.
    /// Inverting seq makes a forward prefix scan yield newest first.
    fn transaction_key(wallet_id: Uuid, seq: u64) -> Vec<u8> {
        let mut key = wallet_id.as_bytes().to_vec();
        key.extend_from_slice(&(u64::MAX - seq).to_be_bytes());
        key
    }

    fn index_key_owner_wallet(owner: &OwnerId) -> Vec<u8> {
        let mut key = b"ow|".to_vec();
        key.extend_from_slice(owner.as_bytes());
        key
    }

    fn index_key_owner_credit_line(owner: &OwnerId) -> Vec<u8> {
        let mut key = b"oc|".to_vec();
        key.extend_from_slice(owner.as_bytes());
        key
    }

    fn uuid_from_index(bytes: &[u8]) -> Result<Uuid> {
        let raw: [u8; 16] = bytes
            .try_into()
            .map_err(|_| Error::Storage("Corrupt index entry".to_string()))?;
        Ok(Uuid::from_bytes(raw))
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StorageStats> {
        let cf_wallets = self.cf_handle(CF_WALLETS)?;
        let cf_txs = self.cf_handle(CF_TRANSACTIONS)?;

        // Count wallets (exact, small keyspace)
        let mut wallet_count = 0u64;
        let iter = self.db.iterator_cf(cf_wallets, IteratorMode::Start);
        for _ in iter {
            wallet_count += 1;
        }

        // Count transactions (approximate, fast)
        let transaction_count = self.approximate_count(cf_txs)?;

        Ok(StorageStats {
            total_wallets: wallet_count,
            total_transactions: transaction_count,
        })
    }

    fn approximate_count(&self, cf: &ColumnFamily) -> Result<u64> {
        // RocksDB property for approximate count
        let prop = self
            .db
            .property_int_value_cf(cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);

        Ok(prop)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Exact wallet count
    pub total_wallets: u64,
    /// Approximate transaction count
    pub total_transactions: u64,
}

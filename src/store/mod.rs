//! Transaction persistence.
//!
//! The store is the single source of truth for transaction state. Its
//! `create` is an atomic insert-if-absent on the session id, standing in
//! for a relational unique constraint: under concurrent identical requests
//! exactly one caller observes [`InsertOutcome::Created`] and every other
//! caller gets the winner's row back. The engine builds its idempotency
//! guarantee on that primitive rather than on a check-then-act read.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::types::error::GatewayError;
use crate::types::transaction::{Transaction, TransactionEvent};

/// Outcome of an insert-if-absent.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The row was inserted; the caller owns the side-effecting path.
    Created,
    /// A row already existed for this session id.
    Duplicate(Transaction),
}

/// Single-row mutation run under the store's per-key lock.
pub type UpdateFn = Box<dyn FnOnce(&mut Transaction) -> Result<(), GatewayError> + Send>;

/// Durable CRUD for transactions and their event log.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Inserts the transaction unless one already exists for its session id.
    async fn create(&self, transaction: Transaction) -> Result<InsertOutcome, GatewayError>;

    async fn get_by_session_id(&self, session_id: &str) -> Option<Transaction>;

    async fn get_by_transaction_id(&self, transaction_id: &str) -> Option<Transaction>;

    /// Runs a validate-and-mutate closure atomically against one row and
    /// returns the updated record. The closure must not call back into the
    /// store.
    async fn apply(
        &self,
        transaction_id: &str,
        update: UpdateFn,
    ) -> Result<Transaction, GatewayError>;

    /// Writes the serialized response back onto the row for later replay.
    async fn store_response(
        &self,
        session_id: &str,
        raw_response: String,
    ) -> Result<(), GatewayError>;

    /// Appends an audit event. Events are never mutated or deleted.
    async fn append_event(&self, event: TransactionEvent);

    async fn events_for(&self, transaction_id: &str) -> Vec<TransactionEvent>;

    /// Paginated history for a customer reference, newest first.
    async fn history_for_customer(
        &self,
        customer_reference: &str,
        skip: usize,
        take: usize,
    ) -> Vec<Transaction>;

    /// Paginated history for a phone number, newest first.
    async fn history_for_phone(&self, phone_number: &str, skip: usize, take: usize)
        -> Vec<Transaction>;
}

/// In-memory store backed by concurrent maps.
///
/// Rows are keyed by session id; a secondary index maps transaction ids
/// back to session ids so both lookups stay O(1).
#[derive(Debug, Default)]
pub struct InMemoryTransactionStore {
    by_session: DashMap<String, Transaction>,
    session_by_txid: DashMap<String, String>,
    events: DashMap<String, Vec<TransactionEvent>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        InMemoryTransactionStore {
            by_session: DashMap::new(),
            session_by_txid: DashMap::new(),
            events: DashMap::new(),
        }
    }

    /// Number of persisted transactions.
    pub fn len(&self) -> usize {
        self.by_session.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_session.is_empty()
    }

    fn collect_sorted<F>(&self, filter: F, skip: usize, take: usize) -> Vec<Transaction>
    where
        F: Fn(&Transaction) -> bool,
    {
        let mut rows: Vec<Transaction> = self
            .by_session
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.into_iter().skip(skip).take(take).collect()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn create(&self, transaction: Transaction) -> Result<InsertOutcome, GatewayError> {
        use dashmap::mapref::entry::Entry;

        match self.by_session.entry(transaction.session_id.clone()) {
            Entry::Occupied(existing) => Ok(InsertOutcome::Duplicate(existing.get().clone())),
            Entry::Vacant(slot) => {
                self.session_by_txid.insert(
                    transaction.transaction_id.clone(),
                    transaction.session_id.clone(),
                );
                slot.insert(transaction);
                Ok(InsertOutcome::Created)
            }
        }
    }

    async fn get_by_session_id(&self, session_id: &str) -> Option<Transaction> {
        self.by_session.get(session_id).map(|entry| entry.clone())
    }

    async fn get_by_transaction_id(&self, transaction_id: &str) -> Option<Transaction> {
        let session_id = self.session_by_txid.get(transaction_id)?.clone();
        self.by_session.get(&session_id).map(|entry| entry.clone())
    }

    async fn apply(
        &self,
        transaction_id: &str,
        update: UpdateFn,
    ) -> Result<Transaction, GatewayError> {
        let session_id = self
            .session_by_txid
            .get(transaction_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| GatewayError::transaction_not_found(transaction_id))?;

        let mut row = self
            .by_session
            .get_mut(&session_id)
            .ok_or_else(|| GatewayError::transaction_not_found(transaction_id))?;

        update(row.value_mut())?;
        Ok(row.clone())
    }

    async fn store_response(
        &self,
        session_id: &str,
        raw_response: String,
    ) -> Result<(), GatewayError> {
        let mut row = self
            .by_session
            .get_mut(session_id)
            .ok_or_else(|| GatewayError::transaction_not_found(session_id))?;
        row.raw_response = Some(raw_response);
        Ok(())
    }

    async fn append_event(&self, event: TransactionEvent) {
        self.events
            .entry(event.transaction_id.clone())
            .or_default()
            .push(event);
    }

    async fn events_for(&self, transaction_id: &str) -> Vec<TransactionEvent> {
        self.events
            .get(transaction_id)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    async fn history_for_customer(
        &self,
        customer_reference: &str,
        skip: usize,
        take: usize,
    ) -> Vec<Transaction> {
        self.collect_sorted(
            |tx| tx.customer_reference.as_deref() == Some(customer_reference),
            skip,
            take,
        )
    }

    async fn history_for_phone(
        &self,
        phone_number: &str,
        skip: usize,
        take: usize,
    ) -> Vec<Transaction> {
        self.collect_sorted(
            |tx| tx.phone_number.as_deref() == Some(phone_number),
            skip,
            take,
        )
    }
}

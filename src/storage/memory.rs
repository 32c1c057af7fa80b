//! In-Memory Collaborator Implementations
//!
//! Deterministic pod manager and event sinks for tests, the CLI, and local
//! development. Data is lost when the process exits.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use super::traits::{EventSink, PodManager, PodMutation, StorageError, StorageResult};
use crate::common::logging::log_custody_event;
use crate::types::{
    CustodyEvent, DepositRequest, EthAddress, WithdrawalRequest, WithdrawalStatus,
};

#[derive(Debug, Clone)]
struct PodRecord {
    operator: EthAddress,
    balance_sats: u64,
    deposit: Option<DepositRequest>,
    withdrawal: Option<WithdrawalRequest>,
}

#[derive(Debug, Default)]
struct Ledger {
    pods: HashMap<EthAddress, PodRecord>,
    operator_btc_keys: HashMap<EthAddress, Vec<u8>>,
}

/// In-memory pod manager
///
/// A single lock guards the whole ledger, so a committed batch is never
/// observed half-applied.
#[derive(Debug, Default)]
pub struct MemoryPodManager {
    ledger: RwLock<Ledger>,
}

impl MemoryPodManager {
    /// Create a new empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pod delegated to `operator`
    pub fn register_pod(&self, pod: EthAddress, operator: EthAddress) -> StorageResult<()> {
        let mut ledger = self.write()?;
        if ledger.pods.contains_key(&pod) {
            return Err(StorageError::Duplicate(format!("pod {}", pod)));
        }

        ledger.pods.insert(
            pod,
            PodRecord {
                operator,
                balance_sats: 0,
                deposit: None,
                withdrawal: None,
            },
        );
        Ok(())
    }

    /// Record the operator's 33-byte compressed Bitcoin key
    pub fn set_operator_btc_public_key(
        &self,
        operator: EthAddress,
        public_key: Vec<u8>,
    ) -> StorageResult<()> {
        self.write()?.operator_btc_keys.insert(operator, public_key);
        Ok(())
    }

    /// Open a pending deposit request, replacing any resolved one
    pub fn open_deposit_request(
        &self,
        pod: &EthAddress,
        transaction_id: [u8; 32],
        amount_sats: u64,
    ) -> StorageResult<()> {
        let mut ledger = self.write()?;
        let record = pod_mut(&mut ledger, pod)?;

        if record.deposit.as_ref().is_some_and(|d| d.is_pending()) {
            return Err(StorageError::Duplicate(format!("pending deposit for {}", pod)));
        }
        record.deposit = Some(DepositRequest::new(transaction_id, amount_sats));
        Ok(())
    }

    /// Open a pending withdrawal request, replacing any completed one
    pub fn open_withdrawal_request(
        &self,
        pod: &EthAddress,
        amount_sats: u64,
        withdraw_address: impl Into<String>,
    ) -> StorageResult<()> {
        let mut ledger = self.write()?;
        let record = pod_mut(&mut ledger, pod)?;

        if record
            .withdrawal
            .as_ref()
            .is_some_and(|w| w.status != WithdrawalStatus::Completed)
        {
            return Err(StorageError::Duplicate(format!(
                "open withdrawal for {}",
                pod
            )));
        }
        record.withdrawal = Some(WithdrawalRequest::new(amount_sats, withdraw_address));
        Ok(())
    }

    pub fn set_bitcoin_balance(&self, pod: &EthAddress, balance_sats: u64) -> StorageResult<()> {
        let mut ledger = self.write()?;
        pod_mut(&mut ledger, pod)?.balance_sats = balance_sats;
        Ok(())
    }

    fn read(&self) -> StorageResult<std::sync::RwLockReadGuard<'_, Ledger>> {
        self.ledger
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> StorageResult<std::sync::RwLockWriteGuard<'_, Ledger>> {
        self.ledger
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }

    fn pod(&self, pod: &EthAddress) -> StorageResult<PodRecord> {
        self.read()?
            .pods
            .get(pod)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("pod {}", pod)))
    }
}

fn pod_mut<'a>(ledger: &'a mut Ledger, pod: &EthAddress) -> StorageResult<&'a mut PodRecord> {
    ledger
        .pods
        .get_mut(pod)
        .ok_or_else(|| StorageError::NotFound(format!("pod {}", pod)))
}

fn apply(record: &mut PodRecord, mutation: &PodMutation) -> StorageResult<()> {
    match mutation {
        PodMutation::SetBalance(balance) => record.balance_sats = *balance,
        PodMutation::ConfirmDeposit => match record.deposit.as_mut() {
            Some(deposit) if deposit.is_pending() => deposit.mark_confirmed(),
            _ => return Err(transition("no pending deposit to confirm")),
        },
        PodMutation::RecordSignedPsbt(psbt) => match record.withdrawal.as_mut() {
            Some(withdrawal) if withdrawal.is_pending() => withdrawal.mark_psbt_signed(psbt.clone()),
            _ => return Err(transition("no pending withdrawal for PSBT")),
        },
        PodMutation::RecordCompleteTransaction(tx) => match record.withdrawal.as_mut() {
            Some(withdrawal) if withdrawal.accepts_signing() => {
                withdrawal.mark_transaction_submitted(tx.clone())
            }
            _ => return Err(transition("withdrawal does not accept a transaction")),
        },
        PodMutation::CompleteWithdrawal => match record.withdrawal.as_mut() {
            Some(withdrawal) if withdrawal.submitted_transaction().is_some() => {
                withdrawal.mark_completed()
            }
            _ => return Err(transition("no submitted withdrawal transaction")),
        },
    }
    Ok(())
}

fn transition(reason: &str) -> StorageError {
    StorageError::InvalidTransition(reason.to_string())
}

impl PodManager for MemoryPodManager {
    fn operator_for_pod(&self, pod: &EthAddress) -> StorageResult<Option<EthAddress>> {
        Ok(self.read()?.pods.get(pod).map(|record| record.operator))
    }

    fn operator_btc_public_key(&self, operator: &EthAddress) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.read()?.operator_btc_keys.get(operator).cloned())
    }

    fn bitcoin_balance(&self, pod: &EthAddress) -> StorageResult<u64> {
        Ok(self.pod(pod)?.balance_sats)
    }

    fn deposit_request(&self, pod: &EthAddress) -> StorageResult<Option<DepositRequest>> {
        Ok(self.pod(pod)?.deposit)
    }

    fn withdrawal_request(&self, pod: &EthAddress) -> StorageResult<Option<WithdrawalRequest>> {
        Ok(self.pod(pod)?.withdrawal)
    }

    fn commit(&self, pod: &EthAddress, mutations: &[PodMutation]) -> StorageResult<()> {
        let mut ledger = self.write()?;
        let record = pod_mut(&mut ledger, pod)?;

        // stage on a copy so a failing mutation leaves the record untouched
        let mut staged = record.clone();
        for mutation in mutations {
            apply(&mut staged, mutation)?;
        }

        *record = staged;
        Ok(())
    }
}

/// Event sink that keeps every event, in order
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<CustodyEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events
    pub fn events(&self) -> Vec<CustodyEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemoryEventLog {
    fn emit(&self, event: CustodyEvent) {
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        events.push(event);
    }
}

/// Event sink that writes events to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: CustodyEvent) {
        log_custody_event(&event, None);
    }
}

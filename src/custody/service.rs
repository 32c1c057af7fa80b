//! Custody Service
//!
//! Entry points operators call to confirm deposits, approve and finalize
//! withdrawals, and attest to pod addresses. Every call runs the same way:
//! read pod state, validate it, check the operator's signature over the
//! canonical payload, run the Bitcoin checks, then commit one mutation batch
//! and emit one event. Nothing is written when any step fails.

use std::sync::{Arc, Mutex};

use bitcoin::bech32::Hrp;
use serde::Serialize;

use crate::auth::{authorize_with, CanonicalPayload, EthSignedMessageHasher, MessageHasher};
use crate::btc::{
    check_transaction_payment, decode_bech32_address, decode_transaction, get_script_pub_key,
    witness_script_address, DecodedPsbt, MultisigTemplate, PaymentCheck, TransactionError,
};
use crate::common::logging::{
    generate_correlation_id, log_custody_event, log_custody_failure, log_security_event,
};
use crate::common::{CustodyConfig, CustodyError, Result};
use crate::storage::{EventSink, PodManager, PodMutation};
use crate::types::{CustodyEvent, EthAddress, WithdrawalRequest, WithdrawalStatus};

/// Confirmed deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositConfirmation {
    pub pod: EthAddress,
    pub operator: EthAddress,
    pub amount_sats: u64,
    #[serde(with = "hex::serde")]
    pub transaction_id: [u8; 32],
}

/// Withdrawal approved with a PSBT or complete transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawalApproval {
    pub pod: EthAddress,
    pub operator: EthAddress,
    pub amount_sats: u64,
    pub withdraw_address: String,
    /// Output paying the withdrawal address
    pub vout: usize,
}

/// Finalized withdrawal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawalCompletion {
    pub pod: EthAddress,
    pub operator: EthAddress,
    pub amount_sats: u64,
}

/// Operator script verified against the claimed address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressVerification {
    pub operator: EthAddress,
    pub btc_address: String,
    pub threshold: u8,
    pub key_count: usize,
}

/// What a successful call hands back to be committed and announced
struct Outcome<T> {
    value: T,
    mutations: Vec<PodMutation>,
    event: CustodyEvent,
}

/// Custody orchestrator
pub struct CustodyService {
    /// Bech32 prefix of the configured network
    hrp: Hrp,

    /// Expected pod script shape
    template: MultisigTemplate,

    /// Pod registry
    pod_manager: Arc<dyn PodManager>,

    /// Event destination
    events: Arc<dyn EventSink>,

    /// Payload digest strategy
    hasher: Arc<dyn MessageHasher>,

    /// Held for the whole of each call
    execution_lock: Mutex<()>,
}

impl CustodyService {
    /// Create a service for a validated configuration
    pub fn new(
        config: &CustodyConfig,
        pod_manager: Arc<dyn PodManager>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            hrp: config.hrp()?,
            template: config.multisig_template()?,
            pod_manager,
            events,
            hasher: Arc::new(EthSignedMessageHasher),
            execution_lock: Mutex::new(()),
        })
    }

    /// Replace the payload digest strategy
    pub fn with_hasher(mut self, hasher: Arc<dyn MessageHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn hrp(&self) -> &Hrp {
        &self.hrp
    }

    pub fn template(&self) -> MultisigTemplate {
        self.template
    }

    /// Confirm the pod's pending deposit and credit its balance
    pub fn confirm_deposit(
        &self,
        caller: &EthAddress,
        pod: &EthAddress,
        signature: &[u8],
    ) -> Result<DepositConfirmation> {
        self.execute("confirm_deposit", pod, |correlation_id| {
            let operator = self.require_operator(caller, pod)?;

            let deposit = self
                .pod_manager
                .deposit_request(pod)?
                .filter(|deposit| deposit.is_pending())
                .ok_or(CustodyError::RequestNotPending {
                    kind: "deposit",
                    pod: *pod,
                })?;

            let payload = CanonicalPayload::DepositConfirm {
                pod: *pod,
                operator,
                amount_sats: deposit.amount_sats,
                transaction_id: &deposit.transaction_id,
            };
            self.check_signature(&payload, signature, &operator, correlation_id)?;

            Ok(Outcome {
                value: DepositConfirmation {
                    pod: *pod,
                    operator,
                    amount_sats: deposit.amount_sats,
                    transaction_id: deposit.transaction_id,
                },
                mutations: vec![
                    PodMutation::SetBalance(deposit.amount_sats),
                    PodMutation::ConfirmDeposit,
                ],
                event: CustodyEvent::BitcoinDepositConfirmed {
                    pod: *pod,
                    operator,
                    amount_sats: deposit.amount_sats,
                },
            })
        })
    }

    /// Approve a pending withdrawal with a PSBT paying the withdrawal address
    pub fn withdraw_bitcoin_psbt(
        &self,
        caller: &EthAddress,
        pod: &EthAddress,
        amount_sats: u64,
        psbt: &[u8],
        signature: &[u8],
    ) -> Result<WithdrawalApproval> {
        self.execute("withdraw_bitcoin_psbt", pod, |correlation_id| {
            let operator = self.require_operator(caller, pod)?;
            let withdrawal =
                self.withdrawal_matching(pod, amount_sats, WithdrawalRequest::is_pending)?;

            let payload = CanonicalPayload::PsbtWithdrawal {
                pod: *pod,
                amount_sats,
                psbt,
                withdraw_address: &withdrawal.withdraw_address,
            };
            self.check_signature(&payload, signature, &operator, correlation_id)?;

            let decoded = DecodedPsbt::parse(psbt)?;
            let vout = require_payment(
                decoded.check_payment(&withdrawal.withdraw_address, amount_sats, &self.hrp),
                &withdrawal.withdraw_address,
                amount_sats,
            )?;

            Ok(Outcome {
                value: WithdrawalApproval {
                    pod: *pod,
                    operator,
                    amount_sats,
                    withdraw_address: withdrawal.withdraw_address,
                    vout,
                },
                mutations: vec![PodMutation::RecordSignedPsbt(psbt.to_vec())],
                event: CustodyEvent::BitcoinWithdrawalTransactionSigned {
                    pod: *pod,
                    operator,
                    amount_sats,
                },
            })
        })
    }

    /// Approve a withdrawal with the fully-formed transaction
    pub fn withdraw_bitcoin_complete_tx(
        &self,
        caller: &EthAddress,
        pod: &EthAddress,
        amount_sats: u64,
        transaction: &[u8],
        signature: &[u8],
    ) -> Result<WithdrawalApproval> {
        self.execute("withdraw_bitcoin_complete_tx", pod, |correlation_id| {
            if transaction.is_empty() {
                return Err(TransactionError::Empty.into());
            }

            let operator = self.require_operator(caller, pod)?;
            let withdrawal =
                self.withdrawal_matching(pod, amount_sats, WithdrawalRequest::accepts_signing)?;

            let payload = CanonicalPayload::CompleteTxWithdrawal {
                pod: *pod,
                amount_sats,
                transaction,
                withdraw_address: &withdrawal.withdraw_address,
            };
            self.check_signature(&payload, signature, &operator, correlation_id)?;

            let tx = decode_transaction(transaction)?;
            if let WithdrawalStatus::PsbtSigned { psbt } = &withdrawal.status {
                if !DecodedPsbt::parse(psbt)?.matches_transaction(&tx) {
                    return Err(TransactionError::PsbtMismatch.into());
                }
            }

            let vout = require_payment(
                check_transaction_payment(
                    &tx,
                    &withdrawal.withdraw_address,
                    amount_sats,
                    &self.hrp,
                ),
                &withdrawal.withdraw_address,
                amount_sats,
            )?;

            Ok(Outcome {
                value: WithdrawalApproval {
                    pod: *pod,
                    operator,
                    amount_sats,
                    withdraw_address: withdrawal.withdraw_address,
                    vout,
                },
                mutations: vec![PodMutation::RecordCompleteTransaction(transaction.to_vec())],
                event: CustodyEvent::BitcoinWithdrawalTransactionSigned {
                    pod: *pod,
                    operator,
                    amount_sats,
                },
            })
        })
    }

    /// Finalize a withdrawal whose transaction was submitted, zeroing the pod
    pub fn confirm_withdrawal(
        &self,
        caller: &EthAddress,
        pod: &EthAddress,
        transaction: &[u8],
        signature: &[u8],
    ) -> Result<WithdrawalCompletion> {
        self.execute("confirm_withdrawal", pod, |correlation_id| {
            if transaction.is_empty() {
                return Err(TransactionError::Empty.into());
            }

            let operator = self.require_operator(caller, pod)?;

            let withdrawal = self
                .pod_manager
                .withdrawal_request(pod)?
                .filter(|w| w.submitted_transaction() == Some(transaction))
                .ok_or(CustodyError::RequestNotPending {
                    kind: "withdrawal",
                    pod: *pod,
                })?;

            let payload = CanonicalPayload::WithdrawalConfirm {
                pod: *pod,
                transaction,
                withdraw_address: &withdrawal.withdraw_address,
            };
            self.check_signature(&payload, signature, &operator, correlation_id)?;

            Ok(Outcome {
                value: WithdrawalCompletion {
                    pod: *pod,
                    operator,
                    amount_sats: withdrawal.amount_sats,
                },
                mutations: vec![PodMutation::SetBalance(0), PodMutation::CompleteWithdrawal],
                event: CustodyEvent::BitcoinWithdrawalConfirmed {
                    pod: *pod,
                    operator,
                    amount_sats: withdrawal.amount_sats,
                },
            })
        })
    }

    /// Verify the operator's multisig script hashes to the claimed address
    pub fn verify_btc_address(
        &self,
        caller: &EthAddress,
        pod: &EthAddress,
        script: &[u8],
        btc_address: &str,
        signature: &[u8],
    ) -> Result<AddressVerification> {
        self.execute("verify_btc_address", pod, |correlation_id| {
            let operator = self.require_operator(caller, pod)?;

            let payload = CanonicalPayload::AddressVerify {
                pod: *pod,
                operator,
                script,
                btc_address,
            };
            self.check_signature(&payload, signature, &operator, correlation_id)?;

            let parsed = self.template.parse(script)?;

            let operator_key = self
                .pod_manager
                .operator_btc_public_key(&operator)?
                .ok_or(CustodyError::OperatorKeyNotInScript(operator))?;
            if !parsed.contains_key(&operator_key) {
                return Err(CustodyError::OperatorKeyNotInScript(operator));
            }

            let derived = witness_script_address(script, &self.hrp)?;
            let claimed = decode_bech32_address(btc_address.trim(), &self.hrp).ok();
            if claimed.as_ref() != Some(&get_script_pub_key(script)) {
                return Err(CustodyError::AddressMismatch {
                    derived,
                    claimed: btc_address.to_string(),
                });
            }

            Ok(Outcome {
                value: AddressVerification {
                    operator,
                    btc_address: derived.clone(),
                    threshold: parsed.threshold(),
                    key_count: parsed.keys().len(),
                },
                mutations: Vec::new(),
                event: CustodyEvent::BtcAddressVerified {
                    operator,
                    btc_address: derived,
                },
            })
        })
    }

    /// Serialize the call, then commit and announce its outcome
    fn execute<T>(
        &self,
        operation: &'static str,
        pod: &EthAddress,
        call: impl FnOnce(&str) -> Result<Outcome<T>>,
    ) -> Result<T> {
        // a panic in an earlier call leaves no partial state behind
        let _guard = self
            .execution_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let correlation_id = generate_correlation_id();
        let span = tracing::info_span!(
            target: "bitdsm::custody",
            "custody_call",
            operation,
            pod = %pod,
            correlation_id = %correlation_id,
        );
        let _entered = span.enter();

        let result = call(&correlation_id).and_then(|outcome| {
            if !outcome.mutations.is_empty() {
                self.pod_manager.commit(pod, &outcome.mutations)?;
            }
            Ok(outcome)
        });

        match result {
            Ok(outcome) => {
                tracing::info!(
                    target: "bitdsm::custody",
                    event = outcome.event.name(),
                    mutations = outcome.mutations.len(),
                    "custody call succeeded"
                );
                log_custody_event(&outcome.event, Some(&correlation_id));
                self.events.emit(outcome.event);
                Ok(outcome.value)
            }
            Err(err) => {
                if err.is_authorization_failure() {
                    log_security_event(
                        operation,
                        false,
                        serde_json::json!({ "pod": pod.to_string(), "error": err.to_string() }),
                        Some(&correlation_id),
                    );
                }
                log_custody_failure(operation, err.error_code(), &err.to_string(), &correlation_id);
                Err(err)
            }
        }
    }

    /// The pod's operator, who must also be the caller
    fn require_operator(&self, caller: &EthAddress, pod: &EthAddress) -> Result<EthAddress> {
        let operator = self
            .pod_manager
            .operator_for_pod(pod)?
            .ok_or(CustodyError::PodNotFound(*pod))?;

        if *caller != operator {
            return Err(CustodyError::UnauthorizedOperator {
                caller: *caller,
                pod: *pod,
            });
        }
        Ok(operator)
    }

    /// Withdrawal in an accepted state whose amount equals `amount_sats`
    fn withdrawal_matching(
        &self,
        pod: &EthAddress,
        amount_sats: u64,
        accepted: fn(&WithdrawalRequest) -> bool,
    ) -> Result<WithdrawalRequest> {
        let withdrawal = self
            .pod_manager
            .withdrawal_request(pod)?
            .filter(accepted)
            .ok_or(CustodyError::RequestNotPending {
                kind: "withdrawal",
                pod: *pod,
            })?;

        if withdrawal.amount_sats != amount_sats {
            return Err(CustodyError::AmountMismatch {
                expected: withdrawal.amount_sats,
                actual: amount_sats,
            });
        }
        Ok(withdrawal)
    }

    fn check_signature(
        &self,
        payload: &CanonicalPayload<'_>,
        signature: &[u8],
        operator: &EthAddress,
        correlation_id: &str,
    ) -> Result<()> {
        authorize_with(self.hasher.as_ref(), &payload.encode(), signature, operator)?;

        log_security_event(
            payload.operation(),
            true,
            serde_json::json!({ "operator": operator.to_string() }),
            Some(correlation_id),
        );
        Ok(())
    }
}

fn require_payment(check: PaymentCheck, address: &str, expected: u64) -> Result<usize> {
    match check {
        PaymentCheck::Paid { vout } => Ok(vout),
        PaymentCheck::AmountMismatch { actual, .. } => {
            Err(CustodyError::AmountMismatch { expected, actual })
        }
        PaymentCheck::AddressNotFound => Err(CustodyError::OutputNotFound {
            address: address.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::OperatorKey;
    use crate::storage::{MockEventSink, MockPodManager};
    use crate::types::DepositRequest;

    const POD: EthAddress = EthAddress::new([0x0a; 20]);

    fn service(manager: MockPodManager, events: MockEventSink) -> CustodyService {
        CustodyService::new(
            &CustodyConfig::default(),
            Arc::new(manager),
            Arc::new(events),
        )
        .unwrap()
    }

    fn deposit_signature(key: &OperatorKey, request: &DepositRequest) -> [u8; 65] {
        key.sign_payload(
            &CanonicalPayload::DepositConfirm {
                pod: POD,
                operator: key.address(),
                amount_sats: request.amount_sats,
                transaction_id: &request.transaction_id,
            }
            .encode(),
        )
    }

    #[test]
    fn test_confirm_deposit_commits_once_and_emits_once() {
        let key = OperatorKey::generate();
        let operator = key.address();
        let request = DepositRequest::new([4u8; 32], 25_000);
        let signature = deposit_signature(&key, &request);

        let mut manager = MockPodManager::new();
        manager
            .expect_operator_for_pod()
            .returning(move |_| Ok(Some(operator)));
        let pending = request.clone();
        manager
            .expect_deposit_request()
            .returning(move |_| Ok(Some(pending.clone())));
        manager
            .expect_commit()
            .withf(|pod, mutations| {
                *pod == POD
                    && mutations.to_vec()
                        == vec![PodMutation::SetBalance(25_000), PodMutation::ConfirmDeposit]
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let mut events = MockEventSink::new();
        events
            .expect_emit()
            .withf(move |event| {
                *event
                    == CustodyEvent::BitcoinDepositConfirmed {
                        pod: POD,
                        operator,
                        amount_sats: 25_000,
                    }
            })
            .times(1)
            .return_const(());

        let confirmation = service(manager, events)
            .confirm_deposit(&operator, &POD, &signature)
            .unwrap();
        assert_eq!(confirmation.amount_sats, 25_000);
    }

    #[test]
    fn test_bad_signature_never_commits() {
        let key = OperatorKey::generate();
        let operator = key.address();
        let request = DepositRequest::new([4u8; 32], 25_000);

        let mut tampered = request.clone();
        tampered.amount_sats += 1;
        let signature = deposit_signature(&key, &tampered);

        let mut manager = MockPodManager::new();
        manager
            .expect_operator_for_pod()
            .returning(move |_| Ok(Some(operator)));
        manager
            .expect_deposit_request()
            .returning(move |_| Ok(Some(request.clone())));
        manager.expect_commit().never();

        let mut events = MockEventSink::new();
        events.expect_emit().never();

        let err = service(manager, events)
            .confirm_deposit(&operator, &POD, &signature)
            .unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHORIZED_SIGNER");
    }

    #[test]
    fn test_commit_failure_emits_nothing() {
        let key = OperatorKey::generate();
        let operator = key.address();
        let request = DepositRequest::new([4u8; 32], 1);
        let signature = deposit_signature(&key, &request);

        let mut manager = MockPodManager::new();
        manager
            .expect_operator_for_pod()
            .returning(move |_| Ok(Some(operator)));
        manager
            .expect_deposit_request()
            .returning(move |_| Ok(Some(request.clone())));
        manager.expect_commit().times(1).returning(|_, _| {
            Err(crate::storage::StorageError::InvalidTransition(
                "raced".to_string(),
            ))
        });

        let mut events = MockEventSink::new();
        events.expect_emit().never();

        let err = service(manager, events)
            .confirm_deposit(&operator, &POD, &signature)
            .unwrap_err();
        assert_eq!(err.error_code(), "STORAGE_ERROR");
    }

    #[test]
    fn test_unknown_pod() {
        let mut manager = MockPodManager::new();
        manager.expect_operator_for_pod().returning(|_| Ok(None));
        manager.expect_commit().never();

        let mut events = MockEventSink::new();
        events.expect_emit().never();

        let err = service(manager, events)
            .confirm_deposit(&EthAddress::new([1; 20]), &POD, &[0u8; 65])
            .unwrap_err();
        assert!(matches!(err, CustodyError::PodNotFound(pod) if pod == POD));
    }

    #[test]
    fn test_empty_transaction_rejected_before_lookup() {
        let mut manager = MockPodManager::new();
        manager.expect_operator_for_pod().never();

        let svc = service(manager, MockEventSink::new());
        let caller = EthAddress::new([1; 20]);

        assert!(matches!(
            svc.confirm_withdrawal(&caller, &POD, &[], &[0u8; 65]),
            Err(CustodyError::InvalidTransaction(TransactionError::Empty))
        ));
        assert!(matches!(
            svc.withdraw_bitcoin_complete_tx(&caller, &POD, 1, &[], &[0u8; 65]),
            Err(CustodyError::InvalidTransaction(TransactionError::Empty))
        ));
    }

    #[test]
    fn test_payment_mapping() {
        assert_eq!(require_payment(PaymentCheck::Paid { vout: 2 }, "a", 5).unwrap(), 2);
        assert!(matches!(
            require_payment(PaymentCheck::AmountMismatch { vout: 0, actual: 4 }, "a", 5),
            Err(CustodyError::AmountMismatch {
                expected: 5,
                actual: 4
            })
        ));
        assert!(matches!(
            require_payment(PaymentCheck::AddressNotFound, "a", 5),
            Err(CustodyError::OutputNotFound { .. })
        ));
    }
}

//! Pending custodian payments.
//!
//! Period pay is not transferred directly; each period appends (or tops up)
//! a pending payment per custodian, and the custodian claims it later. The
//! queue only produces `Transfer` values; the token ledger executing them
//! lives outside the engine.

use crate::error::CustodianError;
use dac_types::{MemberName, TokenAmount};
use serde::{Deserialize, Serialize};

/// A payment waiting to be claimed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPayment {
    pub id: u64,
    pub receiver: MemberName,
    pub amount: TokenAmount,
}

/// A token movement for the external ledger to execute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: MemberName,
    pub to: MemberName,
    pub amount: TokenAmount,
    pub memo: String,
}

/// Per-community queue of unclaimed custodian payments.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PayoutQueue {
    payments: Vec<PendingPayment>,
    next_id: u64,
}

impl PayoutQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payments(&self) -> &[PendingPayment] {
        &self.payments
    }

    pub fn pending_for(&self, receiver: &MemberName) -> Option<&PendingPayment> {
        self.payments.iter().find(|p| &p.receiver == receiver)
    }

    /// Queue `amount` for `receiver`. An existing pending payment for the
    /// same receiver accumulates instead of creating a second record.
    pub fn accumulate(
        &mut self,
        receiver: &MemberName,
        amount: TokenAmount,
    ) -> Result<(), CustodianError> {
        if amount.is_zero() {
            return Ok(());
        }
        match self.payments.iter_mut().find(|p| &p.receiver == receiver) {
            Some(existing) => {
                existing.amount = existing
                    .amount
                    .checked_add(amount)
                    .ok_or(CustodianError::Overflow("pending payment amount"))?;
            }
            None => {
                self.payments.push(PendingPayment {
                    id: self.next_id,
                    receiver: receiver.clone(),
                    amount,
                });
                self.next_id += 1;
            }
        }
        tracing::debug!(%receiver, %amount, "payment queued");
        Ok(())
    }

    /// Claim a payment. Only the receiver may claim; the record is removed
    /// and the resulting transfer returned for execution.
    pub fn claim(
        &mut self,
        id: u64,
        caller: &MemberName,
        pay_source: &MemberName,
    ) -> Result<Transfer, CustodianError> {
        let idx = self
            .payments
            .iter()
            .position(|p| p.id == id)
            .ok_or(CustodianError::PaymentNotFound(id))?;
        if &self.payments[idx].receiver != caller {
            return Err(CustodianError::NotPaymentReceiver(id));
        }
        let payment = self.payments.remove(idx);
        tracing::info!(id, receiver = %payment.receiver, amount = %payment.amount, "payment claimed");
        Ok(Transfer {
            from: pay_source.clone(),
            to: payment.receiver,
            amount: payment.amount,
            memo: "custodian pay".to_string(),
        })
    }

    /// Administratively drop a payment without paying it out.
    pub fn remove(&mut self, id: u64) -> Result<PendingPayment, CustodianError> {
        let idx = self
            .payments
            .iter()
            .position(|p| p.id == id)
            .ok_or(CustodianError::PaymentNotFound(id))?;
        let payment = self.payments.remove(idx);
        tracing::info!(id, receiver = %payment.receiver, "payment removed");
        Ok(payment)
    }

    /// Receiver-side refusal of a payment. Same effect as removal but only
    /// the receiver may do it.
    pub fn reject(&mut self, id: u64, caller: &MemberName) -> Result<PendingPayment, CustodianError> {
        let idx = self
            .payments
            .iter()
            .position(|p| p.id == id)
            .ok_or(CustodianError::PaymentNotFound(id))?;
        if &self.payments[idx].receiver != caller {
            return Err(CustodianError::NotPaymentReceiver(id));
        }
        let payment = self.payments.remove(idx);
        tracing::info!(id, receiver = %payment.receiver, "payment rejected");
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str) -> MemberName {
        MemberName::new(name)
    }

    #[test]
    fn test_accumulate_tops_up_existing_payment() {
        let mut queue = PayoutQueue::new();
        queue.accumulate(&member("cust1"), TokenAmount::new(100)).unwrap();
        queue.accumulate(&member("cust2"), TokenAmount::new(200)).unwrap();
        queue.accumulate(&member("cust1"), TokenAmount::new(50)).unwrap();

        assert_eq!(queue.payments().len(), 2);
        assert_eq!(
            queue.pending_for(&member("cust1")).unwrap().amount,
            TokenAmount::new(150)
        );
        // Topping up keeps the original id.
        assert_eq!(queue.pending_for(&member("cust1")).unwrap().id, 0);
        assert_eq!(queue.pending_for(&member("cust2")).unwrap().id, 1);
    }

    #[test]
    fn test_zero_amount_is_not_queued() {
        let mut queue = PayoutQueue::new();
        queue.accumulate(&member("cust1"), TokenAmount::ZERO).unwrap();
        assert!(queue.payments().is_empty());
    }

    #[test]
    fn test_claim_removes_record_and_builds_transfer() {
        let mut queue = PayoutQueue::new();
        queue.accumulate(&member("cust1"), TokenAmount::new(175_000)).unwrap();

        let transfer = queue.claim(0, &member("cust1"), &member("treasury")).unwrap();
        assert_eq!(transfer.from, member("treasury"));
        assert_eq!(transfer.to, member("cust1"));
        assert_eq!(transfer.amount, TokenAmount::new(175_000));
        assert!(queue.payments().is_empty());

        assert!(matches!(
            queue.claim(0, &member("cust1"), &member("treasury")),
            Err(CustodianError::PaymentNotFound(0))
        ));
    }

    #[test]
    fn test_only_receiver_may_claim_or_reject() {
        let mut queue = PayoutQueue::new();
        queue.accumulate(&member("cust1"), TokenAmount::new(100)).unwrap();

        assert!(matches!(
            queue.claim(0, &member("intruder"), &member("treasury")),
            Err(CustodianError::NotPaymentReceiver(0))
        ));
        assert!(matches!(
            queue.reject(0, &member("intruder")),
            Err(CustodianError::NotPaymentReceiver(0))
        ));

        let rejected = queue.reject(0, &member("cust1")).unwrap();
        assert_eq!(rejected.amount, TokenAmount::new(100));
        assert!(queue.payments().is_empty());
    }

    #[test]
    fn test_ids_keep_increasing_after_removal() {
        let mut queue = PayoutQueue::new();
        queue.accumulate(&member("a"), TokenAmount::new(1)).unwrap();
        queue.remove(0).unwrap();
        queue.accumulate(&member("b"), TokenAmount::new(1)).unwrap();
        assert_eq!(queue.pending_for(&member("b")).unwrap().id, 1);
    }
}

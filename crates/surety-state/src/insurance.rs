//! # Insurance Pool
//!
//! Passenger policies, payout crediting and withdrawable balances.
//!
//! A passenger may hold several policies on the same flight as long as the
//! total premium stays within the purchase cap. When a flight resolves to
//! `LateAirline` every unclaimed policy on it is credited at the payout ratio
//! and marked claimed; any other status leaves the policies untouched.
//!
//! Withdrawal is split in two so the balance is zeroed before any external
//! transfer runs: [`InsurancePool::debit_balance`] inside one ledger
//! transaction, then the transfer, then either a commit of the `Withdrawn`
//! event or [`InsurancePool::restore_balance`] on failure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use surety_core::{
    AccountId, Amount, FlightKey, FlightStatus, PolicyId, ProtocolEvent, ProtocolParams,
    SuretyError,
};

use crate::flight::FlightRegistry;

/// A passenger's insurance policy on one flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub passenger: AccountId,
    pub key: FlightKey,
    /// Premium paid.
    pub premium: Amount,
    /// Credited payout, set when the policy is claimed.
    pub payout: Option<Amount>,
    pub claimed: bool,
    /// Ledger height of the purchase.
    pub purchased_at: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsurancePool {
    policies: Vec<Policy>,
    balances: BTreeMap<AccountId, Amount>,
    premiums_collected: Amount,
    payouts_credited: Amount,
}

impl InsurancePool {
    /// Buy a policy on a registered flight.
    pub fn purchase(
        &mut self,
        params: &ProtocolParams,
        flights: &FlightRegistry,
        passenger: &AccountId,
        key: &FlightKey,
        amount: Amount,
        height: u64,
        events: &mut Vec<ProtocolEvent>,
    ) -> Result<PolicyId, SuretyError> {
        flights.ensure_exists(key)?;
        if amount.is_zero() {
            return Err(SuretyError::InvalidAmount(
                "premium must be greater than zero".into(),
            ));
        }
        let held = self
            .policies
            .iter()
            .filter(|p| &p.passenger == passenger && &p.key == key)
            .fold(Amount::ZERO, |acc, p| acc.saturating_add(p.premium));
        let total = held.saturating_add(amount);
        if total > params.purchase_cap {
            return Err(SuretyError::CapExceeded {
                requested: total.to_string(),
                cap: params.purchase_cap.to_string(),
            });
        }

        let id = PolicyId::new();
        self.policies.push(Policy {
            id,
            passenger: passenger.clone(),
            key: key.clone(),
            premium: amount,
            payout: None,
            claimed: false,
            purchased_at: height,
        });
        self.premiums_collected = self.premiums_collected.saturating_add(amount);
        events.push(ProtocolEvent::InsurancePurchased {
            passenger: passenger.clone(),
            key: key.clone(),
            policy: id,
            amount,
        });
        Ok(id)
    }

    /// Credit every unclaimed policy on `key` if `status` pays out.
    ///
    /// Returns the total credited.
    pub fn credit_payout(
        &mut self,
        params: &ProtocolParams,
        key: &FlightKey,
        status: FlightStatus,
        events: &mut Vec<ProtocolEvent>,
    ) -> Result<Amount, SuretyError> {
        if !status.triggers_payout() {
            return Ok(Amount::ZERO);
        }
        let mut total = Amount::ZERO;
        for policy in self
            .policies
            .iter_mut()
            .filter(|p| &p.key == key && !p.claimed)
        {
            let payout = params.payout_ratio.apply(policy.premium).ok_or_else(|| {
                SuretyError::InvalidAmount(format!("payout on {} overflows", policy.premium))
            })?;
            policy.payout = Some(payout);
            policy.claimed = true;
            let balance = self.balances.entry(policy.passenger.clone()).or_default();
            *balance = balance.saturating_add(payout);
            total = total.saturating_add(payout);
            events.push(ProtocolEvent::PayoutCredited {
                passenger: policy.passenger.clone(),
                policy: policy.id,
                amount: payout,
            });
        }
        self.payouts_credited = self.payouts_credited.saturating_add(total);
        Ok(total)
    }

    /// Zero the passenger's balance and return what it held.
    pub fn debit_balance(&mut self, passenger: &AccountId) -> Result<Amount, SuretyError> {
        match self.balances.remove(passenger) {
            Some(amount) if !amount.is_zero() => Ok(amount),
            _ => Err(SuretyError::InsufficientFunds(format!(
                "{passenger} has no credited balance"
            ))),
        }
    }

    /// Put back a debited amount after a failed transfer.
    pub fn restore_balance(&mut self, passenger: &AccountId, amount: Amount) {
        let balance = self.balances.entry(passenger.clone()).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Withdrawable balance of a passenger.
    pub fn balance(&self, passenger: &AccountId) -> Amount {
        self.balances.get(passenger).copied().unwrap_or_default()
    }

    /// Policies held by a passenger.
    pub fn policies_of<'a>(&'a self, passenger: &'a AccountId) -> impl Iterator<Item = &'a Policy> {
        self.policies.iter().filter(move |p| &p.passenger == passenger)
    }

    /// Policies written on a flight.
    pub fn policies_for<'a>(&'a self, key: &'a FlightKey) -> impl Iterator<Item = &'a Policy> {
        self.policies.iter().filter(move |p| &p.key == key)
    }

    pub fn policy_count(&self) -> usize {
        self.policies.len()
    }

    pub fn premiums_collected(&self) -> Amount {
        self.premiums_collected
    }

    pub fn payouts_credited(&self) -> Amount {
        self.payouts_credited
    }
}

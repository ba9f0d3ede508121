//! # Protocol Parameters
//!
//! Tunable constants of the governance and consensus rules. The defaults
//! reproduce the deployed protocol: 10 units to fund an airline, 1 unit to
//! register an oracle, policies capped at 1 unit, payouts at 1.5× the
//! premium, three matching reports to finalize a round, and multiparty
//! voting from the fifth airline onward.
//!
//! Parameters load from YAML (see `surety-api` bootstrap) and are validated
//! once at startup with [`ProtocolParams::validate`].

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::error::ParamsError;

/// Payout as a ratio of the premium paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRatio {
    pub numerator: u32,
    pub denominator: u32,
}

impl PayoutRatio {
    /// Apply the ratio to a premium. `None` on overflow.
    pub fn apply(&self, premium: Amount) -> Option<Amount> {
        premium.checked_mul_ratio(self.numerator, self.denominator)
    }
}

/// Governance and consensus parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolParams {
    /// Minimum contribution that makes an airline funded.
    pub min_airline_funding: Amount,
    /// Fee an oracle pays to register.
    pub oracle_registration_fee: Amount,
    /// Maximum total premium a passenger may hold on one flight.
    pub purchase_cap: Amount,
    /// Payout owed on a policy when its flight resolves to `LateAirline`.
    pub payout_ratio: PayoutRatio,
    /// Matching oracle reports required to finalize a round.
    pub agreement_threshold: usize,
    /// Number of airlines admitted without a vote (the owner included).
    pub multiparty_threshold: usize,
    /// Votes required are `ceil(registered / vote_divisor)`.
    pub vote_divisor: usize,
    /// Whether voters must also be funded.
    pub require_funded_voter: bool,
    /// Distinct indexes assigned to every oracle.
    pub indexes_per_oracle: u8,
    /// Indexes are drawn from `0..index_range`.
    pub index_range: u8,
    /// When set, an open round older than this many ledger operations is
    /// replaced by the next status request for the same flight.
    pub stale_round_after: Option<u64>,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            min_airline_funding: Amount::units(10),
            oracle_registration_fee: Amount::units(1),
            purchase_cap: Amount::units(1),
            payout_ratio: PayoutRatio {
                numerator: 3,
                denominator: 2,
            },
            agreement_threshold: 3,
            multiparty_threshold: 4,
            vote_divisor: 2,
            require_funded_voter: false,
            indexes_per_oracle: 3,
            index_range: 10,
            stale_round_after: None,
        }
    }
}

impl ProtocolParams {
    /// Check the parameters are internally consistent.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.agreement_threshold == 0 {
            return Err(ParamsError::Zero("agreement_threshold"));
        }
        if self.multiparty_threshold == 0 {
            return Err(ParamsError::Zero("multiparty_threshold"));
        }
        if self.vote_divisor == 0 {
            return Err(ParamsError::Zero("vote_divisor"));
        }
        if self.indexes_per_oracle == 0 {
            return Err(ParamsError::Zero("indexes_per_oracle"));
        }
        if self.purchase_cap.is_zero() {
            return Err(ParamsError::Zero("purchase_cap"));
        }
        if self.payout_ratio.denominator == 0 {
            return Err(ParamsError::Zero("payout_ratio.denominator"));
        }
        if self.index_range < self.indexes_per_oracle {
            return Err(ParamsError::IndexRangeTooSmall {
                range: self.index_range,
                per_oracle: self.indexes_per_oracle,
            });
        }
        if self.payout_ratio.numerator < self.payout_ratio.denominator {
            return Err(ParamsError::PayoutBelowPremium {
                numerator: self.payout_ratio.numerator,
                denominator: self.payout_ratio.denominator,
            });
        }
        Ok(())
    }

    /// Approving votes a pending candidate needs with `registered` airlines.
    pub fn required_votes(&self, registered: usize) -> usize {
        registered.div_ceil(self.vote_divisor.max(1))
    }

    /// Whether the next admission can skip the vote.
    pub fn admits_directly(&self, registered: usize) -> bool {
        registered < self.multiparty_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        ProtocolParams::default().validate().unwrap();
    }

    #[test]
    fn required_votes_is_ceiling_of_half() {
        let p = ProtocolParams::default();
        assert_eq!(p.required_votes(4), 2);
        assert_eq!(p.required_votes(5), 3);
        assert_eq!(p.required_votes(6), 3);
        assert_eq!(p.required_votes(7), 4);
    }

    #[test]
    fn fifth_admission_needs_votes() {
        let p = ProtocolParams::default();
        assert!(p.admits_directly(3));
        assert!(!p.admits_directly(4));
    }

    #[test]
    fn payout_ratio_applies_one_and_a_half() {
        let p = ProtocolParams::default();
        assert_eq!(
            p.payout_ratio.apply(Amount::fraction(1, 2)),
            Some(Amount::fraction(3, 4))
        );
    }

    #[test]
    fn validate_rejects_inconsistent_values() {
        let p = ProtocolParams {
            index_range: 2,
            ..ProtocolParams::default()
        };
        assert_eq!(
            p.validate(),
            Err(ParamsError::IndexRangeTooSmall {
                range: 2,
                per_oracle: 3
            })
        );
        let p = ProtocolParams {
            agreement_threshold: 0,
            ..ProtocolParams::default()
        };
        assert_eq!(p.validate(), Err(ParamsError::Zero("agreement_threshold")));
        let p = ProtocolParams {
            payout_ratio: PayoutRatio {
                numerator: 1,
                denominator: 2,
            },
            ..ProtocolParams::default()
        };
        assert!(matches!(
            p.validate(),
            Err(ParamsError::PayoutBelowPremium { .. })
        ));
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let yaml = "agreement_threshold: 5\npurchase_cap: \"2\"\nstale_round_after: 100\n";
        let p: ProtocolParams = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(p.agreement_threshold, 5);
        assert_eq!(p.purchase_cap, Amount::units(2));
        assert_eq!(p.stale_round_after, Some(100));
        assert_eq!(p.min_airline_funding, Amount::units(10));
    }

    #[test]
    fn unknown_yaml_fields_are_rejected() {
        assert!(serde_yaml::from_str::<ProtocolParams>("quorum: 3\n").is_err());
    }
}

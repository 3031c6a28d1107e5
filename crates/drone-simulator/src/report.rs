//! Outcome tally for load rounds.

use std::collections::BTreeMap;
use std::fmt;

use crate::client::ClientError;

/// How a single load request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Outcome {
    Loaded,
    CapacityExceeded,
    BatteryTooLow,
    AlreadyLoading,
    /// Any other API rejection
    Rejected,
    /// Transport failure or server error
    Failed,
}

impl Outcome {
    pub fn from_result<T>(result: &Result<T, ClientError>) -> Self {
        match result {
            Ok(_) => Self::Loaded,
            Err(ClientError::Api { status, .. }) if *status >= 500 => Self::Failed,
            Err(ClientError::Api { code, .. }) => match code.as_str() {
                "WEIGHT_LIMIT_EXCEEDED" => Self::CapacityExceeded,
                "BATTERY_TOO_LOW" => Self::BatteryTooLow,
                "ALREADY_LOADING" => Self::AlreadyLoading,
                _ => Self::Rejected,
            },
            Err(ClientError::Http(_)) => Self::Failed,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::CapacityExceeded => "capacity_exceeded",
            Self::BatteryTooLow => "battery_too_low",
            Self::AlreadyLoading => "already_loading",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    counts: BTreeMap<Outcome, usize>,
}

impl Tally {
    pub fn record(&mut self, outcome: Outcome) {
        *self.counts.entry(outcome).or_default() += 1;
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.counts.get(&outcome).copied().unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn merge(&mut self, other: &Self) {
        for (outcome, count) in &other.counts {
            *self.counts.entry(*outcome).or_default() += count;
        }
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "total={}", self.total())?;
        for (outcome, count) in &self.counts {
            write!(f, " {}={count}", outcome.label())?;
        }
        Ok(())
    }
}

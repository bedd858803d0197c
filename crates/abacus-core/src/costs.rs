//! Operation cost registry
//!
//! Maps each operator to the simulated time a worker spends on one node of
//! that operator. The whole table is replaced at once, so a reader always sees
//! one complete generation of the four durations.

use crate::error::{CalcError, CalcResult};
use abacus_types::OperatorSymbol;
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::info;

/// Complete set of per-operator durations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperationCosts {
    #[serde(with = "millis")]
    pub plus: Duration,
    #[serde(with = "millis")]
    pub minus: Duration,
    #[serde(with = "millis")]
    pub multiply: Duration,
    #[serde(with = "millis")]
    pub divide: Duration,
}

impl OperationCosts {
    /// Same duration for every operator
    pub fn uniform(duration: Duration) -> Self {
        Self { plus: duration, minus: duration, multiply: duration, divide: duration }
    }

    /// Build from signed millisecond values, rejecting negatives
    pub fn from_millis(plus: i64, minus: i64, multiply: i64, divide: i64) -> CalcResult<Self> {
        Ok(Self {
            plus: non_negative("plus", plus)?,
            minus: non_negative("minus", minus)?,
            multiply: non_negative("multiply", multiply)?,
            divide: non_negative("divide", divide)?,
        })
    }

    /// Duration charged for one node of `operator`
    pub fn get(&self, operator: OperatorSymbol) -> Duration {
        match operator {
            OperatorSymbol::Plus => self.plus,
            OperatorSymbol::Minus => self.minus,
            OperatorSymbol::Multiply => self.multiply,
            OperatorSymbol::Divide => self.divide,
        }
    }

    /// `(operator, duration)` pairs in configuration order
    pub fn entries(&self) -> [(OperatorSymbol, Duration); 4] {
        OperatorSymbol::ALL.map(|op| (op, self.get(op)))
    }
}

fn non_negative(setting: &str, value: i64) -> CalcResult<Duration> {
    u64::try_from(value)
        .map(Duration::from_millis)
        .map_err(|_| CalcError::config(setting, format!("duration must not be negative, got {value}ms")))
}

/// Whole milliseconds, saturating at `u64::MAX`
pub(crate) fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(super::whole_millis(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Shared, synchronized holder of the current [`OperationCosts`]
#[derive(Debug, Default)]
pub struct CostRegistry {
    current: RwLock<OperationCosts>,
}

impl CostRegistry {
    pub fn new(costs: OperationCosts) -> Self {
        Self { current: RwLock::new(costs) }
    }

    /// Consistent copy of all four durations
    pub fn snapshot(&self) -> OperationCosts {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current duration for a single operator
    pub fn cost_of(&self, operator: OperatorSymbol) -> Duration {
        self.snapshot().get(operator)
    }

    /// Atomically replace the whole table
    pub fn replace(&self, costs: OperationCosts) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = costs;
        info!(
            plus_ms = whole_millis(costs.plus),
            minus_ms = whole_millis(costs.minus),
            multiply_ms = whole_millis(costs.multiply),
            divide_ms = whole_millis(costs.divide),
            "Operation costs updated"
        );
    }

    /// Validate millisecond inputs and replace the table; on error nothing changes
    pub fn set_millis(
        &self,
        plus: i64,
        minus: i64,
        multiply: i64,
        divide: i64,
    ) -> CalcResult<OperationCosts> {
        let costs = OperationCosts::from_millis(plus, minus, multiply, divide)?;
        self.replace(costs);
        Ok(costs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_set_and_get() {
        let registry = CostRegistry::default();
        assert_eq!(registry.snapshot(), OperationCosts::default());

        registry.set_millis(100, 200, 50, 25).unwrap();
        assert_eq!(registry.cost_of(OperatorSymbol::Plus), Duration::from_millis(100));
        assert_eq!(registry.cost_of(OperatorSymbol::Minus), Duration::from_millis(200));
        assert_eq!(registry.cost_of(OperatorSymbol::Multiply), Duration::from_millis(50));
        assert_eq!(registry.cost_of(OperatorSymbol::Divide), Duration::from_millis(25));
    }

    #[test]
    fn test_negative_costs_rejected() {
        let registry = CostRegistry::new(OperationCosts::uniform(Duration::from_millis(10)));

        let err = registry.set_millis(1, 2, -3, 4).unwrap_err();
        assert!(matches!(err, CalcError::ConfigValidation { ref setting, .. } if setting == "multiply"));
        assert_eq!(registry.snapshot(), OperationCosts::uniform(Duration::from_millis(10)));
    }

    #[test]
    fn test_millis_serialization() {
        let costs = OperationCosts::from_millis(1000, 0, 250, 5).unwrap();
        let json = serde_json::to_value(costs).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"plus": 1000, "minus": 0, "multiply": 250, "divide": 5})
        );
        let back: OperationCosts = serde_json::from_value(json).unwrap();
        assert_eq!(back, costs);
    }

    #[test]
    fn test_whole_millis_saturates() {
        assert_eq!(whole_millis(Duration::from_micros(2_999)), 2);
        assert_eq!(whole_millis(Duration::MAX), u64::MAX);

        let huge = OperationCosts::uniform(Duration::MAX);
        let json = serde_json::to_value(huge).unwrap();
        assert_eq!(json["plus"], u64::MAX);
        CostRegistry::default().replace(huge);
    }

    #[test]
    fn test_snapshots_never_mix_generations() {
        let registry = Arc::new(CostRegistry::new(OperationCosts::uniform(Duration::from_millis(1))));
        let writer = {
            let registry = registry.clone();
            thread::spawn(move || {
                for round in 0..2_000u64 {
                    registry.replace(OperationCosts::uniform(Duration::from_millis(round % 7 + 1)));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for _ in 0..2_000 {
                        let snapshot = registry.snapshot();
                        assert!(snapshot.entries().iter().all(|(_, d)| *d == snapshot.plus));
                    }
                })
            })
            .collect();

        writer.join().expect("writer panicked");
        for reader in readers {
            reader.join().expect("reader panicked");
        }
    }
}

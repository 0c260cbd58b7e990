use std::sync::Arc;

use crate::simplification::rules::Rule;

pub(crate) mod combination;
pub(crate) mod expansion;
pub(crate) mod powers;

/// Get all algebraic rules
pub(crate) fn get_algebraic_rules() -> Vec<Arc<dyn Rule>> {
    vec![
        // Expansion
        Arc::new(expansion::DistributeNumericRule),
        Arc::new(expansion::ExpandProductRule),
        Arc::new(expansion::ExpandPowerRule),
        // Power rules
        Arc::new(powers::PowerPowerRule),
        Arc::new(powers::PowerOfProductRule),
        // Collection
        Arc::new(combination::CombineTermsRule),
        Arc::new(combination::CombineFactorsRule),
    ]
}

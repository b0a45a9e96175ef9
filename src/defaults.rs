//! Default-policy chains
//!
//! Derived parameters that legitimately differ by hardware generation are
//! computed through [`Chain`]s: each generation's feature block pushes a
//! computation layer, and the last-pushed layer is the active
//! implementation. A layer may delegate to the previously active layer
//! through [`Lower`] to obtain a base value to adjust, or compute
//! independently — an explicit chain of responsibility rather than a
//! base-class hierarchy.
//!
//! [`DefaultsRegistry`] collects the chains for one session together with
//! the per-feature specialization flags that keep chain contributions
//! idempotent across repeated query-stage runs.

use std::collections::HashSet;
use std::rc::Rc;

use crate::caps::CapabilityDescriptor;
use crate::params::ParameterSet;
use crate::pipeline::FeatureId;

/// Shared inputs every chain layer receives
pub struct DefaultsParam<'a> {
    /// The parameter set being negotiated
    pub par: &'a ParameterSet,
    /// Hardware capability limits already present in the store
    pub caps: &'a CapabilityDescriptor,
}

type LayerFn<T> = dyn Fn(Lower<'_, T>, &DefaultsParam<'_>) -> T;

/// Handle onto the layers below the currently executing one
pub struct Lower<'a, T> {
    layers: &'a [Rc<LayerFn<T>>],
}

impl<T> Lower<'_, T> {
    /// Invoke the previously active layer, if any
    pub fn call(&self, dpar: &DefaultsParam<'_>) -> Option<T> {
        let (top, rest) = self.layers.split_last()?;
        Some(top(Lower { layers: rest }, dpar))
    }
}

/// One derived-quantity chain; the last pushed layer executes as the active
/// implementation
pub struct Chain<T> {
    layers: Vec<Rc<LayerFn<T>>>,
}

impl<T> Default for Chain<T> {
    fn default() -> Self {
        Self { layers: Vec::new() }
    }
}

impl<T> Chain<T> {
    /// Append a computation layer, making it the active implementation
    pub fn push<F>(&mut self, layer: F)
    where
        F: Fn(Lower<'_, T>, &DefaultsParam<'_>) -> T + 'static,
    {
        self.layers.push(Rc::new(layer));
    }

    /// Evaluate the active layer; `None` if no layer was ever pushed
    pub fn eval(&self, dpar: &DefaultsParam<'_>) -> Option<T> {
        let (top, rest) = self.layers.split_last()?;
        Some(top(Lower { layers: rest }, dpar))
    }

    /// Number of layers pushed so far
    pub fn depth(&self) -> usize {
        self.layers.len()
    }
}

impl<T> std::fmt::Debug for Chain<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain").field("depth", &self.depth()).finish()
    }
}

/// Session registry of default-policy chains and specialization flags
#[derive(Default, Debug)]
pub struct DefaultsRegistry {
    specialized: HashSet<FeatureId>,
    /// Active reference counts per direction (L0, L1)
    pub max_num_ref: Chain<(u16, u16)>,
}

impl DefaultsRegistry {
    /// Claim the specialization slot for `feature`
    ///
    /// Returns `true` on the first call per session and `false` afterwards;
    /// a feature whose flag is already set must skip its side-effecting body
    /// and report success trivially.
    pub fn mark_specialized(&mut self, feature: FeatureId) -> bool {
        self.specialized.insert(feature)
    }

    /// Whether `feature` already ran its specialization body
    pub fn is_specialized(&self, feature: FeatureId) -> bool {
        self.specialized.contains(&feature)
    }
}

/// Range-check `value` against `[lo, hi]`, substituting `default` when out
/// of range
///
/// Out-of-range input is corrected silently, never rejected; idempotent by
/// construction (the substituted value is always in range).
pub fn check_range_or_default(value: u16, lo: u16, hi: u16, default: u16) -> u16 {
    if value < lo || value > hi {
        default
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncoderConfig;

    fn fixture() -> (ParameterSet, CapabilityDescriptor) {
        (
            EncoderConfig::default().to_parameter_set(),
            CapabilityDescriptor {
                max_ref: [4, 2],
                ..Default::default()
            },
        )
    }

    #[test]
    fn last_pushed_layer_is_active() {
        let (par, caps) = fixture();
        let mut chain: Chain<u16> = Chain::default();
        chain.push(|_, _| 1);
        chain.push(|_, _| 2);
        assert_eq!(chain.eval(&DefaultsParam { par: &par, caps: &caps }), Some(2));
    }

    #[test]
    fn layer_may_delegate_to_previous() {
        let (par, caps) = fixture();
        let mut chain: Chain<u16> = Chain::default();
        chain.push(|_, _| 10);
        chain.push(|lower, dpar| lower.call(dpar).unwrap_or(0) + 1);
        assert_eq!(
            chain.eval(&DefaultsParam { par: &par, caps: &caps }),
            Some(11)
        );
    }

    #[test]
    fn empty_chain_evaluates_to_none() {
        let (par, caps) = fixture();
        let chain: Chain<u16> = Chain::default();
        assert_eq!(chain.eval(&DefaultsParam { par: &par, caps: &caps }), None);
    }

    #[test]
    fn specialization_flag_claims_once() {
        let mut registry = DefaultsRegistry::default();
        assert!(registry.mark_specialized(FeatureId::GEN12_CAPS));
        assert!(!registry.mark_specialized(FeatureId::GEN12_CAPS));
        assert!(registry.is_specialized(FeatureId::GEN12_CAPS));
        assert!(!registry.is_specialized(FeatureId::GEN11_CAPS));
    }

    #[test]
    fn range_check_substitutes_default() {
        assert_eq!(check_range_or_default(0, 1, 7, 4), 4);
        assert_eq!(check_range_or_default(8, 1, 7, 4), 4);
        assert_eq!(check_range_or_default(1, 1, 7, 4), 1);
        assert_eq!(check_range_or_default(7, 1, 7, 4), 7);
        // Idempotent: correcting the corrected value changes nothing.
        let once = check_range_or_default(42, 1, 7, 4);
        assert_eq!(check_range_or_default(once, 1, 7, 4), once);
    }
}

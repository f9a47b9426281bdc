//! The activation decision.
//!
//! [`resolve`] is a pure function of the resolver model, the add-on's
//! global-enable flag, its binding and the current context.

use crate::binding::ScopeBinding;

/// Which precedence rules apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolverModel {
    /// A binding restricts the add-on to its targets; no binding means
    /// active everywhere.
    #[default]
    TwoTier,
    /// Like [`TwoTier`](Self::TwoTier), but a globally enabled add-on is
    /// active regardless of its bindings.
    GlobalOverride,
}

/// Why an add-on is or is not active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No binding; active in every context.
    Unrestricted,
    /// Bound, and the current context is a target.
    Matched,
    /// Bound, and the current context is not a target.
    NotMatched,
    /// Bound, and there is no current context.
    NoContext,
    /// Globally enabled under [`ResolverModel::GlobalOverride`].
    Overridden,
}

impl Decision {
    /// Whether the add-on may run.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Unrestricted | Self::Matched | Self::Overridden)
    }
}

/// Decides whether an add-on is active.
///
/// A binding without a matching context is a hard deny; it never falls back
/// to the unrestricted default.
#[must_use]
pub fn resolve(
    model: ResolverModel,
    globally_enabled: bool,
    binding: Option<&ScopeBinding>,
    context: Option<&str>,
) -> Decision {
    if model == ResolverModel::GlobalOverride && globally_enabled {
        return Decision::Overridden;
    }
    let Some(binding) = binding else {
        return Decision::Unrestricted;
    };
    match context {
        None => Decision::NoContext,
        Some(context) if binding.allows(context) => Decision::Matched,
        Some(_) => Decision::NotMatched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bound_to(targets: &[&str]) -> ScopeBinding {
        ScopeBinding {
            targets: targets.iter().map(|t| (*t).to_owned()).collect(),
        }
    }

    #[test]
    fn unbound_is_active_everywhere() {
        let model = ResolverModel::TwoTier;
        assert_eq!(resolve(model, false, None, Some("Alice")), Decision::Unrestricted);
        assert_eq!(resolve(model, false, None, None), Decision::Unrestricted);
    }

    #[test]
    fn bound_requires_matching_context() {
        let binding = bound_to(&["Alice"]);
        let model = ResolverModel::TwoTier;
        assert_eq!(resolve(model, false, Some(&binding), Some("Alice")), Decision::Matched);
        assert_eq!(resolve(model, false, Some(&binding), Some("Bob")), Decision::NotMatched);
        assert_eq!(resolve(model, false, Some(&binding), None), Decision::NoContext);
    }

    #[test]
    fn two_tier_ignores_global_flag() {
        let binding = bound_to(&["Alice"]);
        let decision = resolve(ResolverModel::TwoTier, true, Some(&binding), Some("Bob"));
        assert_eq!(decision, Decision::NotMatched);
    }

    #[test]
    fn global_override_beats_bindings() {
        let binding = bound_to(&["Alice"]);
        let model = ResolverModel::GlobalOverride;
        assert_eq!(resolve(model, true, Some(&binding), None), Decision::Overridden);
        assert_eq!(resolve(model, false, Some(&binding), None), Decision::NoContext);
    }

    proptest! {
        /// Under the two-tier model a bound add-on is active exactly when the
        /// context is one of its targets.
        #[test]
        fn bound_activation_is_membership(
            targets in prop::collection::btree_set("[a-d]", 1..4),
            context in proptest::option::of("[a-e]"),
            globally_enabled in any::<bool>(),
        ) {
            let binding = ScopeBinding { targets };
            let decision = resolve(
                ResolverModel::TwoTier,
                globally_enabled,
                Some(&binding),
                context.as_deref(),
            );
            let expected = context.as_deref().is_some_and(|c| binding.targets.contains(c));
            prop_assert_eq!(decision.is_active(), expected);
        }

        /// The override model only ever adds activations.
        #[test]
        fn override_never_denies_more(
            targets in prop::collection::btree_set("[a-d]", 0..4),
            context in proptest::option::of("[a-e]"),
            globally_enabled in any::<bool>(),
        ) {
            let binding = (!targets.is_empty()).then_some(ScopeBinding { targets });
            let two_tier = resolve(ResolverModel::TwoTier, globally_enabled, binding.as_ref(), context.as_deref());
            let overriding = resolve(ResolverModel::GlobalOverride, globally_enabled, binding.as_ref(), context.as_deref());
            prop_assert!(!two_tier.is_active() || overriding.is_active());
        }
    }
}

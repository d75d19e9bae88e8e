use std::sync::Arc;

use pgm_graph::Graph;
use pgm_utils::ArenaKey;

use crate::conjugate;
use crate::finite::FiniteFactory;
use crate::prior_mutation::PriorMutationFactory;
use crate::sampler::NodeSampler;

/// Recognizes whether a node's local structure matches a sampler it knows how to build.
/// Factories are tried in priority order by [assign_sampler]; the first that returns
/// `Some` wins. A model with no better match always falls through to
/// [PriorMutationFactory], which never refuses.
pub trait NodeSamplerFactory: Send + Sync {
    fn name(&self) -> &'static str;

    fn try_build(&self, graph: &Graph, node: ArenaKey) -> Option<Arc<dyn NodeSampler>>;
}

/// The base module's factory priority list: every closed-form conjugate family ahead of
/// the finite/enumeration sampler, ahead of the universal prior-mutation fallback. Analytic
/// families are preferred over enumeration (cheaper, and exact rather than a sum over a
/// possibly large discrete support), which is in turn preferred over mutating blindly from
/// the prior.
pub fn base_factories() -> Vec<Arc<dyn NodeSamplerFactory>> {
    vec![
        Arc::new(conjugate::normal::NormalKnownPrecisionFactory),
        Arc::new(conjugate::mvnormal::MvNormalKnownPrecisionFactory),
        Arc::new(conjugate::beta_binomial::BetaBinomialFactory),
        Arc::new(conjugate::gamma_poisson::GammaPoissonFactory),
        Arc::new(conjugate::gamma_normal_precision::GammaNormalPrecisionFactory),
        Arc::new(FiniteFactory),
        Arc::new(PriorMutationFactory),
    ]
}

/// Tries every factory in order and returns the first match. Callers normally pass
/// [base_factories] (or that list with project-specific families prepended), whose last
/// entry always matches, so this only returns `None` for a caller-supplied list that omits
/// a fallback.
pub fn assign_sampler(
    factories: &[Arc<dyn NodeSamplerFactory>],
    graph: &Graph,
    node: ArenaKey,
) -> Option<Arc<dyn NodeSampler>> {
    for f in factories {
        if let Some(sampler) = f.try_build(graph, node) {
            return Some(sampler);
        }
        tracing::debug!(node = node.index(), factory = f.name(), "factory declined, trying next");
    }
    None
}

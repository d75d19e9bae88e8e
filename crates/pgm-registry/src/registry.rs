use std::collections::HashMap;
use std::sync::Arc;

use pgm_error::{Result, pgm_err};

use crate::distribution::Distribution;
use crate::distributions;
use crate::function::Function;
use crate::functions;

/// The process-wide distribution/function catalog, built explicitly with
/// [Registry::load_base_module] and then handed by reference to the compiler. There is no
/// hidden global: a caller that wants a different or extended catalog builds its own
/// [Registry] and registers additional entries on top of the base module.
#[derive(Default)]
pub struct Registry {
    distributions: HashMap<&'static str, Arc<dyn Distribution>>,
    functions: HashMap<&'static str, Arc<dyn Function>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the base distribution and function module.
    pub fn load_base_module() -> Self {
        let mut registry = Self::new();
        for dist in distributions::base_module() {
            registry.register_distribution(dist);
        }
        for func in functions::base_module() {
            registry.register_function(func);
        }
        registry
    }

    pub fn register_distribution(&mut self, dist: Arc<dyn Distribution>) {
        self.distributions.insert(dist.name(), dist);
    }

    pub fn register_function(&mut self, func: Arc<dyn Function>) {
        self.functions.insert(func.name(), func);
    }

    pub fn distribution(&self, name: &str) -> Option<Arc<dyn Distribution>> {
        self.distributions.get(name).cloned()
    }

    pub fn function(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.functions.get(name).cloned()
    }

    pub fn require_distribution(&self, name: &str) -> Result<Arc<dyn Distribution>> {
        self.distribution(name)
            .ok_or_else(|| pgm_err!(Unsupported: "distribution `{}` is not registered", name))
    }

    pub fn require_function(&self, name: &str) -> Result<Arc<dyn Function>> {
        self.function(name)
            .ok_or_else(|| pgm_err!(Unsupported: "function `{}` is not registered", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_module_registers_required_names() {
        let registry = Registry::load_base_module();
        for name in [
            "dnorm", "dnormvar", "dmnorm", "dmnormvar", "dbeta", "dbin", "dbern", "dcat",
            "dunif", "dexp", "dlnorm", "dchisqr", "dgamma", "dt", "dweib", "dpois", "df",
            "dmulti", "dinterval",
        ] {
            assert!(registry.distribution(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn unregistered_name_is_unsupported() {
        let registry = Registry::load_base_module();
        let err = registry.require_distribution("dnotathing").unwrap_err();
        assert_eq!(err.code(), pgm_error::ErrorCode::Unsupported);
    }

    #[test]
    fn pareto_alias_typo_is_not_replicated() {
        let registry = Registry::load_base_module();
        assert!(registry.distribution("dbinom").is_none());
    }
}

//! The ordered result of a successful composition.

use tessera_common::types::InstanceId;
use tessera_schema::instance::ModuleInstance;

use crate::resolver::Reference;

/// Fully resolved instances in application order.
///
/// Every producer appears before all of its consumers.
#[derive(Debug, Clone)]
pub struct CompositionPlan {
    steps: Vec<ModuleInstance>,
    references: Vec<Reference>,
}

impl CompositionPlan {
    pub(crate) const fn new(steps: Vec<ModuleInstance>, references: Vec<Reference>) -> Self {
        Self { steps, references }
    }

    /// Instances in application order.
    #[must_use]
    pub fn steps(&self) -> &[ModuleInstance] {
        &self.steps
    }

    /// The references that produced the ordering constraints.
    #[must_use]
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Identifiers in application order.
    pub fn order(&self) -> impl Iterator<Item = &InstanceId> {
        self.steps.iter().map(ModuleInstance::id)
    }

    /// Position of `id` in the plan.
    #[must_use]
    pub fn position(&self, id: &InstanceId) -> Option<usize> {
        self.steps.iter().position(|step| step.id() == id)
    }

    /// Looks up a resolved instance.
    #[must_use]
    pub fn get(&self, id: &InstanceId) -> Option<&ModuleInstance> {
        self.steps.iter().find(|step| step.id() == id)
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Consumes the plan, returning the ordered instances.
    #[must_use]
    pub fn into_steps(self) -> Vec<ModuleInstance> {
        self.steps
    }
}

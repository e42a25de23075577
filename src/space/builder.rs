use crate::config::SpaceConfig;
use crate::space::EventSpace;
use crate::staging::{CausalStack, PayloadStaging};

/// Builder for constructing an [`EventSpace`] with shared services.
///
/// Spaces built without an explicit store or stack get private ones.
pub struct EventSpaceBuilder {
    cfg: SpaceConfig,
    staging: Option<PayloadStaging>,
    causal: Option<CausalStack>,
}

impl EventSpaceBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SpaceConfig) -> Self {
        Self {
            cfg,
            staging: None,
            causal: None,
        }
    }

    /// Shares a payload staging store.
    ///
    /// Items staged through any space sharing the store apply to events spawned
    /// by all of them.
    pub fn with_staging(mut self, staging: PayloadStaging) -> Self {
        self.staging = Some(staging);
        self
    }

    /// Shares a causal event stack.
    ///
    /// Events spawned in one space while another space's handler runs then link
    /// to that handler's event.
    pub fn with_causal_stack(mut self, causal: CausalStack) -> Self {
        self.causal = Some(causal);
        self
    }

    /// Builds and returns the space.
    pub fn build(self) -> EventSpace {
        EventSpace::from_parts(
            self.cfg,
            self.staging.unwrap_or_default(),
            self.causal.unwrap_or_default(),
        )
    }
}

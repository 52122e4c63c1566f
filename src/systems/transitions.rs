//! Drives the gradual snow/thaw sweeps that trail influence changes.

use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    world::SimWorld,
};

#[derive(Default)]
pub struct TransitionSystem;

impl TransitionSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for TransitionSystem {
    fn name(&self) -> &str {
        "transitions"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        world: &mut SimWorld,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        world.advance_transitions();
        Ok(())
    }
}

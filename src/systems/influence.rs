//! Per-fire burn and spawn economy.
//!
//! Every active fire accumulates fractional burn progress and consumes whole
//! units of wood as the accumulator crosses 1. A shortfall shrinks the fire
//! instead of consuming; spawn progress works the same way but pays out in
//! workers, capped per fire.

use anyhow::Result;
use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    world::SimWorld,
};

#[derive(Default)]
pub struct InfluenceSystem;

impl InfluenceSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for InfluenceSystem {
    fn name(&self) -> &str {
        "influence"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut SimWorld,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        for id in world.fire_ids() {
            if !world.fire(id).is_active() {
                continue;
            }

            let owed = world.fire_mut(id).accumulate_burn(ctx.dt);
            if owed > 0 {
                if world.inventory.try_remove(owed) {
                    world.fire_mut(id).settle_burn(owed);
                } else {
                    debug!(fire = id.0, owed, "wood shortfall, shrinking fire");
                    world.fire_mut(id).reset_burn();
                    world.shrink_fire(id);
                    // A shrinking fire skips this tick's spawn accumulation.
                    continue;
                }
            }

            let cap = world.params.resources.worker_cap_per_fire;
            let owed_workers = world.fire_mut(id).accumulate_spawn(ctx.dt);
            for _ in 0..owed_workers {
                if world.fire(id).worker_count >= cap {
                    break;
                }
                world.spawn_worker(id, rng);
            }
        }
        Ok(())
    }
}

//! Tick loop and system scheduling.
//!
//! Systems run in registration order against the shared world, each with its
//! own named random stream. Deferred actions drain at the top of the tick so
//! an activation scheduled for "now" lands before any system observes the
//! world.

use anyhow::Result;

use crate::{
    rng::{RngManager, SystemRng},
    world::{Outcome, SimWorld},
};

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    pub dt_seconds: f32,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            tick: 0,
            settings: self.settings,
        }
    }
}

pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    tick: u64,
    settings: EngineSettings,
}

impl Engine {
    /// Advance the world one tick: due deferred actions, then every system in
    /// order, then the clock.
    pub fn tick(&mut self, world: &mut SimWorld) -> Result<()> {
        for action in world.take_due_actions() {
            let mut rng_stream = self.rng.stream("deferred");
            world.apply_action(action, &mut rng_stream);
        }

        for system in &mut self.systems {
            let mut rng_stream = self.rng.stream(system.name());
            let ctx = SystemContext {
                tick: self.tick,
                dt: self.settings.dt_seconds,
                scenario_name: &self.settings.scenario_name,
            };
            system.run(&ctx, world, &mut rng_stream)?;
        }

        world.advance_clock(self.settings.dt_seconds);
        self.tick += 1;
        Ok(())
    }

    /// Run up to `ticks` ticks, stopping early once the world reaches a
    /// terminal outcome.
    pub fn run(&mut self, world: &mut SimWorld, ticks: u64) -> Result<Option<Outcome>> {
        for _ in 0..ticks {
            if world.outcome().is_some() {
                break;
            }
            self.tick(world)?;
        }
        Ok(world.outcome())
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }
}

pub struct SystemContext<'a> {
    pub tick: u64,
    pub dt: f32,
    pub scenario_name: &'a str,
}

pub trait System {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut SimWorld,
        rng: &mut SystemRng<'_>,
    ) -> Result<()>;
}

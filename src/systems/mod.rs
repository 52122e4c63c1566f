mod influence;
mod transitions;
mod workers;

pub use influence::InfluenceSystem;
pub use transitions::TransitionSystem;
pub use workers::WorkerSystem;

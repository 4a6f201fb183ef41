//! The five-stage admission → execution → reporting pipeline, one action per
//! stage. Each stage owns exactly one side effect and its cleanup releases
//! that effect; the action runner guarantees release in reverse order on
//! every path.
mod claim;
mod complete;
mod container;
mod execute;
mod register;

pub use claim::ClaimAction;
pub use complete::CompleteAction;
pub use container::CreateContainerAction;
pub use execute::ExecuteAction;
pub use register::RegisterAction;

pub mod session;

pub use session::{HealthSession, OverwritePolicy, UpsertOutcome};

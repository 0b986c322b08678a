//! Dual-path analytics: statistics first, an optional generative model on
//! top, and arbitration between the two.
//!
//! Everything here except [`orchestrator`] is a pure function over its
//! inputs. The orchestrator is the only component that awaits I/O.

pub mod aggregator;
pub mod arbitration;
pub mod credentials;
pub mod documents;
pub mod json_repair;
pub mod learning_path;
pub mod normalizer;
pub mod orchestrator;
pub mod prediction;
pub mod prompts;
pub mod scorer;
pub mod trend;

pub use credentials::{Credential, CredentialPool};
pub use orchestrator::{AiOrchestrator, AiOutcome, FailureReason, GenerativeProvider};

pub mod domain;
pub mod error;

pub use domain::artifact::{BuildArtifact, ValidationOutcome};
pub use domain::publish::{PublishRequest, PublishedVersion, VersionCreationTicket};
pub use domain::source::{Dialect, SourceInputs, SourceSpec};
pub use error::CoreError;

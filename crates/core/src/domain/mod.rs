pub mod artifact;
pub mod publish;
pub mod source;

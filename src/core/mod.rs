pub mod error;
pub mod forward;
pub mod record;
pub mod types;
pub mod variant;

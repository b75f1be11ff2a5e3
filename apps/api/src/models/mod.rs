pub mod analysis;
pub mod candidate;
pub mod record;
pub mod run;

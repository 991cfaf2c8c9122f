pub mod client;
pub mod embedding;
pub mod structured;

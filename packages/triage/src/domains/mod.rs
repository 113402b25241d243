pub mod audit;
pub mod matching;
pub mod requests;
pub mod resources;

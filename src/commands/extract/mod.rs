mod columns;
mod decode;
mod details;
mod dialect;
mod merge;
mod noise;
mod pipeline;
mod projector;
mod rows;
mod run;
mod store;
#[cfg(test)]
mod tests;
mod types;

pub use rows::DEFAULT_Y_TOLERANCE;
pub use run::run;

//! Runtime data model definitions.
//!
//! Entity modeling itself lives outside this crate; `model` only carries the
//! facts routing needs: where the rows live and which column decides it.
pub mod entity;

#[cfg(test)]
mod tests;

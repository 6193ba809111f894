//! HTTP scenarios, one module per concern.

mod admission;
mod blocks;
mod surface;
mod transactions;

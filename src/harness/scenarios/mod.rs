//! Regression scenarios, one module per diagram kind.

pub mod timing;

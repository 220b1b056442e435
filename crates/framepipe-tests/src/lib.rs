//! Integration test crate for FramePipe.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It drives the pipeline with a hand-controlled source and with the
//! pattern clip engine through the input layer.


#[cfg(test)]
mod ordering;

#[cfg(test)]
mod backpressure;

#[cfg(test)]
mod errors;

#[cfg(test)]
mod cancel;

#[cfg(test)]
mod release;

//! Setup module for the socket-forge application.
//!
//! Turns resolved settings into a solver run and writes its results.

pub mod execution;

//! Execution backends.
//!
//! Only the CPU backend exists. Everything it needs lives in
//! caller-provided scratch, so calls on distinct scratch buffers are
//! independent and may run on different threads.

pub mod cpu;

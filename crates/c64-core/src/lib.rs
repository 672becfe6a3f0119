//! C64 Core - Pure Rust Commodore 64 emulation library
//!
//! This crate provides the core emulation logic for a Commodore 64:
//! the MOS 6510 CPU, the banked 64 KiB memory subsystem, and the
//! simulated I/O chips. It contains no terminal or UI dependencies;
//! the interactive shell lives in the `c64-shell` crate.

#![forbid(unsafe_code)]

/// CPU module containing the MOS 6510 (6502 variant) interpreter
pub mod cpu;
/// Banked memory subsystem: RAM, ROM images and the processor port
pub mod memory;
/// Simulated VIC-II/SID/CIA register banks, keyboard matrix and screen
pub mod io;
/// PETSCII <-> ASCII conversion helpers
pub mod petscii;
/// Integration module wiring CPU, memory and I/O into a machine
pub mod system;

//! Count-based n-gram language modeling library.
//!
//! This crate provides a modular statistical language-model system including:
//! - Generalized n-gram training for any order >= 2
//! - Multi-level count artifacts with binary persistence
//! - Pluggable smoothing (Kneser-Ney, simple backoff)
//! - Temperature and top-k sampling with seedable randomness
//! - A generation loop with stop sequences and usage accounting
//!
//! Only the high-level API is exposed publicly. Low-level components
//! are kept internal to ensure consistency and prevent misuse.

/// Core model types, training and generation logic.
///
/// This module exposes the trainer, the model and the smoothing strategies
/// while keeping internal probability plumbing private.
pub mod model;

/// Tokenizers mapping text to token id sequences and back.
pub mod tokenizer;

/// Error and result types shared across the crate.
pub mod error;

/// Wall-clock abstraction used for latency measurement.
pub mod clock;

/// I/O utilities (file loading).
///
/// Not exposed
pub(crate) mod io;

//! Top-level module for the n-gram language-model system.
//!
//! This module provides a count-based statistical language model:
//! - Persisted count tables and metadata (`NGramArtifact`)
//! - Corpus training at every order (`NGramTrainer`)
//! - Pluggable probability smoothing (`smoothing`)
//! - Controllable token sampling (`Sampler`)
//! - A high-level generation interface (`NGramModel`)

/// Persisted model data: n-gram counts at the primary and all lower
/// orders, continuation statistics, vocabulary and training metadata.
///
/// Pure data plus read-only accessors; immutable once trained.
pub mod artifact;

/// Builds an artifact from a token sequence or a corpus file by
/// sliding-window counting at orders N down to 1.
pub mod trainer;

/// Smoothing strategies turning raw counts into a probability
/// distribution over next tokens.
///
/// Two interchangeable implementations: interpolated backoff and
/// Kneser-Ney discounting.
pub mod smoothing;

/// Token selection from a weighted distribution.
///
/// Applies temperature rescaling and top-k truncation, driven by a
/// seedable pseudo-random source.
pub mod sampler;

/// Generation request parameters, usage accounting and the response
/// envelope.
pub mod request;

/// High-level model tying an artifact, a tokenizer and a smoothing
/// strategy together into a generation loop.
pub mod ngram_model;

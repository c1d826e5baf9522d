// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Production implementations of the [`crate::traits`] seams: alloy for
//! chains, Circle's Iris API for attestations, tokio for time.

mod alloy;
mod iris;
mod tokio_clock;

pub use self::alloy::{
    estimate_gas_with_buffer, signer_error, AlloyChainClient, DEFAULT_GAS_BUFFER_PERCENT,
};
pub use self::iris::{IrisAttestationProvider, IRIS_PRODUCTION_URL, IRIS_SANDBOX_URL};
pub use self::tokio_clock::TokioClock;

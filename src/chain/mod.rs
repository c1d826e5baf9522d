// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Bridgeable chains and the published addresses behind the built-in registries.

pub mod addresses;
mod registry;

pub use registry::{ChainConfig, ChainEntry, ChainRegistry};

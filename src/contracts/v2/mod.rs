// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! CCTP v2 bindings. Minting on v2 is observed rather than submitted, so only
//! the messenger side is bound here.

mod token_messenger_v2;

pub use token_messenger_v2::{BurnOptions, TokenMessengerV2, TokenMessengerV2Contract};

// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Wire-level protocol types: domains, finality, message layout and
//! attestation service responses.

mod attestation;
mod domain_id;
mod finality;
mod message;

pub use attestation::{
    AttestationLookup, AttestationResponse, AttestationStatus, V2AttestationResponse,
};
pub use domain_id::DomainId;
pub use finality::FinalityThreshold;
pub use message::{message_domains, BurnMessage, BurnMessageBody, MessageHeader};

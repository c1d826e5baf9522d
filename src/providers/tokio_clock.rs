// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use std::time::{Duration, Instant};

use crate::traits::Clock;

/// Wall-clock [`Clock`] backed by `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl TokioClock {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Follows tokio's clock, so paused test runtimes see time advance.
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media reader trait for receipt photos and voice notes.

use async_trait::async_trait;

use crate::error::TallyError;
use crate::intent::ExpenseDraft;
use crate::traits::adapter::PluginAdapter;
use crate::types::MediaPayload;

/// Turns binary media into text the dialogue engine can work with.
#[async_trait]
pub trait MediaReader: PluginAdapter {
    /// Reads a receipt image into a tentative expense.
    async fn read_receipt(&self, image: &MediaPayload) -> Result<ExpenseDraft, TallyError>;

    /// Transcribes a voice note.
    async fn transcribe(&self, audio: &MediaPayload) -> Result<String, TallyError>;
}

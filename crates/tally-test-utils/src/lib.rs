// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tally integration tests.
//!
//! Provides mock adapters and a harness that wires the real dialogue
//! controller to a temp SQLite ledger, so conversations can be driven
//! deterministically without network access.
//!
//! # Components
//!
//! - [`MockProvider`] - Scripted intent provider returning queued JSON replies
//! - [`MockMediaReader`] - Scripted receipt reader and transcriber
//! - [`MockChannel`] - Channel adapter that captures everything sent
//! - [`MemoryStates`] - In-memory conversation store with clock control
//! - [`RecordingLedger`] - Ledger wrapper that records mutations and injects failures
//! - [`TestHarness`] - The assembled stack

pub mod harness;
pub mod memory_states;
pub mod mock_channel;
pub mod mock_provider;
pub mod recording_ledger;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use memory_states::MemoryStates;
pub use mock_channel::{MockChannel, Sent};
pub use mock_provider::{MockMediaReader, MockProvider};
pub use recording_ledger::RecordingLedger;

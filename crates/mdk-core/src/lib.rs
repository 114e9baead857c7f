//! # mdk-core
//!
//! Core payment types and collaborator abstractions for the MDK webhook relay.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  connect()  ┌──────────────┐
//! │ NodeFactory  │────────────▶│ PaymentNode  │ sync_wallets()
//! └──────────────┘  per attempt└──────────────┘ receive_payments()
//!                                     │ settled payments
//!                                     ▼
//!                         ┌────────────────────┐
//!                         │ PaymentStateStore  │ mark_payment_received()
//!                         └────────────────────┘
//! ```
//!
//! The `PaymentNode` trait enables swapping between a real Lightning node
//! and the in-memory `FakeNode` without changing relay logic. Amounts are
//! millisatoshis everywhere; satoshi conversion happens only when building
//! upstream `PaymentReceivedEntry` values.

pub mod error;
pub mod node;
pub mod payment;
pub mod state;

pub use error::{CoreError, Result};
pub use node::{FakeNode, FakeNodeFactory, NodeFactory, PaymentNode};
pub use payment::{Amount, PaymentHash, PaymentReceivedEntry, ReceivedPayment};
pub use state::{MemoryPaymentStateStore, PaymentStateStore};

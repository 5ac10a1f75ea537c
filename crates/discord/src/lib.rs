//! Discord integration - gateway bot interface
//!
//! This crate provides the Discord-facing surface for tally:
//! - **Gateway** (`gateway`) - event-loop runner with reconnection logic
//! - **Events** (`events`) - slash commands, button clicks, guild messages
//! - **Commands** (`commands`) - `/poll`, `/coinflip`, `/pick`, `/purge`, ...
//! - **Embeds** (`embeds`) - rich message builders (embeds, buttons)
//! - **Transport** (`transport`) - the outbound channel/message seam
//! - **Service** (`service`) - command handlers wired to the poll engine
//!
//! # Architecture
//!
//! ```text
//! Gateway Events → EventDispatcher → Handlers → Poll Engine (tally-core)
//!                       ↓
//!                 Embeds/Buttons ← ChannelDisplay
//! ```
//!
//! The poll engine never sees Discord types: it renders `DisplayPayload`
//! frames and this crate adapts them onto the wire via `ChannelDisplay`.

pub mod commands;
pub mod embeds;
pub mod events;
pub mod gateway;
pub mod service;
pub mod transport;

//! Data Transfer Objects for trigger sources
//!
//! This module contains the request shapes that trigger sources (manual
//! API calls, webhooks, the scheduler endpoint) hand to the engine.
//! DTOs are lightweight representations optimized for transport.

pub mod trigger;

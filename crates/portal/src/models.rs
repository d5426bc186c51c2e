//! These models represent the objects passed around by the facade
//!
//! There are several different related formats we need to interact with:
//! - vercel useChat messages, sent from the site to the facade
//! - vercel data stream protocol frames, sent from the facade back to the site
//! - openai-compatible messages/tools, sent from the facade to the generation service
//!
//! We always immediately convert those data models into the internal structs
//! using to/from helpers, so the internal models are not an exact match to any
//! of these formats.
pub mod content;
pub mod event;
pub mod message;
pub mod role;
pub mod tool;

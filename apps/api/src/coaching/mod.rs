//! Coaching API: AI-generated goal plans, suggestions and periodic reports.
//!
//! Handlers own authentication, validation and metering. The services in
//! `optimize` and `reports` are pure prompt-in, text-out functions over a
//! `TextGenerator`, so they are tested without HTTP or a real model.

pub mod analytics;
pub mod handlers;
pub mod locale;
pub mod models;
pub mod optimize;
pub mod prompts;
pub mod reports;
pub mod validation;

//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate model, registry and host calls into inspector-level APIs.
//! - Keep UI and CLI layers decoupled from link policy details.

pub mod checklist_service;

//! # Charts Library
//!
//! Scheduled snapshots of project boards and the burndown and burnup reports
//! computed from them.

pub mod analytics;
pub mod config;
pub mod connectors;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod normalization;
pub mod reconciler;
pub mod repositories;
pub mod schedule;
pub mod scheduler;
pub mod server;
pub mod telemetry;
pub use migration;

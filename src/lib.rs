//! Homeowner Intake - slot-filling dialogue engine for project bid cards.
//!
//! Steers a multi-turn conversation with a homeowner until every field needed
//! for a contractor bid card is collected and confirmed. Model output is treated
//! as an advisory hint; slot validators and the registry's field order decide
//! what is applied and where the dialogue goes next.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

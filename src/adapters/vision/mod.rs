//! Vision adapters - implementations of the VisionAnalyzer port.

mod static_analyzer;

pub use static_analyzer::StaticVisionAnalyzer;

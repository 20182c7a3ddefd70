//! Nutrieval Library
//!
//! Nutrition math for detected foods and scoring of food detections against
//! labeled benchmark images.

pub mod build_info;
pub mod catalog;
pub mod config;
pub mod db;
pub mod evaluation;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod tools;

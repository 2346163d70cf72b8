pub mod chrono_utils;
pub mod config;
pub mod observability;

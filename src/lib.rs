pub mod callbacks;
pub mod clients;
pub mod config;
pub mod export;
pub mod finalizer;
pub mod geometry;
pub mod humanize;
pub mod jobs;
pub mod observability;

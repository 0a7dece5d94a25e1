pub mod collector;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod export;
pub mod features;
pub mod hashing;
pub mod language;
pub mod lexicon;
pub mod model;
pub mod models;
pub mod normalizer;
pub mod predictor;
pub mod source;

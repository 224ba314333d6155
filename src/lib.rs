//! Backend for a movie discovery site: catalog browsing backed by TMDB,
//! AI-assisted suggestions, and a small community layer with accounts,
//! comments, and ratings.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

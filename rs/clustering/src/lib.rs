#![feature(portable_simd)]

pub mod element;
pub mod engine;
pub mod error;
pub mod kernel;
pub mod kmeans;
pub mod seeding;
pub mod store;

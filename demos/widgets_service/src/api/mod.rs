//! HTTP presentation layer.

pub mod rest;

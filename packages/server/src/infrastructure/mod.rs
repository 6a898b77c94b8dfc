//! Infrastructure layer: connection hub, wire DTOs and collaborator implementations.

pub mod cache;
pub mod dto;
pub mod hub;
pub mod repository;
pub mod rule_engine;

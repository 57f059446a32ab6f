//! Integration tests for the agent registry service

mod cache_persistence;
mod cli_contracts;
mod registry_flow;
mod support;

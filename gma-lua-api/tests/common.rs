//! Common helpers for gma-lua-api integration tests.

#![allow(dead_code)]

use std::rc::Rc;

use gma_lua_api::{ApiRegistry, ExecutionLimits, ProbeRuntime, ValueType};

pub fn registry() -> ApiRegistry {
    ApiRegistry::gma2().expect("GrandMA2 schema must build")
}

pub fn handle(registry: &ApiRegistry) -> ValueType {
    registry.parse_type("handle").expect("handle alias is declared")
}

/// Probe runtime over the GrandMA2 surface with a short timeout.
pub fn probe() -> ProbeRuntime {
    ProbeRuntime::new(
        Rc::new(registry()),
        ExecutionLimits::with_timeout(std::time::Duration::from_millis(200)),
    )
    .expect("Failed to create probe runtime")
}

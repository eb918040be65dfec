//! Built-in datacat stages.
//!
//! | role | type tag |
//! |---|---|
//! | source | `jsonl-file-source` |
//! | transform | `case-conversion-adapter`, `null-handling-adapter`, `cast-to-datatype-adapter`, `constant-mapping-adapter` |
//! | sink | `jsonl-file-target`, `stdout-target` |

pub mod sinks;
pub mod sources;
pub mod transforms;

mod value;

use datacat_engine::StageRegistry;

/// Register every built-in stage with `registry`.
pub fn register_builtins(registry: &mut StageRegistry) {
    sources::register(registry);
    transforms::register(registry);
    sinks::register(registry);
}

/// A registry holding only the built-in stages.
#[must_use]
pub fn builtin_registry() -> StageRegistry {
    let mut registry = StageRegistry::new();
    register_builtins(&mut registry);
    registry
}

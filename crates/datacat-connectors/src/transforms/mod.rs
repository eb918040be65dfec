//! Record-at-a-time adapters. Each one keeps input order and emits exactly
//! one record per input record.

pub mod case;
pub mod cast;
pub mod mapping;
pub mod null;

use datacat_engine::StageRegistry;

pub(crate) fn register(registry: &mut StageRegistry) {
    registry
        .register_transform(case::TYPE_TAG, case::build)
        .register_transform(cast::TYPE_TAG, cast::build)
        .register_transform(mapping::TYPE_TAG, mapping::build)
        .register_transform(null::TYPE_TAG, null::build);
}

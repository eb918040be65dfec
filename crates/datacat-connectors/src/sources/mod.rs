pub mod jsonl;

use datacat_engine::StageRegistry;

pub(crate) fn register(registry: &mut StageRegistry) {
    registry.register_source(jsonl::TYPE_TAG, jsonl::build);
}

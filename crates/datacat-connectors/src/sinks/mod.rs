pub mod jsonl;
pub mod stdout;

use datacat_engine::StageRegistry;

pub(crate) fn register(registry: &mut StageRegistry) {
    registry
        .register_sink(jsonl::TYPE_TAG, jsonl::build)
        .register_sink(stdout::TYPE_TAG, stdout::build);
}

use datacat_connectors::builtin_registry;
use datacat_types::StageRole;

/// Execute the `stages` command: list the built-in stage type tags.
pub fn execute() {
    let registry = builtin_registry();
    for role in [StageRole::Source, StageRole::Transform, StageRole::Sink] {
        println!("{role}:");
        for tag in registry.tags(role) {
            println!("  {tag}");
        }
    }
}

//! Schema bundles shipped with the validator.
//!
//! A bundle is a JSON object mapping a kind name (`Agent`, `Task`,
//! `Workflow`) to the JSON Schema its `spec` must satisfy. The legacy bundle
//! has a single `agent` entry for the flat record.

use ossa_contracts::version::VersionId;

/// Bundle key for the flat legacy record.
pub const LEGACY_AGENT_KEY: &str = "agent";

const LEGACY_V1: &str = include_str!("../schemas/legacy-v1.json");
const V0_1_9: &str = include_str!("../schemas/v0.1.9.json");
const V0_2_2: &str = include_str!("../schemas/v0.2.2.json");
const CURRENT: &str = include_str!("../schemas/current.json");

/// Every built-in bundle, oldest first, as raw JSON text.
pub fn builtin_bundles() -> Vec<(VersionId, &'static str)> {
    vec![
        (VersionId::legacy_v1(), LEGACY_V1),
        (VersionId::v0_1_9(), V0_1_9),
        (VersionId::v0_2_2(), V0_2_2),
        (VersionId::current(), CURRENT),
    ]
}

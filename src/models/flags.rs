use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Message flags discord honours on webhook messages. Serialized as the raw
/// integer bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageFlags(u64);

bitflags! {
    impl MessageFlags: u64 {
        const SUPPRESS_EMBEDS = 1 << 2;
        const SUPPRESS_NOTIFICATIONS = 1 << 12;
        const IS_COMPONENTS_V2 = 1 << 15;

        // responses may carry flags we don't name
        const _ = !0;
    }
}

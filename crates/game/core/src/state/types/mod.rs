pub mod common;
pub mod diplomacy;
pub mod refs;

// Re-export identifiers and geometry
pub use common::{Frame, Owner, PlayerId, Rect, TilePos, UnitHandle, UnitId, Xy};

// Re-export alliance and vision types
pub use diplomacy::{AllianceTable, Stance, VisionMask};

// Re-export rule-table ids and resolved refs
pub use refs::{
    OrderId, OrderRef, TechId, TechRef, UnitTypeId, UnitTypeRef, UpgradeId, UpgradeRef,
};

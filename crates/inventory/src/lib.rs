//! Pharmacy inventory domain module.
//!
//! The [`InventoryManager`] owns the drug records behind the inventory
//! dashboard. It is pure in-memory domain logic: no IO, no HTTP, no storage.

pub mod catalog;
pub mod config;
pub mod drug;
pub mod manager;

pub use catalog::sample_catalog;
pub use config::InventoryConfig;
pub use drug::{
    AddDrug, AdjustStock, DrugAdded, DrugDraft, DrugRecord, DrugRemoved, InventoryCommand,
    InventoryEvent, RemoveDrug, StockAdjusted, StockDirection, UnitCost,
};
pub use manager::{InventoryManager, InventorySummary};

//! Inventory state manager.
//!
//! Owns the authoritative list of drug records. Every mutation goes through a
//! command handled by the target [`DrugRecord`] aggregate; accepted events are
//! applied and appended to an in-memory journal. A rejected command leaves
//! both the collection and the journal untouched.

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use pharmacy_core::{Aggregate, Clock, DomainError, DomainResult, DrugId, SystemClock};
use pharmacy_events::{Event, EventEnvelope};

use crate::catalog::sample_catalog;
use crate::config::InventoryConfig;
use crate::drug::{
    AddDrug, AdjustStock, DRUG_AGGREGATE_TYPE, DrugDraft, DrugRecord, InventoryCommand,
    InventoryEvent, RemoveDrug, StockDirection,
};

/// Dashboard headline figures over the full (unfiltered) collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventorySummary {
    pub total_drug_types: usize,
    pub total_stock_value: Decimal,
    pub low_stock_items: usize,
    pub low_stock_threshold: u64,
}

#[derive(Debug)]
pub struct InventoryManager {
    config: InventoryConfig,
    clock: Arc<dyn Clock>,
    records: Vec<DrugRecord>,
    /// Ids of removed records; never handed out again.
    retired: HashSet<DrugId>,
    search_term: String,
    journal: Vec<EventEnvelope<InventoryEvent>>,
    last_sequence: u64,
}

impl Default for InventoryManager {
    fn default() -> Self {
        Self::new(InventoryConfig::default(), Arc::new(SystemClock))
    }
}

impl InventoryManager {
    pub fn new(config: InventoryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            records: Vec::new(),
            retired: HashSet::new(),
            search_term: String::new(),
            journal: Vec::new(),
            last_sequence: 0,
        }
    }

    /// Start with the given drafts added in order.
    pub fn with_records(
        config: InventoryConfig,
        clock: Arc<dyn Clock>,
        drafts: impl IntoIterator<Item = DrugDraft>,
    ) -> DomainResult<Self> {
        let mut manager = Self::new(config, clock);
        for draft in drafts {
            manager.add_drug(draft)?;
        }
        Ok(manager)
    }

    /// Start with the demo catalog.
    pub fn with_sample_data(config: InventoryConfig, clock: Arc<dyn Clock>) -> DomainResult<Self> {
        Self::with_records(config, clock, sample_catalog())
    }

    /// Rebuild a manager from a previously recorded journal.
    ///
    /// Each event is re-validated as the command that produced it before it is
    /// applied, so a journal that breaks an invariant is rejected as a whole.
    pub fn replay(
        config: InventoryConfig,
        clock: Arc<dyn Clock>,
        journal: impl IntoIterator<Item = EventEnvelope<InventoryEvent>>,
    ) -> DomainResult<Self> {
        let mut manager = Self::new(config, clock);
        for envelope in journal {
            manager.replay_one(envelope)?;
        }
        tracing::info!(
            records = manager.records.len(),
            last_sequence = manager.last_sequence,
            "inventory rebuilt from journal"
        );
        Ok(manager)
    }

    fn replay_one(&mut self, envelope: EventEnvelope<InventoryEvent>) -> DomainResult<()> {
        let seq = envelope.sequence_number();
        if seq <= self.last_sequence {
            return Err(DomainError::invariant(format!(
                "non-monotonic sequence number (last={}, found={seq})",
                self.last_sequence
            )));
        }

        if envelope.aggregate_type() != DRUG_AGGREGATE_TYPE {
            return Err(DomainError::invariant(format!(
                "unexpected aggregate type {:?} at sequence {seq}",
                envelope.aggregate_type()
            )));
        }

        let event = envelope.payload();
        let drug_id = event.drug_id();
        if envelope.aggregate_id() != drug_id {
            return Err(DomainError::invariant(
                "event drug_id does not match envelope aggregate_id",
            ));
        }

        let command = InventoryCommand::try_from(event)?;
        let idx = match event {
            InventoryEvent::DrugAdded(_) => {
                if self.position(drug_id).is_some() || self.retired.contains(&drug_id) {
                    return Err(DomainError::conflict(format!(
                        "drug {drug_id} already exists"
                    )));
                }
                self.records.push(DrugRecord::empty(drug_id));
                self.records.len() - 1
            }
            InventoryEvent::StockAdjusted(_) | InventoryEvent::DrugRemoved(_) => self
                .position(drug_id)
                .ok_or(DomainError::not_found(drug_id))?,
        };

        // The journaled event must be exactly what its command decides today.
        let decided = self.records[idx].handle(&command).and_then(|decided| {
            if decided.as_slice() == std::slice::from_ref(event) {
                Ok(decided)
            } else {
                Err(DomainError::invariant(format!(
                    "journaled event at sequence {seq} is not in normal form"
                )))
            }
        });
        let decided = match decided {
            Ok(decided) => decided,
            Err(err) => {
                if matches!(event, InventoryEvent::DrugAdded(_)) {
                    self.records.pop();
                }
                return Err(err);
            }
        };

        for e in &decided {
            self.records[idx].apply(e);
        }
        if matches!(event, InventoryEvent::DrugRemoved(_)) {
            self.records.remove(idx);
            self.retired.insert(drug_id);
        }

        tracing::debug!(
            event_id = %envelope.event_id(),
            event_type = envelope.event_type(),
            sequence = seq,
            "journal replayed"
        );

        self.last_sequence = seq;
        self.journal.push(envelope);
        Ok(())
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    /// All live records in insertion order.
    pub fn records(&self) -> &[DrugRecord] {
        &self.records
    }

    pub fn get(&self, id: DrugId) -> Option<&DrugRecord> {
        self.records.iter().find(|r| r.id_typed() == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append-only log of accepted changes.
    pub fn journal(&self) -> &[EventEnvelope<InventoryEvent>] {
        &self.journal
    }

    fn position(&self, id: DrugId) -> Option<usize> {
        self.records.iter().position(|r| r.id_typed() == id)
    }

    fn next_drug_id(&self) -> DrugId {
        loop {
            let id = DrugId::new();
            if self.position(id).is_none() && !self.retired.contains(&id) {
                return id;
            }
        }
    }

    fn record_events(&mut self, events: Vec<InventoryEvent>) {
        for event in events {
            self.last_sequence += 1;
            let envelope = EventEnvelope::new(
                Uuid::now_v7(),
                event.drug_id(),
                DRUG_AGGREGATE_TYPE,
                self.last_sequence,
                event,
            );
            tracing::debug!(
                event_id = %envelope.event_id(),
                event_type = envelope.event_type(),
                schema_version = envelope.payload().version(),
                occurred_at = %envelope.payload().occurred_at(),
                sequence = self.last_sequence,
                "journal append"
            );
            self.journal.push(envelope);
        }
    }

    fn rejected(operation: &'static str, id: Option<DrugId>, err: DomainError) -> DomainError {
        match id {
            Some(id) => tracing::warn!(operation, drug_id = %id, kind = err.kind(), error = %err, "command rejected"),
            None => tracing::warn!(operation, kind = err.kind(), error = %err, "command rejected"),
        }
        err
    }

    /// Validate a draft, assign it a fresh id and timestamp, and append it.
    pub fn add_drug(&mut self, draft: DrugDraft) -> DomainResult<DrugRecord> {
        let id = self.next_drug_id();
        let command = InventoryCommand::AddDrug(AddDrug {
            drug_id: id,
            draft,
            occurred_at: self.clock.now(),
        });

        let mut record = DrugRecord::empty(id);
        let events = record
            .execute(&command)
            .map_err(|e| Self::rejected("add_drug", None, e))?;

        tracing::info!(
            drug_id = %id,
            name = record.name(),
            in_stock = record.in_stock(),
            "drug added"
        );

        self.records.push(record.clone());
        self.record_events(events);
        Ok(record)
    }

    /// Increase or decrease the stock of one record by a positive quantity.
    pub fn adjust_stock(
        &mut self,
        id: DrugId,
        quantity: i64,
        direction: StockDirection,
    ) -> DomainResult<DrugRecord> {
        let idx = self
            .position(id)
            .ok_or_else(|| Self::rejected("adjust_stock", Some(id), DomainError::not_found(id)))?;

        let command = InventoryCommand::AdjustStock(AdjustStock {
            drug_id: id,
            quantity,
            direction,
            occurred_at: self.clock.now(),
        });

        let events = self.records[idx]
            .execute(&command)
            .map_err(|e| Self::rejected("adjust_stock", Some(id), e))?;

        let record = self.records[idx].clone();
        tracing::info!(
            drug_id = %id,
            ?direction,
            quantity,
            in_stock = record.in_stock(),
            "stock adjusted"
        );

        self.record_events(events);
        Ok(record)
    }

    /// Add stock ("Add Stock" action).
    pub fn restock(&mut self, id: DrugId, quantity: i64) -> DomainResult<DrugRecord> {
        self.adjust_stock(id, quantity, StockDirection::Increase)
    }

    /// Take stock ("Take Stock" action).
    pub fn consume(&mut self, id: DrugId, quantity: i64) -> DomainResult<DrugRecord> {
        self.adjust_stock(id, quantity, StockDirection::Decrease)
    }

    /// Remove a record. Absent ids fail with `NotFound`.
    pub fn remove_drug(&mut self, id: DrugId) -> DomainResult<DrugRecord> {
        let idx = self
            .position(id)
            .ok_or_else(|| Self::rejected("remove_drug", Some(id), DomainError::not_found(id)))?;

        let command = InventoryCommand::RemoveDrug(RemoveDrug {
            drug_id: id,
            occurred_at: self.clock.now(),
        });
        let events = self.records[idx]
            .execute(&command)
            .map_err(|e| Self::rejected("remove_drug", Some(id), e))?;

        let record = self.records.remove(idx);
        self.retired.insert(id);
        tracing::info!(drug_id = %id, name = record.name(), "drug removed");

        self.record_events(events);
        Ok(record)
    }

    /// An empty "add drug" form, expiring on today's date by this manager's clock.
    pub fn blank_draft(&self) -> DrugDraft {
        DrugDraft::blank(self.clock.now().date_naive())
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Replace the search term. Any string is accepted.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    /// Records whose name or category contains the search term
    /// (case-insensitive), in insertion order.
    pub fn filtered_view(&self) -> Vec<&DrugRecord> {
        if self.search_term.is_empty() {
            return self.records.iter().collect();
        }
        let needle = self.search_term.to_lowercase();
        self.records
            .iter()
            .filter(|r| r.matches_lowercase(&needle))
            .collect()
    }

    /// Sum of `in_stock × cost_per_unit` over every record, ignoring the search term.
    ///
    /// Saturates at `Decimal::MAX` rather than failing; a dashboard total that
    /// large is already meaningless.
    pub fn aggregate_stock_value(&self) -> Decimal {
        self.records
            .iter()
            .fold(Decimal::ZERO, |sum, r| sum.saturating_add(r.total_value()))
    }

    /// Low-stock count at the configured threshold.
    pub fn low_stock_count(&self) -> usize {
        self.low_stock_count_below(self.config.low_stock_threshold)
    }

    /// Records with `in_stock < threshold`, over the full collection.
    pub fn low_stock_count_below(&self, threshold: u64) -> usize {
        self.records
            .iter()
            .filter(|r| r.is_low_stock(threshold))
            .count()
    }

    /// Records flagged low at the configured threshold.
    pub fn low_stock_records(&self) -> Vec<&DrugRecord> {
        let threshold = self.config.low_stock_threshold;
        self.records
            .iter()
            .filter(|r| r.is_low_stock(threshold))
            .collect()
    }

    pub fn summary(&self) -> InventorySummary {
        InventorySummary {
            total_drug_types: self.records.len(),
            total_stock_value: self.aggregate_stock_value(),
            low_stock_items: self.low_stock_count(),
            low_stock_threshold: self.config.low_stock_threshold,
        }
    }
}

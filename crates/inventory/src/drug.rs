use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pharmacy_core::{Aggregate, AggregateRoot, DomainError, DrugId, ValueObject};
use pharmacy_events::Event;

/// Aggregate type name used in journal envelopes.
pub const DRUG_AGGREGATE_TYPE: &str = "inventory.drug";

/// Cost of a single unit. Never negative.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct UnitCost(Decimal);

impl UnitCost {
    pub const ZERO: UnitCost = UnitCost(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Result<Self, DomainError> {
        if amount < Decimal::ZERO {
            return Err(DomainError::validation("cost_per_unit cannot be negative"));
        }
        Ok(Self(amount))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }
}

impl ValueObject for UnitCost {}

impl TryFrom<Decimal> for UnitCost {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UnitCost> for Decimal {
    fn from(value: UnitCost) -> Self {
        value.0
    }
}

/// Direction of a stock adjustment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockDirection {
    Increase,
    Decrease,
}

/// Candidate record collected by the "add drug" form.
///
/// `in_stock` is signed so that a negative form value reaches validation
/// instead of being unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugDraft {
    pub name: String,
    pub category: String,
    pub in_stock: i64,
    pub cost_per_unit: Decimal,
    pub expiry_date: NaiveDate,
    pub supplier: Option<String>,
}

impl DrugDraft {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        expiry_date: NaiveDate,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            in_stock: 0,
            cost_per_unit: Decimal::ZERO,
            expiry_date,
            supplier: None,
        }
    }

    /// A blank form: empty text, zero quantity and cost, expiring on `today`.
    pub fn blank(today: NaiveDate) -> Self {
        Self::new(String::new(), String::new(), today)
    }

    pub fn in_stock(mut self, in_stock: i64) -> Self {
        self.in_stock = in_stock;
        self
    }

    pub fn cost_per_unit(mut self, cost: Decimal) -> Self {
        self.cost_per_unit = cost;
        self
    }

    pub fn supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = Some(supplier.into());
        self
    }
}

/// Aggregate root: DrugRecord.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrugRecord {
    id: DrugId,
    name: String,
    category: String,
    in_stock: u64,
    cost_per_unit: UnitCost,
    expiry_date: NaiveDate,
    last_updated: DateTime<Utc>,
    supplier: Option<String>,
    #[serde(skip)]
    version: u64,
    #[serde(skip)]
    created: bool,
    #[serde(skip)]
    removed: bool,
}

impl DrugRecord {
    /// Create an empty, not-yet-added aggregate instance for rehydration.
    pub fn empty(id: DrugId) -> Self {
        Self {
            id,
            name: String::new(),
            category: String::new(),
            in_stock: 0,
            cost_per_unit: UnitCost::ZERO,
            expiry_date: NaiveDate::MIN,
            last_updated: DateTime::<Utc>::MIN_UTC,
            supplier: None,
            version: 0,
            created: false,
            removed: false,
        }
    }

    pub fn id_typed(&self) -> DrugId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn in_stock(&self) -> u64 {
        self.in_stock
    }

    pub fn cost_per_unit(&self) -> UnitCost {
        self.cost_per_unit
    }

    pub fn expiry_date(&self) -> NaiveDate {
        self.expiry_date
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn supplier(&self) -> Option<&str> {
        self.supplier.as_deref()
    }

    /// Whether the record has been added and not yet removed.
    pub fn is_live(&self) -> bool {
        self.created && !self.removed
    }

    /// Stock value of this line: `in_stock × cost_per_unit`, saturating at
    /// `Decimal::MAX`.
    pub fn total_value(&self) -> Decimal {
        Decimal::from(self.in_stock).saturating_mul(self.cost_per_unit.amount())
    }

    /// Strictly below the threshold.
    pub fn is_low_stock(&self, threshold: u64) -> bool {
        self.in_stock < threshold
    }

    /// Case-insensitive match on name or category. `needle` must already be lowercase.
    pub(crate) fn matches_lowercase(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.category.to_lowercase().contains(needle)
    }
}

impl AggregateRoot for DrugRecord {
    type Id = DrugId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: AddDrug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddDrug {
    pub drug_id: DrugId,
    pub draft: DrugDraft,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdjustStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub drug_id: DrugId,
    pub quantity: i64,
    pub direction: StockDirection,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveDrug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveDrug {
    pub drug_id: DrugId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryCommand {
    AddDrug(AddDrug),
    AdjustStock(AdjustStock),
    RemoveDrug(RemoveDrug),
}

/// Event: DrugAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugAdded {
    pub drug_id: DrugId,
    pub name: String,
    pub category: String,
    pub in_stock: u64,
    pub cost_per_unit: UnitCost,
    pub expiry_date: NaiveDate,
    pub supplier: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockAdjusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub drug_id: DrugId,
    pub direction: StockDirection,
    pub quantity: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DrugRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugRemoved {
    pub drug_id: DrugId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    DrugAdded(DrugAdded),
    StockAdjusted(StockAdjusted),
    DrugRemoved(DrugRemoved),
}

impl InventoryEvent {
    pub fn drug_id(&self) -> DrugId {
        match self {
            InventoryEvent::DrugAdded(e) => e.drug_id,
            InventoryEvent::StockAdjusted(e) => e.drug_id,
            InventoryEvent::DrugRemoved(e) => e.drug_id,
        }
    }
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::DrugAdded(_) => "inventory.drug.added",
            InventoryEvent::StockAdjusted(_) => "inventory.drug.stock_adjusted",
            InventoryEvent::DrugRemoved(_) => "inventory.drug.removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::DrugAdded(e) => e.occurred_at,
            InventoryEvent::StockAdjusted(e) => e.occurred_at,
            InventoryEvent::DrugRemoved(e) => e.occurred_at,
        }
    }
}

/// The command that would have produced an event. Used to re-validate a
/// journal on replay.
impl TryFrom<&InventoryEvent> for InventoryCommand {
    type Error = DomainError;

    fn try_from(event: &InventoryEvent) -> Result<Self, Self::Error> {
        let command = match event {
            InventoryEvent::DrugAdded(e) => InventoryCommand::AddDrug(AddDrug {
                drug_id: e.drug_id,
                draft: DrugDraft {
                    name: e.name.clone(),
                    category: e.category.clone(),
                    in_stock: i64::try_from(e.in_stock)
                        .map_err(|_| DomainError::invariant("in_stock out of range"))?,
                    cost_per_unit: e.cost_per_unit.amount(),
                    expiry_date: e.expiry_date,
                    supplier: e.supplier.clone(),
                },
                occurred_at: e.occurred_at,
            }),
            InventoryEvent::StockAdjusted(e) => InventoryCommand::AdjustStock(AdjustStock {
                drug_id: e.drug_id,
                quantity: i64::try_from(e.quantity)
                    .map_err(|_| DomainError::invariant("quantity out of range"))?,
                direction: e.direction,
                occurred_at: e.occurred_at,
            }),
            InventoryEvent::DrugRemoved(e) => InventoryCommand::RemoveDrug(RemoveDrug {
                drug_id: e.drug_id,
                occurred_at: e.occurred_at,
            }),
        };
        Ok(command)
    }
}

impl Aggregate for DrugRecord {
    type Command = InventoryCommand;
    type Event = InventoryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InventoryEvent::DrugAdded(e) => {
                self.id = e.drug_id;
                self.name = e.name.clone();
                self.category = e.category.clone();
                self.in_stock = e.in_stock;
                self.cost_per_unit = e.cost_per_unit;
                self.expiry_date = e.expiry_date;
                self.supplier = e.supplier.clone();
                self.last_updated = e.occurred_at;
                self.created = true;
            }
            InventoryEvent::StockAdjusted(e) => {
                self.in_stock = match e.direction {
                    StockDirection::Increase => self.in_stock.saturating_add(e.quantity),
                    StockDirection::Decrease => self.in_stock.saturating_sub(e.quantity),
                };
                // Never move backwards, even if the clock did.
                self.last_updated = self.last_updated.max(e.occurred_at);
            }
            InventoryEvent::DrugRemoved(_) => {
                self.removed = true;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InventoryCommand::AddDrug(cmd) => self.handle_add(cmd),
            InventoryCommand::AdjustStock(cmd) => self.handle_adjust(cmd),
            InventoryCommand::RemoveDrug(cmd) => self.handle_remove(cmd),
        }
    }
}

impl DrugRecord {
    fn ensure_drug_id(&self, drug_id: DrugId) -> Result<(), DomainError> {
        if self.id != drug_id {
            return Err(DomainError::invariant("drug_id mismatch"));
        }
        Ok(())
    }

    fn ensure_live(&self, drug_id: DrugId) -> Result<(), DomainError> {
        if !self.is_live() {
            return Err(DomainError::not_found(drug_id));
        }
        self.ensure_drug_id(drug_id)
    }

    fn handle_add(&self, cmd: &AddDrug) -> Result<Vec<InventoryEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict(format!(
                "drug {} already exists",
                cmd.drug_id
            )));
        }
        self.ensure_drug_id(cmd.drug_id)?;

        let draft = &cmd.draft;
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        let in_stock = u64::try_from(draft.in_stock)
            .map_err(|_| DomainError::validation("in_stock cannot be negative"))?;
        let cost_per_unit = UnitCost::new(draft.cost_per_unit)?;
        let supplier = draft
            .supplier
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(vec![InventoryEvent::DrugAdded(DrugAdded {
            drug_id: cmd.drug_id,
            name: name.to_string(),
            category: draft.category.trim().to_string(),
            in_stock,
            cost_per_unit,
            expiry_date: draft.expiry_date,
            supplier,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_adjust(&self, cmd: &AdjustStock) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_live(cmd.drug_id)?;

        if cmd.quantity <= 0 {
            return Err(DomainError::InvalidQuantity(cmd.quantity));
        }
        let quantity = cmd.quantity as u64;

        match cmd.direction {
            StockDirection::Increase => {
                if self.in_stock.checked_add(quantity).is_none() {
                    return Err(DomainError::invariant("stock would overflow"));
                }
            }
            StockDirection::Decrease => {
                if quantity > self.in_stock {
                    return Err(DomainError::insufficient_stock(quantity, self.in_stock));
                }
            }
        }

        Ok(vec![InventoryEvent::StockAdjusted(StockAdjusted {
            drug_id: cmd.drug_id,
            direction: cmd.direction,
            quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove(&self, cmd: &RemoveDrug) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_live(cmd.drug_id)?;

        Ok(vec![InventoryEvent::DrugRemoved(DrugRemoved {
            drug_id: cmd.drug_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap()
    }

    fn amoxicillin() -> DrugDraft {
        DrugDraft::new(
            "Amoxicillin 250mg",
            "Antibiotic",
            NaiveDate::from_ymd_opt(2027, 12, 31).unwrap(),
        )
        .in_stock(150)
        .cost_per_unit(Decimal::new(5, 1))
        .supplier("PharmaCo")
    }

    fn added(draft: DrugDraft) -> DrugRecord {
        let id = DrugId::new();
        let mut drug = DrugRecord::empty(id);
        drug.execute(&InventoryCommand::AddDrug(AddDrug {
            drug_id: id,
            draft,
            occurred_at: test_time(),
        }))
        .unwrap();
        drug
    }

    fn adjust(drug: &DrugRecord, quantity: i64, direction: StockDirection) -> InventoryCommand {
        InventoryCommand::AdjustStock(AdjustStock {
            drug_id: drug.id_typed(),
            quantity,
            direction,
            occurred_at: test_time() + Duration::minutes(1),
        })
    }

    #[test]
    fn add_emits_event_with_normalised_fields() {
        let id = DrugId::new();
        let drug = DrugRecord::empty(id);
        let mut draft = amoxicillin();
        draft.name = "  Amoxicillin 250mg ".to_string();
        draft.supplier = Some("   ".to_string());

        let events = drug
            .handle(&InventoryCommand::AddDrug(AddDrug {
                drug_id: id,
                draft,
                occurred_at: test_time(),
            }))
            .unwrap();

        assert_eq!(events.len(), 1);
        match &events[0] {
            InventoryEvent::DrugAdded(e) => {
                assert_eq!(e.name, "Amoxicillin 250mg");
                assert_eq!(e.in_stock, 150);
                assert_eq!(e.supplier, None);
                assert_eq!(e.occurred_at, test_time());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn add_rejects_empty_name() {
        let id = DrugId::new();
        let mut draft = amoxicillin();
        draft.name = "   ".to_string();
        let err = DrugRecord::empty(id)
            .handle(&InventoryCommand::AddDrug(AddDrug {
                drug_id: id,
                draft,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::validation("name cannot be empty"));
    }

    #[test]
    fn add_rejects_negative_stock_and_cost() {
        let id = DrugId::new();
        let drug = DrugRecord::empty(id);

        let cmd = |draft| {
            InventoryCommand::AddDrug(AddDrug {
                drug_id: id,
                draft,
                occurred_at: test_time(),
            })
        };

        match drug.handle(&cmd(amoxicillin().in_stock(-1))).unwrap_err() {
            DomainError::Validation(msg) => assert!(msg.contains("in_stock")),
            other => panic!("expected Validation, got {other:?}"),
        }
        match drug
            .handle(&cmd(amoxicillin().cost_per_unit(Decimal::new(-1, 2))))
            .unwrap_err()
        {
            DomainError::Validation(msg) => assert!(msg.contains("cost_per_unit")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn add_twice_conflicts() {
        let drug = added(amoxicillin());
        let err = drug
            .handle(&InventoryCommand::AddDrug(AddDrug {
                drug_id: drug.id_typed(),
                draft: amoxicillin(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn adjust_on_unknown_drug_is_not_found() {
        let drug = DrugRecord::empty(DrugId::new());
        let err = drug
            .handle(&adjust(&drug, 5, StockDirection::Increase))
            .unwrap_err();
        assert_eq!(err, DomainError::not_found(drug.id_typed()));
    }

    #[test]
    fn adjust_rejects_non_positive_quantity() {
        let drug = added(amoxicillin());
        for q in [0, -3] {
            let err = drug
                .handle(&adjust(&drug, q, StockDirection::Increase))
                .unwrap_err();
            assert_eq!(err, DomainError::InvalidQuantity(q));
        }
    }

    #[test]
    fn decrease_beyond_stock_is_rejected_without_mutation() {
        let mut drug = added(amoxicillin());
        let before = drug.clone();

        let err = drug
            .execute(&adjust(&drug, 200, StockDirection::Decrease))
            .unwrap_err();

        assert_eq!(err, DomainError::insufficient_stock(200, 150));
        assert_eq!(drug, before);
    }

    #[test]
    fn decrease_to_exactly_zero_is_allowed() {
        let mut drug = added(amoxicillin());
        drug.execute(&adjust(&drug, 150, StockDirection::Decrease))
            .unwrap();
        assert_eq!(drug.in_stock(), 0);
    }

    #[test]
    fn increase_overflow_is_rejected() {
        let mut draft = amoxicillin();
        draft.in_stock = i64::MAX;
        let mut drug = added(draft);
        drug.execute(&adjust(&drug, i64::MAX, StockDirection::Increase))
            .unwrap();
        let err = drug
            .handle(&adjust(&drug, i64::MAX, StockDirection::Increase))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn last_updated_never_moves_backwards() {
        let mut drug = added(amoxicillin());
        let created_at = drug.last_updated();

        let earlier = InventoryCommand::AdjustStock(AdjustStock {
            drug_id: drug.id_typed(),
            quantity: 1,
            direction: StockDirection::Increase,
            occurred_at: created_at - Duration::hours(1),
        });
        drug.execute(&earlier).unwrap();

        assert_eq!(drug.in_stock(), 151);
        assert_eq!(drug.last_updated(), created_at);
    }

    #[test]
    fn removed_drug_rejects_further_commands() {
        let mut drug = added(amoxicillin());
        drug.execute(&InventoryCommand::RemoveDrug(RemoveDrug {
            drug_id: drug.id_typed(),
            occurred_at: test_time(),
        }))
        .unwrap();

        assert!(!drug.is_live());
        let err = drug
            .handle(&adjust(&drug, 1, StockDirection::Increase))
            .unwrap_err();
        assert_eq!(err, DomainError::not_found(drug.id_typed()));
    }

    #[test]
    fn version_increments_on_apply() {
        let mut drug = added(amoxicillin());
        assert_eq!(drug.version(), 1);
        drug.execute(&adjust(&drug, 10, StockDirection::Increase))
            .unwrap();
        assert_eq!(drug.version(), 2);
    }

    #[test]
    fn total_value_and_low_stock_flag() {
        let drug = added(amoxicillin());
        assert_eq!(drug.total_value(), Decimal::new(75, 0));
        assert!(!drug.is_low_stock(20));
        assert!(drug.is_low_stock(151));
    }

    #[test]
    fn total_value_saturates_instead_of_panicking() {
        let drug = added(amoxicillin().in_stock(i64::MAX).cost_per_unit(Decimal::MAX));
        assert_eq!(drug.total_value(), Decimal::MAX);
    }

    #[test]
    fn unit_cost_rejects_negative_values() {
        assert!(UnitCost::new(Decimal::new(-5, 1)).is_err());
        assert_eq!(UnitCost::new(Decimal::ZERO).unwrap(), UnitCost::ZERO);
    }

    #[test]
    fn events_map_back_to_their_commands() {
        let drug = added(amoxicillin());
        let cmd = adjust(&drug, 7, StockDirection::Decrease);
        let events = drug.handle(&cmd).unwrap();
        let rebuilt = InventoryCommand::try_from(&events[0]).unwrap();
        assert_eq!(rebuilt, cmd);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: an increase followed by an equal decrease restores stock.
        #[test]
        fn increase_then_decrease_round_trips(
            start in 0i64..1_000_000,
            q in 1i64..1_000_000
        ) {
            let mut drug = added(amoxicillin().in_stock(start));
            drug.execute(&adjust(&drug, q, StockDirection::Increase)).unwrap();
            drug.execute(&adjust(&drug, q, StockDirection::Decrease)).unwrap();
            prop_assert_eq!(drug.in_stock(), start as u64);
        }

        /// Property: handle never mutates state.
        #[test]
        fn handle_does_not_mutate_state(
            q in -10i64..500,
            decrease in any::<bool>()
        ) {
            let drug = added(amoxicillin());
            let before = drug.clone();
            let direction = if decrease { StockDirection::Decrease } else { StockDirection::Increase };
            let _ = drug.handle(&adjust(&drug, q, direction));
            prop_assert_eq!(drug, before);
        }
    }
}

//! Demo inventory used to seed a fresh dashboard session.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::drug::DrugDraft;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

/// The four starter drugs a new session is seeded with.
pub fn sample_catalog() -> Vec<DrugDraft> {
    vec![
        DrugDraft::new("Amoxicillin 250mg", "Antibiotic", date(2027, 12, 31))
            .in_stock(150)
            .cost_per_unit(Decimal::new(5, 1))
            .supplier("PharmaCo"),
        DrugDraft::new("Paracetamol 500mg", "Analgesic", date(2026, 6, 30))
            .in_stock(300)
            .cost_per_unit(Decimal::new(1, 1))
            .supplier("MediSupply"),
        DrugDraft::new("Lisinopril 10mg", "Antihypertensive", date(2028, 3, 31))
            .in_stock(75)
            .cost_per_unit(Decimal::new(8, 1))
            .supplier("HealthInc"),
        DrugDraft::new("Salbutamol Inhaler", "Bronchodilator", date(2027, 11, 30))
            .in_stock(50)
            .cost_per_unit(Decimal::new(50, 1))
            .supplier("PharmaCo"),
    ]
}

//! Rate tables: the market-infrastructure fee schedule (B3, CVM, ANBIMA) and
//! the fixed-fee cost catalogs, held together as an immutable snapshot that
//! callers pass into every calculation.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::capped::CappedRate;
use super::catalog::FeeCatalogRow;
use super::combination::CatalogKey;
use super::tiered::BracketTable;
use crate::error::PricingError;
use crate::types::*;
use crate::PricingResult;

// ---------------------------------------------------------------------------
// Built-in market-infrastructure tables
// ---------------------------------------------------------------------------

/// B3 custody for debentures and commercial notes (monthly).
pub fn deb_custody_table() -> BracketTable {
    BracketTable::from_static(
        "custodia_b3_deb",
        &[
            (Some(dec!(100_000_000)), dec!(0.00000167)),
            (Some(dec!(500_000_000)), dec!(0.00000100)),
            (Some(dec!(1_000_000_000)), dec!(0.00000067)),
            (None, dec!(0.00000033)),
        ],
    )
}

/// B3 registration for CR, CRI and CRA, applied per series.
pub fn cr_registration_table() -> BracketTable {
    BracketTable::from_static(
        "registro_b3_cr",
        &[
            (Some(dec!(500_000_000)), dec!(0.000030)),
            (Some(dec!(1_000_000_000)), dec!(0.000020)),
            (Some(dec!(5_000_000_000)), dec!(0.000010)),
            (None, dec!(0.000005)),
        ],
    )
}

/// B3 registration for public debentures and commercial notes, per series × tenor.
pub fn deb_registration_public_table() -> BracketTable {
    BracketTable::from_static(
        "registro_b3_deb_publica",
        &[
            (Some(dec!(100_000_000)), dec!(0.000020)),
            (Some(dec!(500_000_000)), dec!(0.000015)),
            (Some(dec!(1_000_000_000)), dec!(0.000010)),
            (None, dec!(0.000005)),
        ],
    )
}

/// Registered-private debentures pay half the public registration rates.
pub fn deb_registration_private_table() -> BracketTable {
    deb_registration_public_table().scaled("registro_b3_deb_privada", dec!(0.5))
}

/// Every parameter the variable-fee formulas need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    /// Monthly custody rate for CR and CRI (0.000800%)
    pub cr_custody_rate: Rate,
    /// Monthly custody rate for CRA (0.000300%)
    pub cra_custody_rate: Rate,
    pub deb_custody: BracketTable,
    pub cr_registration: BracketTable,
    pub deb_registration_public: BracketTable,
    pub deb_registration_private: BracketTable,
    /// CVM oversight fee on total volume (0.03%)
    pub cvm_rate: Rate,
    /// ANBIMA fee for CRA, public CR and public DEB
    pub market_association: CappedRate,
    /// ANBIMA fee for CRI
    pub market_association_cri: CappedRate,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            cr_custody_rate: dec!(0.000008),
            cra_custody_rate: dec!(0.000003),
            deb_custody: deb_custody_table(),
            cr_registration: cr_registration_table(),
            deb_registration_public: deb_registration_public_table(),
            deb_registration_private: deb_registration_private_table(),
            cvm_rate: dec!(0.0003),
            market_association: CappedRate::new(dec!(0.00002778), dec!(9919), dec!(69436)),
            market_association_cri: CappedRate::new(dec!(0.00003968), dec!(1416), dec!(2830)),
        }
    }
}

impl FeeSchedule {
    pub fn validate(&self) -> PricingResult<()> {
        self.deb_custody.validate()?;
        self.cr_registration.validate()?;
        self.deb_registration_public.validate()?;
        self.deb_registration_private.validate()?;
        self.market_association.validate("market_association")?;
        self.market_association_cri.validate("market_association_cri")?;
        for (field, rate) in [
            ("cr_custody_rate", self.cr_custody_rate),
            ("cra_custody_rate", self.cra_custody_rate),
            ("cvm_rate", self.cvm_rate),
        ] {
            if rate.is_sign_negative() {
                return Err(PricingError::InvalidInput {
                    field: field.into(),
                    reason: "Rate cannot be negative".into(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Immutable view of every rate table for one calculation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTableSnapshot {
    schedule: FeeSchedule,
    catalogs: BTreeMap<CatalogKey, Vec<FeeCatalogRow>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SnapshotDocument {
    #[serde(default)]
    schedule: FeeSchedule,
    #[serde(default)]
    catalogs: Vec<CatalogDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogDocument {
    table: CatalogKey,
    #[serde(default)]
    rows: Vec<FeeCatalogRow>,
}

impl RateTableSnapshot {
    pub fn new(schedule: FeeSchedule) -> Self {
        Self {
            schedule,
            catalogs: BTreeMap::new(),
        }
    }

    /// Builder-style catalog registration; rows for an existing key are appended.
    pub fn with_catalog(mut self, key: CatalogKey, rows: Vec<FeeCatalogRow>) -> Self {
        self.catalogs.entry(key).or_default().extend(rows);
        self
    }

    /// Parse and validate a JSON snapshot document. Unknown table names and
    /// malformed bracket tables are rejected here rather than at pricing time.
    pub fn from_json(json: &str) -> PricingResult<Self> {
        let doc: SnapshotDocument = serde_json::from_str(json)?;
        let mut snapshot = Self::new(doc.schedule);
        for catalog in doc.catalogs {
            if snapshot.catalogs.contains_key(&catalog.table) {
                return Err(PricingError::InvalidInput {
                    field: "catalogs".into(),
                    reason: format!("Table '{}' listed more than once", catalog.table),
                });
            }
            snapshot.catalogs.insert(catalog.table, catalog.rows);
        }
        snapshot.validate()?;
        debug!(catalogs = snapshot.catalogs.len(), "rate table snapshot loaded");
        Ok(snapshot)
    }

    pub fn to_json(&self) -> PricingResult<String> {
        let doc = SnapshotDocument {
            schedule: self.schedule.clone(),
            catalogs: self
                .catalogs
                .iter()
                .map(|(table, rows)| CatalogDocument {
                    table: *table,
                    rows: rows.clone(),
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    pub fn validate(&self) -> PricingResult<()> {
        self.schedule.validate()?;
        for (key, rows) in &self.catalogs {
            for row in rows {
                if row.upfront_price.is_sign_negative() || row.recurring_price.is_sign_negative() {
                    return Err(PricingError::InvalidInput {
                        field: key.table_name(),
                        reason: format!("Row '{}' has a negative price", row.role),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn schedule(&self) -> &FeeSchedule {
        &self.schedule
    }

    /// Rows for a catalog; a missing catalog is an empty slice, not an error.
    pub fn rows(&self, key: &CatalogKey) -> &[FeeCatalogRow] {
        match self.catalogs.get(key) {
            Some(rows) => rows,
            None => {
                warn!(table = %key, "cost table not found, treating as empty");
                &[]
            }
        }
    }

    pub fn has_catalog(&self, key: &CatalogKey) -> bool {
        self.catalogs.contains_key(key)
    }

    pub fn catalog_keys(&self) -> impl Iterator<Item = &CatalogKey> {
        self.catalogs.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::combination::OfferCategory;
    use rust_decimal::Decimal;

    #[test]
    fn test_builtin_tables_are_valid() {
        let schedule = FeeSchedule::default();
        assert!(schedule.validate().is_ok());
        assert!(deb_custody_table().validate().is_ok());
        assert!(cr_registration_table().validate().is_ok());
        assert!(deb_registration_public_table().validate().is_ok());
        assert!(deb_registration_private_table().validate().is_ok());
    }

    #[test]
    fn test_private_registration_is_half_of_public() {
        let public = deb_registration_public_table();
        let private = deb_registration_private_table();
        let rates: Vec<Rate> = private.brackets.iter().map(|b| b.rate).collect();
        assert_eq!(rates, vec![dec!(0.00001), dec!(0.0000075), dec!(0.000005), dec!(0.0000025)]);
        for (p, q) in public.brackets.iter().zip(private.brackets.iter()) {
            assert_eq!(p.upper_bound, q.upper_bound);
        }
    }

    #[test]
    fn test_missing_catalog_is_empty() {
        let snapshot = RateTableSnapshot::default();
        let key = CatalogKey::Offer {
            category: OfferCategory::Debenture,
            offer: OfferType::Public,
        };
        assert!(snapshot.rows(&key).is_empty());
        assert!(!snapshot.has_catalog(&key));
    }

    #[test]
    fn test_from_json_with_catalogs() {
        let json = r#"{
            "catalogs": [
                {
                    "table": "custos_deb_oferta_publica",
                    "rows": [
                        { "papel": "Agente Fiduciário", "tipo_preco": "fixo",
                          "preco_upfront": 10000, "preco_recorrente": 20000,
                          "periodicidade": "anual" }
                    ]
                }
            ]
        }"#;
        let snapshot = RateTableSnapshot::from_json(json).unwrap();
        let key: CatalogKey = "custos_deb_oferta_publica".parse().unwrap();
        assert_eq!(snapshot.rows(&key).len(), 1);
        assert_eq!(snapshot.schedule(), &FeeSchedule::default());
    }

    #[test]
    fn test_from_json_rejects_unknown_table() {
        let json = r#"{ "catalogs": [ { "table": "custos_deb_oferta_publca", "rows": [] } ] }"#;
        assert!(RateTableSnapshot::from_json(json).is_err());
    }

    #[test]
    fn test_from_json_rejects_duplicate_table() {
        let json = r#"{ "catalogs": [
            { "table": "custos_cri_origem", "rows": [] },
            { "table": "custos_cri_origem", "rows": [] }
        ] }"#;
        assert!(RateTableSnapshot::from_json(json).is_err());
    }

    #[test]
    fn test_from_json_rejects_bad_brackets() {
        let json = r#"{
            "schedule": {
                "deb_custody": {
                    "name": "custodia_b3_deb",
                    "brackets": [
                        { "upper_bound": 500, "rate": 0.01 },
                        { "upper_bound": 100, "rate": 0.01 },
                        { "upper_bound": null, "rate": 0.01 }
                    ]
                }
            }
        }"#;
        let err = RateTableSnapshot::from_json(json).unwrap_err();
        assert!(matches!(err, PricingError::InvalidBracketConfiguration { .. }));
    }

    #[test]
    fn test_partial_schedule_override() {
        let json = r#"{ "schedule": { "cvm_rate": "0.0004" } }"#;
        let snapshot = RateTableSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.schedule().cvm_rate, dec!(0.0004));
        assert_eq!(snapshot.schedule().cra_custody_rate, dec!(0.000003));
    }

    #[test]
    fn test_json_round_trip_preserves_catalogs() {
        let key = CatalogKey::Offer {
            category: OfferCategory::ReceivablesCertOther,
            offer: OfferType::Public,
        };
        let snapshot = RateTableSnapshot::default().with_catalog(
            key,
            vec![FeeCatalogRow::flat("Securitizadora", dec!(25000), Decimal::ZERO, None)],
        );
        let json = snapshot.to_json().unwrap();
        let back = RateTableSnapshot::from_json(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_negative_catalog_price_rejected() {
        let key = CatalogKey::Offer {
            category: OfferCategory::Debenture,
            offer: OfferType::Public,
        };
        let snapshot = RateTableSnapshot::default()
            .with_catalog(key, vec![FeeCatalogRow::flat("Auditor", dec!(-1), Decimal::ZERO, None)]);
        assert!(snapshot.validate().is_err());
    }
}

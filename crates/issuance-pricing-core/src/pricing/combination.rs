use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::PricingError;
use crate::types::*;

// ---------------------------------------------------------------------------
// Catalog keys
// ---------------------------------------------------------------------------

/// Categories whose catalogs are keyed by offer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferCategory {
    Debenture,
    NoteCommercial,
    ReceivablesCertOther,
}

/// Categories whose catalogs are keyed by collateral origin (lastro).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LastroCategory {
    ReceivablesCertRe,
    AgribusinessCert,
}

impl OfferCategory {
    fn code(&self) -> &'static str {
        match self {
            OfferCategory::Debenture => "deb",
            OfferCategory::NoteCommercial => "nc",
            OfferCategory::ReceivablesCertOther => "cr",
        }
    }
}

impl LastroCategory {
    fn code(&self) -> &'static str {
        match self {
            LastroCategory::ReceivablesCertRe => "cri",
            LastroCategory::AgribusinessCert => "cra",
        }
    }
}

/// Identifies one fixed-fee catalog. Every valid combination is a distinct
/// variant, so a misspelt table name cannot silently resolve to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CatalogKey {
    Offer {
        category: OfferCategory,
        offer: OfferType,
    },
    Lastro {
        category: LastroCategory,
        origin: CollateralOrigin,
    },
    VehicleSurcharge {
        category: OfferCategory,
        vehicle: Vehicle,
    },
}

impl CatalogKey {
    /// Table name as used by the source data store.
    pub fn table_name(&self) -> String {
        match self {
            CatalogKey::Offer { category, offer } => {
                format!("custos_{}_{}", category.code(), offer.table_fragment())
            }
            CatalogKey::Lastro { category, origin } => {
                format!("custos_{}_{}", category.code(), origin.table_fragment())
            }
            CatalogKey::VehicleSurcharge { category, vehicle } => {
                format!("custos_{}_{}", category.code(), vehicle.table_fragment())
            }
        }
    }

    /// Every key the registry knows about.
    pub fn all() -> Vec<CatalogKey> {
        let offer_categories = [
            OfferCategory::Debenture,
            OfferCategory::NoteCommercial,
            OfferCategory::ReceivablesCertOther,
        ];
        let mut keys = Vec::new();
        for category in offer_categories {
            for offer in [OfferType::PrivatePure, OfferType::PrivateRegistered, OfferType::Public] {
                keys.push(CatalogKey::Offer { category, offer });
            }
            for vehicle in [Vehicle::ExclusiveVehicle, Vehicle::SegregatedEstate] {
                keys.push(CatalogKey::VehicleSurcharge { category, vehicle });
            }
        }
        for category in [LastroCategory::ReceivablesCertRe, LastroCategory::AgribusinessCert] {
            for origin in [CollateralOrigin::Origination, CollateralOrigin::Destination] {
                keys.push(CatalogKey::Lastro { category, origin });
            }
        }
        keys
    }
}

impl fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.table_name())
    }
}

impl FromStr for CatalogKey {
    type Err = PricingError;

    /// Accepts `custos_deb_oferta_publica` as well as the bare
    /// `DEB_oferta_publica` combination form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = normalize_label(s);
        let bare = label.strip_prefix("custos_").unwrap_or(&label);
        CatalogKey::all()
            .into_iter()
            .find(|key| {
                let name = key.table_name();
                name.strip_prefix("custos_") == Some(bare)
            })
            .ok_or_else(|| PricingError::InvalidInput {
                field: "table".into(),
                reason: format!("Unknown cost table '{}'", s),
            })
    }
}

impl TryFrom<String> for CatalogKey {
    type Error = PricingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CatalogKey> for String {
    fn from(key: CatalogKey) -> Self {
        key.table_name()
    }
}

// ---------------------------------------------------------------------------
// Variable formulas
// ---------------------------------------------------------------------------

/// A market-infrastructure fee computed by formula rather than catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableFee {
    /// B3 custody, progressive by volume, monthly
    DebentureCustody,
    /// B3 custody, flat CR/CRI rate, monthly
    ReceivablesCustody,
    /// B3 custody, flat CRA rate, monthly
    AgribusinessCustody,
    /// B3 registration, progressive per series, upfront
    ReceivablesRegistration,
    /// B3 registration, progressive per series × tenor, public rates
    DebentureRegistrationPublic,
    /// B3 registration, progressive per series × tenor, 50% of public rates
    DebentureRegistrationPrivate,
    /// CVM oversight fee on total volume
    CvmOversight,
    /// ANBIMA fee, generic capped schedule
    MarketAssociation,
    /// ANBIMA fee, CRI capped schedule
    MarketAssociationRealEstate,
}

impl VariableFee {
    pub fn is_custody(&self) -> bool {
        matches!(
            self,
            VariableFee::DebentureCustody
                | VariableFee::ReceivablesCustody
                | VariableFee::AgribusinessCustody
        )
    }

    pub fn is_registration(&self) -> bool {
        matches!(
            self,
            VariableFee::ReceivablesRegistration
                | VariableFee::DebentureRegistrationPublic
                | VariableFee::DebentureRegistrationPrivate
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableFormulaSet {
    None,
    DebentureRegistered,
    DebenturePublic,
    ReceivablesRegistered,
    ReceivablesPublic,
    RealEstateCert,
    AgribusinessCert,
}

impl VariableFormulaSet {
    pub fn fees(&self) -> &'static [VariableFee] {
        use VariableFee::*;
        match self {
            VariableFormulaSet::None => &[],
            VariableFormulaSet::DebentureRegistered => {
                &[DebentureCustody, DebentureRegistrationPrivate]
            }
            VariableFormulaSet::DebenturePublic => &[
                DebentureCustody,
                DebentureRegistrationPublic,
                CvmOversight,
                MarketAssociation,
            ],
            VariableFormulaSet::ReceivablesRegistered => {
                &[ReceivablesCustody, ReceivablesRegistration]
            }
            VariableFormulaSet::ReceivablesPublic => &[
                ReceivablesCustody,
                ReceivablesRegistration,
                CvmOversight,
                MarketAssociation,
            ],
            VariableFormulaSet::RealEstateCert => &[
                ReceivablesCustody,
                ReceivablesRegistration,
                CvmOversight,
                MarketAssociationRealEstate,
            ],
            VariableFormulaSet::AgribusinessCert => &[
                AgribusinessCustody,
                ReceivablesRegistration,
                CvmOversight,
                MarketAssociation,
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combination {
    /// Primary fixed-fee catalog; `None` is a lookup miss
    pub primary: Option<CatalogKey>,
    /// Additive vehicle catalog (DEB, NC and CR only)
    pub vehicle_surcharge: Option<CatalogKey>,
    pub formula_set: VariableFormulaSet,
}

/// Map an issuance classification onto its catalogs and variable formulas.
pub fn resolve(
    category: Category,
    offer_type: Option<OfferType>,
    vehicle: Option<Vehicle>,
    collateral_origin: Option<CollateralOrigin>,
) -> Combination {
    let offer_category = match category {
        Category::Debenture => Some(OfferCategory::Debenture),
        Category::NoteCommercial => Some(OfferCategory::NoteCommercial),
        Category::ReceivablesCertOther => Some(OfferCategory::ReceivablesCertOther),
        Category::ReceivablesCertRe | Category::AgribusinessCert => None,
    };

    let combination = match (category, offer_category) {
        (_, Some(oc)) => {
            let formula_set = match (oc, offer_type) {
                (_, None) | (_, Some(OfferType::PrivatePure)) => VariableFormulaSet::None,
                (OfferCategory::ReceivablesCertOther, Some(OfferType::Public)) => {
                    VariableFormulaSet::ReceivablesPublic
                }
                (OfferCategory::ReceivablesCertOther, Some(OfferType::PrivateRegistered)) => {
                    VariableFormulaSet::ReceivablesRegistered
                }
                (_, Some(OfferType::Public)) => VariableFormulaSet::DebenturePublic,
                (_, Some(OfferType::PrivateRegistered)) => VariableFormulaSet::DebentureRegistered,
            };
            Combination {
                primary: offer_type.map(|offer| CatalogKey::Offer { category: oc, offer }),
                vehicle_surcharge: vehicle
                    .map(|vehicle| CatalogKey::VehicleSurcharge { category: oc, vehicle }),
                formula_set,
            }
        }
        (Category::ReceivablesCertRe, None) => Combination {
            primary: Some(CatalogKey::Lastro {
                category: LastroCategory::ReceivablesCertRe,
                origin: collateral_origin.unwrap_or(CollateralOrigin::Origination),
            }),
            vehicle_surcharge: None,
            formula_set: VariableFormulaSet::RealEstateCert,
        },
        (_, None) => Combination {
            primary: Some(CatalogKey::Lastro {
                category: LastroCategory::AgribusinessCert,
                origin: collateral_origin.unwrap_or(CollateralOrigin::Origination),
            }),
            vehicle_surcharge: None,
            formula_set: VariableFormulaSet::AgribusinessCert,
        },
    };

    if combination.primary.is_none() {
        warn!(%category, "offer type not recognised, no cost table applies");
    }
    debug!(
        %category,
        primary = ?combination.primary.map(|k| k.table_name()),
        formula_set = ?combination.formula_set,
        "combination resolved"
    );
    combination
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PricingError;

/// All monetary values (BRL). Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.0003 = 0.03%). Never as percentages.
pub type Rate = Decimal;

/// Year fractions or counts
pub type Years = Decimal;

// ---------------------------------------------------------------------------
// Issuance classification
// ---------------------------------------------------------------------------

/// Instrument category, serialised with the market codes used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Debênture
    #[serde(rename = "DEB", alias = "debenture")]
    Debenture,
    /// Certificado de Recebíveis do Agronegócio
    #[serde(rename = "CRA", alias = "agribusiness_cert")]
    AgribusinessCert,
    /// Certificado de Recebíveis Imobiliários
    #[serde(rename = "CRI", alias = "receivables_cert_re")]
    ReceivablesCertRe,
    /// Certificado de Recebíveis (other underlying)
    #[serde(rename = "CR", alias = "receivables_cert_other")]
    ReceivablesCertOther,
    /// Nota Comercial
    #[serde(rename = "NC", alias = "note_commercial")]
    NoteCommercial,
}

impl Category {
    pub fn code(&self) -> &'static str {
        match self {
            Category::Debenture => "DEB",
            Category::AgribusinessCert => "CRA",
            Category::ReceivablesCertRe => "CRI",
            Category::ReceivablesCertOther => "CR",
            Category::NoteCommercial => "NC",
        }
    }

    /// Categories priced by offer type (the rest are priced by collateral origin).
    pub fn is_offer_based(&self) -> bool {
        matches!(
            self,
            Category::Debenture | Category::NoteCommercial | Category::ReceivablesCertOther
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Category {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "deb" | "debenture" => Ok(Category::Debenture),
            "cra" | "agribusiness_cert" => Ok(Category::AgribusinessCert),
            "cri" | "receivables_cert_re" => Ok(Category::ReceivablesCertRe),
            "cr" | "receivables_cert_other" => Ok(Category::ReceivablesCertOther),
            "nc" | "note_commercial" | "nota_comercial" => Ok(Category::NoteCommercial),
            _ => Err(PricingError::InvalidInput {
                field: "category".into(),
                reason: format!("Unknown category '{}'; expected DEB, CRA, CRI, CR or NC", s),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferType {
    /// Oferta privada pura: no market registration at all
    PrivatePure,
    /// Oferta privada cetipada: private placement registered at B3
    PrivateRegistered,
    /// Oferta pública (CVM registered)
    Public,
}

impl OfferType {
    /// Classify free-text offer descriptions ("Oferta Pública", "oferta_privada_cetipada",
    /// "registered-private", ...). Returns `None` for text that matches no class.
    pub fn classify(text: &str) -> Option<OfferType> {
        let label = normalize_label(text);
        if label.contains("cetipad") || label.contains("registered") {
            Some(OfferType::PrivateRegistered)
        } else if label.contains("pura") || label.contains("pure") {
            Some(OfferType::PrivatePure)
        } else if label.contains("public") || label.contains("cvm") {
            Some(OfferType::Public)
        } else {
            None
        }
    }

    /// Table-name fragment used by the source system.
    pub fn table_fragment(&self) -> &'static str {
        match self {
            OfferType::PrivatePure => "oferta_privada_pura",
            OfferType::PrivateRegistered => "oferta_privada_cetipada",
            OfferType::Public => "oferta_publica",
        }
    }
}

impl fmt::Display for OfferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_fragment())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vehicle {
    ExclusiveVehicle,
    SegregatedEstate,
}

impl Vehicle {
    /// Parse a vehicle label. Empty text and "none"/"nenhum" mean no vehicle.
    pub fn classify(text: &str) -> Result<Option<Vehicle>, PricingError> {
        let label = normalize_label(text);
        if label.is_empty() || label == "none" || label == "nenhum" || label == "sem_veiculo" {
            return Ok(None);
        }
        if label.contains("exclusiv") {
            Ok(Some(Vehicle::ExclusiveVehicle))
        } else if label.contains("patrimonio") || label.contains("segregated") {
            Ok(Some(Vehicle::SegregatedEstate))
        } else {
            Err(PricingError::InvalidInput {
                field: "vehicle".into(),
                reason: format!("Unknown vehicle '{}'", text),
            })
        }
    }

    pub fn table_fragment(&self) -> &'static str {
        match self {
            Vehicle::ExclusiveVehicle => "veiculo_exclusivo",
            Vehicle::SegregatedEstate => "patrimonio_separado",
        }
    }
}

/// Lastro of a CRI/CRA: whether receivables come from origination or destination of funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollateralOrigin {
    Origination,
    Destination,
}

impl CollateralOrigin {
    pub fn table_fragment(&self) -> &'static str {
        match self {
            CollateralOrigin::Origination => "origem",
            CollateralOrigin::Destination => "destinacao",
        }
    }
}

impl FromStr for CollateralOrigin {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "origem" | "origination" => Ok(CollateralOrigin::Origination),
            "destinacao" | "destination" => Ok(CollateralOrigin::Destination),
            _ => Err(PricingError::InvalidInput {
                field: "collateral_origin".into(),
                reason: format!("Unknown collateral origin '{}'; expected origem or destinacao", s),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Calculation input
// ---------------------------------------------------------------------------

/// One series (tranche) of an issuance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tranche {
    #[serde(alias = "numero")]
    pub number: u32,
    #[serde(alias = "valor_emissao")]
    pub face_value: Money,
    /// Only used by tenor-multiplied registration fees
    #[serde(default, alias = "prazo", skip_serializing_if = "Option::is_none")]
    pub tenor_years: Option<Years>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuanceRequest {
    pub category: Category,
    /// `None` when the caller's offer text could not be classified
    pub offer_type: Option<OfferType>,
    #[serde(default)]
    pub vehicle: Option<Vehicle>,
    #[serde(default)]
    pub collateral_origin: Option<CollateralOrigin>,
    pub total_volume: Money,
    #[serde(default)]
    pub series: Vec<Tranche>,
    /// Issuance-level tenor, used for tranches that carry none
    #[serde(default)]
    pub tenor_years: Option<Years>,
}

impl IssuanceRequest {
    /// The tranches to price. With no series supplied the whole volume is a
    /// single implicit tranche #1.
    pub fn effective_series(&self) -> Vec<Tranche> {
        if self.series.is_empty() {
            vec![Tranche {
                number: 1,
                face_value: self.total_volume,
                tenor_years: self.tenor_years,
            }]
        } else {
            self.series.clone()
        }
    }

    /// Tenor multiplier for a tranche: its own tenor, else the issuance tenor,
    /// else one year. Zero counts as absent.
    pub fn tenor_for(&self, tranche: &Tranche) -> Years {
        tranche
            .tenor_years
            .filter(|t| *t > Decimal::ZERO)
            .or(self.tenor_years.filter(|t| *t > Decimal::ZERO))
            .unwrap_or(Decimal::ONE)
    }
}

/// Lowercase, strip Portuguese accents and collapse whitespace/hyphens to `_`.
pub fn normalize_label(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_sep = false;
    for ch in text.trim().chars().flat_map(char::to_lowercase) {
        let mapped = match ch {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            c => c,
        };
        if mapped.is_whitespace() || mapped == '-' || mapped == '_' {
            pending_sep = !out.is_empty();
            continue;
        }
        if pending_sep {
            out.push('_');
            pending_sep = false;
        }
        out.push(mapped);
    }
    out
}

// ---------------------------------------------------------------------------
// Output envelope
// ---------------------------------------------------------------------------

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation. Carries no wall-clock data so identical
/// inputs serialise identically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("Oferta Pública"), "oferta_publica");
        assert_eq!(normalize_label("  Oferta  Privada - Cetipada "), "oferta_privada_cetipada");
        assert_eq!(normalize_label("Destinação"), "destinacao");
        assert_eq!(normalize_label(""), "");
    }

    #[test]
    fn test_offer_type_classification() {
        assert_eq!(OfferType::classify("Oferta Pública"), Some(OfferType::Public));
        assert_eq!(OfferType::classify("public"), Some(OfferType::Public));
        assert_eq!(OfferType::classify("CVM 160"), Some(OfferType::Public));
        assert_eq!(
            OfferType::classify("oferta_privada_cetipada"),
            Some(OfferType::PrivateRegistered)
        );
        assert_eq!(
            OfferType::classify("registered-private"),
            Some(OfferType::PrivateRegistered)
        );
        assert_eq!(OfferType::classify("Oferta Privada Pura"), Some(OfferType::PrivatePure));
        assert_eq!(OfferType::classify("pure-private"), Some(OfferType::PrivatePure));
        assert_eq!(OfferType::classify("leilão"), None);
        assert_eq!(OfferType::classify(""), None);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("DEB".parse::<Category>().unwrap(), Category::Debenture);
        assert_eq!("cri".parse::<Category>().unwrap(), Category::ReceivablesCertRe);
        assert_eq!("NC".parse::<Category>().unwrap(), Category::NoteCommercial);
        assert!("XYZ".parse::<Category>().is_err());
        assert!(Category::ReceivablesCertOther.is_offer_based());
        assert!(!Category::AgribusinessCert.is_offer_based());
    }

    #[test]
    fn test_vehicle_and_origin_parsing() {
        assert_eq!(Vehicle::classify("").unwrap(), None);
        assert_eq!(Vehicle::classify("none").unwrap(), None);
        assert_eq!(
            Vehicle::classify("Veículo Exclusivo").unwrap(),
            Some(Vehicle::ExclusiveVehicle)
        );
        assert_eq!(
            Vehicle::classify("segregated-estate").unwrap(),
            Some(Vehicle::SegregatedEstate)
        );
        assert!(Vehicle::classify("trust").is_err());

        assert_eq!(
            "Destinação".parse::<CollateralOrigin>().unwrap(),
            CollateralOrigin::Destination
        );
        assert_eq!(
            "origination".parse::<CollateralOrigin>().unwrap(),
            CollateralOrigin::Origination
        );
    }

    #[test]
    fn test_implicit_single_tranche() {
        let req = IssuanceRequest {
            category: Category::Debenture,
            offer_type: Some(OfferType::Public),
            vehicle: None,
            collateral_origin: None,
            total_volume: dec!(50_000_000),
            series: vec![],
            tenor_years: Some(dec!(5)),
        };
        let series = req.effective_series();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].number, 1);
        assert_eq!(series[0].face_value, dec!(50_000_000));
        assert_eq!(req.tenor_for(&series[0]), dec!(5));
    }

    #[test]
    fn test_tenor_fallbacks() {
        let req = IssuanceRequest {
            category: Category::Debenture,
            offer_type: Some(OfferType::Public),
            vehicle: None,
            collateral_origin: None,
            total_volume: dec!(10),
            series: vec![],
            tenor_years: None,
        };
        let zero = Tranche { number: 1, face_value: dec!(10), tenor_years: Some(dec!(0)) };
        let three = Tranche { number: 2, face_value: dec!(10), tenor_years: Some(dec!(3)) };
        assert_eq!(req.tenor_for(&zero), Decimal::ONE);
        assert_eq!(req.tenor_for(&three), dec!(3));
    }

    #[test]
    fn test_tranche_accepts_source_field_names() {
        let t: Tranche =
            serde_json::from_str(r#"{"numero": 2, "valor_emissao": 1000, "prazo": 4}"#).unwrap();
        assert_eq!(t.number, 2);
        assert_eq!(t.face_value, dec!(1000));
        assert_eq!(t.tenor_years, Some(dec!(4)));
    }
}

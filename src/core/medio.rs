//! Payment media and counterparty kinds.
//!
//! A forma de pago always resolves to one [`Medio`]. The medio decides which
//! instrument fields are mandatory and how the instrument is normalized when a
//! request is built.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The medium a payment instrument moves money through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Medio {
    /// Cash through an open caja session
    Caja,
    /// Bank transfer
    Transferencia,
    /// Electronic check
    Echeq,
    /// Credit or debit card
    Tarjeta,
    /// Running account. Never valid as a way to pay.
    Ctacte,
}

/// A field an instrument may be required to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentFieldName {
    /// Open caja session
    CajaId,
    /// Bank name
    Banco,
    /// Due date
    Vencimiento,
    /// Card type
    TarjetaTipo,
    /// Card brand
    TarjetaMarca,
    /// Card voucher
    Cupon,
}

impl fmt::Display for InstrumentFieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CajaId => "caja abierta",
            Self::Banco => "banco",
            Self::Vencimiento => "vencimiento",
            Self::TarjetaTipo => "tipo de tarjeta",
            Self::TarjetaMarca => "marca de tarjeta",
            Self::Cupon => "cupón",
        };
        f.write_str(name)
    }
}

impl Medio {
    /// All media, in display order.
    pub const ALL: [Self; 5] = [
        Self::Caja,
        Self::Transferencia,
        Self::Echeq,
        Self::Tarjeta,
        Self::Ctacte,
    ];

    /// Stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Caja => "caja",
            Self::Transferencia => "transferencia",
            Self::Echeq => "echeq",
            Self::Tarjeta => "tarjeta",
            Self::Ctacte => "ctacte",
        }
    }

    /// Fields an instrument of this medio must carry before submission.
    #[must_use]
    pub const fn required_fields(self) -> &'static [InstrumentFieldName] {
        match self {
            Self::Caja => &[InstrumentFieldName::CajaId],
            Self::Transferencia => &[InstrumentFieldName::Banco],
            Self::Echeq => &[InstrumentFieldName::Banco, InstrumentFieldName::Vencimiento],
            Self::Tarjeta => &[
                InstrumentFieldName::TarjetaTipo,
                InstrumentFieldName::TarjetaMarca,
                InstrumentFieldName::Cupon,
            ],
            Self::Ctacte => &[],
        }
    }

    /// Whether this medio may fund a payment.
    #[must_use]
    pub const fn can_pay(self) -> bool {
        !matches!(self, Self::Ctacte)
    }

    /// Guesses the medio from a forma de pago display name.
    ///
    /// Used when the configured catalog omits an explicit medio.
    #[must_use]
    pub fn infer_from_nombre(nombre: &str) -> Option<Self> {
        let n = nombre.to_lowercase();
        if n.contains("cta cte") || n.contains("cta. cte") || n.contains("cuenta corriente") {
            Some(Self::Ctacte)
        } else if n.contains("echeq") || n.contains("e-cheq") || n.contains("cheque") {
            Some(Self::Echeq)
        } else if n.contains("transf") {
            Some(Self::Transferencia)
        } else if n.contains("tarjeta") || n.contains("debito") || n.contains("credito") {
            Some(Self::Tarjeta)
        } else if n.contains("efectivo") || n.contains("caja") {
            Some(Self::Caja)
        } else {
            None
        }
    }
}

impl fmt::Display for Medio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Medio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "caja" | "efectivo" => Ok(Self::Caja),
            "transferencia" => Ok(Self::Transferencia),
            "echeq" => Ok(Self::Echeq),
            "tarjeta" => Ok(Self::Tarjeta),
            "ctacte" | "cta cte" | "cuenta corriente" => Ok(Self::Ctacte),
            other => Err(format!("Unknown medio '{other}'")),
        }
    }
}

/// Medium-specific instrument fields.
///
/// Which of these matter depends on the [`Medio`]; [`MedioFields::retain_for`]
/// drops everything that does not belong to a given medio.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedioFields {
    /// Open caja session (caja)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caja_id: Option<i64>,
    /// Bank (transferencia, echeq)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banco: Option<String>,
    /// Bank reference or check number (transferencia, echeq)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referencia: Option<String>,
    /// Due date (echeq)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vencimiento: Option<NaiveDate>,
    /// Card type (tarjeta)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tarjeta_tipo: Option<String>,
    /// Card brand (tarjeta)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tarjeta_marca: Option<String>,
    /// Voucher number (tarjeta)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cupon: Option<String>,
    /// Installment plan (tarjeta)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
}

impl MedioFields {
    /// First required field of `medio` that is absent, if any.
    #[must_use]
    pub fn missing(&self, medio: Medio) -> Option<InstrumentFieldName> {
        medio
            .required_fields()
            .iter()
            .copied()
            .find(|field| !self.has(*field))
    }

    fn has(&self, field: InstrumentFieldName) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        match field {
            InstrumentFieldName::CajaId => self.caja_id.is_some(),
            InstrumentFieldName::Banco => filled(&self.banco),
            InstrumentFieldName::Vencimiento => self.vencimiento.is_some(),
            InstrumentFieldName::TarjetaTipo => filled(&self.tarjeta_tipo),
            InstrumentFieldName::TarjetaMarca => filled(&self.tarjeta_marca),
            InstrumentFieldName::Cupon => filled(&self.cupon),
        }
    }

    /// Keeps only the fields that belong to `medio`.
    #[must_use]
    pub fn retain_for(self, medio: Medio) -> Self {
        match medio {
            Medio::Caja => Self {
                caja_id: self.caja_id,
                ..Self::default()
            },
            Medio::Transferencia => Self {
                banco: self.banco,
                referencia: self.referencia,
                ..Self::default()
            },
            Medio::Echeq => Self {
                banco: self.banco,
                referencia: self.referencia,
                vencimiento: self.vencimiento,
                ..Self::default()
            },
            Medio::Tarjeta => Self {
                tarjeta_tipo: self.tarjeta_tipo,
                tarjeta_marca: self.tarjeta_marca,
                cupon: self.cupon,
                plan: self.plan,
                ..Self::default()
            },
            Medio::Ctacte => Self::default(),
        }
    }
}

/// Which side of the ledger a counterparty sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterpartyKind {
    /// Customer; obligations are receivables
    Cliente,
    /// Vendor; obligations are payables
    Proveedor,
}

impl CounterpartyKind {
    /// Stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cliente => "cliente",
            Self::Proveedor => "proveedor",
        }
    }

    /// Movement direction when settling this kind's obligations.
    #[must_use]
    pub const fn movimiento_tipo(self) -> &'static str {
        match self {
            Self::Cliente => "ingreso",
            Self::Proveedor => "egreso",
        }
    }
}

impl fmt::Display for CounterpartyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CounterpartyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cliente" => Ok(Self::Cliente),
            "proveedor" => Ok(Self::Proveedor),
            other => Err(format!("Unknown contraparte tipo '{other}'")),
        }
    }
}

/// A selected counterparty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Counterparty {
    /// Cliente or proveedor
    pub kind: CounterpartyKind,
    /// Identifier within its kind
    pub id: i64,
}

impl Counterparty {
    /// Shorthand for a cliente.
    #[must_use]
    pub const fn cliente(id: i64) -> Self {
        Self {
            kind: CounterpartyKind::Cliente,
            id,
        }
    }

    /// Shorthand for a proveedor.
    #[must_use]
    pub const fn proveedor(id: i64) -> Self {
        Self {
            kind: CounterpartyKind::Proveedor,
            id,
        }
    }
}

impl fmt::Display for Counterparty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.kind, self.id)
    }
}

//! Payment allocation form.
//!
//! An [`AllocationForm`] holds one settlement being prepared by an operator:
//! which obligations of a counterparty are being paid and by how much, and the
//! instruments (plus an optional advance) that fund it. Nothing here touches
//! the database; lists are supplied by the caller after fetching them from
//! [`crate::core::tesoreria`], and [`AllocationForm::build_request`] produces
//! the single body that is then applied.
//!
//! The form stays intact after any error so it can be corrected and
//! submitted again.

use crate::{
    core::medio::{Counterparty, CounterpartyKind, InstrumentFieldName, Medio, MedioFields},
    entities::{anticipo, obligacion},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Reasons a form cannot be edited or submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No cliente/proveedor chosen
    #[error("No counterparty selected")]
    NoCounterparty,

    /// Every applied amount is zero
    #[error("Nothing to apply: set an amount on at least one obligation")]
    NothingApplied,

    /// Instruments plus advance do not cover the applied total
    #[error("Payments ({funding}) do not cover the applied total ({applied})")]
    InsufficientFunding {
        /// Σ applied
        applied: Decimal,
        /// Σ instruments + advance saldo
        funding: Decimal,
    },

    /// A row has no forma de pago yet
    #[error("Payment #{} has no forma de pago", .index + 1)]
    MissingFormaPago {
        /// Row index
        index: usize,
    },

    /// A forma de pago id is not in the catalog
    #[error("Forma de pago {formapago_id} is not available")]
    UnknownFormaPago {
        /// Offending id
        formapago_id: i64,
    },

    /// Cuenta corriente chosen as a payment instrument
    #[error("Payment #{}: cuenta corriente cannot be used to pay", .index + 1)]
    CtacteInstrument {
        /// Row index
        index: usize,
    },

    /// A medium-required field is empty
    #[error("Payment #{} is missing {field}", .index + 1)]
    MissingField {
        /// Row index
        index: usize,
        /// Which field
        field: InstrumentFieldName,
    },

    /// Instrument amount is zero or negative
    #[error("Payment #{} must have an amount greater than zero", .index + 1)]
    NonPositiveAmount {
        /// Row index
        index: usize,
    },

    /// No instrument row at that index
    #[error("There is no payment #{}", .index + 1)]
    InstrumentOutOfRange {
        /// Row index
        index: usize,
    },

    /// Amount, date and detail come from an attached movement
    #[error("Payment #{} uses an existing movement and cannot be edited", .index + 1)]
    LockedInstrument {
        /// Row index
        index: usize,
    },

    /// Obligation id is not in the fetched list
    #[error("Obligation {obligation_id} is not pending for this counterparty")]
    UnknownObligation {
        /// Offending id
        obligation_id: i64,
    },

    /// Advance id is not in the fetched list or has no saldo
    #[error("Advance {advance_id} is not available")]
    UnknownAdvance {
        /// Offending id
        advance_id: i64,
    },

    /// Movement id is not in the fetched list
    #[error("Movement {movement_id} is not available")]
    UnknownMovement {
        /// Offending id
        movement_id: i64,
    },

    /// Movement medio differs from the row's medio
    #[error("Movement {movement_id} is {found}, payment uses {expected}")]
    MovementMedioMismatch {
        /// Offending id
        movement_id: i64,
        /// Row medio
        expected: Medio,
        /// Movement medio
        found: Medio,
    },

    /// Movement already bound to another row
    #[error("Movement {movement_id} is already used by payment #{}", .index + 1)]
    MovementAlreadyAttached {
        /// Offending id
        movement_id: i64,
        /// Row holding it
        index: usize,
    },
}

type FormResult<T> = std::result::Result<T, ValidationError>;

/// An obligation as seen by the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
    /// Obligation id
    pub id: i64,
    /// Issue date
    pub fecha: NaiveDate,
    /// Remaining balance
    pub saldo: Decimal,
    /// Originating payment order
    pub ordenpago_id: Option<i64>,
    /// Agreed forma de pago
    pub formapago_id: Option<i64>,
}

impl From<obligacion::Model> for Obligation {
    fn from(model: obligacion::Model) -> Self {
        Self {
            id: model.id,
            fecha: model.fecha,
            saldo: model.saldo,
            ordenpago_id: model.ordenpago_id,
            formapago_id: model.formapago_id,
        }
    }
}

/// An advance available as funding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advance {
    /// Advance id
    pub id: i64,
    /// Original amount
    pub importe: Decimal,
    /// Already applied
    pub aplicado: Decimal,
}

impl Advance {
    /// Remaining credit.
    #[must_use]
    pub fn saldo(&self) -> Decimal {
        self.importe - self.aplicado
    }
}

impl From<anticipo::Model> for Advance {
    fn from(model: anticipo::Model) -> Self {
        Self {
            id: model.id,
            importe: model.importe,
            aplicado: model.aplicado,
        }
    }
}

/// An unapplied treasury movement an instrument row can reuse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableMovement {
    /// Movement id
    pub id: i64,
    /// Medio it was recorded with
    pub medio: Medio,
    /// Amount
    pub monto: Decimal,
    /// Value date
    pub fecha: NaiveDate,
    /// Detail
    pub detalle: Option<String>,
}

/// One payment instrument being edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentRow {
    /// Chosen forma de pago
    pub formapago_id: Option<i64>,
    /// Medio resolved from the forma de pago
    pub medio: Option<Medio>,
    /// Amount
    pub monto: Decimal,
    /// Value date
    pub fecha: Option<NaiveDate>,
    /// Detail
    pub detalle: Option<String>,
    /// Medium-specific fields
    pub fields: MedioFields,
    /// Existing movement this row reuses
    pub existing_ref: Option<i64>,
}

impl InstrumentRow {
    /// Whether amount, date and detail are derived from an existing movement.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.existing_ref.is_some()
    }
}

/// A single edit to an instrument row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrumentField {
    /// Choose the forma de pago
    FormaPago(i64),
    /// Amount
    Monto(Decimal),
    /// Value date
    Fecha(NaiveDate),
    /// Detail
    Detalle(String),
    /// Bank
    Banco(String),
    /// Reference / check number
    Referencia(String),
    /// Due date
    Vencimiento(NaiveDate),
    /// Card type
    TarjetaTipo(String),
    /// Card brand
    TarjetaMarca(String),
    /// Voucher
    Cupon(String),
    /// Installment plan
    Plan(String),
}

/// One allocation line of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationLine {
    /// Obligation being settled
    pub obligation_id: i64,
    /// Amount applied to it
    pub amount: Decimal,
}

/// A normalized payment instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInstrument {
    /// Forma de pago
    pub formapago_id: i64,
    /// Medio it resolves to
    pub medio: Medio,
    /// Amount
    pub monto: Decimal,
    /// Existing movement reused instead of creating a new one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_ref: Option<i64>,
    /// Value date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fecha: Option<NaiveDate>,
    /// Detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detalle: Option<String>,
    /// Fields that belong to `medio`
    #[serde(flatten)]
    pub fields: MedioFields,
}

/// The body submitted to the treasury.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRequest {
    /// Cliente or proveedor
    pub counterparty_kind: CounterpartyKind,
    /// Counterparty id
    pub counterparty_id: i64,
    /// Operation date
    pub fecha: NaiveDate,
    /// Operator notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observaciones: Option<String>,
    /// What gets settled
    pub allocations: Vec<AllocationLine>,
    /// What funds it
    pub payments: Vec<PaymentInstrument>,
    /// Advance used as funding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advance_id: Option<i64>,
    /// Common originating payment order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordenpago_id: Option<i64>,
}

impl AllocationRequest {
    /// The counterparty this request settles.
    #[must_use]
    pub const fn counterparty(&self) -> Counterparty {
        Counterparty {
            kind: self.counterparty_kind,
            id: self.counterparty_id,
        }
    }

    /// Σ allocation amounts.
    #[must_use]
    pub fn total_applied(&self) -> Decimal {
        self.allocations.iter().map(|a| a.amount).sum()
    }

    /// Σ instrument amounts.
    #[must_use]
    pub fn total_payments(&self) -> Decimal {
        self.payments.iter().map(|p| p.monto).sum()
    }
}

/// In-memory allocation state for one settlement.
#[derive(Debug, Clone)]
pub struct AllocationForm {
    catalog: HashMap<i64, Medio>,
    open_caja_id: Option<i64>,
    fecha: NaiveDate,
    observaciones: Option<String>,
    counterparty: Option<Counterparty>,
    obligations: Vec<Obligation>,
    applied: HashMap<i64, Decimal>,
    advances: Vec<Advance>,
    selected_advance: Option<i64>,
    available_movements: Vec<AvailableMovement>,
    instruments: Vec<InstrumentRow>,
}

impl AllocationForm {
    /// Creates an empty form.
    ///
    /// `catalog` maps forma de pago ids to their medio; `open_caja_id` is the
    /// caja session currently open for the branch, if any.
    #[must_use]
    pub fn new(catalog: HashMap<i64, Medio>, fecha: NaiveDate, open_caja_id: Option<i64>) -> Self {
        Self {
            catalog,
            open_caja_id,
            fecha,
            observaciones: None,
            counterparty: None,
            obligations: Vec::new(),
            applied: HashMap::new(),
            advances: Vec::new(),
            selected_advance: None,
            available_movements: Vec::new(),
            instruments: Vec::new(),
        }
    }

    /// Sets operator notes.
    pub fn set_observaciones(&mut self, observaciones: Option<String>) {
        self.observaciones = observaciones.filter(|s| !s.trim().is_empty());
    }

    /// Changes the operation date.
    pub const fn set_fecha(&mut self, fecha: NaiveDate) {
        self.fecha = fecha;
    }

    /// Updates the open caja session used to seed cash rows.
    pub const fn set_open_caja(&mut self, caja_id: Option<i64>) {
        self.open_caja_id = caja_id;
    }

    /// Selects a counterparty with its freshly fetched obligations and advances.
    ///
    /// Applied amounts, the advance choice and the available movements all
    /// belonged to the previous counterparty and are dropped. Rows bound to
    /// an existing movement are released.
    pub fn select_counterparty(
        &mut self,
        counterparty: Counterparty,
        obligations: Vec<Obligation>,
        advances: Vec<Advance>,
    ) {
        self.counterparty = Some(counterparty);
        self.obligations = obligations;
        self.advances = advances;
        self.applied.clear();
        self.selected_advance = None;
        self.available_movements.clear();
        for row in &mut self.instruments {
            if row.existing_ref.take().is_some() {
                row.monto = Decimal::ZERO;
            }
        }
    }

    /// Selected counterparty.
    #[must_use]
    pub const fn counterparty(&self) -> Option<Counterparty> {
        self.counterparty
    }

    /// Obligations currently loaded.
    #[must_use]
    pub fn obligations(&self) -> &[Obligation] {
        &self.obligations
    }

    /// Advances currently loaded.
    #[must_use]
    pub fn advances(&self) -> &[Advance] {
        &self.advances
    }

    /// Instrument rows.
    #[must_use]
    pub fn instruments(&self) -> &[InstrumentRow] {
        &self.instruments
    }

    /// Sets the amount to apply to one obligation, clamped into `[0, saldo]`.
    ///
    /// Returns the amount actually stored.
    pub fn set_applied(&mut self, obligation_id: i64, amount: Decimal) -> FormResult<Decimal> {
        let saldo = self
            .obligations
            .iter()
            .find(|o| o.id == obligation_id)
            .map(|o| o.saldo)
            .ok_or(ValidationError::UnknownObligation { obligation_id })?;

        let clamped = amount.max(Decimal::ZERO).min(saldo.max(Decimal::ZERO));
        if clamped.is_zero() {
            self.applied.remove(&obligation_id);
        } else {
            self.applied.insert(obligation_id, clamped);
        }
        Ok(clamped)
    }

    /// Amount currently applied to an obligation.
    #[must_use]
    pub fn applied(&self, obligation_id: i64) -> Decimal {
        self.applied
            .get(&obligation_id)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Σ applied across obligations.
    #[must_use]
    pub fn total_applied(&self) -> Decimal {
        self.applied.values().copied().sum()
    }

    /// Spreads `amount` over the obligations oldest-first.
    ///
    /// Previous applied amounts are replaced. Returns whatever could not be
    /// placed because every saldo was filled.
    pub fn distribute(&mut self, amount: Decimal) -> Decimal {
        self.applied.clear();
        let mut order: Vec<&Obligation> = self.obligations.iter().collect();
        order.sort_by_key(|o| (o.fecha, o.id));

        let mut remaining = amount.max(Decimal::ZERO);
        for obligation in order {
            if remaining.is_zero() {
                break;
            }
            let take = remaining.min(obligation.saldo.max(Decimal::ZERO));
            if take > Decimal::ZERO {
                self.applied.insert(obligation.id, take);
                remaining -= take;
            }
        }
        remaining
    }

    /// Appends an empty instrument row dated with the form's date.
    pub fn add_instrument(&mut self) -> usize {
        self.instruments.push(InstrumentRow {
            fecha: Some(self.fecha),
            ..InstrumentRow::default()
        });
        self.instruments.len() - 1
    }

    /// Removes an instrument row.
    pub fn remove_instrument(&mut self, index: usize) -> FormResult<InstrumentRow> {
        if index >= self.instruments.len() {
            return Err(ValidationError::InstrumentOutOfRange { index });
        }
        Ok(self.instruments.remove(index))
    }

    /// Applies one edit to an instrument row.
    ///
    /// Choosing a forma de pago resets the medium-specific fields and releases
    /// any existing movement; for cash it seeds the open caja session.
    pub fn update_instrument(&mut self, index: usize, field: InstrumentField) -> FormResult<()> {
        let open_caja_id = self.open_caja_id;
        let medio_for = |id: i64| {
            self.catalog
                .get(&id)
                .copied()
                .ok_or(ValidationError::UnknownFormaPago { formapago_id: id })
        };
        let resolved = match &field {
            InstrumentField::FormaPago(id) => Some(medio_for(*id)?),
            _ => None,
        };

        let row = self
            .instruments
            .get_mut(index)
            .ok_or(ValidationError::InstrumentOutOfRange { index })?;

        if let (InstrumentField::FormaPago(id), Some(medio)) = (&field, resolved) {
            if row.existing_ref.take().is_some() {
                row.monto = Decimal::ZERO;
                row.detalle = None;
            }
            row.formapago_id = Some(*id);
            row.medio = Some(medio);
            row.fields = MedioFields {
                caja_id: if medio == Medio::Caja {
                    open_caja_id
                } else {
                    None
                },
                ..MedioFields::default()
            };
            return Ok(());
        }

        if row.is_locked() {
            return Err(ValidationError::LockedInstrument { index });
        }

        let text = |s: String| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        match field {
            InstrumentField::FormaPago(_) => {}
            InstrumentField::Monto(monto) => row.monto = monto,
            InstrumentField::Fecha(fecha) => row.fecha = Some(fecha),
            InstrumentField::Detalle(s) => row.detalle = text(s),
            InstrumentField::Banco(s) => row.fields.banco = text(s),
            InstrumentField::Referencia(s) => row.fields.referencia = text(s),
            InstrumentField::Vencimiento(d) => row.fields.vencimiento = Some(d),
            InstrumentField::TarjetaTipo(s) => row.fields.tarjeta_tipo = text(s),
            InstrumentField::TarjetaMarca(s) => row.fields.tarjeta_marca = text(s),
            InstrumentField::Cupon(s) => row.fields.cupon = text(s),
            InstrumentField::Plan(s) => row.fields.plan = text(s),
        }
        Ok(())
    }

    /// Replaces the list of unapplied movements rows may reuse.
    ///
    /// Rows bound to a movement that is no longer listed are released.
    pub fn set_available_movements(&mut self, movements: Vec<AvailableMovement>) {
        self.available_movements = movements;
        for row in &mut self.instruments {
            let still_listed = row
                .existing_ref
                .is_some_and(|id| self.available_movements.iter().any(|m| m.id == id));
            if row.existing_ref.is_some() && !still_listed {
                row.existing_ref = None;
                row.monto = Decimal::ZERO;
            }
        }
    }

    /// Binds a row to an existing unapplied movement of the same medio.
    ///
    /// The row takes the movement's amount, date and detail and becomes
    /// read-only for them; its medium-specific fields are cleared.
    pub fn attach_existing_movement(&mut self, index: usize, movement_id: i64) -> FormResult<()> {
        if let Some(holder) = self
            .instruments
            .iter()
            .position(|r| r.existing_ref == Some(movement_id))
            .filter(|&i| i != index)
        {
            return Err(ValidationError::MovementAlreadyAttached {
                movement_id,
                index: holder,
            });
        }

        let movement = self
            .available_movements
            .iter()
            .find(|m| m.id == movement_id)
            .ok_or(ValidationError::UnknownMovement { movement_id })?;

        let row = self
            .instruments
            .get_mut(index)
            .ok_or(ValidationError::InstrumentOutOfRange { index })?;
        let medio = row
            .medio
            .ok_or(ValidationError::MissingFormaPago { index })?;
        if movement.medio != medio {
            return Err(ValidationError::MovementMedioMismatch {
                movement_id,
                expected: medio,
                found: movement.medio,
            });
        }

        row.existing_ref = Some(movement.id);
        row.monto = movement.monto;
        row.fecha = Some(movement.fecha);
        row.detalle.clone_from(&movement.detalle);
        row.fields = MedioFields::default();
        Ok(())
    }

    /// Releases a row from its existing movement.
    pub fn detach_existing_movement(&mut self, index: usize) -> FormResult<()> {
        let row = self
            .instruments
            .get_mut(index)
            .ok_or(ValidationError::InstrumentOutOfRange { index })?;
        if row.existing_ref.take().is_some() {
            row.monto = Decimal::ZERO;
            row.detalle = None;
        }
        Ok(())
    }

    /// Uses an existing advance as (part of) the funding.
    pub fn use_advance(&mut self, advance_id: i64) -> FormResult<()> {
        self.advances
            .iter()
            .find(|a| a.id == advance_id && a.saldo() > Decimal::ZERO)
            .ok_or(ValidationError::UnknownAdvance { advance_id })?;
        self.selected_advance = Some(advance_id);
        Ok(())
    }

    /// Stops using an advance.
    pub const fn clear_advance(&mut self) {
        self.selected_advance = None;
    }

    /// Advance chosen as funding.
    #[must_use]
    pub fn selected_advance(&self) -> Option<&Advance> {
        self.selected_advance
            .and_then(|id| self.advances.iter().find(|a| a.id == id))
    }

    /// Σ instrument amounts.
    #[must_use]
    pub fn total_instruments(&self) -> Decimal {
        self.instruments.iter().map(|r| r.monto).sum()
    }

    /// Σ instrument amounts plus the selected advance saldo.
    #[must_use]
    pub fn total_funding(&self) -> Decimal {
        self.total_instruments() + self.selected_advance().map_or(Decimal::ZERO, Advance::saldo)
    }

    /// Checks that the form can be submitted.
    pub fn validate(&self) -> FormResult<()> {
        if self.counterparty.is_none() {
            return Err(ValidationError::NoCounterparty);
        }

        let applied = self.total_applied();
        if applied <= Decimal::ZERO {
            return Err(ValidationError::NothingApplied);
        }

        let funding = self.total_funding();
        if funding < applied {
            return Err(ValidationError::InsufficientFunding { applied, funding });
        }

        for (index, row) in self.instruments.iter().enumerate() {
            let medio = row
                .medio
                .ok_or(ValidationError::MissingFormaPago { index })?;
            if !medio.can_pay() {
                return Err(ValidationError::CtacteInstrument { index });
            }
            if !row.is_locked() {
                if let Some(field) = row.fields.missing(medio) {
                    return Err(ValidationError::MissingField { index, field });
                }
            }
            if row.monto <= Decimal::ZERO {
                return Err(ValidationError::NonPositiveAmount { index });
            }
        }

        Ok(())
    }

    /// The originating payment order shared by the selected obligations.
    ///
    /// Present only when the distinct non-null order ids among obligations
    /// with a positive applied amount number exactly one.
    #[must_use]
    pub fn common_ordenpago_id(&self) -> Option<i64> {
        let ids: BTreeSet<i64> = self
            .obligations
            .iter()
            .filter(|o| self.applied(o.id) > Decimal::ZERO)
            .filter_map(|o| o.ordenpago_id)
            .collect();
        if ids.len() == 1 {
            ids.into_iter().next()
        } else {
            None
        }
    }

    /// Validates and produces the normalized request body.
    pub fn build_request(&self) -> FormResult<AllocationRequest> {
        self.validate()?;
        let counterparty = self.counterparty.ok_or(ValidationError::NoCounterparty)?;

        let allocations = self
            .obligations
            .iter()
            .filter_map(|o| {
                let amount = self.applied(o.id);
                (amount > Decimal::ZERO).then_some(AllocationLine {
                    obligation_id: o.id,
                    amount,
                })
            })
            .collect();

        let payments = self
            .instruments
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let formapago_id = row
                    .formapago_id
                    .ok_or(ValidationError::MissingFormaPago { index })?;
                let medio = row
                    .medio
                    .ok_or(ValidationError::MissingFormaPago { index })?;
                Ok(if row.is_locked() {
                    PaymentInstrument {
                        formapago_id,
                        medio,
                        monto: row.monto,
                        existing_ref: row.existing_ref,
                        fecha: None,
                        detalle: None,
                        fields: MedioFields::default(),
                    }
                } else {
                    PaymentInstrument {
                        formapago_id,
                        medio,
                        monto: row.monto,
                        existing_ref: None,
                        fecha: row.fecha,
                        detalle: row.detalle.clone(),
                        fields: row.fields.clone().retain_for(medio),
                    }
                })
            })
            .collect::<FormResult<Vec<_>>>()?;

        Ok(AllocationRequest {
            counterparty_kind: counterparty.kind,
            counterparty_id: counterparty.id,
            fecha: self.fecha,
            observaciones: self.observaciones.clone(),
            allocations,
            payments,
            advance_id: self.selected_advance,
            ordenpago_id: self.common_ordenpago_id(),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use rust_decimal_macros::dec;

    const EFECTIVO: i64 = 1;
    const TRANSFERENCIA: i64 = 2;
    const ECHEQ: i64 = 3;
    const TARJETA: i64 = 4;
    const CTA_CTE: i64 = 5;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn catalog() -> HashMap<i64, Medio> {
        HashMap::from([
            (EFECTIVO, Medio::Caja),
            (TRANSFERENCIA, Medio::Transferencia),
            (ECHEQ, Medio::Echeq),
            (TARJETA, Medio::Tarjeta),
            (CTA_CTE, Medio::Ctacte),
        ])
    }

    fn obligation(id: i64, d: u32, saldo: Decimal, ordenpago_id: Option<i64>) -> Obligation {
        Obligation {
            id,
            fecha: date(d),
            saldo,
            ordenpago_id,
            formapago_id: None,
        }
    }

    fn form_with_obligations() -> AllocationForm {
        let mut form = AllocationForm::new(catalog(), date(20), Some(7));
        form.select_counterparty(
            Counterparty::cliente(42),
            vec![
                obligation(10, 5, dec!(100), None),
                obligation(11, 1, dec!(250.50), None),
                obligation(12, 9, dec!(80), None),
            ],
            vec![Advance {
                id: 90,
                importe: dec!(500),
                aplicado: dec!(450),
            }],
        );
        form
    }

    fn cash_row(form: &mut AllocationForm, monto: Decimal) -> usize {
        let i = form.add_instrument();
        form.update_instrument(i, InstrumentField::FormaPago(EFECTIVO))
            .unwrap();
        form.update_instrument(i, InstrumentField::Monto(monto))
            .unwrap();
        i
    }

    #[test]
    fn test_set_applied_clamps_to_saldo() {
        let mut form = form_with_obligations();

        assert_eq!(form.set_applied(10, dec!(150)).unwrap(), dec!(100));
        assert_eq!(form.set_applied(11, dec!(-5)).unwrap(), dec!(0));
        assert_eq!(form.set_applied(12, dec!(30.25)).unwrap(), dec!(30.25));

        assert_eq!(form.applied(10), dec!(100));
        assert_eq!(form.applied(11), dec!(0));
        assert_eq!(form.total_applied(), dec!(130.25));

        for o in form.obligations() {
            assert!(form.applied(o.id) >= Decimal::ZERO);
            assert!(form.applied(o.id) <= o.saldo);
        }
    }

    #[test]
    fn test_set_applied_unknown_obligation() {
        let mut form = form_with_obligations();
        assert_eq!(
            form.set_applied(999, dec!(1)),
            Err(ValidationError::UnknownObligation { obligation_id: 999 })
        );
    }

    #[test]
    fn test_distribute_fills_oldest_first() {
        let mut form = form_with_obligations();
        let leftover = form.distribute(dec!(300));

        assert_eq!(leftover, dec!(0));
        assert_eq!(form.applied(11), dec!(250.50));
        assert_eq!(form.applied(10), dec!(49.50));
        assert_eq!(form.applied(12), dec!(0));

        let leftover = form.distribute(dec!(1000));
        assert_eq!(leftover, dec!(569.50));
        assert_eq!(form.total_applied(), dec!(430.50));
    }

    #[test]
    fn test_changing_counterparty_resets_applied_and_advance() {
        let mut form = form_with_obligations();
        form.set_applied(10, dec!(50)).unwrap();
        form.use_advance(90).unwrap();

        form.select_counterparty(
            Counterparty::cliente(43),
            vec![obligation(20, 1, dec!(10), None)],
            Vec::new(),
        );

        assert_eq!(form.total_applied(), dec!(0));
        assert!(form.selected_advance().is_none());
        assert_eq!(form.counterparty(), Some(Counterparty::cliente(43)));
    }

    #[test]
    fn test_cash_row_seeds_open_caja() {
        let mut form = form_with_obligations();
        let i = cash_row(&mut form, dec!(10));
        assert_eq!(form.instruments()[i].fields.caja_id, Some(7));
        assert_eq!(form.instruments()[i].medio, Some(Medio::Caja));

        form.set_open_caja(None);
        let j = cash_row(&mut form, dec!(10));
        assert_eq!(form.instruments()[j].fields.caja_id, None);
    }

    #[test]
    fn test_selecting_forma_pago_clears_existing_ref_and_fields() {
        let mut form = form_with_obligations();
        let i = form.add_instrument();
        form.update_instrument(i, InstrumentField::FormaPago(ECHEQ))
            .unwrap();
        form.update_instrument(i, InstrumentField::Banco("Galicia".to_string()))
            .unwrap();
        form.update_instrument(i, InstrumentField::Vencimiento(date(30)))
            .unwrap();

        form.set_available_movements(vec![AvailableMovement {
            id: 500,
            medio: Medio::Echeq,
            monto: dec!(75),
            fecha: date(2),
            detalle: Some("echeq 0001".to_string()),
        }]);
        form.attach_existing_movement(i, 500).unwrap();
        assert_eq!(form.instruments()[i].existing_ref, Some(500));
        assert_eq!(form.instruments()[i].monto, dec!(75));
        assert_eq!(form.instruments()[i].fields, MedioFields::default());

        form.update_instrument(i, InstrumentField::FormaPago(TRANSFERENCIA))
            .unwrap();
        let row = &form.instruments()[i];
        assert_eq!(row.existing_ref, None);
        assert_eq!(row.monto, dec!(0));
        assert_eq!(row.fields, MedioFields::default());
        assert_eq!(row.medio, Some(Medio::Transferencia));
    }

    #[test]
    fn test_reselecting_forma_pago_resets_medium_fields_without_movement() {
        let mut form = form_with_obligations();
        let i = form.add_instrument();
        form.update_instrument(i, InstrumentField::FormaPago(TARJETA))
            .unwrap();
        form.update_instrument(i, InstrumentField::Cupon("123".to_string()))
            .unwrap();
        form.update_instrument(i, InstrumentField::FormaPago(TARJETA))
            .unwrap();
        assert_eq!(form.instruments()[i].fields.cupon, None);
    }

    #[test]
    fn test_attached_row_is_read_only() {
        let mut form = form_with_obligations();
        let i = form.add_instrument();
        form.update_instrument(i, InstrumentField::FormaPago(TRANSFERENCIA))
            .unwrap();
        form.set_available_movements(vec![AvailableMovement {
            id: 501,
            medio: Medio::Transferencia,
            monto: dec!(40),
            fecha: date(3),
            detalle: None,
        }]);
        form.attach_existing_movement(i, 501).unwrap();

        assert_eq!(
            form.update_instrument(i, InstrumentField::Monto(dec!(99))),
            Err(ValidationError::LockedInstrument { index: i })
        );
        assert_eq!(form.instruments()[i].monto, dec!(40));

        form.detach_existing_movement(i).unwrap();
        form.update_instrument(i, InstrumentField::Monto(dec!(99)))
            .unwrap();
        assert_eq!(form.instruments()[i].monto, dec!(99));
    }

    #[test]
    fn test_attach_rejects_medio_mismatch_and_double_use() {
        let mut form = form_with_obligations();
        form.set_available_movements(vec![AvailableMovement {
            id: 502,
            medio: Medio::Transferencia,
            monto: dec!(40),
            fecha: date(3),
            detalle: None,
        }]);

        let cash = cash_row(&mut form, dec!(1));
        assert_eq!(
            form.attach_existing_movement(cash, 502),
            Err(ValidationError::MovementMedioMismatch {
                movement_id: 502,
                expected: Medio::Caja,
                found: Medio::Transferencia,
            })
        );

        let a = form.add_instrument();
        form.update_instrument(a, InstrumentField::FormaPago(TRANSFERENCIA))
            .unwrap();
        form.attach_existing_movement(a, 502).unwrap();
        let b = form.add_instrument();
        form.update_instrument(b, InstrumentField::FormaPago(TRANSFERENCIA))
            .unwrap();
        assert_eq!(
            form.attach_existing_movement(b, 502),
            Err(ValidationError::MovementAlreadyAttached {
                movement_id: 502,
                index: a,
            })
        );
        assert_eq!(
            form.attach_existing_movement(b, 999),
            Err(ValidationError::UnknownMovement { movement_id: 999 })
        );
    }

    #[test]
    fn test_validate_requires_counterparty() {
        let form = AllocationForm::new(catalog(), date(1), None);
        assert_eq!(form.validate(), Err(ValidationError::NoCounterparty));
    }

    #[test]
    fn test_validate_blocks_zero_applied() {
        let mut form = form_with_obligations();
        cash_row(&mut form, dec!(10));
        assert_eq!(form.validate(), Err(ValidationError::NothingApplied));
    }

    #[test]
    fn test_validate_blocks_insufficient_funding() {
        let mut form = form_with_obligations();
        form.set_applied(10, dec!(100)).unwrap();
        cash_row(&mut form, dec!(40));
        form.use_advance(90).unwrap();

        assert_eq!(
            form.validate(),
            Err(ValidationError::InsufficientFunding {
                applied: dec!(100),
                funding: dec!(90),
            })
        );

        cash_row(&mut form, dec!(10));
        assert_eq!(form.validate(), Ok(()));
    }

    #[test]
    fn test_validate_blocks_ctacte() {
        let mut form = form_with_obligations();
        form.set_applied(10, dec!(10)).unwrap();
        let i = form.add_instrument();
        form.update_instrument(i, InstrumentField::FormaPago(CTA_CTE))
            .unwrap();
        form.update_instrument(i, InstrumentField::Monto(dec!(10)))
            .unwrap();
        assert_eq!(
            form.validate(),
            Err(ValidationError::CtacteInstrument { index: i })
        );
    }

    #[test]
    fn test_validate_requires_medium_fields() {
        let mut form = form_with_obligations();
        form.set_applied(10, dec!(10)).unwrap();
        let i = form.add_instrument();
        form.update_instrument(i, InstrumentField::FormaPago(ECHEQ))
            .unwrap();
        form.update_instrument(i, InstrumentField::Monto(dec!(10)))
            .unwrap();
        form.update_instrument(i, InstrumentField::Banco("Nación".to_string()))
            .unwrap();
        assert_eq!(
            form.validate(),
            Err(ValidationError::MissingField {
                index: i,
                field: InstrumentFieldName::Vencimiento,
            })
        );

        form.update_instrument(i, InstrumentField::Vencimiento(date(28)))
            .unwrap();
        assert_eq!(form.validate(), Ok(()));
    }

    #[test]
    fn test_validate_cash_without_open_caja() {
        let mut form = form_with_obligations();
        form.set_open_caja(None);
        form.set_applied(10, dec!(10)).unwrap();
        let i = cash_row(&mut form, dec!(10));
        assert_eq!(
            form.validate(),
            Err(ValidationError::MissingField {
                index: i,
                field: InstrumentFieldName::CajaId,
            })
        );
    }

    #[test]
    fn test_validate_rejects_non_positive_instrument() {
        let mut form = form_with_obligations();
        form.set_applied(10, dec!(10)).unwrap();
        cash_row(&mut form, dec!(20));
        let i = cash_row(&mut form, dec!(0));
        assert_eq!(
            form.validate(),
            Err(ValidationError::NonPositiveAmount { index: i })
        );
    }

    #[test]
    fn test_common_ordenpago_id_requires_exactly_one() {
        let mut form = AllocationForm::new(catalog(), date(20), Some(7));
        form.select_counterparty(
            Counterparty::proveedor(8),
            vec![
                obligation(1, 1, dec!(10), Some(300)),
                obligation(2, 2, dec!(10), Some(300)),
                obligation(3, 3, dec!(10), None),
                obligation(4, 4, dec!(10), Some(301)),
            ],
            Vec::new(),
        );

        assert_eq!(form.common_ordenpago_id(), None);

        form.set_applied(1, dec!(5)).unwrap();
        form.set_applied(2, dec!(5)).unwrap();
        assert_eq!(form.common_ordenpago_id(), Some(300));

        form.set_applied(3, dec!(5)).unwrap();
        assert_eq!(form.common_ordenpago_id(), Some(300));

        form.set_applied(4, dec!(5)).unwrap();
        assert_eq!(form.common_ordenpago_id(), None);

        form.set_applied(1, dec!(0)).unwrap();
        form.set_applied(2, dec!(0)).unwrap();
        assert_eq!(form.common_ordenpago_id(), Some(301));
    }

    #[test]
    fn test_build_request_normalizes_instruments() {
        let mut form = form_with_obligations();
        form.set_observaciones(Some("cobro marzo".to_string()));
        form.set_applied(11, dec!(200)).unwrap();
        form.set_applied(10, dec!(50)).unwrap();

        let t = form.add_instrument();
        form.update_instrument(t, InstrumentField::FormaPago(TRANSFERENCIA))
            .unwrap();
        form.update_instrument(t, InstrumentField::Monto(dec!(190)))
            .unwrap();
        form.update_instrument(t, InstrumentField::Banco("Galicia".to_string()))
            .unwrap();
        form.update_instrument(t, InstrumentField::Cupon("stale".to_string()))
            .unwrap();

        let c = form.add_instrument();
        form.update_instrument(c, InstrumentField::FormaPago(EFECTIVO))
            .unwrap();
        form.set_available_movements(vec![AvailableMovement {
            id: 77,
            medio: Medio::Caja,
            monto: dec!(60),
            fecha: date(4),
            detalle: Some("seña".to_string()),
        }]);
        form.attach_existing_movement(c, 77).unwrap();

        let request = form.build_request().unwrap();

        assert_eq!(request.counterparty_id, 42);
        assert_eq!(request.counterparty_kind, CounterpartyKind::Cliente);
        assert_eq!(request.observaciones.as_deref(), Some("cobro marzo"));
        assert_eq!(
            request.allocations,
            vec![
                AllocationLine {
                    obligation_id: 10,
                    amount: dec!(50),
                },
                AllocationLine {
                    obligation_id: 11,
                    amount: dec!(200),
                },
            ]
        );
        assert_eq!(request.total_applied(), dec!(250));
        assert_eq!(request.total_payments(), dec!(250));
        assert_eq!(request.advance_id, None);
        assert_eq!(request.ordenpago_id, None);

        let transfer = &request.payments[0];
        assert_eq!(transfer.fields.banco.as_deref(), Some("Galicia"));
        assert_eq!(transfer.fields.cupon, None);

        let reused = &request.payments[1];
        assert_eq!(reused.existing_ref, Some(77));
        assert_eq!(reused.fields, MedioFields::default());
        assert_eq!(reused.fecha, None);
    }

    #[test]
    fn test_build_request_with_advance_only() {
        let mut form = form_with_obligations();
        form.set_applied(12, dec!(50)).unwrap();
        form.use_advance(90).unwrap();

        let request = form.build_request().unwrap();
        assert!(request.payments.is_empty());
        assert_eq!(request.advance_id, Some(90));
    }

    #[test]
    fn test_build_request_serializes_expected_shape() {
        let mut form = form_with_obligations();
        form.set_applied(12, dec!(80)).unwrap();
        cash_row(&mut form, dec!(80));

        let request = form.build_request().unwrap();
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["counterparty_id"], 42);
        assert_eq!(json["payments"][0]["medio"], "caja");
        assert_eq!(json["payments"][0]["caja_id"], 7);
        assert!(json["payments"][0].get("banco").is_none());
        assert!(json.get("advance_id").is_none());
        assert!(json.get("ordenpago_id").is_none());

        let back: AllocationRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn test_failed_build_keeps_form_intact() {
        let mut form = form_with_obligations();
        form.set_applied(10, dec!(100)).unwrap();
        cash_row(&mut form, dec!(10));

        assert!(form.build_request().is_err());
        assert_eq!(form.applied(10), dec!(100));
        assert_eq!(form.instruments().len(), 1);
    }

    #[test]
    fn test_remove_instrument() {
        let mut form = form_with_obligations();
        cash_row(&mut form, dec!(1));
        assert!(form.remove_instrument(0).is_ok());
        assert_eq!(
            form.remove_instrument(0),
            Err(ValidationError::InstrumentOutOfRange { index: 0 })
        );
    }

    #[test]
    fn test_use_advance_requires_saldo() {
        let mut form = AllocationForm::new(catalog(), date(1), None);
        form.select_counterparty(
            Counterparty::cliente(1),
            Vec::new(),
            vec![Advance {
                id: 5,
                importe: dec!(10),
                aplicado: dec!(10),
            }],
        );
        assert_eq!(
            form.use_advance(5),
            Err(ValidationError::UnknownAdvance { advance_id: 5 })
        );
    }
}

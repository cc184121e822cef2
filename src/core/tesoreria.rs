//! Treasury business logic - listing what is pending and applying settlements.
//!
//! This is the durable side of an allocation. The listing functions feed an
//! [`AllocationForm`](crate::core::allocation::AllocationForm); the apply
//! functions take the [`AllocationRequest`] it builds and record it inside a
//! single database transaction. Each apply re-checks the request against the
//! database. Any refusal is an [`Error::Rejected`] whose message goes back to
//! the operator, and nothing is written.

use crate::{
    core::{
        allocation::{AllocationRequest, AvailableMovement, PaymentInstrument},
        forma_pago,
        medio::{Counterparty, CounterpartyKind, Medio, MedioFields},
    },
    entities::{
        Anticipo, Caja, Movimiento, Obligacion, OrdenPago, anticipo, aplicacion, movimiento,
        obligacion, operacion, orden_pago,
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{DatabaseTransaction, QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::HashSet;
use tracing::{info, instrument, warn};

/// Everything one successful apply wrote.
#[derive(Debug, Clone)]
pub struct ApplicationReceipt {
    /// Operation header
    pub operacion: operacion::Model,
    /// One line per settled obligation (two when an advance covered part of it)
    pub aplicaciones: Vec<aplicacion::Model>,
    /// Movements created or marked applied
    pub movimientos: Vec<movimiento::Model>,
    /// The advance consumed, after the update
    pub anticipo_usado: Option<anticipo::Model>,
    /// New advance holding any excess funding
    pub anticipo_generado: Option<anticipo::Model>,
    /// Payment order the settlement was issued under
    pub orden_pago: Option<orden_pago::Model>,
}

/// A new obligation to record.
#[derive(Debug, Clone)]
pub struct NewObligation {
    /// Who owes or is owed
    pub counterparty: Counterparty,
    /// Issuing branch
    pub sucursal_id: i64,
    /// Issue date
    pub fecha: NaiveDate,
    /// Description
    pub descripcion: String,
    /// Amount
    pub total: Decimal,
    /// Originating payment order
    pub ordenpago_id: Option<i64>,
    /// Agreed forma de pago
    pub formapago_id: Option<i64>,
}

/// A movement recorded ahead of its application.
#[derive(Debug, Clone)]
pub struct NewMovement {
    /// Counterparty the money came from or went to
    pub counterparty: Counterparty,
    /// Forma de pago
    pub formapago_id: i64,
    /// Amount
    pub monto: Decimal,
    /// Value date
    pub fecha: NaiveDate,
    /// Detail
    pub detalle: Option<String>,
    /// Medium-specific fields
    pub fields: MedioFields,
}

fn reject(message: String) -> Error {
    warn!("Treasury rejected request: {message}");
    Error::rejected(message)
}

fn belongs_to(tipo: &str, id: i64, counterparty: Counterparty) -> bool {
    tipo == counterparty.kind.as_str() && id == counterparty.id
}

/// Pending obligations of a counterparty, oldest first.
///
/// When `sucursal_id` is given only that branch's obligations are returned.
pub async fn list_obligations<C>(
    db: &C,
    counterparty: Counterparty,
    sucursal_id: Option<i64>,
) -> Result<Vec<obligacion::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Obligacion::find()
        .filter(obligacion::Column::ContraparteTipo.eq(counterparty.kind.as_str()))
        .filter(obligacion::Column::ContraparteId.eq(counterparty.id))
        .filter(obligacion::Column::Saldo.gt(Decimal::ZERO));
    if let Some(sucursal_id) = sucursal_id {
        query = query.filter(obligacion::Column::SucursalId.eq(sucursal_id));
    }
    query
        .order_by_asc(obligacion::Column::Fecha)
        .order_by_asc(obligacion::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Advances of a counterparty that still have saldo.
pub async fn list_advances<C>(db: &C, counterparty: Counterparty) -> Result<Vec<anticipo::Model>>
where
    C: ConnectionTrait,
{
    let advances = Anticipo::find()
        .filter(anticipo::Column::ContraparteTipo.eq(counterparty.kind.as_str()))
        .filter(anticipo::Column::ContraparteId.eq(counterparty.id))
        .order_by_asc(anticipo::Column::Fecha)
        .order_by_asc(anticipo::Column::Id)
        .all(db)
        .await?;
    Ok(advances
        .into_iter()
        .filter(|a| a.saldo() > Decimal::ZERO)
        .collect())
}

/// Unapplied movements of a counterparty recorded with `medio`.
pub async fn list_available_movements<C>(
    db: &C,
    counterparty: Counterparty,
    medio: Medio,
) -> Result<Vec<AvailableMovement>>
where
    C: ConnectionTrait,
{
    let rows = Movimiento::find()
        .filter(movimiento::Column::ContraparteTipo.eq(counterparty.kind.as_str()))
        .filter(movimiento::Column::ContraparteId.eq(counterparty.id))
        .filter(movimiento::Column::Medio.eq(medio.as_str()))
        .filter(movimiento::Column::Aplicado.eq(false))
        .order_by_asc(movimiento::Column::Fecha)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|m| AvailableMovement {
            id: m.id,
            medio,
            monto: m.monto,
            fecha: m.fecha,
            detalle: m.detalle,
        })
        .collect())
}

/// Records a new obligation with its full amount pending.
#[instrument(skip(db))]
pub async fn register_obligation(
    db: &DatabaseConnection,
    new: NewObligation,
) -> Result<obligacion::Model> {
    if new.total <= Decimal::ZERO {
        return Err(reject(format!(
            "Obligation amount must be positive, got {}",
            new.total
        )));
    }

    obligacion::ActiveModel {
        contraparte_tipo: Set(new.counterparty.kind.as_str().to_string()),
        contraparte_id: Set(new.counterparty.id),
        sucursal_id: Set(new.sucursal_id),
        fecha: Set(new.fecha),
        descripcion: Set(new.descripcion),
        total: Set(new.total),
        saldo: Set(new.total),
        ordenpago_id: Set(new.ordenpago_id),
        formapago_id: Set(new.formapago_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Records an advance received from or paid to a counterparty.
#[instrument(skip(db))]
pub async fn register_advance(
    db: &DatabaseConnection,
    counterparty: Counterparty,
    fecha: NaiveDate,
    importe: Decimal,
) -> Result<anticipo::Model> {
    if importe <= Decimal::ZERO {
        return Err(reject(format!("Advance must be positive, got {importe}")));
    }
    anticipo::ActiveModel {
        contraparte_tipo: Set(counterparty.kind.as_str().to_string()),
        contraparte_id: Set(counterparty.id),
        fecha: Set(fecha),
        importe: Set(importe),
        aplicado: Set(Decimal::ZERO),
        operacion_id: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

async fn check_fields(
    txn: &DatabaseTransaction,
    label: &str,
    medio: Medio,
    fields: &MedioFields,
) -> Result<()> {
    if let Some(field) = fields.missing(medio) {
        return Err(reject(format!("{label} is missing {field}")));
    }
    if medio == Medio::Caja {
        let open = match fields.caja_id {
            Some(caja_id) => Caja::find_by_id(caja_id)
                .one(txn)
                .await?
                .is_some_and(|c| c.is_open()),
            None => false,
        };
        if !open {
            return Err(reject(format!("{label}: caja is not open")));
        }
    }
    Ok(())
}

/// Records a movement that is not applied to any obligation yet.
///
/// It shows up in [`list_available_movements`] until a request references it.
#[instrument(skip(db))]
pub async fn record_unapplied_movement(
    db: &DatabaseConnection,
    new: NewMovement,
) -> Result<movimiento::Model> {
    if new.monto <= Decimal::ZERO {
        return Err(reject(format!("Movement must be positive, got {}", new.monto)));
    }

    let txn = db.begin().await?;
    let catalog = forma_pago::catalog(&txn).await?;
    let medio = catalog
        .get(&new.formapago_id)
        .copied()
        .ok_or_else(|| reject(format!("Forma de pago {} not found", new.formapago_id)))?;
    if !medio.can_pay() {
        return Err(reject("Cuenta corriente is not a treasury movement".to_string()));
    }
    let fields = new.fields.retain_for(medio);
    check_fields(&txn, "Movement", medio, &fields).await?;

    let saved = movimiento_model(
        new.counterparty,
        new.formapago_id,
        medio,
        new.monto,
        new.fecha,
        new.detalle,
        fields,
    )
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!(movimiento_id = saved.id, "Unapplied movement recorded");
    Ok(saved)
}

fn movimiento_model(
    counterparty: Counterparty,
    formapago_id: i64,
    medio: Medio,
    monto: Decimal,
    fecha: NaiveDate,
    detalle: Option<String>,
    fields: MedioFields,
) -> movimiento::ActiveModel {
    movimiento::ActiveModel {
        tipo: Set(counterparty.kind.movimiento_tipo().to_string()),
        formapago_id: Set(formapago_id),
        medio: Set(medio.as_str().to_string()),
        contraparte_tipo: Set(counterparty.kind.as_str().to_string()),
        contraparte_id: Set(counterparty.id),
        fecha: Set(fecha),
        monto: Set(monto),
        detalle: Set(detalle),
        banco: Set(fields.banco),
        referencia: Set(fields.referencia),
        vencimiento: Set(fields.vencimiento),
        tarjeta_tipo: Set(fields.tarjeta_tipo),
        tarjeta_marca: Set(fields.tarjeta_marca),
        cupon: Set(fields.cupon),
        plan: Set(fields.plan),
        caja_id: Set(fields.caja_id),
        ordenpago_id: Set(None),
        operacion_id: Set(None),
        aplicado: Set(false),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
}

/// Applies a settlement funded by new payments and/or an advance.
///
/// Corresponds to the `aplicar` endpoint.
#[instrument(skip(db, request), fields(counterparty_id = request.counterparty_id))]
pub async fn apply(db: &DatabaseConnection, request: &AllocationRequest) -> Result<ApplicationReceipt> {
    let tipo = match request.counterparty_kind {
        CounterpartyKind::Cliente => "cobro",
        CounterpartyKind::Proveedor => "pago",
    };
    apply_in_transaction(db, request, tipo, false).await
}

/// Applies a settlement funded only by an existing advance.
///
/// Corresponds to the `aplicar-anticipo` endpoint: the request must name an
/// advance and carry no payments.
#[instrument(skip(db, request), fields(counterparty_id = request.counterparty_id))]
pub async fn apply_advance(
    db: &DatabaseConnection,
    request: &AllocationRequest,
) -> Result<ApplicationReceipt> {
    if request.advance_id.is_none() {
        return Err(reject("No advance selected".to_string()));
    }
    if !request.payments.is_empty() {
        return Err(reject(
            "Applying an advance does not take new payments".to_string(),
        ));
    }
    apply_in_transaction(db, request, "anticipo", false).await
}

/// Pays a proveedor under a payment order.
///
/// Corresponds to the `ordenes-pago/emitir` endpoint. When the request
/// carries the common originating `ordenpago_id` that order is reused;
/// otherwise a new order is created.
#[instrument(skip(db, request), fields(counterparty_id = request.counterparty_id))]
pub async fn emit_payment_order(
    db: &DatabaseConnection,
    request: &AllocationRequest,
) -> Result<ApplicationReceipt> {
    if request.counterparty_kind != CounterpartyKind::Proveedor {
        return Err(reject(
            "Payment orders can only be issued to proveedores".to_string(),
        ));
    }
    apply_in_transaction(db, request, "pago", true).await
}

struct CheckedPayment<'a> {
    instrument: &'a PaymentInstrument,
    existing: Option<movimiento::Model>,
}

async fn check_payments<'a>(
    txn: &DatabaseTransaction,
    request: &'a AllocationRequest,
) -> Result<Vec<CheckedPayment<'a>>> {
    let counterparty = request.counterparty();
    let catalog = forma_pago::catalog(txn).await?;
    let mut seen_refs = HashSet::new();
    let mut checked = Vec::with_capacity(request.payments.len());

    for (index, payment) in request.payments.iter().enumerate() {
        let label = format!("Payment #{}", index + 1);
        let medio = catalog
            .get(&payment.formapago_id)
            .copied()
            .ok_or_else(|| {
                reject(format!(
                    "{label}: forma de pago {} not found",
                    payment.formapago_id
                ))
            })?;
        if medio != payment.medio {
            return Err(reject(format!(
                "{label}: forma de pago is {medio}, request says {}",
                payment.medio
            )));
        }
        if !medio.can_pay() {
            return Err(reject(format!(
                "{label}: cuenta corriente cannot be used to pay"
            )));
        }
        if payment.monto <= Decimal::ZERO {
            return Err(reject(format!("{label}: amount must be positive")));
        }

        let existing = match payment.existing_ref {
            Some(movement_id) => {
                if !seen_refs.insert(movement_id) {
                    return Err(reject(format!(
                        "{label}: movement {movement_id} used twice"
                    )));
                }
                let movement = Movimiento::find_by_id(movement_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| reject(format!("{label}: movement {movement_id} not found")))?;
                if movement.aplicado {
                    return Err(reject(format!(
                        "{label}: movement {movement_id} is already applied"
                    )));
                }
                if !belongs_to(&movement.contraparte_tipo, movement.contraparte_id, counterparty) {
                    return Err(reject(format!(
                        "{label}: movement {movement_id} belongs to another counterparty"
                    )));
                }
                if movement.medio != medio.as_str() {
                    return Err(reject(format!(
                        "{label}: movement {movement_id} is {}, not {medio}",
                        movement.medio
                    )));
                }
                if movement.monto != payment.monto {
                    return Err(reject(format!(
                        "{label}: amount {} differs from movement amount {}",
                        payment.monto, movement.monto
                    )));
                }
                Some(movement)
            }
            None => {
                check_fields(txn, &label, medio, &payment.fields).await?;
                None
            }
        };

        checked.push(CheckedPayment {
            instrument: payment,
            existing,
        });
    }

    Ok(checked)
}

async fn resolve_payment_order(
    txn: &DatabaseTransaction,
    request: &AllocationRequest,
    applied: Decimal,
) -> Result<orden_pago::Model> {
    if let Some(orden_id) = request.ordenpago_id {
        let orden = OrdenPago::find_by_id(orden_id)
            .one(txn)
            .await?
            .ok_or_else(|| reject(format!("Payment order {orden_id} not found")))?;
        if orden.proveedor_id != request.counterparty_id {
            return Err(reject(format!(
                "Payment order {orden_id} belongs to another proveedor"
            )));
        }
        let total = orden.total + applied;
        let mut active: orden_pago::ActiveModel = orden.into();
        active.total = Set(total);
        return active.update(txn).await.map_err(Into::into);
    }

    orden_pago::ActiveModel {
        proveedor_id: Set(request.counterparty_id),
        fecha: Set(request.fecha),
        total: Set(applied),
        observaciones: Set(request.observaciones.clone()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(Into::into)
}

#[allow(clippy::too_many_lines)]
async fn apply_in_transaction(
    db: &DatabaseConnection,
    request: &AllocationRequest,
    tipo: &str,
    issue_order: bool,
) -> Result<ApplicationReceipt> {
    let counterparty = request.counterparty();
    if request.allocations.is_empty() {
        return Err(reject("Nothing to apply".to_string()));
    }
    let mut seen = HashSet::new();
    for line in &request.allocations {
        if line.amount <= Decimal::ZERO {
            return Err(reject(format!(
                "Amount for obligation {} must be positive",
                line.obligation_id
            )));
        }
        if !seen.insert(line.obligation_id) {
            return Err(reject(format!(
                "Obligation {} appears twice",
                line.obligation_id
            )));
        }
    }
    let applied = request.total_applied();

    let txn = db.begin().await?;

    let mut obligations = Vec::with_capacity(request.allocations.len());
    for line in &request.allocations {
        let obligation = Obligacion::find_by_id(line.obligation_id)
            .one(&txn)
            .await?
            .ok_or_else(|| reject(format!("Obligation {} not found", line.obligation_id)))?;
        if !belongs_to(
            &obligation.contraparte_tipo,
            obligation.contraparte_id,
            counterparty,
        ) {
            return Err(reject(format!(
                "Obligation {} belongs to another counterparty",
                obligation.id
            )));
        }
        if line.amount > obligation.saldo {
            return Err(reject(format!(
                "Obligation {}: amount {} exceeds saldo {}",
                obligation.id, line.amount, obligation.saldo
            )));
        }
        obligations.push((obligation, line.amount));
    }

    let advance = match request.advance_id {
        Some(advance_id) => {
            let advance = Anticipo::find_by_id(advance_id)
                .one(&txn)
                .await?
                .ok_or_else(|| reject(format!("Advance {advance_id} not found")))?;
            if !belongs_to(&advance.contraparte_tipo, advance.contraparte_id, counterparty) {
                return Err(reject(format!(
                    "Advance {advance_id} belongs to another counterparty"
                )));
            }
            if advance.saldo() <= Decimal::ZERO {
                return Err(reject(format!("Advance {advance_id} has no saldo left")));
            }
            Some(advance)
        }
        None => None,
    };

    let payments = check_payments(&txn, request).await?;
    let total_payments = request.total_payments();
    let advance_saldo = advance.as_ref().map_or(Decimal::ZERO, anticipo::Model::saldo);
    if total_payments + advance_saldo < applied {
        return Err(reject(format!(
            "Payments ({}) do not cover the applied total ({applied})",
            total_payments + advance_saldo
        )));
    }

    let orden = if issue_order {
        Some(resolve_payment_order(&txn, request, applied).await?)
    } else {
        None
    };
    let ordenpago_id = orden.as_ref().map(|o| o.id);

    let operacion = operacion::ActiveModel {
        tipo: Set(tipo.to_string()),
        contraparte_tipo: Set(counterparty.kind.as_str().to_string()),
        contraparte_id: Set(counterparty.id),
        fecha: Set(request.fecha),
        observaciones: Set(request.observaciones.clone()),
        total_aplicado: Set(applied),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut movimientos = Vec::with_capacity(payments.len());
    for payment in payments {
        let saved = match payment.existing {
            Some(existing) => {
                let mut active: movimiento::ActiveModel = existing.into();
                active.aplicado = Set(true);
                active.operacion_id = Set(Some(operacion.id));
                active.ordenpago_id = Set(ordenpago_id);
                active.update(&txn).await?
            }
            None => {
                let instrument = payment.instrument;
                let mut active = movimiento_model(
                    counterparty,
                    instrument.formapago_id,
                    instrument.medio,
                    instrument.monto,
                    instrument.fecha.unwrap_or(request.fecha),
                    instrument.detalle.clone(),
                    instrument.fields.clone().retain_for(instrument.medio),
                );
                active.aplicado = Set(true);
                active.operacion_id = Set(Some(operacion.id));
                active.ordenpago_id = Set(ordenpago_id);
                active.insert(&txn).await?
            }
        };
        movimientos.push(saved);
    }

    let from_advance = advance_saldo.min(applied);
    let anticipo_usado = match advance {
        Some(advance) if from_advance > Decimal::ZERO => {
            let aplicado = advance.aplicado + from_advance;
            let mut active: anticipo::ActiveModel = advance.into();
            active.aplicado = Set(aplicado);
            Some(active.update(&txn).await?)
        }
        _ => None,
    };
    let anticipo_id = anticipo_usado.as_ref().map(|a| a.id);

    let mut aplicaciones = Vec::new();
    let mut advance_left = from_advance;
    for (obligation, amount) in obligations {
        let covered_by_advance = advance_left.min(amount);
        advance_left -= covered_by_advance;
        let parts = [
            (covered_by_advance, anticipo_id),
            (amount - covered_by_advance, None),
        ];
        for (monto, line_anticipo) in parts {
            if monto <= Decimal::ZERO {
                continue;
            }
            let line = aplicacion::ActiveModel {
                operacion_id: Set(operacion.id),
                obligacion_id: Set(obligation.id),
                monto: Set(monto),
                fecha: Set(request.fecha),
                ordenpago_id: Set(ordenpago_id),
                anticipo_id: Set(line_anticipo),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            aplicaciones.push(line);
        }

        let saldo = obligation.saldo - amount;
        let mut active: obligacion::ActiveModel = obligation.into();
        active.saldo = Set(saldo);
        active.update(&txn).await?;
    }

    let excess = total_payments - (applied - from_advance);
    let anticipo_generado = if excess > Decimal::ZERO {
        Some(
            anticipo::ActiveModel {
                contraparte_tipo: Set(counterparty.kind.as_str().to_string()),
                contraparte_id: Set(counterparty.id),
                fecha: Set(request.fecha),
                importe: Set(excess),
                aplicado: Set(Decimal::ZERO),
                operacion_id: Set(Some(operacion.id)),
                ..Default::default()
            }
            .insert(&txn)
            .await?,
        )
    } else {
        None
    };

    txn.commit().await?;

    info!(
        operacion_id = operacion.id,
        %applied,
        lines = aplicaciones.len(),
        movements = movimientos.len(),
        "Settlement applied"
    );

    Ok(ApplicationReceipt {
        operacion,
        aplicaciones,
        movimientos,
        anticipo_usado,
        anticipo_generado,
        orden_pago: orden,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::allocation::{AllocationForm, AllocationLine, InstrumentField};
    use crate::test_utils::*;
    use rust_decimal_macros::dec;

    fn line(obligation_id: i64, amount: Decimal) -> AllocationLine {
        AllocationLine {
            obligation_id,
            amount,
        }
    }

    fn transfer(formapago_id: i64, monto: Decimal) -> PaymentInstrument {
        PaymentInstrument {
            formapago_id,
            medio: Medio::Transferencia,
            monto,
            existing_ref: None,
            fecha: None,
            detalle: None,
            fields: MedioFields {
                banco: Some("Galicia".to_string()),
                ..MedioFields::default()
            },
        }
    }

    fn request(
        counterparty: Counterparty,
        allocations: Vec<AllocationLine>,
        payments: Vec<PaymentInstrument>,
    ) -> AllocationRequest {
        AllocationRequest {
            counterparty_kind: counterparty.kind,
            counterparty_id: counterparty.id,
            fecha: test_date(15),
            observaciones: None,
            allocations,
            payments,
            advance_id: None,
            ordenpago_id: None,
        }
    }

    async fn saldo(db: &DatabaseConnection, id: i64) -> Decimal {
        Obligacion::find_by_id(id).one(db).await.unwrap().unwrap().saldo
    }

    #[tokio::test]
    async fn test_list_obligations_filters_and_orders() -> Result<()> {
        let db = setup_test_db().await?;
        let cliente = Counterparty::cliente(1);
        let late = create_test_obligation(&db, cliente, 10, dec!(100)).await?;
        let early = create_test_obligation(&db, cliente, 2, dec!(50)).await?;
        create_test_obligation(&db, Counterparty::cliente(2), 1, dec!(70)).await?;
        create_test_obligation(&db, Counterparty::proveedor(1), 1, dec!(70)).await?;

        let listed = list_obligations(&db, cliente, None).await?;
        let ids: Vec<i64> = listed.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);

        assert!(list_obligations(&db, cliente, Some(99)).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_transfer_settles_obligations() -> Result<()> {
        init_test_tracing();
        let db = setup_seeded_db().await?;
        let cliente = Counterparty::cliente(1);
        let a = create_test_obligation(&db, cliente, 1, dec!(100)).await?;
        let b = create_test_obligation(&db, cliente, 2, dec!(80)).await?;
        let transferencia = forma_pago_id(&db, "Transferencia").await?;

        let receipt = apply(
            &db,
            &request(
                cliente,
                vec![line(a.id, dec!(100)), line(b.id, dec!(30))],
                vec![transfer(transferencia, dec!(130))],
            ),
        )
        .await?;

        assert_eq!(receipt.operacion.tipo, "cobro");
        assert_eq!(receipt.aplicaciones.len(), 2);
        assert_eq!(receipt.movimientos.len(), 1);
        assert!(receipt.movimientos[0].aplicado);
        assert_eq!(receipt.movimientos[0].tipo, "ingreso");
        assert!(receipt.anticipo_generado.is_none());
        assert!(receipt.orden_pago.is_none());

        assert_eq!(saldo(&db, a.id).await, dec!(0));
        assert_eq!(saldo(&db, b.id).await, dec!(50));

        let pending = list_obligations(&db, cliente, None).await?;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, b.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_excess_becomes_advance() -> Result<()> {
        let db = setup_seeded_db().await?;
        let cliente = Counterparty::cliente(1);
        let a = create_test_obligation(&db, cliente, 1, dec!(100)).await?;
        let transferencia = forma_pago_id(&db, "Transferencia").await?;

        let receipt = apply(
            &db,
            &request(
                cliente,
                vec![line(a.id, dec!(100))],
                vec![transfer(transferencia, dec!(120))],
            ),
        )
        .await?;

        let generated = receipt.anticipo_generado.unwrap();
        assert_eq!(generated.importe, dec!(20));
        assert_eq!(generated.operacion_id, Some(receipt.operacion.id));

        let advances = list_advances(&db, cliente).await?;
        assert_eq!(advances.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_rejects_and_writes_nothing() -> Result<()> {
        let db = setup_seeded_db().await?;
        let cliente = Counterparty::cliente(1);
        let a = create_test_obligation(&db, cliente, 1, dec!(100)).await?;
        let other = create_test_obligation(&db, Counterparty::cliente(2), 1, dec!(100)).await?;
        let transferencia = forma_pago_id(&db, "Transferencia").await?;
        let ctacte = forma_pago_id(&db, "Cuenta Corriente").await?;

        let over_saldo = request(
            cliente,
            vec![line(a.id, dec!(150))],
            vec![transfer(transferencia, dec!(150))],
        );
        assert!(matches!(apply(&db, &over_saldo).await, Err(Error::Rejected { .. })));

        let foreign = request(
            cliente,
            vec![line(other.id, dec!(10))],
            vec![transfer(transferencia, dec!(10))],
        );
        assert!(matches!(apply(&db, &foreign).await, Err(Error::Rejected { .. })));

        let short = request(
            cliente,
            vec![line(a.id, dec!(100))],
            vec![transfer(transferencia, dec!(60))],
        );
        assert!(matches!(apply(&db, &short).await, Err(Error::Rejected { .. })));

        let mut by_ctacte = transfer(ctacte, dec!(100));
        by_ctacte.medio = Medio::Ctacte;
        let ctacte_request = request(cliente, vec![line(a.id, dec!(100))], vec![by_ctacte]);
        assert!(matches!(
            apply(&db, &ctacte_request).await,
            Err(Error::Rejected { .. })
        ));

        let mut no_bank = transfer(transferencia, dec!(100));
        no_bank.fields = MedioFields::default();
        let missing = request(cliente, vec![line(a.id, dec!(100))], vec![no_bank]);
        assert!(matches!(apply(&db, &missing).await, Err(Error::Rejected { .. })));

        assert_eq!(saldo(&db, a.id).await, dec!(100));
        assert!(Movimiento::find().all(&db).await?.is_empty());
        assert!(crate::entities::Operacion::find().all(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_cash_requires_open_caja() -> Result<()> {
        let db = setup_seeded_db().await?;
        let cliente = Counterparty::cliente(1);
        let a = create_test_obligation(&db, cliente, 1, dec!(40)).await?;
        let efectivo = forma_pago_id(&db, "Efectivo").await?;

        let cash = |caja_id| PaymentInstrument {
            formapago_id: efectivo,
            medio: Medio::Caja,
            monto: dec!(40),
            existing_ref: None,
            fecha: None,
            detalle: None,
            fields: MedioFields {
                caja_id,
                ..MedioFields::default()
            },
        };

        let closed = crate::core::caja::open_session(&db, 1, "ana".to_string(), dec!(0)).await?;
        crate::core::caja::close_session(&db, closed.id).await?;
        let rejected = request(cliente, vec![line(a.id, dec!(40))], vec![cash(Some(closed.id))]);
        assert!(matches!(apply(&db, &rejected).await, Err(Error::Rejected { .. })));

        let open = crate::core::caja::open_session(&db, 1, "ana".to_string(), dec!(0)).await?;
        let ok = request(cliente, vec![line(a.id, dec!(40))], vec![cash(Some(open.id))]);
        let receipt = apply(&db, &ok).await?;
        assert_eq!(receipt.movimientos[0].caja_id, Some(open.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_existing_movement_is_reused() -> Result<()> {
        let db = setup_seeded_db().await?;
        let cliente = Counterparty::cliente(1);
        let a = create_test_obligation(&db, cliente, 1, dec!(100)).await?;
        let transferencia = forma_pago_id(&db, "Transferencia").await?;

        let movement = record_unapplied_movement(
            &db,
            NewMovement {
                counterparty: cliente,
                formapago_id: transferencia,
                monto: dec!(100),
                fecha: test_date(3),
                detalle: Some("transferencia recibida".to_string()),
                fields: MedioFields {
                    banco: Some("Macro".to_string()),
                    ..MedioFields::default()
                },
            },
        )
        .await?;

        let available = list_available_movements(&db, cliente, Medio::Transferencia).await?;
        assert_eq!(available.len(), 1);
        assert!(list_available_movements(&db, cliente, Medio::Echeq).await?.is_empty());

        let mut form = AllocationForm::new(forma_pago::catalog(&db).await?, test_date(15), None);
        form.select_counterparty(
            cliente,
            list_obligations(&db, cliente, None)
                .await?
                .into_iter()
                .map(Into::into)
                .collect(),
            Vec::new(),
        );
        form.set_available_movements(available);
        form.set_applied(a.id, dec!(100))?;
        let row = form.add_instrument();
        form.update_instrument(row, InstrumentField::FormaPago(transferencia))?;
        form.attach_existing_movement(row, movement.id)?;

        let receipt = apply(&db, &form.build_request()?).await?;
        assert_eq!(receipt.movimientos.len(), 1);
        assert_eq!(receipt.movimientos[0].id, movement.id);
        assert!(receipt.movimientos[0].aplicado);
        assert_eq!(Movimiento::find().all(&db).await?.len(), 1);
        assert!(list_available_movements(&db, cliente, Medio::Transferencia)
            .await?
            .is_empty());

        let again = apply(&db, &form.build_request()?).await;
        assert!(matches!(again, Err(Error::Rejected { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_advance() -> Result<()> {
        let db = setup_seeded_db().await?;
        let cliente = Counterparty::cliente(1);
        let a = create_test_obligation(&db, cliente, 1, dec!(100)).await?;
        let b = create_test_obligation(&db, cliente, 2, dec!(100)).await?;
        let advance = register_advance(&db, cliente, test_date(1), dec!(150)).await?;

        let mut with_advance = request(
            cliente,
            vec![line(a.id, dec!(100)), line(b.id, dec!(50))],
            Vec::new(),
        );
        with_advance.advance_id = Some(advance.id);

        let receipt = apply_advance(&db, &with_advance).await?;
        assert_eq!(receipt.operacion.tipo, "anticipo");
        assert_eq!(receipt.anticipo_usado.unwrap().aplicado, dec!(150));
        assert!(receipt
            .aplicaciones
            .iter()
            .all(|l| l.anticipo_id == Some(advance.id)));
        assert!(list_advances(&db, cliente).await?.is_empty());
        assert_eq!(saldo(&db, b.id).await, dec!(50));

        let mut exhausted = request(cliente, vec![line(b.id, dec!(10))], Vec::new());
        exhausted.advance_id = Some(advance.id);
        assert!(matches!(
            apply_advance(&db, &exhausted).await,
            Err(Error::Rejected { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_advance_plus_payment_splits_lines() -> Result<()> {
        let db = setup_seeded_db().await?;
        let cliente = Counterparty::cliente(1);
        let a = create_test_obligation(&db, cliente, 1, dec!(100)).await?;
        let advance = register_advance(&db, cliente, test_date(1), dec!(30)).await?;
        let transferencia = forma_pago_id(&db, "Transferencia").await?;

        let mut mixed = request(
            cliente,
            vec![line(a.id, dec!(100))],
            vec![transfer(transferencia, dec!(70))],
        );
        mixed.advance_id = Some(advance.id);

        assert!(matches!(
            apply_advance(&db, &mixed).await,
            Err(Error::Rejected { .. })
        ));

        let receipt = apply(&db, &mixed).await?;
        assert_eq!(receipt.aplicaciones.len(), 2);
        assert_eq!(receipt.aplicaciones[0].monto, dec!(30));
        assert_eq!(receipt.aplicaciones[0].anticipo_id, Some(advance.id));
        assert_eq!(receipt.aplicaciones[1].monto, dec!(70));
        assert_eq!(receipt.aplicaciones[1].anticipo_id, None);
        assert!(receipt.anticipo_generado.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_emit_payment_order_new_and_reused() -> Result<()> {
        let db = setup_seeded_db().await?;
        let proveedor = Counterparty::proveedor(5);
        let a = create_test_obligation(&db, proveedor, 1, dec!(200)).await?;
        let transferencia = forma_pago_id(&db, "Transferencia").await?;

        let first = emit_payment_order(
            &db,
            &request(
                proveedor,
                vec![line(a.id, dec!(120))],
                vec![transfer(transferencia, dec!(120))],
            ),
        )
        .await?;
        let orden = first.orden_pago.unwrap();
        assert_eq!(orden.total, dec!(120));
        assert_eq!(first.movimientos[0].tipo, "egreso");
        assert_eq!(first.movimientos[0].ordenpago_id, Some(orden.id));
        assert_eq!(first.aplicaciones[0].ordenpago_id, Some(orden.id));

        let mut follow_up = request(
            proveedor,
            vec![line(a.id, dec!(80))],
            vec![transfer(transferencia, dec!(80))],
        );
        follow_up.ordenpago_id = Some(orden.id);
        let second = emit_payment_order(&db, &follow_up).await?;
        let reused = second.orden_pago.unwrap();
        assert_eq!(reused.id, orden.id);
        assert_eq!(reused.total, dec!(200));
        assert_eq!(OrdenPago::find().all(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_emit_payment_order_rejects_cliente() -> Result<()> {
        let db = setup_seeded_db().await?;
        let cliente = Counterparty::cliente(1);
        let a = create_test_obligation(&db, cliente, 1, dec!(10)).await?;
        let transferencia = forma_pago_id(&db, "Transferencia").await?;

        let result = emit_payment_order(
            &db,
            &request(
                cliente,
                vec![line(a.id, dec!(10))],
                vec![transfer(transferencia, dec!(10))],
            ),
        )
        .await;
        assert!(matches!(result, Err(Error::Rejected { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_register_obligation_requires_positive_total() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_test_obligation(&db, Counterparty::cliente(1), 1, dec!(0)).await;
        assert!(matches!(result, Err(Error::Rejected { .. })));
        Ok(())
    }
}

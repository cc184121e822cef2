//! Treasury Discord commands - balances, collections, payments and advances.
//!
//! Each settlement command fills an `AllocationForm` the same way an operator
//! would. It loads the counterparty's pending obligations, adds one instrument
//! (new or bound to an existing movement), spreads the amount to apply over
//! the obligations oldest first and submits the resulting request.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, amount_from_f64, handlers::autocomplete, parse_fecha},
        core::{
            allocation::{Advance, AllocationForm, AllocationRequest, InstrumentField},
            caja as sesion, forma_pago,
            medio::{Counterparty, CounterpartyKind, Medio},
            tesoreria::{self, ApplicationReceipt},
        },
        errors::{Error, Result},
    };
    use rust_decimal::Decimal;
    use std::fmt::Write;

    /// Instrument details shared by `/cobrar` and `/pagar`.
    #[derive(Default)]
    struct InstrumentArgs {
        banco: Option<String>,
        referencia: Option<String>,
        vencimiento: Option<String>,
        tarjeta_tipo: Option<String>,
        tarjeta_marca: Option<String>,
        cupon: Option<String>,
        plan: Option<String>,
    }

    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Submit {
        Apply,
        PaymentOrder,
        Advance,
    }

    fn parse_kind(tipo: &str) -> Option<CounterpartyKind> {
        tipo.trim().to_lowercase().parse().ok()
    }

    async fn load_form(
        ctx: poise::Context<'_, BotData, Error>,
        counterparty: Counterparty,
    ) -> Result<AllocationForm> {
        let data = ctx.data();
        let db = &data.database;
        let open_caja = sesion::current_open_session(db, data.settings.sucursal_id)
            .await?
            .map(|c| c.id);

        let mut form = AllocationForm::new(
            forma_pago::catalog(db).await?,
            chrono::Local::now().date_naive(),
            open_caja,
        );
        let obligations = tesoreria::list_obligations(db, counterparty, None).await?;
        let advances = tesoreria::list_advances(db, counterparty).await?;
        form.select_counterparty(
            counterparty,
            obligations.into_iter().map(Into::into).collect(),
            advances.into_iter().map(Into::into).collect(),
        );
        Ok(form)
    }

    fn fill_fields(form: &mut AllocationForm, row: usize, args: InstrumentArgs) -> Result<()> {
        let text_fields: [(Option<String>, fn(String) -> InstrumentField); 6] = [
            (args.banco, InstrumentField::Banco),
            (args.referencia, InstrumentField::Referencia),
            (args.tarjeta_tipo, InstrumentField::TarjetaTipo),
            (args.tarjeta_marca, InstrumentField::TarjetaMarca),
            (args.cupon, InstrumentField::Cupon),
            (args.plan, InstrumentField::Plan),
        ];
        for (value, field) in text_fields {
            if let Some(value) = value {
                form.update_instrument(row, field(value))?;
            }
        }
        if let Some(vencimiento) = parse_fecha(args.vencimiento.as_deref())? {
            form.update_instrument(row, InstrumentField::Vencimiento(vencimiento))?;
        }
        Ok(())
    }

    fn describe_receipt(receipt: &ApplicationReceipt) -> String {
        let mut message = format!(
            "✅ Operación #{} recorded: **${}** applied.\n",
            receipt.operacion.id, receipt.operacion.total_aplicado
        );
        for line in &receipt.aplicaciones {
            let _ = writeln!(message, "• Obligación #{}: ${}", line.obligacion_id, line.monto);
        }
        if let Some(used) = &receipt.anticipo_usado {
            let _ = writeln!(
                message,
                "Anticipo #{} used, saldo left ${}",
                used.id,
                used.saldo()
            );
        }
        if let Some(generated) = &receipt.anticipo_generado {
            let _ = writeln!(
                message,
                "Excess of ${} kept as anticipo #{}",
                generated.importe, generated.id
            );
        }
        if let Some(orden) = &receipt.orden_pago {
            let _ = writeln!(message, "Orden de pago #{} (total ${})", orden.id, orden.total);
        }
        message
    }

    async fn submit(
        ctx: poise::Context<'_, BotData, Error>,
        request: &AllocationRequest,
        mode: Submit,
        preview: bool,
    ) -> Result<()> {
        if preview {
            let json = serde_json::to_string_pretty(request)?;
            ctx.say(format!("```json\n{json}\n```")).await?;
            return Ok(());
        }

        let db = &ctx.data().database;
        let result = match mode {
            Submit::Apply => tesoreria::apply(db, request).await,
            Submit::PaymentOrder => tesoreria::emit_payment_order(db, request).await,
            Submit::Advance => tesoreria::apply_advance(db, request).await,
        };

        match result {
            Ok(receipt) => {
                ctx.say(describe_receipt(&receipt)).await?;
            }
            Err(e @ Error::Rejected { .. }) => {
                ctx.say(format!("❌ {e}")).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// What a settlement command asked for.
    struct Settlement {
        counterparty: Counterparty,
        forma_pago: String,
        monto: Option<f64>,
        aplicar: Option<f64>,
        movimiento: Option<i64>,
        anticipo: Option<i64>,
        args: InstrumentArgs,
        mode: Submit,
        preview: bool,
    }

    async fn settle(ctx: poise::Context<'_, BotData, Error>, settlement: Settlement) -> Result<()> {
        let Settlement {
            counterparty,
            forma_pago: forma_pago_nombre,
            monto,
            aplicar,
            movimiento,
            anticipo,
            args,
            mode,
            preview,
        } = settlement;

        let db = &ctx.data().database;
        let Some(fp) = forma_pago::get_by_nombre(db, &forma_pago_nombre).await? else {
            ctx.say(format!("❌ Forma de pago '{forma_pago_nombre}' not found."))
                .await?;
            return Ok(());
        };
        let medio: Medio = fp.medio.parse().map_err(Error::rejected)?;

        let mut form = load_form(ctx, counterparty).await?;
        if form.obligations().is_empty() {
            ctx.say(format!("📭 No pending obligations for {counterparty}."))
                .await?;
            return Ok(());
        }

        let row = form.add_instrument();
        form.update_instrument(row, InstrumentField::FormaPago(fp.id))?;
        match (movimiento, monto) {
            (Some(movement_id), _) => {
                let available = tesoreria::list_available_movements(db, counterparty, medio).await?;
                form.set_available_movements(available);
                form.attach_existing_movement(row, movement_id)?;
            }
            (None, Some(monto)) => {
                let monto = amount_from_f64(monto)?;
                if monto <= Decimal::ZERO {
                    ctx.say("❌ Invalid amount: must be greater than zero").await?;
                    return Ok(());
                }
                form.update_instrument(row, InstrumentField::Monto(monto))?;
                fill_fields(&mut form, row, args)?;
            }
            (None, None) => {
                ctx.say("❌ Give either an amount or an existing movement.")
                    .await?;
                return Ok(());
            }
        }
        if let Some(advance_id) = anticipo {
            form.use_advance(advance_id)?;
        }

        let to_apply = match aplicar {
            Some(aplicar) => amount_from_f64(aplicar)?,
            None => form.total_funding(),
        };
        form.distribute(to_apply);

        let request = match form.build_request() {
            Ok(request) => request,
            Err(e) => {
                ctx.say(format!("❌ {e}")).await?;
                return Ok(());
            }
        };
        submit(ctx, &request, mode, preview).await
    }

    /// Lists the pending obligations and advances of a counterparty.
    #[poise::command(slash_command, prefix_command)]
    pub async fn saldos(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "cliente or proveedor"]
        #[autocomplete = "autocomplete::autocomplete_contraparte"]
        tipo: String,
        #[description = "Counterparty id"] id: i64,
    ) -> Result<()> {
        let Some(kind) = parse_kind(&tipo) else {
            ctx.say("❌ Tipo must be `cliente` or `proveedor`.").await?;
            return Ok(());
        };
        let counterparty = Counterparty { kind, id };
        let form = load_form(ctx, counterparty).await?;

        if form.obligations().is_empty() && form.advances().is_empty() {
            ctx.say(format!("📭 Nothing pending for {counterparty}."))
                .await?;
            return Ok(());
        }

        let mut message = format!("**Saldos de {counterparty}**\n");
        let mut total = Decimal::ZERO;
        for obligation in form.obligations() {
            total += obligation.saldo;
            let orden = obligation
                .ordenpago_id
                .map(|id| format!(" (OP #{id})"))
                .unwrap_or_default();
            let _ = writeln!(
                message,
                "• #{} {}: ${}{orden}",
                obligation.id, obligation.fecha, obligation.saldo
            );
        }
        let _ = writeln!(message, "Total pendiente: **${total}**");
        for advance in form.advances() {
            let _ = writeln!(message, "💰 Anticipo #{}: ${}", advance.id, advance.saldo());
        }

        ctx.say(message).await?;
        Ok(())
    }

    /// Collects from a cliente, settling the oldest obligations first.
    #[allow(clippy::too_many_arguments)]
    #[poise::command(slash_command)]
    pub async fn cobrar(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Cliente id"] cliente: i64,
        #[description = "Forma de pago"]
        #[autocomplete = "autocomplete::autocomplete_forma_pago"]
        forma_pago: String,
        #[description = "Amount received"] monto: Option<f64>,
        #[description = "Total to apply; defaults to everything received"] aplicar: Option<f64>,
        #[description = "Existing unapplied movement id"] movimiento: Option<i64>,
        #[description = "Also use this advance"] anticipo: Option<i64>,
        #[description = "Bank (transferencia, echeq)"] banco: Option<String>,
        #[description = "Reference or check number"] referencia: Option<String>,
        #[description = "Due date YYYY-MM-DD (echeq)"] vencimiento: Option<String>,
        #[description = "Card type (tarjeta)"] tarjeta_tipo: Option<String>,
        #[description = "Card brand (tarjeta)"] tarjeta_marca: Option<String>,
        #[description = "Voucher number (tarjeta)"] cupon: Option<String>,
        #[description = "Installment plan (tarjeta)"] plan: Option<String>,
        #[description = "Only show the request that would be sent"] vista_previa: Option<bool>,
    ) -> Result<()> {
        let settlement = Settlement {
            counterparty: Counterparty::cliente(cliente),
            forma_pago,
            monto,
            aplicar,
            movimiento,
            anticipo,
            args: InstrumentArgs {
                banco,
                referencia,
                vencimiento,
                tarjeta_tipo,
                tarjeta_marca,
                cupon,
                plan,
            },
            mode: Submit::Apply,
            preview: vista_previa.unwrap_or(false),
        };
        settle(ctx, settlement).await
    }

    /// Pays a proveedor under a payment order, settling the oldest obligations first.
    #[allow(clippy::too_many_arguments)]
    #[poise::command(slash_command)]
    pub async fn pagar(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Proveedor id"] proveedor: i64,
        #[description = "Forma de pago"]
        #[autocomplete = "autocomplete::autocomplete_forma_pago"]
        forma_pago: String,
        #[description = "Amount paid"] monto: Option<f64>,
        #[description = "Total to apply; defaults to everything paid"] aplicar: Option<f64>,
        #[description = "Existing unapplied movement id"] movimiento: Option<i64>,
        #[description = "Also use this advance"] anticipo: Option<i64>,
        #[description = "Bank (transferencia, echeq)"] banco: Option<String>,
        #[description = "Reference or check number"] referencia: Option<String>,
        #[description = "Due date YYYY-MM-DD (echeq)"] vencimiento: Option<String>,
        #[description = "Card type (tarjeta)"] tarjeta_tipo: Option<String>,
        #[description = "Card brand (tarjeta)"] tarjeta_marca: Option<String>,
        #[description = "Voucher number (tarjeta)"] cupon: Option<String>,
        #[description = "Installment plan (tarjeta)"] plan: Option<String>,
        #[description = "Only show the request that would be sent"] vista_previa: Option<bool>,
    ) -> Result<()> {
        let settlement = Settlement {
            counterparty: Counterparty::proveedor(proveedor),
            forma_pago,
            monto,
            aplicar,
            movimiento,
            anticipo,
            args: InstrumentArgs {
                banco,
                referencia,
                vencimiento,
                tarjeta_tipo,
                tarjeta_marca,
                cupon,
                plan,
            },
            mode: Submit::PaymentOrder,
            preview: vista_previa.unwrap_or(false),
        };
        settle(ctx, settlement).await
    }

    /// Settles obligations using only an existing advance.
    #[poise::command(slash_command)]
    pub async fn aplicar_anticipo(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "cliente or proveedor"]
        #[autocomplete = "autocomplete::autocomplete_contraparte"]
        tipo: String,
        #[description = "Counterparty id"] id: i64,
        #[description = "Advance id"] anticipo: i64,
    ) -> Result<()> {
        let Some(kind) = parse_kind(&tipo) else {
            ctx.say("❌ Tipo must be `cliente` or `proveedor`.").await?;
            return Ok(());
        };
        let counterparty = Counterparty { kind, id };

        let mut form = load_form(ctx, counterparty).await?;
        if let Err(e) = form.use_advance(anticipo) {
            ctx.say(format!("❌ {e}")).await?;
            return Ok(());
        }
        let saldo = form
            .selected_advance()
            .map_or(Decimal::ZERO, Advance::saldo);
        form.distribute(saldo);

        let request = match form.build_request() {
            Ok(request) => request,
            Err(e) => {
                ctx.say(format!("❌ {e}")).await?;
                return Ok(());
            }
        };
        submit(ctx, &request, Submit::Advance, false).await
    }

    #[cfg(test)]
    mod tests {
        #![allow(clippy::unwrap_used)]
        use super::*;
        use crate::core::allocation::Obligation;
        use chrono::NaiveDate;
        use rust_decimal_macros::dec;
        use std::collections::HashMap;

        const TARJETA: i64 = 4;

        fn proveedor_form() -> AllocationForm {
            let fecha = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
            let mut form =
                AllocationForm::new(HashMap::from([(TARJETA, Medio::Tarjeta)]), fecha, None);
            form.select_counterparty(
                Counterparty::proveedor(8),
                vec![Obligation {
                    id: 30,
                    fecha,
                    saldo: dec!(120),
                    ordenpago_id: None,
                    formapago_id: None,
                }],
                Vec::new(),
            );
            form
        }

        #[test]
        fn test_card_fields_complete_a_tarjeta_payment() {
            let mut form = proveedor_form();
            let row = form.add_instrument();
            form.update_instrument(row, InstrumentField::FormaPago(TARJETA))
                .unwrap();
            form.update_instrument(row, InstrumentField::Monto(dec!(120)))
                .unwrap();
            let args = InstrumentArgs {
                tarjeta_tipo: Some("crédito".to_string()),
                tarjeta_marca: Some("Visa".to_string()),
                cupon: Some("000123".to_string()),
                plan: Some("3 cuotas".to_string()),
                ..InstrumentArgs::default()
            };
            fill_fields(&mut form, row, args).unwrap();
            form.distribute(dec!(120));

            let request = form.build_request().unwrap();
            assert_eq!(request.counterparty_kind, CounterpartyKind::Proveedor);
            let fields = &request.payments[0].fields;
            assert_eq!(fields.tarjeta_marca.as_deref(), Some("Visa"));
            assert_eq!(fields.cupon.as_deref(), Some("000123"));
            assert_eq!(fields.plan.as_deref(), Some("3 cuotas"));
        }

        #[test]
        fn test_tarjeta_payment_without_card_fields_is_blocked() {
            let mut form = proveedor_form();
            let row = form.add_instrument();
            form.update_instrument(row, InstrumentField::FormaPago(TARJETA))
                .unwrap();
            form.update_instrument(row, InstrumentField::Monto(dec!(120)))
                .unwrap();
            fill_fields(&mut form, row, InstrumentArgs::default()).unwrap();
            form.distribute(dec!(120));

            assert!(form.build_request().is_err());
        }
    }
}

// Re-export all commands
pub use inner::*;

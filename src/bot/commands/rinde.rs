//! Rinde Discord commands - calculate, save and list monthly yields.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, amount_from_f64},
        config::settings::RindePrecios,
        core::rinde::{self as calculo, Ajuste, Categoria, Periodo, RindeInputs, RindeResult},
        errors::{Error, Result},
    };
    use std::fmt::Write;

    /// Raw slash-command numbers for one calculation.
    struct RawInputs {
        ventas: f64,
        movimientos: f64,
        inventario_inicial: f64,
        inventario_final: f64,
        kg_novillo: f64,
        kg_vaca: f64,
        kg_cerdo: f64,
        ajuste: Option<f64>,
        ajuste_descripcion: Option<String>,
    }

    impl RawInputs {
        fn into_inputs(self, precios: &RindePrecios) -> Result<RindeInputs> {
            let ajustes = match self.ajuste {
                Some(importe) => vec![Ajuste {
                    descripcion: self
                        .ajuste_descripcion
                        .unwrap_or_else(|| "Ajuste".to_string()),
                    importe: amount_from_f64(importe)?,
                }],
                None => Vec::new(),
            };

            Ok(RindeInputs {
                ventas: amount_from_f64(self.ventas)?,
                movimientos: amount_from_f64(self.movimientos)?,
                inventario_inicial: amount_from_f64(self.inventario_inicial)?,
                inventario_final: amount_from_f64(self.inventario_final)?,
                ajustes,
                novillo: Categoria::new(amount_from_f64(self.kg_novillo)?, precios.precio_novillo),
                vaca: Categoria::new(amount_from_f64(self.kg_vaca)?, precios.precio_exportacion),
                cerdo: Categoria::new(amount_from_f64(self.kg_cerdo)?, precios.precio_cerdo),
            })
        }
    }

    fn describe(result: &RindeResult) -> String {
        let mut message = format!(
            "📈 Vendido: **${}**\nEsperado: **${}**\n",
            result.monto_vendido, result.monto_esperado
        );
        if result.incompleto {
            message.push_str("⚠️ Rinde incompleto: no expected amount (check kilograms and prices).");
        } else {
            let _ = write!(message, "Rinde: **{}%**", result.rinde);
        }
        message
    }

    /// Parent command for the monthly yield.
    #[poise::command(
        slash_command,
        subcommands("rinde_calcular", "rinde_guardar", "rinde_listar")
    )]
    pub async fn rinde(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Rinde command. Available subcommands:\n\
            `/rinde calcular` - Compute the yield without saving\n\
            `/rinde guardar` - Compute and save a month\n\
            `/rinde listar` - List saved months";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Computes the yield with the configured prices, without saving it.
    #[allow(clippy::too_many_arguments)]
    #[poise::command(slash_command, rename = "calcular")]
    pub async fn rinde_calcular(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Sales total"] ventas: f64,
        #[description = "Internal movements total"] movimientos: f64,
        #[description = "Opening inventory value"] inventario_inicial: f64,
        #[description = "Closing inventory value"] inventario_final: f64,
        #[description = "Novillo kilograms"] kg_novillo: f64,
        #[description = "Vaca kilograms"] kg_vaca: f64,
        #[description = "Cerdo kilograms"] kg_cerdo: f64,
        #[description = "Signed adjustment"] ajuste: Option<f64>,
        #[description = "Adjustment description"] ajuste_descripcion: Option<String>,
    ) -> Result<()> {
        let raw = RawInputs {
            ventas,
            movimientos,
            inventario_inicial,
            inventario_final,
            kg_novillo,
            kg_vaca,
            kg_cerdo,
            ajuste,
            ajuste_descripcion,
        };
        let inputs = raw.into_inputs(&ctx.data().settings.rinde)?;

        match inputs.calculate() {
            Ok(result) => ctx.say(describe(&result)).await?,
            Err(e @ Error::Rejected { .. }) => ctx.say(format!("❌ {e}")).await?,
            Err(e) => return Err(e),
        };
        Ok(())
    }

    /// Computes and saves the yield of a month for this branch.
    #[allow(clippy::too_many_arguments)]
    #[poise::command(slash_command, rename = "guardar")]
    pub async fn rinde_guardar(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Month (1-12)"] mes: u32,
        #[description = "Year"] anio: i32,
        #[description = "Sales total"] ventas: f64,
        #[description = "Internal movements total"] movimientos: f64,
        #[description = "Opening inventory value"] inventario_inicial: f64,
        #[description = "Closing inventory value"] inventario_final: f64,
        #[description = "Novillo kilograms"] kg_novillo: f64,
        #[description = "Vaca kilograms"] kg_vaca: f64,
        #[description = "Cerdo kilograms"] kg_cerdo: f64,
        #[description = "Signed adjustment"] ajuste: Option<f64>,
        #[description = "Adjustment description"] ajuste_descripcion: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let periodo = match Periodo::new(data.settings.sucursal_id, mes, anio) {
            Ok(periodo) => periodo,
            Err(e) => {
                ctx.say(format!("❌ {e}")).await?;
                return Ok(());
            }
        };
        let raw = RawInputs {
            ventas,
            movimientos,
            inventario_inicial,
            inventario_final,
            kg_novillo,
            kg_vaca,
            kg_cerdo,
            ajuste,
            ajuste_descripcion,
        };
        let inputs = raw.into_inputs(&data.settings.rinde)?;

        match calculo::save_rinde(&data.database, periodo, &inputs).await {
            Ok(saved) => {
                ctx.say(format!(
                    "✅ Rinde {:02}/{} saved: **{}%** (vendido ${}, esperado ${}).",
                    saved.mes, saved.anio, saved.rinde, saved.monto_vendido, saved.monto_esperado
                ))
                .await?;
            }
            Err(
                e @ (Error::DuplicateRinde { .. } | Error::IncompleteRinde | Error::Rejected { .. }),
            ) => {
                ctx.say(format!("⚠️ {e}")).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Lists the saved yields of this branch, newest first.
    #[poise::command(slash_command, rename = "listar")]
    pub async fn rinde_listar(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let rindes = calculo::list_rindes(&data.database, data.settings.sucursal_id).await?;

        if rindes.is_empty() {
            ctx.say("📭 No rinde saved yet.").await?;
            return Ok(());
        }

        let mut message = String::from("**Rindes**\n");
        for r in rindes.iter().take(24) {
            let _ = writeln!(message, "• {:02}/{}: {}%", r.mes, r.anio, r.rinde.round_dp(2));
        }
        ctx.say(message).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

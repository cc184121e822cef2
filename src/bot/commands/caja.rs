//! Caja Discord commands - open, close and inspect the branch session.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, amount_from_f64},
        core::caja as sesion,
        errors::{Error, Result},
    };

    /// Parent command for the branch caja session.
    #[poise::command(
        slash_command,
        subcommands("caja_abrir", "caja_cerrar", "caja_estado")
    )]
    pub async fn caja(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Caja command. Available subcommands:\n\
            `/caja abrir` - Open the caja with an initial float\n\
            `/caja cerrar` - Close the open caja\n\
            `/caja estado` - Show the open caja";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Opens a caja session for this branch.
    #[poise::command(slash_command, rename = "abrir")]
    pub async fn caja_abrir(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Initial cash float"] monto_inicial: f64,
    ) -> Result<()> {
        let monto_inicial = amount_from_f64(monto_inicial)?;
        let data = ctx.data();
        let usuario = ctx.author().name.clone();

        match sesion::open_session(&data.database, data.settings.sucursal_id, usuario, monto_inicial)
            .await
        {
            Ok(session) => {
                ctx.say(format!(
                    "✅ Caja #{} opened with **${}**.",
                    session.id, session.monto_inicial
                ))
                .await?;
            }
            Err(e @ (Error::CajaAlreadyOpen { .. } | Error::Rejected { .. })) => {
                ctx.say(format!("⚠️ {e}")).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Closes the open caja session.
    #[poise::command(slash_command, rename = "cerrar")]
    pub async fn caja_cerrar(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let Some(open) = sesion::current_open_session(&data.database, data.settings.sucursal_id).await?
        else {
            ctx.say("⚠️ There is no open caja.").await?;
            return Ok(());
        };

        let closed = sesion::close_session(&data.database, open.id).await?;
        ctx.say(format!("✅ Caja #{} closed.", closed.id)).await?;
        Ok(())
    }

    /// Shows the open caja session.
    #[poise::command(slash_command, rename = "estado")]
    pub async fn caja_estado(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let message = sesion::current_open_session(&data.database, data.settings.sucursal_id)
            .await?
            .map_or_else(
                || "📭 The caja is closed.".to_string(),
                |session| {
                    format!(
                        "💵 Caja #{} open since {} by {} (float ${}).",
                        session.id,
                        session.abierta_en.format("%Y-%m-%d %H:%M"),
                        session.usuario,
                        session.monto_inicial
                    )
                },
            );
        ctx.say(message).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

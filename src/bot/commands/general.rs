//! General Discord commands - ping, help, and other utility commands.
//! This module contains simple commands that don't require database operations
//! and provide basic bot functionality and user assistance.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    ///
    /// This is a simple health check command that doesn't require any database operations.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    const HELP_TEXT: &str = "**Tesorero Help**\n\
        Here is a summary of all available commands.\n\n\
        **Tesorería**\n\
        • `/saldos <tipo> <id>` - Pending obligations and advances of a cliente or proveedor.\n\
        • `/cobrar <cliente> <forma_pago> [monto] ...` - Collects from a cliente, oldest obligations first.\n\
        • `/pagar <proveedor> <forma_pago> [monto] ...` - Pays a proveedor under a payment order, oldest obligations first.\n\
        • `/aplicar_anticipo <tipo> <id> <anticipo>` - Settles obligations with an existing advance.\n\n\
        **Caja**\n\
        • `/caja abrir <monto_inicial>` - Opens the branch caja.\n\
        • `/caja cerrar` - Closes it.\n\
        • `/caja estado` - Shows the open session.\n\n\
        **Rinde**\n\
        • `/rinde calcular ...` - Computes the yield without saving.\n\
        • `/rinde guardar <mes> <anio> ...` - Computes and saves a month.\n\
        • `/rinde listar` - Lists saved months.\n\n\
        **Utility Commands**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.";

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say(HELP_TEXT).await?;
        Ok(())
    }

}

// Re-export all commands
pub use inner::*;

//! Autocomplete handlers for Discord slash command parameters.

use crate::{bot::BotData, core::forma_pago, errors::Error};

/// Suggests active formas de pago whose name contains the partial input.
///
/// Cuenta corriente entries are left out since they cannot fund a payment.
pub async fn autocomplete_forma_pago(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let db = &ctx.data().database;

    let Ok(formas) = forma_pago::list_active(db).await else {
        return Vec::new();
    };

    let partial_lower = partial.to_lowercase();

    formas
        .into_iter()
        .filter(|fp| {
            fp.medio
                .parse::<crate::core::medio::Medio>()
                .is_ok_and(|m| m.can_pay())
        })
        .filter(|fp| fp.nombre.to_lowercase().contains(&partial_lower))
        .map(|fp| fp.nombre)
        .take(25) // Discord autocomplete limit
        .collect()
}

/// Suggests the two counterparty kinds.
pub async fn autocomplete_contraparte(
    _ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    matching_contrapartes(partial)
}

fn matching_contrapartes(partial: &str) -> Vec<String> {
    let partial_lower = partial.to_lowercase();
    ["cliente", "proveedor"]
        .iter()
        .filter(|k| k.contains(&partial_lower))
        .map(|&k| k.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contraparte_suggestions() {
        assert_eq!(matching_contrapartes(""), vec!["cliente", "proveedor"]);
        assert_eq!(matching_contrapartes("PROV"), vec!["proveedor"]);
        assert_eq!(matching_contrapartes("e"), vec!["cliente", "proveedor"]);
        assert!(matching_contrapartes("banco").is_empty());
    }
}

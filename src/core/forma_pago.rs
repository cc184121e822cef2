//! Forma de pago catalog.
//!
//! The catalog is seeded from `config.toml` on startup and read by the
//! allocation form to resolve each forma de pago to its medio.

use crate::{
    config::settings::FormaPagoConfig,
    core::medio::Medio,
    entities::{FormaPago, forma_pago},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// All active formas de pago, ordered by name.
pub async fn list_active<C>(db: &C) -> Result<Vec<forma_pago::Model>>
where
    C: ConnectionTrait,
{
    FormaPago::find()
        .filter(forma_pago::Column::Activa.eq(true))
        .order_by_asc(forma_pago::Column::Nombre)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an active forma de pago by its exact name.
pub async fn get_by_nombre<C>(db: &C, nombre: &str) -> Result<Option<forma_pago::Model>>
where
    C: ConnectionTrait,
{
    FormaPago::find()
        .filter(forma_pago::Column::Nombre.eq(nombre))
        .filter(forma_pago::Column::Activa.eq(true))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Maps every active forma de pago id to its medio.
///
/// Rows whose stored medio cannot be parsed are skipped with a warning.
pub async fn catalog<C>(db: &C) -> Result<HashMap<i64, Medio>>
where
    C: ConnectionTrait,
{
    let rows = list_active(db).await?;
    let mut map = HashMap::with_capacity(rows.len());
    for row in rows {
        match row.medio.parse::<Medio>() {
            Ok(medio) => {
                map.insert(row.id, medio);
            }
            Err(e) => warn!(formapago_id = row.id, "Skipping forma de pago: {e}"),
        }
    }
    Ok(map)
}

/// Inserts configured formas de pago that are not present yet.
///
/// Existing rows (matched by name) are left untouched. Returns how many rows
/// were inserted.
pub async fn seed_formas_pago(db: &DatabaseConnection, configs: &[FormaPagoConfig]) -> Result<usize> {
    let mut inserted = 0;
    for config in configs {
        let nombre = config.nombre.trim();
        if nombre.is_empty() {
            return Err(Error::Config {
                message: "Forma de pago name cannot be empty".to_string(),
            });
        }

        let medio = match config.medio {
            Some(medio) => medio,
            None => Medio::infer_from_nombre(nombre).ok_or_else(|| Error::Config {
                message: format!("Cannot infer medio for forma de pago '{nombre}'"),
            })?,
        };

        let exists = FormaPago::find()
            .filter(forma_pago::Column::Nombre.eq(nombre))
            .one(db)
            .await?
            .is_some();
        if exists {
            debug!("Forma de pago '{nombre}' already present");
            continue;
        }

        forma_pago::ActiveModel {
            nombre: Set(nombre.to_string()),
            medio: Set(medio.as_str().to_string()),
            activa: Set(true),
            ..Default::default()
        }
        .insert(db)
        .await?;
        inserted += 1;
    }

    info!("Seeded {inserted} formas de pago");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn config(nombre: &str, medio: Option<Medio>) -> FormaPagoConfig {
        FormaPagoConfig {
            nombre: nombre.to_string(),
            medio,
        }
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let configs = vec![
            config("Efectivo", None),
            config("Galicia", Some(Medio::Transferencia)),
        ];

        assert_eq!(seed_formas_pago(&db, &configs).await?, 2);
        assert_eq!(seed_formas_pago(&db, &configs).await?, 0);
        assert_eq!(list_active(&db).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_rejects_uninferable_medio() -> Result<()> {
        let db = setup_test_db().await?;
        let result = seed_formas_pago(&db, &[config("Vale", None)]).await;
        assert!(matches!(result, Err(Error::Config { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_catalog_resolves_medio() -> Result<()> {
        let db = setup_test_db().await?;
        seed_formas_pago(
            &db,
            &[config("Efectivo", None), config("Cuenta Corriente", None)],
        )
        .await?;

        let catalog = catalog(&db).await?;
        let efectivo = get_by_nombre(&db, "Efectivo").await?;
        let ctacte = get_by_nombre(&db, "Cuenta Corriente").await?;

        assert!(efectivo.is_some() && ctacte.is_some());
        if let (Some(efectivo), Some(ctacte)) = (efectivo, ctacte) {
            assert_eq!(catalog.get(&efectivo.id), Some(&Medio::Caja));
            assert_eq!(catalog.get(&ctacte.id), Some(&Medio::Ctacte));
        }
        Ok(())
    }
}

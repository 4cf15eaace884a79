use super::model::{Borrador, SesionGuardada};
use crate::model::{Role, User};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{Row, SqlitePool};
use tracing::{debug, instrument};

pub type Pool = SqlitePool;

const KEY_JORNADA_CERRADA: &str = "jornada_cerrada";
const KEY_HORA_INICIO: &str = "hora_inicio_jornada";

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized)
        .await
        .with_context(|| format!("failed to open store at {normalized}"))?;
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// Expand a leading `~/` in a file-backed SQLite URL, create the parent
/// directory and ask SQLite to create the file if missing. In-memory and
/// non-sqlite URLs pass through.
pub(crate) fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rel), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rel),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    format!(
        "sqlite://{}?{}",
        expanded_path,
        query_part.unwrap_or("mode=rwc")
    )
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

// --- session ---

#[instrument(skip_all)]
pub async fn guardar_sesion(pool: &Pool, token: &str, user: &User) -> Result<()> {
    sqlx::query(
        "INSERT INTO session (id, token, user_id, role, nombre) VALUES (1, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET token = excluded.token, user_id = excluded.user_id,
             role = excluded.role, nombre = excluded.nombre,
             created_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
    )
    .bind(token)
    .bind(&user.id)
    .bind(user.role.as_str())
    .bind(&user.nombre)
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn cargar_sesion(pool: &Pool) -> Result<Option<SesionGuardada>> {
    let row = sqlx::query("SELECT token, user_id, role, nombre FROM session WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let role: String = row.get("role");
    let role = Role::parse_role(&role).ok_or_else(|| anyhow!("unknown role in store: {role}"))?;
    Ok(Some(SesionGuardada {
        token: row.get("token"),
        user: User {
            id: row.get("user_id"),
            role,
            nombre: row.get("nombre"),
        },
    }))
}

/// Forget everything: session, flags and drafts.
#[instrument(skip_all)]
pub async fn limpiar_todo(pool: &Pool) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM session").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM session_state")
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM venta_drafts")
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    debug!("local store cleared");
    Ok(())
}

// --- session_state ---

async fn get_state(pool: &Pool, key: &str) -> Result<Option<String>> {
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM session_state WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value)
}

async fn set_state(pool: &Pool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO session_state (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value,
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

async fn delete_state(pool: &Pool, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM session_state WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn jornada_cerrada(pool: &Pool) -> Result<bool> {
    Ok(get_state(pool, KEY_JORNADA_CERRADA).await?.as_deref() == Some("1"))
}

#[instrument(skip_all, fields(cerrada = cerrada))]
pub async fn set_jornada_cerrada(pool: &Pool, cerrada: bool) -> Result<()> {
    if cerrada {
        set_state(pool, KEY_JORNADA_CERRADA, "1").await
    } else {
        delete_state(pool, KEY_JORNADA_CERRADA).await
    }
}

#[instrument(skip_all)]
pub async fn hora_inicio_jornada(pool: &Pool) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = get_state(pool, KEY_HORA_INICIO).await? else {
        return Ok(None);
    };
    let parsed = DateTime::parse_from_rfc3339(&raw)
        .with_context(|| format!("invalid stored shift start: {raw}"))?;
    Ok(Some(parsed.with_timezone(&Utc)))
}

#[instrument(skip_all)]
pub async fn guardar_hora_inicio(pool: &Pool, inicio: DateTime<Utc>) -> Result<()> {
    set_state(pool, KEY_HORA_INICIO, &inicio.to_rfc3339()).await
}

#[instrument(skip_all)]
pub async fn borrar_hora_inicio(pool: &Pool) -> Result<()> {
    delete_state(pool, KEY_HORA_INICIO).await
}

// --- venta_drafts ---

#[instrument(skip_all, fields(venta_id = %venta_id))]
pub async fn guardar_borrador(
    pool: &Pool,
    venta_id: &str,
    payload: &Map<String, Value>,
) -> Result<()> {
    let json = serde_json::to_string(payload)?;
    sqlx::query(
        "INSERT INTO venta_drafts (venta_id, payload) VALUES (?, ?)
         ON CONFLICT(venta_id) DO UPDATE SET payload = excluded.payload,
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
    )
    .bind(venta_id)
    .bind(json)
    .execute(pool)
    .await?;
    Ok(())
}

fn borrador_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Borrador> {
    let payload: String = row.get("payload");
    let updated_at: String = row.get("updated_at");
    Ok(Borrador {
        venta_id: row.get("venta_id"),
        payload: serde_json::from_str(&payload).context("corrupt draft payload")?,
        updated_at: DateTime::parse_from_rfc3339(&updated_at)
            .ok()
            .map(|d| d.with_timezone(&Utc)),
    })
}

#[instrument(skip_all, fields(venta_id = %venta_id))]
pub async fn cargar_borrador(pool: &Pool, venta_id: &str) -> Result<Option<Borrador>> {
    let row = sqlx::query("SELECT venta_id, payload, updated_at FROM venta_drafts WHERE venta_id = ?")
        .bind(venta_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(borrador_from_row).transpose()
}

#[instrument(skip_all)]
pub async fn listar_borradores(pool: &Pool) -> Result<Vec<Borrador>> {
    let rows = sqlx::query("SELECT venta_id, payload, updated_at FROM venta_drafts ORDER BY updated_at")
        .fetch_all(pool)
        .await?;
    rows.iter().map(borrador_from_row).collect()
}

#[instrument(skip_all, fields(venta_id = %venta_id))]
pub async fn borrar_borrador(pool: &Pool, venta_id: &str) -> Result<bool> {
    let res = sqlx::query("DELETE FROM venta_drafts WHERE venta_id = ?")
        .bind(venta_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

#[instrument(skip_all)]
pub async fn borrar_borradores(pool: &Pool) -> Result<u64> {
    let res = sqlx::query("DELETE FROM venta_drafts").execute(pool).await?;
    Ok(res.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_pool() -> Pool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn user() -> User {
        User {
            id: "u1".into(),
            role: Role::Empleado,
            nombre: "Ana".into(),
        }
    }

    #[tokio::test]
    async fn session_round_trip_and_overwrite() {
        let pool = setup_pool().await;
        assert!(cargar_sesion(&pool).await.unwrap().is_none());

        guardar_sesion(&pool, "t1", &user()).await.unwrap();
        let admin = User {
            role: Role::Admin,
            ..user()
        };
        guardar_sesion(&pool, "t2", &admin).await.unwrap();

        let s = cargar_sesion(&pool).await.unwrap().unwrap();
        assert_eq!(s.token, "t2");
        assert_eq!(s.user, admin);
    }

    #[tokio::test]
    async fn flags_and_shift_start() {
        let pool = setup_pool().await;
        assert!(!jornada_cerrada(&pool).await.unwrap());
        set_jornada_cerrada(&pool, true).await.unwrap();
        assert!(jornada_cerrada(&pool).await.unwrap());
        set_jornada_cerrada(&pool, false).await.unwrap();
        assert!(!jornada_cerrada(&pool).await.unwrap());

        let inicio = Utc.with_ymd_and_hms(2025, 3, 17, 8, 0, 0).unwrap();
        guardar_hora_inicio(&pool, inicio).await.unwrap();
        assert_eq!(hora_inicio_jornada(&pool).await.unwrap(), Some(inicio));
        borrar_hora_inicio(&pool).await.unwrap();
        assert_eq!(hora_inicio_jornada(&pool).await.unwrap(), None);
    }

    #[tokio::test]
    async fn drafts_are_keyed_by_sale() {
        let pool = setup_pool().await;
        let p = json!({ "primaNeta": 600 });
        guardar_borrador(&pool, "v1", p.as_object().unwrap()).await.unwrap();
        guardar_borrador(&pool, "v2", p.as_object().unwrap()).await.unwrap();

        let b = cargar_borrador(&pool, "v1").await.unwrap().unwrap();
        assert_eq!(b.payload.get("primaNeta"), Some(&json!(600)));

        assert!(borrar_borrador(&pool, "v1").await.unwrap());
        assert!(!borrar_borrador(&pool, "v1").await.unwrap());
        assert_eq!(borrar_borradores(&pool).await.unwrap(), 1);
        assert!(listar_borradores(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_wipes_every_table() {
        let pool = setup_pool().await;
        guardar_sesion(&pool, "t", &user()).await.unwrap();
        set_jornada_cerrada(&pool, true).await.unwrap();
        guardar_borrador(&pool, "v1", &Map::new()).await.unwrap();

        limpiar_todo(&pool).await.unwrap();
        assert!(cargar_sesion(&pool).await.unwrap().is_none());
        assert!(!jornada_cerrada(&pool).await.unwrap());
        assert!(listar_borradores(&pool).await.unwrap().is_empty());
    }

    #[test]
    fn file_urls_get_create_mode() {
        assert_eq!(prepare_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/nested/crm.db", dir.path().display());
        let prepared = prepare_sqlite_url(&url);
        assert!(prepared.ends_with("/nested/crm.db?mode=rwc"));
        assert!(dir.path().join("nested").is_dir());
    }
}

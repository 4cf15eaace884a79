use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use crm_client::api::HttpCrmApi;
use crm_client::config;
use crm_client::fecha::{formatear_fecha_es, Mes};
use crm_client::horario::{clasificar_dia, formatear_balance, formatear_minutos};
use crm_client::model::Venta;
use crm_client::session::SessionController;
use crm_client::store;
use crm_client::ventas::{FiltroLibro, Revision};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and keep the session for later commands
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Today's clock status
    Hoy,
    /// Clock in or out
    Fichar,
    /// Worked time for a month, by week
    Historial {
        /// Month as YYYY-MM (defaults to the current one)
        #[arg(long)]
        mes: Option<Mes>,
    },
    /// Employee calendar merged with the organization calendar
    Calendario {
        #[arg(long)]
        mes: Option<Mes>,
    },
    /// Sales ledger for a month
    Libro {
        #[arg(long)]
        mes: Option<Mes>,
        #[arg(long)]
        aseguradora: Option<String>,
        #[arg(long)]
        ramo: Option<String>,
        /// Creator name
        #[arg(long)]
        usuario: Option<String>,
    },
    /// Search sales by policy, holder or fiscal id
    Buscar { consulta: String },
    /// Open review requests (admin)
    Solicitudes,
    /// Show what a request would change (admin)
    Revisar { id: String },
    Aprobar { id: String },
    Rechazar { id: String },
    /// Follow live events until the connection ends
    Escuchar,
}

fn imprimir_venta(v: &Venta) {
    println!(
        "{}  {}  {}  {:.2}  {}{}",
        v.fecha_efecto,
        v.numero_poliza,
        v.tomador,
        v.prima_neta,
        if v.esta_anulada() { "ANULADA " } else { "" },
        v.estado_revision
            .map(|r| format!("[{r:?}]"))
            .unwrap_or_default()
    );
}

fn mes_o_actual(mes: Option<Mes>) -> Mes {
    mes.unwrap_or_else(|| Mes::de_fecha(Local::now().date_naive()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| cfg.database_url());
    let pool = store::init_pool(&database_url).await?;
    store::run_migrations(&pool).await?;

    let api = Arc::new(HttpCrmApi::new(&cfg.backend.api_url)?);
    let mut session = SessionController::new(api, pool, cfg.horario.clone());

    if let Command::Login { email, password } = &args.command {
        let user = session.login(email, password).await?;
        println!("Sesión iniciada: {} ({})", user.nombre, user.role.as_str());
        return Ok(());
    }

    if !session.restaurar().await? {
        return Err(anyhow!("no hay sesión guardada, ejecuta `login` primero"));
    }

    match args.command {
        Command::Login { .. } => {}
        Command::Logout => {
            session.logout().await?;
            println!("Sesión cerrada");
        }
        Command::Hoy => {
            let ahora = Utc::now();
            let hoy = session.cargar_hoy(ahora).await?;
            println!(
                "{:?} · {}",
                hoy.registro.estado,
                formatear_minutos(hoy.minutos_en_vivo(ahora))
            );
        }
        Command::Fichar => {
            let aviso = session.fichar(Local::now()).await?;
            println!("{}", aviso.texto);
        }
        Command::Historial { mes } => {
            let historial = session.cargar_historial(mes_o_actual(mes)).await?;
            println!(
                "{}: {} días, {}",
                historial.mes,
                historial.totales.dias_trabajados,
                formatear_minutos(historial.totales.minutos)
            );
            for semana in &historial.semanas {
                println!(
                    "  {}  {}  {}",
                    semana.etiqueta(),
                    formatear_minutos(semana.minutos),
                    formatear_balance(semana.diferencia)
                );
            }
        }
        Command::Calendario { mes } => {
            let cal = session.cargar_calendario(mes_o_actual(mes)).await?;
            for fecha in cal.mes.dias() {
                let dia = cal.dias.get(&fecha);
                println!(
                    "{}  {:?}  {}",
                    formatear_fecha_es(fecha),
                    clasificar_dia(fecha, dia),
                    dia.map(|d| formatear_minutos(d.minutos_trabajados))
                        .unwrap_or_default()
                );
            }
            println!(
                "Total: {} días, {}",
                cal.totales.dias_trabajados,
                formatear_minutos(cal.totales.minutos)
            );
        }
        Command::Libro {
            mes,
            aseguradora,
            ramo,
            usuario,
        } => {
            let filtro = FiltroLibro {
                aseguradora,
                ramo,
                usuario,
            };
            let libro = session.cargar_libro(mes_o_actual(mes)).await?;
            for v in libro.filtrar(&filtro) {
                imprimir_venta(v);
            }
            let produccion = libro.produccion(&filtro);
            println!("Producción total: {:.2} €", produccion.total);
            for (ramo, total) in &produccion.por_ramo {
                println!("  {ramo}: {total:.2} €");
            }
        }
        Command::Buscar { consulta } => {
            for v in session.buscar_ventas(&consulta).await? {
                imprimir_venta(&v);
            }
        }
        Command::Solicitudes => {
            for s in session.cargar_solicitudes().await? {
                println!(
                    "{}  {}  {}  {}",
                    s.id,
                    s.tipo.etiqueta(),
                    s.venta.numero_poliza.as_deref().unwrap_or("-"),
                    s.solicitado_por
                        .as_ref()
                        .map(|p| p.nombre.as_str())
                        .unwrap_or("-")
                );
            }
        }
        Command::Revisar { id } => {
            session.cargar_solicitudes().await?;
            match session.abrir_solicitud(&id).await? {
                Revision::Cambios(cambios) if cambios.is_empty() => println!("Sin cambios"),
                Revision::Cambios(cambios) => {
                    for c in cambios {
                        println!("  {}: {} -> {}", c.campo, c.antes, c.despues);
                    }
                }
                Revision::Eliminacion => println!("Eliminar la venta"),
                Revision::Anulacion { motivo } => {
                    println!("Anular la venta: {}", motivo.as_deref().unwrap_or("-"))
                }
                Revision::Rehabilitacion => println!("Rehabilitar la venta"),
            }
        }
        Command::Aprobar { id } => {
            session.cargar_solicitudes().await?;
            session.aprobar(&id).await?;
            println!("Solicitud {id} aprobada");
        }
        Command::Rechazar { id } => {
            session.cargar_solicitudes().await?;
            session.rechazar(&id).await?;
            println!("Solicitud {id} rechazada");
        }
        Command::Escuchar => {
            let max_backoff = Duration::from_secs(cfg.app.max_backoff_seconds);
            session.conectar(&cfg.socket_base(), max_backoff)?;
            info!("listening for live events");
            while let Some(evento) = session.siguiente_evento().await? {
                println!("{evento:?}");
            }
        }
    }

    Ok(())
}

//! Configuration loader and validator for the CRM client.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::model::{ConfigEmpleado, HORAS_CONTRATADAS_POR_DEFECTO, MAX_DIAS_VACACIONES_POR_DEFECTO};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub app: App,
    pub backend: Backend,
    #[serde(default)]
    pub horario: Horario,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub max_backoff_seconds: u64,
}

/// Where the REST API and the Socket.IO endpoint live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Backend {
    pub api_url: String,
    /// Defaults to the origin of `api_url`.
    #[serde(default)]
    pub socket_url: Option<String>,
}

/// Time-tracking defaults used when the backend omits per-employee values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Horario {
    pub horas_contratadas_semana: f64,
    pub max_dias_vacaciones: u32,
    pub aviso_segundos: u64,
    pub hora_cambio_saludo: u32,
}

impl Default for Horario {
    fn default() -> Self {
        Self {
            horas_contratadas_semana: HORAS_CONTRATADAS_POR_DEFECTO,
            max_dias_vacaciones: MAX_DIAS_VACACIONES_POR_DEFECTO,
            aviso_segundos: 10,
            hora_cambio_saludo: crate::horario::reloj::HORA_CAMBIO_SALUDO,
        }
    }
}

impl Horario {
    /// Contract figures for an employee whose record leaves them unset.
    pub fn config_empleado(&self) -> ConfigEmpleado {
        ConfigEmpleado {
            horas_contratadas_semana: self.horas_contratadas_semana,
            max_dias_vacaciones: self.max_dias_vacaciones,
        }
    }
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// Default SQLite location inside the data directory.
    pub fn database_url(&self) -> String {
        format!(
            "sqlite://{}/crm-client.db",
            self.app.data_dir.trim_end_matches('/')
        )
    }

    /// Socket base: explicit `socket_url`, else scheme and host of `api_url`.
    pub fn socket_base(&self) -> String {
        if let Some(url) = self.backend.socket_url.as_deref() {
            if !url.trim().is_empty() {
                return url.to_string();
            }
        }
        match reqwest::Url::parse(&self.backend.api_url) {
            Ok(url) => url.origin().ascii_serialization(),
            Err(_) => self.backend.api_url.clone(),
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.max_backoff_seconds == 0 {
        return Err(ConfigError::Invalid("app.max_backoff_seconds must be > 0"));
    }

    let api = cfg.backend.api_url.trim();
    if api.is_empty() {
        return Err(ConfigError::Invalid("backend.api_url must be non-empty"));
    }
    if !(api.starts_with("http://") || api.starts_with("https://")) {
        return Err(ConfigError::Invalid("backend.api_url must be an http(s) url"));
    }

    let h = &cfg.horario;
    if !(h.horas_contratadas_semana > 0.0) {
        return Err(ConfigError::Invalid("horario.horas_contratadas_semana must be > 0"));
    }
    if h.aviso_segundos == 0 {
        return Err(ConfigError::Invalid("horario.aviso_segundos must be > 0"));
    }
    if h.hora_cambio_saludo > 23 {
        return Err(ConfigError::Invalid("horario.hora_cambio_saludo must be an hour (0-23)"));
    }

    Ok(())
}

/// Sample configuration with every section filled in.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  max_backoff_seconds: 60

backend:
  api_url: "http://localhost:3001/api/"
  # socket_url: "http://localhost:3001"

horario:
  horas_contratadas_semana: 40
  max_dias_vacaciones: 30
  aviso_segundos: 10
  hora_cambio_saludo: 14
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.horario, Horario::default());
    }

    #[test]
    fn horario_section_is_optional() {
        let yaml = "app:\n  data_dir: d\n  max_backoff_seconds: 5\nbackend:\n  api_url: https://crm.example.com/api\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.horario.horas_contratadas_semana, 40.0);
        assert_eq!(cfg.horario.aviso_segundos, 10);
    }

    #[test]
    fn employee_contract_falls_back_to_horario() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.horario.max_dias_vacaciones = 22;
        let detalle: crate::model::UsuarioDetalle = serde_json::from_value(
            serde_json::json!({ "_id": "u1", "horasContratadasSemana": 30.0 }),
        )
        .unwrap();
        let config = detalle.config(cfg.horario.config_empleado());
        assert_eq!(config.horas_contratadas_semana, 30.0);
        assert_eq!(config.max_dias_vacaciones, 22);
    }

    #[test]
    fn invalid_api_url() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.backend.api_url = "".into();
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("backend.api_url")), _ => panic!("wrong error") }

        cfg.backend.api_url = "ftp://host".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_horario_values() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.horario.horas_contratadas_semana = 0.0;
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("horas_contratadas_semana")), _ => panic!("wrong error") }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.horario.hora_cambio_saludo = 24;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.max_backoff_seconds = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn socket_base_falls_back_to_api_origin() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        assert_eq!(cfg.socket_base(), "http://localhost:3001");
        cfg.backend.socket_url = Some("https://rt.example.com".into());
        assert_eq!(cfg.socket_base(), "https://rt.example.com");
    }

    #[test]
    fn database_url_lives_in_data_dir() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        assert_eq!(cfg.database_url(), "sqlite://./data/crm-client.db");
    }

    #[test]
    fn ensure_dirs_creates_data_dir() {
        let td = tempdir().unwrap();
        let data_path = td.path().join("data");
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = data_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(data_path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.app.max_backoff_seconds, 60);
    }
}

use std::env;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_DATABASE_PATH: &str = "reconcila.db";
pub const IN_MEMORY_DATABASE: &str = ":memory:";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_path: String,
    pub seed_doctor: Option<SeedDoctor>,
}

/// Clinician account created on first start when the doctors table is empty.
#[derive(Debug, Clone)]
pub struct SeedDoctor {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = match env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().unwrap_or_else(|_| {
                warn!("PORT value {:?} is not a valid port, using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            Err(_) => {
                warn!("PORT not set, using default {}", DEFAULT_PORT);
                DEFAULT_PORT
            }
        };

        let database_path = env::var("DATABASE_PATH")
            .unwrap_or_else(|_| {
                warn!("DATABASE_PATH not set, using default {}", DEFAULT_DATABASE_PATH);
                DEFAULT_DATABASE_PATH.to_string()
            });

        let seed_doctor = match (env::var("SEED_DOCTOR_EMAIL"), env::var("SEED_DOCTOR_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.is_empty() && !password.is_empty() => Some(SeedDoctor {
                email,
                password,
                first_name: env::var("SEED_DOCTOR_FIRST_NAME").unwrap_or_default(),
                last_name: env::var("SEED_DOCTOR_LAST_NAME").unwrap_or_default(),
            }),
            _ => {
                warn!("SEED_DOCTOR_EMAIL/SEED_DOCTOR_PASSWORD not set, no default doctor will be created");
                None
            }
        };

        Self {
            port,
            database_path,
            seed_doctor,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == IN_MEMORY_DATABASE
    }

    pub fn is_seed_configured(&self) -> bool {
        self.seed_doctor.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            seed_doctor: None,
        }
    }
}
